use std::collections::{BTreeMap, BTreeSet, HashSet};

use log::{debug, info};
use snafu::ensure;

use crate::config::*;
use crate::registry::{check_eligible, CandidateRegistry, VoterRegistry};
use crate::store::BallotStore;

/// Ranked ballots and the Schulze method.
pub struct SchulzeResolver<'a> {
    voters: &'a dyn VoterRegistry,
    candidates: &'a dyn CandidateRegistry,
    store: &'a BallotStore<RankedBallot>,
    rules: &'a TallyRules,
}

impl<'a> SchulzeResolver<'a> {
    pub fn new(
        voters: &'a dyn VoterRegistry,
        candidates: &'a dyn CandidateRegistry,
        store: &'a BallotStore<RankedBallot>,
        rules: &'a TallyRules,
    ) -> SchulzeResolver<'a> {
        SchulzeResolver {
            voters,
            candidates,
            store,
            rules,
        }
    }

    /// Adds a ranked ballot. The ranking must not name a candidate twice.
    pub fn submit(
        &self,
        voter_id: VoterId,
        ranking: &[CandidateId],
    ) -> TallyResult<RankedBallot> {
        if self.rules.eligibility_check == EligibilityCheck::AllBallots {
            check_eligible(self.voters, voter_id, self.rules.minimum_voter_age)?;
        }
        let mut seen: HashSet<CandidateId> = HashSet::new();
        for &candidate_id in ranking.iter() {
            ensure!(
                seen.insert(candidate_id),
                InvalidBallotSnafu {
                    voter_id,
                    reason: format!("candidate {} is ranked more than once", candidate_id)
                }
            );
            if self.rules.ranking_check == RankingCheck::RegisteredCandidatesOnly {
                ensure!(
                    self.candidates.exists(candidate_id),
                    CandidateNotFoundSnafu { candidate_id }
                );
            }
        }
        let ballot = self.store.record(RankedBallot {
            voter_id,
            ranking: ranking.to_vec(),
        })?;
        info!(
            "Ranked ballot from voter {} accepted ({} ranked ballots)",
            voter_id,
            self.store.len()
        );
        Ok(ballot)
    }

    /// Computes the Schulze winners over all the ranked ballots.
    pub fn resolve(&self) -> TallyResult<SchulzeResult> {
        let ballots = self.store.snapshot();
        ensure!(!ballots.is_empty(), NoRankedBallotsSnafu);
        Ok(run_schulze(&ballots))
    }
}

/// The Schulze method over a non-empty set of ballots.
///
/// Candidates are the ones appearing in at least one ranking. A candidate missing
/// from a ballot brings no preference information for that ballot.
pub fn run_schulze(ballots: &[RankedBallot]) -> SchulzeResult {
    let candidates: Vec<CandidateId> = ballots
        .iter()
        .flat_map(|b| b.ranking.iter().cloned())
        .collect::<BTreeSet<CandidateId>>()
        .into_iter()
        .collect();
    let index: BTreeMap<CandidateId, usize> = candidates
        .iter()
        .enumerate()
        .map(|(idx, cid)| (*cid, idx))
        .collect();
    info!(
        "Processing {} ranked ballots over {} candidates",
        ballots.len(),
        candidates.len()
    );

    let pairwise = pairwise_preferences(ballots, &index, candidates.len());
    debug!("run_schulze: pairwise: {:?}", pairwise);

    let strength = strongest_paths(&pairwise);
    debug!("run_schulze: strength: {:?}", strength);

    let n = candidates.len();
    let winners: Vec<CandidateId> = (0..n)
        .filter(|&c| (0..n).all(|d| c == d || strength[c][d] >= strength[d][c]))
        .map(|c| candidates[c])
        .collect();
    info!("Schulze winners: {:?}", winners);

    let mut audit_trail: BTreeMap<CandidateId, BTreeMap<CandidateId, u64>> = BTreeMap::new();
    for (i, ci) in candidates.iter().enumerate() {
        let row = audit_trail.entry(*ci).or_default();
        for (j, cj) in candidates.iter().enumerate() {
            if i != j {
                row.insert(*cj, pairwise[i][j]);
            }
        }
    }

    SchulzeResult {
        winners,
        pairwise: audit_trail,
    }
}

// pairwise[i][j]: number of ballots ranking candidate i above candidate j.
fn pairwise_preferences(
    ballots: &[RankedBallot],
    index: &BTreeMap<CandidateId, usize>,
    n: usize,
) -> Vec<Vec<u64>> {
    let mut pairwise = vec![vec![0u64; n]; n];
    for ballot in ballots.iter() {
        let positions: Vec<usize> = ballot
            .ranking
            .iter()
            .filter_map(|cid| index.get(cid).cloned())
            .collect();
        for (rank, &i) in positions.iter().enumerate() {
            for &j in positions[rank + 1..].iter() {
                if i != j {
                    pairwise[i][j] += 1;
                }
            }
        }
    }
    pairwise
}

/// Widest (max-min) path strengths over the graph of strict pairwise majorities.
fn strongest_paths(pairwise: &[Vec<u64>]) -> Vec<Vec<u64>> {
    let n = pairwise.len();
    let mut strength = vec![vec![0u64; n]; n];
    for c in 0..n {
        for d in 0..n {
            if c != d && pairwise[c][d] > pairwise[d][c] {
                strength[c][d] = pairwise[c][d];
            }
        }
    }
    // The intermediate candidate is the outer loop: a single pass reaches the fixed point.
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            for k in 0..n {
                if i != k && j != k {
                    let through_i = strength[j][i].min(strength[i][k]);
                    if through_i > strength[j][k] {
                        strength[j][k] = through_i;
                    }
                }
            }
        }
    }
    strength
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Candidates, Voters};

    const A: CandidateId = 1;
    const B: CandidateId = 2;
    const C: CandidateId = 3;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn ballots(rankings: &[&[CandidateId]]) -> Vec<RankedBallot> {
        rankings
            .iter()
            .enumerate()
            .map(|(idx, r)| RankedBallot {
                voter_id: idx as VoterId + 1,
                ranking: r.to_vec(),
            })
            .collect()
    }

    #[test]
    fn cycle_gives_three_co_winners() {
        init();
        let res = run_schulze(&ballots(&[&[A, B, C], &[B, C, A], &[C, A, B]]));
        assert_eq!(res.pairwise[&A][&B], 2);
        assert_eq!(res.pairwise[&B][&A], 1);
        assert_eq!(res.pairwise[&B][&C], 2);
        assert_eq!(res.pairwise[&C][&B], 1);
        assert_eq!(res.pairwise[&C][&A], 2);
        assert_eq!(res.pairwise[&A][&C], 1);
        assert_eq!(res.winners, vec![A, B, C]);
    }

    #[test]
    fn first_everywhere_wins_alone() {
        init();
        let res = run_schulze(&ballots(&[&[A, B, C], &[A, C, B], &[A, B, C]]));
        assert_eq!(res.winners, vec![A]);
        assert_eq!(res.pairwise[&A][&B], 3);
        assert_eq!(res.pairwise[&B][&C], 2);
        assert_eq!(res.pairwise[&C][&B], 1);
    }

    #[test]
    fn wikipedia_example() {
        // The 45 voters example for the Schulze method, with E as the winner.
        const D: CandidateId = 4;
        const E: CandidateId = 5;
        let groups: [(usize, [CandidateId; 5]); 8] = [
            (5, [A, C, B, E, D]),
            (5, [A, D, E, C, B]),
            (8, [B, E, D, A, C]),
            (3, [C, A, B, E, D]),
            (7, [C, A, E, B, D]),
            (2, [C, B, A, D, E]),
            (7, [D, C, E, B, A]),
            (8, [E, B, A, D, C]),
        ];
        let mut all: Vec<RankedBallot> = Vec::new();
        for (count, ranking) in groups.iter() {
            for _ in 0..*count {
                all.push(RankedBallot {
                    voter_id: all.len() as VoterId,
                    ranking: ranking.to_vec(),
                });
            }
        }
        let res = run_schulze(&all);
        assert_eq!(res.pairwise[&A][&B], 20);
        assert_eq!(res.pairwise[&B][&A], 25);
        assert_eq!(res.pairwise[&E][&D], 31);
        assert_eq!(res.winners, vec![E]);
    }

    #[test]
    fn partial_rankings_only_compare_listed_candidates() {
        let res = run_schulze(&ballots(&[&[A, B], &[C], &[B, C]]));
        assert_eq!(res.pairwise[&A][&C], 0);
        assert_eq!(res.pairwise[&C][&A], 0);
        assert_eq!(res.pairwise[&B][&C], 1);
        // A beats C through B.
        assert_eq!(res.winners, vec![A]);
    }

    fn registries() -> (Voters, Candidates) {
        let mut voters = Voters::new();
        voters
            .register(Voter {
                voter_id: 1,
                name: "Dora".to_string(),
                email: "dora@example.org".to_string(),
                age: 16,
            })
            .unwrap();
        let mut candidates = Candidates::new();
        for candidate_id in [A, B, C] {
            candidates
                .register(Candidate {
                    candidate_id,
                    name: format!("candidate {}", candidate_id),
                    party: None,
                })
                .unwrap();
        }
        (voters, candidates)
    }

    #[test]
    fn submission_rules() {
        init();
        let (voters, candidates) = registries();
        let store = BallotStore::new();
        let rules = TallyRules::DEFAULT_RULES;
        let resolver = SchulzeResolver::new(&voters, &candidates, &store, &rules);
        assert_eq!(resolver.resolve(), Err(TallyError::NoRankedBallots {}));

        // Unknown voters and unknown candidates are accepted by default.
        resolver.submit(7, &[A, 99]).unwrap();
        assert!(matches!(
            resolver.submit(7, &[B]),
            Err(TallyError::DuplicateBallot { voter_id: 7, .. })
        ));
        assert!(matches!(
            resolver.submit(8, &[A, B, A]),
            Err(TallyError::InvalidBallot { voter_id: 8, .. })
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(resolver.resolve().unwrap().winners, vec![A]);

        let strict = TallyRules {
            ranking_check: RankingCheck::RegisteredCandidatesOnly,
            eligibility_check: EligibilityCheck::AllBallots,
            ..TallyRules::DEFAULT_RULES
        };
        let strict_store = BallotStore::new();
        let resolver = SchulzeResolver::new(&voters, &candidates, &strict_store, &strict);
        assert_eq!(
            resolver.submit(7, &[A]),
            Err(TallyError::VoterNotFound { voter_id: 7 })
        );
        assert!(matches!(
            resolver.submit(1, &[A]),
            Err(TallyError::VoterUnderage { voter_id: 1, .. })
        ));
        assert!(strict_store.is_empty());
    }

    #[test]
    fn unregistered_candidates_can_be_refused() {
        let (mut voters, candidates) = registries();
        voters
            .register(Voter {
                voter_id: 2,
                name: "Emil".to_string(),
                email: "emil@example.org".to_string(),
                age: 50,
            })
            .unwrap();
        let store = BallotStore::new();
        let rules = TallyRules {
            ranking_check: RankingCheck::RegisteredCandidatesOnly,
            ..TallyRules::DEFAULT_RULES
        };
        let resolver = SchulzeResolver::new(&voters, &candidates, &store, &rules);
        assert_eq!(
            resolver.submit(2, &[A, 99]),
            Err(TallyError::CandidateNotFound { candidate_id: 99 })
        );
        resolver.submit(2, &[C, A]).unwrap();
        assert_eq!(resolver.resolve().unwrap().winners, vec![C]);
    }
}
