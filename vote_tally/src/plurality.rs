use std::collections::HashMap;

use chrono::Utc;
use log::{debug, info};
use snafu::{ensure, OptionExt};

use crate::config::*;
use crate::registry::{check_eligible, CandidateRegistry, VoterRegistry};
use crate::store::BallotStore;

/// Plurality counting over weighted votes.
///
/// Totals and timelines are always recomputed from the stored vote records.
pub struct PluralityTally<'a> {
    voters: &'a dyn VoterRegistry,
    candidates: &'a dyn CandidateRegistry,
    store: &'a BallotStore<VoteRecord>,
    rules: &'a TallyRules,
}

impl<'a> PluralityTally<'a> {
    pub fn new(
        voters: &'a dyn VoterRegistry,
        candidates: &'a dyn CandidateRegistry,
        store: &'a BallotStore<VoteRecord>,
        rules: &'a TallyRules,
    ) -> PluralityTally<'a> {
        PluralityTally {
            voters,
            candidates,
            store,
            rules,
        }
    }

    /// Casts a vote of weight 1.
    pub fn cast_vote(
        &self,
        voter_id: VoterId,
        candidate_id: CandidateId,
    ) -> TallyResult<VoteRecord> {
        self.cast(voter_id, candidate_id, 1, Utc::now())
    }

    /// Casts a vote whose weight depends on the status of the voter profile.
    pub fn cast_weighted_vote(
        &self,
        voter_id: VoterId,
        candidate_id: CandidateId,
        profile_updated: bool,
    ) -> TallyResult<VoteRecord> {
        self.cast_weighted_vote_at(voter_id, candidate_id, profile_updated, Utc::now())
    }

    /// Same as `cast_weighted_vote`, with the submission time given by the caller.
    pub fn cast_weighted_vote_at(
        &self,
        voter_id: VoterId,
        candidate_id: CandidateId,
        profile_updated: bool,
        timestamp: Timestamp,
    ) -> TallyResult<VoteRecord> {
        let weight = if profile_updated {
            self.rules.updated_profile_weight
        } else {
            1
        };
        self.cast(voter_id, candidate_id, weight, timestamp)
    }

    fn cast(
        &self,
        voter_id: VoterId,
        candidate_id: CandidateId,
        weight: u64,
        timestamp: Timestamp,
    ) -> TallyResult<VoteRecord> {
        check_eligible(self.voters, voter_id, self.rules.minimum_voter_age)?;
        ensure!(
            self.candidates.exists(candidate_id),
            CandidateNotFoundSnafu { candidate_id }
        );
        let record = self.store.record(VoteRecord {
            voter_id,
            candidate_id,
            timestamp,
            weight,
        })?;
        info!(
            "Voter {} voted for candidate {} (weight {})",
            voter_id, candidate_id, weight
        );
        Ok(record)
    }

    fn totals(&self) -> HashMap<CandidateId, u64> {
        self.store.read(|records| {
            let mut totals: HashMap<CandidateId, u64> = HashMap::new();
            for r in records.iter() {
                *totals.entry(r.candidate_id).or_insert(0) += r.weight;
            }
            totals
        })
    }

    fn candidate(&self, candidate_id: CandidateId) -> TallyResult<&'a Candidate> {
        self.candidates
            .lookup(candidate_id)
            .context(CandidateNotFoundSnafu { candidate_id })
    }

    pub fn candidate_votes(&self, candidate_id: CandidateId) -> TallyResult<CandidateVotes> {
        let candidate = self.candidate(candidate_id)?;
        let votes = self.totals().get(&candidate_id).cloned().unwrap_or(0);
        Ok(CandidateVotes {
            candidate_id,
            name: candidate.name.clone(),
            votes,
        })
    }

    // Every registered candidate with its total, most votes first, ties by id.
    fn standings(&self, totals: &HashMap<CandidateId, u64>) -> Vec<Standing> {
        let mut standings: Vec<Standing> = self
            .candidates
            .all()
            .into_iter()
            .map(|c| Standing {
                candidate_id: c.candidate_id,
                name: c.name.clone(),
                party: c.party.clone(),
                votes: totals.get(&c.candidate_id).cloned().unwrap_or(0),
            })
            .collect();
        standings.sort_by(|a, b| {
            b.votes
                .cmp(&a.votes)
                .then(a.candidate_id.cmp(&b.candidate_id))
        });
        standings
    }

    /// The leaderboard: every registered candidate, most votes first.
    /// Equal totals are ordered by candidate id.
    pub fn tally(&self) -> Vec<Standing> {
        let standings = self.standings(&self.totals());
        debug!("tally: {:?}", standings);
        standings
    }

    /// All the candidates sharing the highest total.
    ///
    /// The maximum and the standings come from the same read of the votes.
    pub fn winner(&self) -> TallyResult<WinnerResult> {
        let totals = self.totals();
        let max_votes = totals.values().max().cloned().context(NoVotesCastSnafu)?;
        let mut winners: Vec<Standing> = self
            .standings(&totals)
            .into_iter()
            .filter(|s| s.votes == max_votes)
            .collect();
        winners.sort_by_key(|s| s.candidate_id);
        info!(
            "winner: {:?} with {} votes",
            winners.iter().map(|s| s.candidate_id).collect::<Vec<_>>(),
            max_votes
        );
        Ok(WinnerResult { winners, max_votes })
    }

    fn events(&self, candidate_id: CandidateId) -> Vec<VoteEvent> {
        self.store.read(|records| {
            records
                .iter()
                .filter(|r| r.candidate_id == candidate_id)
                .map(|r| VoteEvent {
                    voter_id: r.voter_id,
                    timestamp: r.timestamp,
                    weight: r.weight,
                })
                .collect()
        })
    }

    /// The votes for a candidate, in submission order.
    pub fn timeline(&self, candidate_id: CandidateId) -> TallyResult<Timeline> {
        let candidate = self.candidate(candidate_id)?;
        Ok(Timeline {
            candidate_id,
            name: candidate.name.clone(),
            events: self.events(candidate_id),
        })
    }

    /// The votes for a candidate cast between `from` and `to`, both included.
    pub fn timeline_in_range(
        &self,
        candidate_id: CandidateId,
        from: Timestamp,
        to: Timestamp,
    ) -> TallyResult<RangeTimeline> {
        let candidate = self.candidate(candidate_id)?;
        let events: Vec<VoteEvent> = self
            .events(candidate_id)
            .into_iter()
            .filter(|e| from <= e.timestamp && e.timestamp <= to)
            .collect();
        let total_weight = events.iter().map(|e| e.weight).sum();
        Ok(RangeTimeline {
            candidate_id,
            name: candidate.name.clone(),
            from,
            to,
            events,
            total_weight,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Candidates, Voters};
    use chrono::{Duration, TimeZone};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn registries(num_voters: u32, ages: &[(VoterId, u32)]) -> (Voters, Candidates) {
        let mut voters = Voters::new();
        for voter_id in 1..=num_voters {
            let age = ages
                .iter()
                .find(|(id, _)| *id == voter_id)
                .map(|(_, age)| *age)
                .unwrap_or(40);
            voters
                .register(Voter {
                    voter_id,
                    name: format!("voter {}", voter_id),
                    email: format!("voter{}@example.org", voter_id),
                    age,
                })
                .unwrap();
        }
        let mut candidates = Candidates::new();
        for (candidate_id, name) in [(1, "Anna"), (2, "Bob"), (3, "Clara")] {
            candidates
                .register(Candidate {
                    candidate_id,
                    name: name.to_string(),
                    party: None,
                })
                .unwrap();
        }
        (voters, candidates)
    }

    #[test]
    fn preconditions_leave_the_store_untouched() {
        init();
        let (voters, candidates) = registries(3, &[(2, 17)]);
        let store = BallotStore::new();
        let rules = TallyRules::DEFAULT_RULES;
        let plurality = PluralityTally::new(&voters, &candidates, &store, &rules);

        assert_eq!(
            plurality.cast_vote(99, 1),
            Err(TallyError::VoterNotFound { voter_id: 99 })
        );
        assert_eq!(
            plurality.cast_vote(2, 1),
            Err(TallyError::VoterUnderage {
                voter_id: 2,
                age: 17,
                minimum: 18
            })
        );
        assert_eq!(
            plurality.cast_vote(1, 42),
            Err(TallyError::CandidateNotFound { candidate_id: 42 })
        );
        assert!(store.is_empty());

        plurality.cast_vote(1, 1).unwrap();
        assert_eq!(
            plurality.cast_weighted_vote(1, 2, true),
            Err(TallyError::DuplicateBallot {
                voter_id: 1,
                kind: BallotKind::Plurality
            })
        );
        assert_eq!(store.len(), 1);
        assert_eq!(plurality.candidate_votes(2).unwrap().votes, 0);
    }

    #[test]
    fn totals_are_the_sum_of_weights() {
        init();
        let (voters, candidates) = registries(6, &[]);
        let store = BallotStore::new();
        let rules = TallyRules::DEFAULT_RULES;
        let plurality = PluralityTally::new(&voters, &candidates, &store, &rules);

        plurality.cast_weighted_vote(1, 1, true).unwrap();
        plurality.cast_weighted_vote(2, 1, false).unwrap();
        plurality.cast_vote(3, 2).unwrap();
        plurality.cast_weighted_vote(4, 2, true).unwrap();
        plurality.cast_weighted_vote(5, 3, true).unwrap();
        // Refused, must not count.
        assert!(plurality.cast_weighted_vote(5, 3, true).is_err());

        for c in 1..=3 {
            let expected: u64 = store
                .snapshot()
                .iter()
                .filter(|r| r.candidate_id == c)
                .map(|r| r.weight)
                .sum();
            assert_eq!(plurality.candidate_votes(c).unwrap().votes, expected);
        }
        let board: Vec<(CandidateId, u64)> = plurality
            .tally()
            .iter()
            .map(|s| (s.candidate_id, s.votes))
            .collect();
        assert_eq!(board, vec![(1, 3), (2, 3), (3, 2)]);
    }

    #[test]
    fn leaderboard_lists_candidates_without_votes() {
        let (voters, candidates) = registries(1, &[]);
        let store = BallotStore::new();
        let rules = TallyRules::DEFAULT_RULES;
        let plurality = PluralityTally::new(&voters, &candidates, &store, &rules);
        plurality.cast_vote(1, 3).unwrap();
        let board: Vec<(CandidateId, u64)> = plurality
            .tally()
            .iter()
            .map(|s| (s.candidate_id, s.votes))
            .collect();
        assert_eq!(board, vec![(3, 1), (1, 0), (2, 0)]);
    }

    #[test]
    fn winner_reports_ties() {
        init();
        let (voters, candidates) = registries(25, &[]);
        let store = BallotStore::new();
        let rules = TallyRules::DEFAULT_RULES;
        let plurality = PluralityTally::new(&voters, &candidates, &store, &rules);
        assert_eq!(plurality.winner(), Err(TallyError::NoVotesCast {}));

        for voter_id in 1..=25 {
            let candidate_id = match voter_id {
                1..=10 => 1,
                11..=20 => 2,
                _ => 3,
            };
            plurality.cast_vote(voter_id, candidate_id).unwrap();
        }
        let res = plurality.winner().unwrap();
        assert_eq!(res.max_votes, 10);
        let ids: Vec<CandidateId> = res.winners.iter().map(|s| s.candidate_id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn timeline_range_is_inclusive() {
        init();
        let (voters, candidates) = registries(4, &[]);
        let store = BallotStore::new();
        let rules = TallyRules::DEFAULT_RULES;
        let plurality = PluralityTally::new(&voters, &candidates, &store, &rules);

        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        plurality.cast_weighted_vote_at(1, 1, false, t0).unwrap();
        plurality
            .cast_weighted_vote_at(2, 1, true, t0 + Duration::hours(1))
            .unwrap();
        plurality
            .cast_weighted_vote_at(3, 1, false, t0 + Duration::hours(2))
            .unwrap();
        plurality
            .cast_weighted_vote_at(4, 2, true, t0 + Duration::hours(1))
            .unwrap();

        let full = plurality.timeline(1).unwrap();
        let voters_in_order: Vec<VoterId> = full.events.iter().map(|e| e.voter_id).collect();
        assert_eq!(voters_in_order, vec![1, 2, 3]);

        let range = plurality
            .timeline_in_range(1, t0 + Duration::hours(1), t0 + Duration::hours(2))
            .unwrap();
        let in_range: Vec<VoterId> = range.events.iter().map(|e| e.voter_id).collect();
        assert_eq!(in_range, vec![2, 3]);
        assert_eq!(range.total_weight, 3);

        assert_eq!(
            plurality.timeline(9).map(|t| t.events.len()),
            Err(TallyError::CandidateNotFound { candidate_id: 9 })
        );
    }

    #[test]
    fn winner_is_consistent_while_votes_arrive() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::thread;

        let num_voters = 5000;
        let (voters, candidates) = registries(num_voters, &[]);
        let store = BallotStore::new();
        let rules = TallyRules::DEFAULT_RULES;
        let plurality = PluralityTally::new(&voters, &candidates, &store, &rules);
        plurality.cast_vote(1, 2).unwrap();
        let done = AtomicBool::new(false);

        thread::scope(|s| {
            s.spawn(|| {
                for voter_id in 2..=num_voters {
                    plurality.cast_vote(voter_id, 1).unwrap();
                }
                done.store(true, Ordering::SeqCst);
            });
            while !done.load(Ordering::SeqCst) {
                let res = plurality.winner().unwrap();
                assert!(!res.winners.is_empty());
                assert!(res.winners.iter().all(|w| w.votes == res.max_votes));
            }
        });
        let res = plurality.winner().unwrap();
        assert_eq!(res.max_votes, num_voters as u64 - 1);
        assert_eq!(res.winners[0].candidate_id, 1);
    }
}
