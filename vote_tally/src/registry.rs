//! The voter and candidate registries consumed by the engine.
//!
//! The engine only needs a few lookups from each registry. `Voters` and
//! `Candidates` are simple in-memory implementations, filled once before the
//! election starts.

use std::collections::HashMap;

use log::debug;
use snafu::{ensure, OptionExt};

use crate::config::*;

pub trait VoterRegistry: Send + Sync {
    fn exists(&self, voter_id: VoterId) -> bool;
    /// The age of the voter, if registered.
    fn age(&self, voter_id: VoterId) -> Option<u32>;
}

pub trait CandidateRegistry: Send + Sync {
    fn exists(&self, candidate_id: CandidateId) -> bool;
    fn lookup(&self, candidate_id: CandidateId) -> Option<&Candidate>;
    /// All the registered candidates, in registration order.
    fn all(&self) -> Vec<&Candidate>;
}

/// Checks that the voter is registered and old enough to vote.
pub(crate) fn check_eligible(
    voters: &dyn VoterRegistry,
    voter_id: VoterId,
    minimum_age: u32,
) -> TallyResult<()> {
    let age = voters
        .age(voter_id)
        .context(VoterNotFoundSnafu { voter_id })?;
    ensure!(
        age >= minimum_age,
        VoterUnderageSnafu {
            voter_id,
            age,
            minimum: minimum_age
        }
    );
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct Voters {
    voters: HashMap<VoterId, Voter>,
}

impl Voters {
    pub fn new() -> Voters {
        Voters::default()
    }

    pub fn register(&mut self, voter: Voter) -> TallyResult<()> {
        ensure!(
            !self.voters.contains_key(&voter.voter_id),
            DuplicateVoterSnafu {
                voter_id: voter.voter_id
            }
        );
        debug!("register voter: {:?}", voter);
        self.voters.insert(voter.voter_id, voter);
        Ok(())
    }

    pub fn get(&self, voter_id: VoterId) -> Option<&Voter> {
        self.voters.get(&voter_id)
    }

    pub fn len(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voters.is_empty()
    }
}

impl VoterRegistry for Voters {
    fn exists(&self, voter_id: VoterId) -> bool {
        self.voters.contains_key(&voter_id)
    }

    fn age(&self, voter_id: VoterId) -> Option<u32> {
        self.voters.get(&voter_id).map(|v| v.age)
    }
}

// Candidates keep their registration order, which is also the order of the reports.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    candidates: Vec<Candidate>,
    index: HashMap<CandidateId, usize>,
}

impl Candidates {
    pub fn new() -> Candidates {
        Candidates::default()
    }

    pub fn register(&mut self, candidate: Candidate) -> TallyResult<()> {
        ensure!(
            !self.index.contains_key(&candidate.candidate_id),
            DuplicateCandidateSnafu {
                candidate_id: candidate.candidate_id
            }
        );
        debug!("register candidate: {:?}", candidate);
        self.index
            .insert(candidate.candidate_id, self.candidates.len());
        self.candidates.push(candidate);
        Ok(())
    }

    /// The candidates of a party. The comparison ignores case.
    pub fn by_party(&self, party: &str) -> TallyResult<Vec<Candidate>> {
        let wanted = party.to_lowercase();
        let res: Vec<Candidate> = self
            .candidates
            .iter()
            .filter(|c| matches!(&c.party, Some(p) if p.to_lowercase() == wanted))
            .cloned()
            .collect();
        ensure!(
            !res.is_empty(),
            NoCandidatesForPartySnafu {
                party: party.to_string()
            }
        );
        Ok(res)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl CandidateRegistry for Candidates {
    fn exists(&self, candidate_id: CandidateId) -> bool {
        self.index.contains_key(&candidate_id)
    }

    fn lookup(&self, candidate_id: CandidateId) -> Option<&Candidate> {
        self.index
            .get(&candidate_id)
            .and_then(|idx| self.candidates.get(*idx))
    }

    fn all(&self) -> Vec<&Candidate> {
        self.candidates.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(candidate_id: CandidateId, name: &str, party: Option<&str>) -> Candidate {
        Candidate {
            candidate_id,
            name: name.to_string(),
            party: party.map(|p| p.to_string()),
        }
    }

    #[test]
    fn duplicate_registrations_are_refused() {
        let mut voters = Voters::new();
        let voter = Voter {
            voter_id: 1,
            name: "Anna".to_string(),
            email: "anna@example.org".to_string(),
            age: 30,
        };
        voters.register(voter.clone()).unwrap();
        assert_eq!(
            voters.register(voter),
            Err(TallyError::DuplicateVoter { voter_id: 1 })
        );
        assert_eq!(voters.len(), 1);
        assert_eq!(voters.age(1), Some(30));
        assert_eq!(voters.age(2), None);

        let mut candidates = Candidates::new();
        candidates.register(candidate(7, "Bob", None)).unwrap();
        assert_eq!(
            candidates.register(candidate(7, "Clara", None)),
            Err(TallyError::DuplicateCandidate { candidate_id: 7 })
        );
        assert_eq!(candidates.lookup(7).map(|c| c.name.as_str()), Some("Bob"));
    }

    #[test]
    fn party_filter_ignores_case() {
        let mut candidates = Candidates::new();
        candidates
            .register(candidate(1, "Anna", Some("Green")))
            .unwrap();
        candidates.register(candidate(2, "Bob", None)).unwrap();
        candidates
            .register(candidate(3, "Clara", Some("GREEN")))
            .unwrap();
        let greens = candidates.by_party("green").unwrap();
        let ids: Vec<CandidateId> = greens.iter().map(|c| c.candidate_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(
            candidates.by_party("blue"),
            Err(TallyError::NoCandidatesForParty {
                party: "blue".to_string()
            })
        );
    }

    #[test]
    fn registration_order_is_kept() {
        let mut candidates = Candidates::new();
        for (id, name) in [(5, "E"), (2, "B"), (9, "I")] {
            candidates.register(candidate(id, name, None)).unwrap();
        }
        let ids: Vec<CandidateId> = candidates.all().iter().map(|c| c.candidate_id).collect();
        assert_eq!(ids, vec![5, 2, 9]);
    }
}
