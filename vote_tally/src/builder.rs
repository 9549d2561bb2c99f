use snafu::ensure;

pub use crate::config::*;
use crate::privacy::PrivacyBudget;
use crate::registry::{Candidates, Voters};
use crate::store::BallotStore;
use crate::Election;

/// A builder for setting up an election.
///
/// Voters and candidates are registered here, once. The election that comes out of
/// `build` only accepts ballots.
///
/// ```
/// use vote_tally::builder::Builder;
/// use vote_tally::{Candidate, TallyRules, Voter};
/// # use vote_tally::TallyError;
///
/// let election = Builder::new(&TallyRules::DEFAULT_RULES)?
///     .candidates(&[Candidate {
///         candidate_id: 1,
///         name: "Anna".to_string(),
///         party: None,
///     }])?
///     .voters(&[Voter {
///         voter_id: 10,
///         name: "Bob".to_string(),
///         email: "bob@example.org".to_string(),
///         age: 33,
///     }])?
///     .build();
///
/// election.plurality().cast_vote(10, 1)?;
/// assert_eq!(election.plurality().winner()?.max_votes, 1);
///
/// # Ok::<(), TallyError>(())
/// ```
pub struct Builder {
    pub(crate) _rules: TallyRules,
    pub(crate) _voters: Voters,
    pub(crate) _candidates: Candidates,
    pub(crate) _privacy_budget: Option<f64>,
}

impl Builder {
    /// Fails when the rules give a zero weight to updated profiles.
    pub fn new(rules: &TallyRules) -> Result<Builder, TallyError> {
        ensure!(
            rules.updated_profile_weight > 0,
            InvalidProfileWeightSnafu {
                weight: rules.updated_profile_weight
            }
        );
        Ok(Builder {
            _rules: rules.clone(),
            _voters: Voters::new(),
            _candidates: Candidates::new(),
            _privacy_budget: None,
        })
    }

    pub fn candidates(mut self, cands: &[Candidate]) -> Result<Builder, TallyError> {
        for c in cands {
            self.add_candidate(c.clone())?;
        }
        Ok(self)
    }

    pub fn voters(mut self, voters: &[Voter]) -> Result<Builder, TallyError> {
        for v in voters {
            self.add_voter(v.clone())?;
        }
        Ok(self)
    }

    /// Caps the total epsilon spent by the noised counts of this election.
    pub fn privacy_budget(self, total_epsilon: f64) -> Builder {
        Builder {
            _privacy_budget: Some(total_epsilon),
            ..self
        }
    }

    pub fn add_candidate(&mut self, candidate: Candidate) -> Result<(), TallyError> {
        self._candidates.register(candidate)
    }

    pub fn add_voter(&mut self, voter: Voter) -> Result<(), TallyError> {
        self._voters.register(voter)
    }

    pub fn build(self) -> Election {
        Election {
            rules: self._rules,
            voters: self._voters,
            candidates: self._candidates,
            votes: BallotStore::new(),
            ranked: BallotStore::new(),
            encrypted: BallotStore::new(),
            privacy_budget: self._privacy_budget.map(PrivacyBudget::new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_profile_weight_is_rejected() {
        let rules = TallyRules {
            updated_profile_weight: 0,
            ..TallyRules::DEFAULT_RULES
        };
        assert!(matches!(
            Builder::new(&rules),
            Err(TallyError::InvalidProfileWeight { weight: 0 })
        ));

        let rules = TallyRules {
            updated_profile_weight: 3,
            ..TallyRules::DEFAULT_RULES
        };
        let election = Builder::new(&rules)
            .unwrap()
            .candidates(&[Candidate {
                candidate_id: 1,
                name: "Anna".to_string(),
                party: None,
            }])
            .unwrap()
            .voters(&[Voter {
                voter_id: 1,
                name: "Bob".to_string(),
                email: "bob@example.org".to_string(),
                age: 40,
            }])
            .unwrap()
            .build();
        assert_eq!(
            election
                .plurality()
                .cast_weighted_vote(1, 1, true)
                .unwrap()
                .weight,
            3
        );
    }
}
