mod audit;
pub mod builder;
mod config;
mod encrypted;
pub mod manual;
mod plurality;
mod privacy;
mod registry;
mod schulze;
mod store;

use log::info;

pub use crate::audit::{AuditPlanner, AUDIT_METHOD};
pub use crate::config::*;
pub use crate::encrypted::{EncryptedBallots, SIMULATED_PROOF};
pub use crate::plurality::PluralityTally;
pub use crate::privacy::{noise_scale, NoisedCounter, PrivacyBudget};
pub use crate::registry::{CandidateRegistry, Candidates, VoterRegistry, Voters};
pub use crate::schulze::{run_schulze, SchulzeResolver};
pub use crate::store::{Ballot, BallotStore};

/// An election: the registries, one ballot store per ballot kind and the rules.
///
/// Each counting method is reached through a short-lived view borrowing the
/// relevant store. Built with `builder::Builder`.
pub struct Election {
    pub(crate) rules: TallyRules,
    pub(crate) voters: Voters,
    pub(crate) candidates: Candidates,
    pub(crate) votes: BallotStore<VoteRecord>,
    pub(crate) ranked: BallotStore<RankedBallot>,
    pub(crate) encrypted: BallotStore<EncryptedBallot>,
    pub(crate) privacy_budget: Option<PrivacyBudget>,
}

impl Election {
    pub fn plurality(&self) -> PluralityTally<'_> {
        PluralityTally::new(&self.voters, &self.candidates, &self.votes, &self.rules)
    }

    pub fn schulze(&self) -> SchulzeResolver<'_> {
        SchulzeResolver::new(&self.voters, &self.candidates, &self.ranked, &self.rules)
    }

    pub fn encrypted(&self) -> EncryptedBallots<'_> {
        EncryptedBallots::new(&self.voters, &self.encrypted, &self.rules)
    }

    pub fn noised_counter(&self) -> NoisedCounter<'_> {
        NoisedCounter::new(&self.encrypted, self.privacy_budget.as_ref())
    }

    pub fn audit(&self) -> AuditPlanner {
        AuditPlanner::new()
    }

    pub fn rules(&self) -> &TallyRules {
        &self.rules
    }

    pub fn voters(&self) -> &Voters {
        &self.voters
    }

    pub fn candidates(&self) -> &Candidates {
        &self.candidates
    }

    pub fn privacy_budget(&self) -> Option<&PrivacyBudget> {
        self.privacy_budget.as_ref()
    }

    /// The number of accepted ballots of a kind.
    pub fn ballot_count(&self, kind: BallotKind) -> usize {
        let count = match kind {
            BallotKind::Plurality => self.votes.len(),
            BallotKind::Ranked => self.ranked.len(),
            BallotKind::Encrypted => self.encrypted.len(),
        };
        info!("ballot_count: {} {} ballots", count, kind);
        count
    }
}
