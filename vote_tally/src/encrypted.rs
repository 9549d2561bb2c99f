use std::collections::BTreeMap;

use log::info;
use snafu::ensure;

use crate::config::*;
use crate::registry::{check_eligible, VoterRegistry};
use crate::store::BallotStore;

/// Placeholder returned with the tally. No proof is computed.
pub const SIMULATED_PROOF: &str = "simulated-homomorphic-proof";

/// Submission and counting of simulated encrypted ballots.
///
/// The ciphertext and the proof are opaque: the candidate id travels in clear next
/// to them and is what gets counted.
pub struct EncryptedBallots<'a> {
    voters: &'a dyn VoterRegistry,
    store: &'a BallotStore<EncryptedBallot>,
    rules: &'a TallyRules,
}

impl<'a> EncryptedBallots<'a> {
    pub fn new(
        voters: &'a dyn VoterRegistry,
        store: &'a BallotStore<EncryptedBallot>,
        rules: &'a TallyRules,
    ) -> EncryptedBallots<'a> {
        EncryptedBallots {
            voters,
            store,
            rules,
        }
    }

    pub fn submit(
        &self,
        voter_id: VoterId,
        candidate_id: CandidateId,
        ciphertext: &str,
        proof: &str,
    ) -> TallyResult<BallotReceipt> {
        // A second ballot is reported as such, even when it is also malformed.
        ensure!(
            !self.store.has_voted(voter_id),
            DuplicateBallotSnafu {
                voter_id,
                kind: BallotKind::Encrypted
            }
        );
        ensure!(
            !ciphertext.is_empty() && !proof.is_empty(),
            InvalidBallotSnafu {
                voter_id,
                reason: "empty ciphertext or proof"
            }
        );
        if self.rules.eligibility_check == EligibilityCheck::AllBallots {
            check_eligible(self.voters, voter_id, self.rules.minimum_voter_age)?;
        }
        self.store.record(EncryptedBallot {
            voter_id,
            candidate_id,
            ciphertext: ciphertext.to_string(),
            proof: proof.to_string(),
        })?;
        let total_ballots = self.store.len();
        info!(
            "Encrypted ballot from voter {} accepted ({} encrypted ballots)",
            voter_id, total_ballots
        );
        Ok(BallotReceipt {
            voter_id,
            total_ballots,
            fingerprint: sha256::digest(ciphertext),
        })
    }

    /// Counts the ballots per candidate.
    pub fn homomorphic_tally(&self) -> TallyResult<HomomorphicTally> {
        let (tally, total_ballots) = self.store.read(|records| {
            let mut tally: BTreeMap<CandidateId, u64> = BTreeMap::new();
            for b in records.iter() {
                *tally.entry(b.candidate_id).or_insert(0) += 1;
            }
            (tally, records.len())
        });
        ensure!(total_ballots > 0, NoEncryptedBallotsSnafu);
        info!("homomorphic_tally: {:?}", tally);
        Ok(HomomorphicTally {
            tally,
            proof: SIMULATED_PROOF.to_string(),
            total_ballots,
        })
    }
}
