use log::{debug, info};
use parking_lot::Mutex;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::config::*;
use crate::store::BallotStore;

// Rounding slack when comparing a request with what is left of the budget.
const BUDGET_TOLERANCE: f64 = 1e-9;

/// The standard deviation of the noise for a given epsilon.
pub fn noise_scale(epsilon: f64) -> f64 {
    if epsilon > 0.0 {
        1.0 / epsilon
    } else {
        1.0
    }
}

/// A cumulative privacy budget shared by all the noised queries of an election.
#[derive(Debug)]
pub struct PrivacyBudget {
    total: f64,
    remaining: Mutex<f64>,
}

impl PrivacyBudget {
    pub fn new(total: f64) -> PrivacyBudget {
        PrivacyBudget {
            total,
            remaining: Mutex::new(total),
        }
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn remaining(&self) -> f64 {
        *self.remaining.lock()
    }

    /// Takes `epsilon` from the budget. Nothing is taken when the request does not fit.
    pub fn charge(&self, epsilon: f64) -> TallyResult<()> {
        let mut remaining = self.remaining.lock();
        if epsilon > *remaining + BUDGET_TOLERANCE {
            return PrivacyBudgetExhaustedSnafu {
                requested: epsilon,
                remaining: *remaining,
            }
            .fail();
        }
        *remaining = (*remaining - epsilon).max(0.0);
        debug!("charge: epsilon {} charged, {} left", epsilon, *remaining);
        Ok(())
    }
}

/// Noised counts over the encrypted ballots.
pub struct NoisedCounter<'a> {
    store: &'a BallotStore<EncryptedBallot>,
    budget: Option<&'a PrivacyBudget>,
}

impl<'a> NoisedCounter<'a> {
    pub fn new(
        store: &'a BallotStore<EncryptedBallot>,
        budget: Option<&'a PrivacyBudget>,
    ) -> NoisedCounter<'a> {
        NoisedCounter { store, budget }
    }

    pub fn query(&self, candidate_id: CandidateId, epsilon: f64) -> TallyResult<NoisedCount> {
        self.query_with_rng(candidate_id, epsilon, &mut rand::thread_rng())
    }

    /// The number of ballots for the candidate, and the same number with Gaussian
    /// noise of standard deviation `1/epsilon` added, rounded and clamped to
    /// `0..=u64::MAX`.
    pub fn query_with_rng<R: Rng + ?Sized>(
        &self,
        candidate_id: CandidateId,
        epsilon: f64,
        rng: &mut R,
    ) -> TallyResult<NoisedCount> {
        let scale = noise_scale(epsilon);
        if let Some(budget) = self.budget {
            budget.charge(1.0 / scale)?;
        }
        let true_count = self.store.read(|records| {
            records
                .iter()
                .filter(|b| b.candidate_id == candidate_id)
                .count() as u64
        });
        let z: f64 = StandardNormal.sample(rng);
        let noise = z * scale;
        // Saturating cast: a huge positive draw gives u64::MAX, a NaN from an
        // infinite scale gives zero.
        let noisy_count = (true_count as f64 + noise).round().max(0.0) as u64;
        info!(
            "Noised count for candidate {} with epsilon {}: {}",
            candidate_id, epsilon, noisy_count
        );
        Ok(NoisedCount {
            candidate_id,
            true_count,
            noisy_count,
            epsilon,
        })
    }
}
