use log::info;
use snafu::ensure;

use crate::config::*;

/// Label of the sample sizing method. The computation is an illustration, not a
/// certified sequential test.
pub const AUDIT_METHOD: &str = "Kaplan–Markov (simulated)";

/// Sample sizes for ballot-polling audits.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuditPlanner;

impl AuditPlanner {
    pub fn new() -> AuditPlanner {
        AuditPlanner
    }

    /// The recommended sample size is `floor(total_ballots * risk_limit) + 1`.
    ///
    /// Any risk limit is accepted. A negative or NaN product gives a sample of 1,
    /// and the size saturates at `u64::MAX`.
    pub fn plan(&self, total_ballots: i64, risk_limit: f64) -> TallyResult<AuditPlan> {
        ensure!(total_ballots > 0, InvalidBallotCountSnafu { total_ballots });
        let recommended_sample_size = ((total_ballots as f64 * risk_limit).floor() as u64)
            .saturating_add(1);
        info!(
            "Audit plan: {} ballots, risk limit {}: sample {} ballots",
            total_ballots, risk_limit, recommended_sample_size
        );
        Ok(AuditPlan {
            total_ballots,
            risk_limit,
            recommended_sample_size,
            method: AUDIT_METHOD.to_string(),
        })
    }
}
