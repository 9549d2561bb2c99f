// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snafu::Snafu;

pub type VoterId = u32;
pub type CandidateId = u32;
pub type Timestamp = DateTime<Utc>;

/// A registered voter.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Voter {
    pub voter_id: VoterId,
    pub name: String,
    pub email: String,
    pub age: u32,
}

/// A registered candidate.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: CandidateId,
    pub name: String,
    pub party: Option<String>,
}

/// The three kinds of ballots. Each kind enforces its own one-ballot-per-voter rule.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum BallotKind {
    Plurality,
    Ranked,
    Encrypted,
}

impl Display for BallotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BallotKind::Plurality => write!(f, "plurality"),
            BallotKind::Ranked => write!(f, "ranked"),
            BallotKind::Encrypted => write!(f, "encrypted"),
        }
    }
}

/// A vote for a single candidate, with the weight it was given at submission time.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub voter_id: VoterId,
    pub candidate_id: CandidateId,
    pub timestamp: Timestamp,
    pub weight: u64,
}

/// A strict preference order over candidates, most preferred first.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RankedBallot {
    pub voter_id: VoterId,
    pub ranking: Vec<CandidateId>,
}

/// A simulated encrypted ballot. The ciphertext and the proof are opaque strings.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedBallot {
    pub voter_id: VoterId,
    pub candidate_id: CandidateId,
    pub ciphertext: String,
    pub proof: String,
}

// ******** Output data structures *********

/// One line of the leaderboard.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Standing {
    pub candidate_id: CandidateId,
    pub name: String,
    pub party: Option<String>,
    pub votes: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateVotes {
    pub candidate_id: CandidateId,
    pub name: String,
    pub votes: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct WinnerResult {
    /// All the candidates sharing the highest total, in candidate id order.
    pub winners: Vec<Standing>,
    pub max_votes: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoteEvent {
    pub voter_id: VoterId,
    pub timestamp: Timestamp,
    pub weight: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub candidate_id: CandidateId,
    pub name: String,
    pub events: Vec<VoteEvent>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RangeTimeline {
    pub candidate_id: CandidateId,
    pub name: String,
    pub from: Timestamp,
    pub to: Timestamp,
    pub events: Vec<VoteEvent>,
    pub total_weight: u64,
}

/// The outcome of the Schulze method.
///
/// The pairwise matrix is kept as an audit trail: `pairwise[c][d]` is the number of
/// ballots ranking `c` strictly above `d`.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SchulzeResult {
    pub winners: Vec<CandidateId>,
    pub pairwise: BTreeMap<CandidateId, BTreeMap<CandidateId, u64>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BallotReceipt {
    pub voter_id: VoterId,
    pub total_ballots: usize,
    /// SHA-256 digest of the ciphertext, hex encoded.
    pub fingerprint: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct HomomorphicTally {
    pub tally: BTreeMap<CandidateId, u64>,
    pub proof: String,
    pub total_ballots: usize,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct NoisedCount {
    pub candidate_id: CandidateId,
    pub true_count: u64,
    pub noisy_count: u64,
    pub epsilon: f64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AuditPlan {
    pub total_ballots: i64,
    pub risk_limit: f64,
    pub recommended_sample_size: u64,
    pub method: String,
}

/// Errors that prevent a submission or a query from completing.
///
/// All of them are detected before any state is modified.
#[derive(PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TallyError {
    #[snafu(display("Voter {voter_id} not found"))]
    VoterNotFound { voter_id: VoterId },

    #[snafu(display("Voter {voter_id} is {age} years old, must be at least {minimum}"))]
    VoterUnderage {
        voter_id: VoterId,
        age: u32,
        minimum: u32,
    },

    #[snafu(display("Candidate {candidate_id} not found"))]
    CandidateNotFound { candidate_id: CandidateId },

    #[snafu(display("Voter {voter_id} has already submitted a {kind} ballot"))]
    DuplicateBallot { voter_id: VoterId, kind: BallotKind },

    #[snafu(display("Invalid ballot from voter {voter_id}: {reason}"))]
    InvalidBallot { voter_id: VoterId, reason: String },

    #[snafu(display("No votes have been cast yet"))]
    NoVotesCast {},

    #[snafu(display("No ranked ballots submitted"))]
    NoRankedBallots {},

    #[snafu(display("No encrypted ballots found"))]
    NoEncryptedBallots {},

    #[snafu(display("Invalid total ballot count: {total_ballots}"))]
    InvalidBallotCount { total_ballots: i64 },

    #[snafu(display("Updated profile weight must be positive, got {weight}"))]
    InvalidProfileWeight { weight: u64 },

    #[snafu(display(
        "Privacy budget exhausted: requested epsilon {requested}, remaining {remaining}"
    ))]
    PrivacyBudgetExhausted { requested: f64, remaining: f64 },

    #[snafu(display("Voter with ID {voter_id} already exists"))]
    DuplicateVoter { voter_id: VoterId },

    #[snafu(display("Candidate with ID {candidate_id} already exists"))]
    DuplicateCandidate { candidate_id: CandidateId },

    #[snafu(display("No candidates found for party {party}"))]
    NoCandidatesForParty { party: String },
}

pub type TallyResult<T> = Result<T, TallyError>;

// ********* Configuration **********

/// Which candidates may appear in a ranked ballot.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RankingCheck {
    /// Any candidate id is accepted, registered or not.
    Permissive,
    /// Every id in the ranking must be a registered candidate.
    RegisteredCandidatesOnly,
}

/// Which ballot kinds are checked against the voter registry.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum EligibilityCheck {
    PluralityOnly,
    AllBallots,
}

#[derive(PartialEq, Debug, Clone)]
pub struct TallyRules {
    pub minimum_voter_age: u32,
    /// Weight of a vote cast by a voter whose profile was updated.
    pub updated_profile_weight: u64,
    pub ranking_check: RankingCheck,
    pub eligibility_check: EligibilityCheck,
}

impl TallyRules {
    pub const DEFAULT_RULES: TallyRules = TallyRules {
        minimum_voter_age: 18,
        updated_profile_weight: 2,
        ranking_check: RankingCheck::Permissive,
        eligibility_check: EligibilityCheck::PluralityOnly,
    };
}

impl Default for TallyRules {
    fn default() -> Self {
        TallyRules::DEFAULT_RULES
    }
}
