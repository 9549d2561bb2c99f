// The JSON description of an election.

use chrono::{DateTime, Utc};

use crate::election::*;

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElectionRules {
    #[serde(rename = "minimumVoterAge")]
    pub minimum_voter_age: Option<u32>,
    #[serde(rename = "updatedProfileWeight")]
    pub updated_profile_weight: Option<u64>,
    #[serde(rename = "rankingCheck")]
    pub ranking_check: Option<String>,
    #[serde(rename = "eligibilityCheck")]
    pub eligibility_check: Option<String>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<u64>,
    #[serde(rename = "privacyBudget")]
    pub privacy_budget: Option<f64>,
}

impl ElectionRules {
    pub fn tally_rules(&self) -> ElectionResult<TallyRules> {
        let defaults = TallyRules::DEFAULT_RULES;
        let res = TallyRules {
            minimum_voter_age: self
                .minimum_voter_age
                .unwrap_or(defaults.minimum_voter_age),
            updated_profile_weight: match self.updated_profile_weight {
                None => defaults.updated_profile_weight,
                Some(w) if w > 0 => w,
                Some(w) => whatever!("updatedProfileWeight must be positive, got {}", w),
            },
            ranking_check: match self.ranking_check.as_deref() {
                None | Some("permissive") => RankingCheck::Permissive,
                Some("registeredCandidatesOnly") => RankingCheck::RegisteredCandidatesOnly,
                Some(x) => whatever!("unknown ranking check: {:?}", x),
            },
            eligibility_check: match self.eligibility_check.as_deref() {
                None | Some("pluralityOnly") => EligibilityCheck::PluralityOnly,
                Some("allBallots") => EligibilityCheck::AllBallots,
                Some(x) => whatever!("unknown eligibility check: {:?}", x),
            },
        };
        if let Some(budget) = self.privacy_budget {
            ensure_whatever!(
                budget.is_finite() && budget > 0.0,
                "privacyBudget must be a positive number, got {}",
                budget
            );
        }
        Ok(res)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEntry {
    #[serde(rename = "candidateId")]
    pub candidate_id: CandidateId,
    pub name: String,
    pub party: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoterEntry {
    #[serde(rename = "voterId")]
    pub voter_id: VoterId,
    pub name: String,
    pub email: String,
    pub age: u32,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoteEntry {
    #[serde(rename = "voterId")]
    pub voter_id: VoterId,
    #[serde(rename = "candidateId")]
    pub candidate_id: CandidateId,
    #[serde(rename = "profileUpdated")]
    pub profile_updated: Option<bool>,
    /// When missing, the vote is timestamped when it is replayed.
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RankedEntry {
    #[serde(rename = "voterId")]
    pub voter_id: VoterId,
    pub ranking: Vec<CandidateId>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedEntry {
    #[serde(rename = "voterId")]
    pub voter_id: VoterId,
    #[serde(rename = "candidateId")]
    pub candidate_id: CandidateId,
    pub ciphertext: String,
    pub proof: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "idColumnIndex")]
    _id_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteColumnIndex")]
    _first_vote_column_index: Option<JSValue>,
    #[serde(rename = "firstVoteRowIndex")]
    _first_vote_row_index: Option<JSValue>,
}

// Indices are 1-based in the configuration and 0-based in the readers.
impl FileSource {
    pub fn id_column_index(&self) -> ElectionResult<usize> {
        read_js_index(&self._id_column_index, 1)
    }

    pub fn first_vote_column_index(&self) -> ElectionResult<usize> {
        read_js_index(&self._first_vote_column_index, 2)
    }

    pub fn first_vote_row_index(&self) -> ElectionResult<usize> {
        read_js_index(&self._first_vote_row_index, 1)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TimelineQuery {
    #[serde(rename = "candidateId")]
    pub candidate_id: CandidateId,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyQuery {
    #[serde(rename = "candidateId")]
    pub candidate_id: CandidateId,
    pub epsilon: f64,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AuditQuery {
    /// Defaults to the number of accepted plurality votes.
    #[serde(rename = "totalBallots")]
    pub total_ballots: Option<i64>,
    #[serde(rename = "riskLimit")]
    pub risk_limit: f64,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Queries {
    #[serde(default)]
    pub timelines: Vec<TimelineQuery>,
    #[serde(default)]
    pub privacy: Vec<PrivacyQuery>,
    pub audit: Option<AuditQuery>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    pub rules: Option<ElectionRules>,
    pub candidates: Vec<CandidateEntry>,
    pub voters: Vec<VoterEntry>,
    #[serde(default)]
    pub votes: Vec<VoteEntry>,
    #[serde(rename = "rankedBallots", default)]
    pub ranked_ballots: Vec<RankedEntry>,
    #[serde(rename = "rankedBallotFiles", default)]
    pub ranked_ballot_files: Vec<FileSource>,
    #[serde(rename = "encryptedBallots", default)]
    pub encrypted_ballots: Vec<EncryptedEntry>,
    #[serde(default)]
    pub queries: Queries,
}

pub fn read_config(path: &str) -> ElectionResult<ElectionConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ElectionConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: String) -> ElectionResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_summary: {:?}", js);
    Ok(js)
}

fn read_js_index(x: &Option<JSValue>, default: usize) -> ElectionResult<usize> {
    let one_based = match x {
        None => default,
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {})?,
        Some(JSValue::String(s)) => s
            .parse::<usize>()
            .ok()
            .context(ParsingJsonNumberSnafu {})?,
        _ => None.context(ParsingJsonNumberSnafu {})?,
    };
    one_based.checked_sub(1).context(ParsingJsonNumberSnafu {})
}
