use log::{debug, info, warn};

use snafu::{prelude::*, ErrorCompat, Snafu};
use vote_tally::builder::Builder;
use vote_tally::*;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::SecondsFormat;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

pub mod config_reader;
pub mod io_csv;

use crate::election::config_reader::*;
use crate::election::io_csv::read_csv_ranking;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ElectionError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading json: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a positive integer index"))]
    ParsingJsonNumber {},
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading csv line: {source}"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} is too short"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("Line {lineno}: could not read id {value:?}"))]
    CsvParseId { lineno: usize, value: String },
    #[snafu(display("Error writing summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Could not set up the election: {source}"))]
    Setup { source: TallyError },
    #[snafu(display("Could not find the directory of {path}"))]
    MissingParentDir { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type ElectionResult<T> = Result<T, ElectionError>;

fn format_ts(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn error_js(e: &TallyError) -> JSValue {
    json!({ "error": e.to_string() })
}

fn rejection_js(kind: BallotKind, voter_id: VoterId, e: &TallyError) -> JSValue {
    warn!("rejected {} ballot of voter {}: {}", kind, voter_id, e);
    json!({"kind": kind.to_string(), "voterId": voter_id, "error": e.to_string()})
}

fn events_js(events: &[VoteEvent]) -> Vec<JSValue> {
    events
        .iter()
        .map(|e| json!({"voterId": e.voter_id, "timestamp": format_ts(&e.timestamp), "weight": e.weight}))
        .collect()
}

fn build_election(config: &ElectionConfig) -> ElectionResult<Election> {
    let rules = config.rules.clone().unwrap_or_default();
    let tally_rules = rules.tally_rules()?;
    info!("build_election: rules: {:?}", tally_rules);

    let mut builder = Builder::new(&tally_rules).context(SetupSnafu {})?;
    for c in config.candidates.iter() {
        builder
            .add_candidate(Candidate {
                candidate_id: c.candidate_id,
                name: c.name.clone(),
                party: match c.party.clone() {
                    Some(x) if x.is_empty() => None,
                    x => x,
                },
            })
            .context(SetupSnafu {})?;
    }
    for v in config.voters.iter() {
        builder
            .add_voter(Voter {
                voter_id: v.voter_id,
                name: v.name.clone(),
                email: v.email.clone(),
                age: v.age,
            })
            .context(SetupSnafu {})?;
    }
    if let Some(budget) = rules.privacy_budget {
        builder = builder.privacy_budget(budget);
    }
    Ok(builder.build())
}

/// Submits all the ballots of the configuration, in file order.
///
/// Returns the rejected ballots and the receipts of the encrypted ballots.
fn replay_ballots(
    election: &Election,
    config: &ElectionConfig,
    root_path: &Path,
) -> ElectionResult<(Vec<JSValue>, Vec<JSValue>)> {
    let mut rejected: Vec<JSValue> = Vec::new();

    let plurality = election.plurality();
    for v in config.votes.iter() {
        let profile_updated = v.profile_updated.unwrap_or(false);
        let res = match v.timestamp {
            Some(ts) => {
                plurality.cast_weighted_vote_at(v.voter_id, v.candidate_id, profile_updated, ts)
            }
            None => plurality.cast_weighted_vote(v.voter_id, v.candidate_id, profile_updated),
        };
        if let Err(e) = res {
            rejected.push(rejection_js(BallotKind::Plurality, v.voter_id, &e));
        }
    }

    let schulze = election.schulze();
    for rb in config.ranked_ballots.iter() {
        if let Err(e) = schulze.submit(rb.voter_id, &rb.ranking) {
            rejected.push(rejection_js(BallotKind::Ranked, rb.voter_id, &e));
        }
    }
    for cfs in config.ranked_ballot_files.iter() {
        let p: PathBuf = root_path.join(&cfs.file_path);
        let p2 = p.as_path().display().to_string();
        info!("Attempting to read rank file {:?}", p2);
        for pb in read_csv_ranking(p2, cfs)? {
            debug!("replay_ballots: line {}: {:?}", pb.lineno, pb);
            if let Err(e) = schulze.submit(pb.voter_id, &pb.ranking) {
                rejected.push(rejection_js(BallotKind::Ranked, pb.voter_id, &e));
            }
        }
    }

    let encrypted = election.encrypted();
    let mut receipts: Vec<JSValue> = Vec::new();
    for eb in config.encrypted_ballots.iter() {
        match encrypted.submit(eb.voter_id, eb.candidate_id, &eb.ciphertext, &eb.proof) {
            Ok(receipt) => receipts.push(json!({
                "voterId": receipt.voter_id,
                "totalBallots": receipt.total_ballots,
                "fingerprint": receipt.fingerprint,
            })),
            Err(e) => rejected.push(rejection_js(BallotKind::Encrypted, eb.voter_id, &e)),
        }
    }

    Ok((rejected, receipts))
}

fn leaderboard_js(election: &Election) -> Vec<JSValue> {
    election
        .plurality()
        .tally()
        .iter()
        .map(|s| json!({"candidateId": s.candidate_id, "name": s.name, "party": s.party, "votes": s.votes}))
        .collect()
}

fn winner_js(election: &Election) -> JSValue {
    match election.plurality().winner() {
        Ok(w) => {
            let ids: Vec<CandidateId> = w.winners.iter().map(|s| s.candidate_id).collect();
            json!({"winners": ids, "maxVotes": w.max_votes})
        }
        Err(e) => error_js(&e),
    }
}

fn schulze_js(election: &Election) -> JSValue {
    match election.schulze().resolve() {
        Ok(res) => {
            // JSON object keys are strings.
            let mut pairwise: JSMap<String, JSValue> = JSMap::new();
            for (c, row) in res.pairwise.iter() {
                let mut js_row: JSMap<String, JSValue> = JSMap::new();
                for (d, count) in row.iter() {
                    js_row.insert(d.to_string(), json!(count));
                }
                pairwise.insert(c.to_string(), JSValue::Object(js_row));
            }
            json!({"winners": res.winners, "pairwise": pairwise})
        }
        Err(e) => error_js(&e),
    }
}

fn homomorphic_js(election: &Election) -> JSValue {
    match election.encrypted().homomorphic_tally() {
        Ok(ht) => {
            let mut tally: JSMap<String, JSValue> = JSMap::new();
            for (c, count) in ht.tally.iter() {
                tally.insert(c.to_string(), json!(count));
            }
            json!({"tally": tally, "proof": ht.proof, "totalBallots": ht.total_ballots})
        }
        Err(e) => error_js(&e),
    }
}

fn timelines_js(election: &Election, queries: &[TimelineQuery]) -> Vec<JSValue> {
    let plurality = election.plurality();
    queries
        .iter()
        .map(|q| match (q.from, q.to) {
            (Some(from), Some(to)) => match plurality.timeline_in_range(q.candidate_id, from, to) {
                Ok(tl) => json!({
                    "candidateId": tl.candidate_id,
                    "name": tl.name,
                    "from": format_ts(&tl.from),
                    "to": format_ts(&tl.to),
                    "events": events_js(&tl.events),
                    "totalWeight": tl.total_weight,
                }),
                Err(e) => json!({"candidateId": q.candidate_id, "error": e.to_string()}),
            },
            _ => match plurality.timeline(q.candidate_id) {
                Ok(tl) => json!({
                    "candidateId": tl.candidate_id,
                    "name": tl.name,
                    "events": events_js(&tl.events),
                }),
                Err(e) => json!({"candidateId": q.candidate_id, "error": e.to_string()}),
            },
        })
        .collect()
}

fn privacy_js(election: &Election, queries: &[PrivacyQuery], rng: &mut StdRng) -> Vec<JSValue> {
    let counter = election.noised_counter();
    queries
        .iter()
        .map(
            |q| match counter.query_with_rng(q.candidate_id, q.epsilon, &mut *rng) {
                Ok(nc) => json!({
                    "candidateId": nc.candidate_id,
                    "trueCount": nc.true_count,
                    "noisyCount": nc.noisy_count,
                    "epsilon": nc.epsilon,
                }),
                Err(e) => json!({"candidateId": q.candidate_id, "error": e.to_string()}),
            },
        )
        .collect()
}

fn audit_js(election: &Election, query: &AuditQuery) -> JSValue {
    let total = query
        .total_ballots
        .unwrap_or_else(|| election.ballot_count(BallotKind::Plurality) as i64);
    match election.audit().plan(total, query.risk_limit) {
        Ok(plan) => json!({
            "totalBallots": plan.total_ballots,
            "riskLimit": plan.risk_limit,
            "recommendedSampleSize": plan.recommended_sample_size,
            "method": plan.method,
        }),
        Err(e) => error_js(&e),
    }
}

fn build_summary_js(
    config: &ElectionConfig,
    election: &Election,
    rejected: Vec<JSValue>,
    receipts: Vec<JSValue>,
    rng: &mut StdRng,
) -> JSValue {
    let config_js = json!({
        "contest": config.contest_name,
        "ballots": {
            "plurality": election.ballot_count(BallotKind::Plurality),
            "ranked": election.ballot_count(BallotKind::Ranked),
            "encrypted": election.ballot_count(BallotKind::Encrypted),
        }
    });

    let mut results: JSMap<String, JSValue> = JSMap::new();
    results.insert(
        "leaderboard".to_string(),
        JSValue::Array(leaderboard_js(election)),
    );
    results.insert("winner".to_string(), winner_js(election));
    results.insert("schulze".to_string(), schulze_js(election));
    results.insert("homomorphic".to_string(), homomorphic_js(election));
    results.insert("receipts".to_string(), JSValue::Array(receipts));
    results.insert(
        "timelines".to_string(),
        JSValue::Array(timelines_js(election, &config.queries.timelines)),
    );
    results.insert(
        "privacy".to_string(),
        JSValue::Array(privacy_js(election, &config.queries.privacy, rng)),
    );
    if let Some(aq) = &config.queries.audit {
        results.insert("audit".to_string(), audit_js(election, aq));
    }

    json!({
        "config": config_js,
        "rejected": rejected,
        "results": results,
    })
}

fn write_summary(pretty_js: &str, out: Option<String>) -> ElectionResult<()> {
    match out.as_deref() {
        None | Some("") | Some("stdout") => {
            println!("{}", pretty_js);
        }
        Some(path) => {
            info!("Writing summary to {}", path);
            fs::write(path, pretty_js).context(WritingSummarySnafu { path })?;
        }
    }
    Ok(())
}

pub fn run_election(
    config_path: String,
    out: Option<String>,
    check_summary_path: Option<String>,
    seed: Option<u64>,
) -> ElectionResult<()> {
    let config = read_config(config_path.as_str())?;
    info!("config: {:?}", config);

    let config_p = Path::new(config_path.as_str());
    let root_p = config_p.parent().context(MissingParentDirSnafu {
        path: config_path.clone(),
    })?;

    let election = build_election(&config)?;
    let (rejected, receipts) = replay_ballots(&election, &config, root_p)?;
    info!(
        "run_election: {} ballots rejected for contest {:?}",
        rejected.len(),
        config.contest_name
    );

    let seed = seed.or_else(|| config.rules.as_ref().and_then(|r| r.random_seed));
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // Assemble the final json
    let result_js = build_summary_js(&config, &election, rejected, receipts, &mut rng);

    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_summary(&pretty_js_stats, out)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

fn run_election_test(test_name: &str, config_lpath: &str, summary_lpath: &str) -> bool {
    let test_dir = option_env!("VOTETALLY_TEST_DIR")
        .unwrap_or(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data"));
    info!("Running test {}", test_name);
    let res = run_election(
        format!("{}/{}/{}", test_dir, test_name, config_lpath),
        Some(format!("{}/{}_summary.json", std::env::temp_dir().display(), test_name)),
        Some(format!("{}/{}/{}", test_dir, test_name, summary_lpath)),
        None,
    );
    if let Err(e) = res {
        warn!("Error occurred {:?}", e);
        eprintln!("An error occurred {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        } else {
            eprintln!("No trace found");
        }
        return false;
    }
    true
}

pub fn test_wrapper(test_name: &str) -> bool {
    run_election_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    )
}
