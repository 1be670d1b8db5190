use log::{debug, info, warn};

use committee_voting::builder::{CreateElectionRequest, ElectionBuilder};
use committee_voting::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

#[derive(Debug, Snafu)]
pub enum CliError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Invalid election: {source}"))]
    Voting { source: VotingError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CliResult<T> = Result<T, CliError>;

/// The owner used for the elections created from a poll file.
const DEFAULT_OWNER: &str = "comvote";

/// A poll file: the creation payload of one election, its ballots and optionally
/// the limits to check it against.
///
/// Each ballot may carry a `count` field (default 1) to stand for that many
/// identical ballots.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PollFile {
    #[serde(flatten)]
    pub election: CreateElectionRequest,
    pub owner: Option<String>,
    #[serde(default)]
    pub ballots: Vec<JSValue>,
    pub limits: Option<ElectionLimits>,
}

/// The kinds of input files.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputType {
    /// One `PollFile`.
    Poll,
    /// A list of stored elections, as written by `ElectionStore::records`.
    Records,
}

impl InputType {
    pub fn parse(s: Option<&str>) -> CliResult<InputType> {
        match s {
            None | Some("poll") => Ok(InputType::Poll),
            Some("records") => Ok(InputType::Records),
            Some(x) => whatever!("Unknown input type {:?}, expected poll or records", x),
        }
    }
}

fn read_ballot_count(js: &JSValue) -> CliResult<u64> {
    match js.get("count") {
        None => Ok(1),
        Some(JSValue::Number(n)) => match n.as_u64() {
            Some(c) => Ok(c),
            None => whatever!("Ballot count must be a non-negative integer: {}", n),
        },
        Some(x) => whatever!("Ballot count must be a number: {}", x),
    }
}

/// Builds the election of a poll file and admits its ballots.
///
/// A ballot the election refuses is logged and skipped. Returns the election and
/// the number of skipped ballots.
pub fn tally_poll(poll: &PollFile) -> CliResult<(Election, u64)> {
    let limits = poll.limits.clone().unwrap_or_default();
    let owner = poll.owner.as_deref().unwrap_or(DEFAULT_OWNER);
    let mut election = ElectionBuilder::from_request(&poll.election, &limits)
        .context(VotingSnafu {})?
        .build(ElectionId(1), owner)
        .context(VotingSnafu {})?;

    let mut rejected: u64 = 0;
    for (idx, js) in poll.ballots.iter().enumerate() {
        let count = read_ballot_count(js)?;
        let ballot = match Ballot::from_json(js) {
            Ok(b) => b,
            Err(e) => {
                warn!("tally_poll: ballot {}: skipping: {}", idx, e);
                rejected += count;
                continue;
            }
        };
        for _ in 0..count {
            if let Err(e) = election.add_ballot(ballot.clone()) {
                warn!("tally_poll: ballot {}: skipping: {}", idx, e);
                rejected += count;
                break;
            }
        }
    }
    debug!(
        "tally_poll: {} ballots admitted, {} rejected",
        election.vote_count(),
        rejected
    );
    Ok((election, rejected))
}

fn candidate_name(election: &Election, cid: &CandidateId) -> String {
    election
        .candidates()
        .iter()
        .find(|c| c.id == *cid)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| cid.to_string())
}

fn scores_to_json(election: &Election, scores: &[(CandidateId, f64)]) -> Vec<JSValue> {
    scores
        .iter()
        .map(|(cid, score)| json!({"candidate": candidate_name(election, cid), "score": score}))
        .collect()
}

fn result_stats_to_json(election: &Election, rs: &VotingResult) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for round_stat in rs.round_stats.iter() {
        let mut tally_results: Vec<JSValue> = Vec::new();
        if let Some(cid) = &round_stat.elected {
            tally_results.push(json!({ "elected": candidate_name(election, cid) }));
        }
        if let Some(cid) = &round_stat.eliminated {
            tally_results.push(json!({ "eliminated": candidate_name(election, cid) }));
        }
        l.push(json!({
            "round": round_stat.round,
            "tally": scores_to_json(election, &round_stat.tally),
            "tallyResults": tally_results
        }));
    }
    l
}

/// The summary of one evaluated election.
pub fn build_summary_js(election: &Election, rv: &VotingResult, rejected: u64) -> JSValue {
    let winners: Vec<String> = rv
        .winners
        .iter()
        .map(|cid| candidate_name(election, cid))
        .collect();
    json!({
        "config": {
            "id": election.id(),
            "title": election.title(),
            "rule": election.rule(),
            "committeeSize": election.committee_size(),
            "candidates": election.candidates(),
            "threshold": rv.threshold,
        },
        "results": {
            "votecount": election.vote_count(),
            "rejected": rejected,
            "stopped": election.is_stopped(),
            "winners": winners,
            "tally": scores_to_json(election, &rv.tally),
            "committeeScore": rv.committee_score,
            "rounds": result_stats_to_json(election, rv),
        }
    })
}

pub fn read_summary(path: &str) -> CliResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn summarize_poll(contents: &str) -> CliResult<JSValue> {
    let poll: PollFile = serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
    info!(
        "poll: {:?} with {} ballot entries",
        poll.election.title,
        poll.ballots.len()
    );
    let (mut election, rejected) = tally_poll(&poll)?;
    let result = election.recompute_winners().clone();
    Ok(build_summary_js(&election, &result, rejected))
}

fn summarize_records(contents: &str) -> CliResult<JSValue> {
    let records: Vec<ElectionRecord> =
        serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
    let store = ElectionStore::from_records(&records, &ElectionLimits::DEFAULT_LIMITS)
        .context(VotingSnafu {})?;
    info!("records: restored {} elections", store.len());
    let mut summaries: Vec<JSValue> = Vec::new();
    for record in records.iter() {
        let election = store.snapshot(record.id).context(VotingSnafu {})?;
        let result = store
            .evaluate(record.id, election.owner())
            .context(VotingSnafu {})?;
        summaries.push(build_summary_js(&election, &result, 0));
    }
    Ok(json!({ "elections": summaries }))
}

fn write_summary(out: Option<&str>, pretty_js: &str) -> CliResult<()> {
    match out {
        None | Some("stdout") => {
            println!("{}", pretty_js);
        }
        Some(path) => {
            info!("Writing summary to {}", path);
            fs::write(path, pretty_js).context(WritingJsonSnafu { path })?;
        }
    }
    Ok(())
}

/// Reads the input, evaluates the elections it contains and writes the summary.
///
/// If a reference summary is given, any difference with it is printed and
/// reported as an error.
pub fn run_election(
    input_path: &str,
    input_type: InputType,
    out: Option<&str>,
    check_summary_path: Option<&str>,
) -> CliResult<()> {
    let contents = fs::read_to_string(input_path).context(OpeningJsonSnafu { path: input_path })?;
    let result_js = match input_type {
        InputType::Poll => summarize_poll(&contents)?,
        InputType::Records => summarize_records(&contents)?,
    };

    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    write_summary(out, &pretty_js_stats)?;

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

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn temp_file(name: &str, contents: &str) -> String {
        let p: PathBuf = [
            std::env::temp_dir(),
            PathBuf::from(format!("comvote_{}_{}", std::process::id(), name)),
        ]
        .iter()
        .collect();
        fs::write(&p, contents).unwrap();
        p.display().to_string()
    }

    fn approval_poll() -> JSValue {
        json!({
            "title": "Board 2024",
            "description": "Pick two",
            "candidate_names": ["Anna", "Bob", "Clara", "Dan"],
            "committee_size": 2,
            "rule_kind": "approvalElection",
            "ballots": [
                {"type": "approvalBallot", "app_candidates": ["1", "3"], "count": 3},
                {"type": "approvalBallot", "app_candidates": ["2", "3"]},
                {"type": "approvalBallot", "app_candidates": ["9"]},
                {"type": "ordinalBallot", "order": ["1", "2", "3", "4"]}
            ]
        })
    }

    #[test]
    fn poll_is_tallied_with_counts() {
        init();
        let poll: PollFile = serde_json::from_value(approval_poll()).unwrap();
        let (mut election, rejected) = tally_poll(&poll).unwrap();
        assert_eq!(election.vote_count(), 4);
        assert_eq!(rejected, 2);
        let result = election.recompute_winners().clone();
        let js = build_summary_js(&election, &result, rejected);
        assert_eq!(js["results"]["winners"], json!(["Anna", "Clara"]));
        assert_eq!(js["results"]["tally"][2], json!({"candidate": "Clara", "score": 4.0}));
        assert_eq!(js["config"]["rule"], json!("approvalElection"));
    }

    #[test]
    fn stv_rounds_in_summary() {
        let poll: PollFile = serde_json::from_value(json!({
            "title": "Chair",
            "candidate_names": ["Anna", "Bob", "Clara"],
            "committee_size": 1,
            "rule_kind": "stvElection",
            "ballots": [
                {"type": "ordinalBallot", "order": ["1", "2", "3"], "count": 2},
                {"type": "ordinalBallot", "order": ["3", "2", "1"]}
            ]
        }))
        .unwrap();
        let (mut election, _) = tally_poll(&poll).unwrap();
        let result = election.recompute_winners().clone();
        let js = build_summary_js(&election, &result, 0);
        // quota = 3 / 2 + 1 = 2
        assert_eq!(js["config"]["threshold"], json!(2));
        assert_eq!(
            js["results"]["rounds"][0]["tallyResults"],
            json!([{"elected": "Anna"}])
        );
        assert_eq!(js["results"]["winners"], json!(["Anna"]));
    }

    #[test]
    fn invalid_poll_is_an_error() {
        let poll: PollFile = serde_json::from_value(json!({
            "title": "Chair",
            "candidate_names": ["Anna", "Bob"],
            "committee_size": 2,
            "rule_kind": "approvalElection"
        }))
        .unwrap();
        assert!(matches!(tally_poll(&poll), Err(CliError::Voting { .. })));
        assert!(InputType::parse(Some("csv")).is_err());
        assert_eq!(InputType::parse(None).unwrap(), InputType::Poll);
    }

    #[test]
    fn reference_summary_is_checked() {
        init();
        let input = temp_file("poll.json", &approval_poll().to_string());
        let out = temp_file("out.json", "");
        run_election(&input, InputType::Poll, Some(out.as_str()), None).unwrap();
        // The output is its own reference.
        run_election(&input, InputType::Poll, Some("stdout"), Some(out.as_str())).unwrap();

        let other = temp_file("other.json", "{\"results\": []}");
        assert!(matches!(
            run_election(&input, InputType::Poll, None, Some(other.as_str())),
            Err(CliError::Whatever { .. })
        ));
        assert!(matches!(
            run_election("/nonexistent/comvote.json", InputType::Poll, None, None),
            Err(CliError::OpeningJson { .. })
        ));
    }

    #[test]
    fn records_are_evaluated() {
        let store = ElectionStore::default();
        let id = store
            .register_election(
                "alice",
                &CreateElectionRequest {
                    title: "Lunch".to_string(),
                    description: "".to_string(),
                    candidate_names: vec!["pizza".into(), "salad".into(), "soup".into()],
                    committee_size: 1,
                    rule_kind: RuleKind::Borda,
                },
            )
            .unwrap();
        store
            .add_vote_from_json(id, &json!({"type": "ordinalBallot", "order": ["2", "1", "3"]}))
            .unwrap();
        let contents = serde_json::to_string(&store.records()).unwrap();
        let js = summarize_records(&contents).unwrap();
        assert_eq!(js["elections"][0]["results"]["winners"], json!(["salad"]));
        assert_eq!(js["elections"][0]["results"]["votecount"], json!(1));
    }
}
