use log::debug;
use serde::{Deserialize, Serialize};

use crate::ballot::Ballot;
use crate::config::*;
use crate::election::Election;

/// The payload used to create an election.
///
/// Candidates are only given by name; they receive the ids `"1"`, `"2"`, ... in
/// the order of the list.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CreateElectionRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub candidate_names: Vec<String>,
    pub committee_size: usize,
    pub rule_kind: RuleKind,
}

/// A builder for elections.
///
/// ```
/// use committee_voting::builder::ElectionBuilder;
/// use committee_voting::{CandidateId, ElectionId, ElectionLimits, RuleKind};
/// # use committee_voting::VotingError;
///
/// let mut builder = ElectionBuilder::new(&ElectionLimits::DEFAULT_LIMITS)
///     .title("Board 2024")
///     .rule(RuleKind::Approval)
///     .committee_size(1)
///     .candidates(&["Anna".to_string(), "Bob".to_string()])?;
///
/// builder.add_ballot_json(&serde_json::json!({"type": "approvalBallot", "app_candidates": ["2"]}))?;
///
/// let mut election = builder.build(ElectionId(1), "alice")?;
/// assert_eq!(election.evaluate().winners, vec![CandidateId::from("2")]);
/// # Ok::<(), VotingError>(())
/// ```
pub struct ElectionBuilder {
    pub(crate) _limits: ElectionLimits,
    pub(crate) _title: String,
    pub(crate) _description: String,
    pub(crate) _candidates: Option<Vec<Candidate>>,
    pub(crate) _committee_size: usize,
    pub(crate) _rule: RuleKind,
    pub(crate) _ballots: Vec<Ballot>,
    pub(crate) _stopped: bool,
}

impl ElectionBuilder {
    pub fn new(limits: &ElectionLimits) -> ElectionBuilder {
        ElectionBuilder {
            _limits: limits.clone(),
            _title: String::new(),
            _description: String::new(),
            _candidates: None,
            _committee_size: 1,
            _rule: RuleKind::Approval,
            _ballots: Vec::new(),
            _stopped: false,
        }
    }

    /// Starts from a creation payload.
    pub fn from_request(
        request: &CreateElectionRequest,
        limits: &ElectionLimits,
    ) -> Result<ElectionBuilder, VotingError> {
        ElectionBuilder::new(limits)
            .title(&request.title)
            .description(&request.description)
            .committee_size(request.committee_size)
            .rule(request.rule_kind)
            .candidates(&request.candidate_names)
    }

    pub fn title(self, title: &str) -> ElectionBuilder {
        ElectionBuilder {
            _title: title.to_string(),
            ..self
        }
    }

    pub fn description(self, description: &str) -> ElectionBuilder {
        ElectionBuilder {
            _description: description.to_string(),
            ..self
        }
    }

    pub fn committee_size(self, committee_size: usize) -> ElectionBuilder {
        ElectionBuilder {
            _committee_size: committee_size,
            ..self
        }
    }

    pub fn rule(self, rule: RuleKind) -> ElectionBuilder {
        ElectionBuilder {
            _rule: rule,
            ..self
        }
    }

    /// Sets the candidates from their names. Resets the ballots already added.
    pub fn candidates(self, names: &[String]) -> Result<ElectionBuilder, VotingError> {
        if names.is_empty() {
            return Err(VotingError::Validation {
                message: "at least one candidate is required".to_string(),
            });
        }
        Ok(ElectionBuilder {
            _candidates: Some(
                names
                    .iter()
                    .enumerate()
                    .map(|(idx, name)| Candidate::new((idx + 1).to_string(), name.trim()))
                    .collect(),
            ),
            _ballots: Vec::new(),
            ..self
        })
    }

    /// Builds the election stopped, as a closed poll imported with its ballots.
    pub fn stopped(self) -> ElectionBuilder {
        ElectionBuilder {
            _stopped: true,
            ..self
        }
    }

    /// Adds a ballot. It is checked against the election when the election is built.
    pub fn add_ballot(&mut self, ballot: Ballot) -> Result<(), VotingError> {
        if ballot.kind() != self._rule.ballot_kind() {
            return Err(VotingError::KindMismatch {
                expected: self._rule.ballot_kind(),
                actual: ballot.kind(),
            });
        }
        self._ballots.push(ballot);
        Ok(())
    }

    pub fn add_ballot_json(&mut self, js: &serde_json::Value) -> Result<(), VotingError> {
        self.add_ballot(Ballot::from_json(js)?)
    }

    /// Creates the election and admits the ballots, in the order they were added.
    pub fn build(self, id: ElectionId, owner: &str) -> Result<Election, VotingError> {
        let candidates = self._candidates.ok_or_else(|| VotingError::Validation {
            message: "no candidates were given".to_string(),
        })?;
        let mut election = Election::new(
            id,
            owner,
            self._title.trim(),
            self._description.trim(),
            candidates,
            self._committee_size,
            self._rule,
            &self._limits,
        )?;
        debug!(
            "build: election {}: admitting {} ballots",
            id,
            self._ballots.len()
        );
        for ballot in self._ballots {
            election.add_ballot(ballot)?;
        }
        if self._stopped {
            election.stop();
        }
        Ok(election)
    }
}
