// ********* Input data structures ***********

use serde::{Deserialize, Serialize};
use snafu::Snafu;
use std::fmt::Display;

/// The identifier of a candidate, unique within one election.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for CandidateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(s: &str) -> Self {
        CandidateId(s.to_string())
    }
}

impl From<String> for CandidateId {
    fn from(s: String) -> Self {
        CandidateId(s)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElectionId(pub u64);

impl Display for ElectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
}

impl Candidate {
    pub fn new(id: impl Into<CandidateId>, name: impl Into<String>) -> Candidate {
        Candidate {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The shape of a ballot. Every rule accepts exactly one of them.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum BallotKind {
    #[serde(rename = "approvalBallot")]
    Approval,
    #[serde(rename = "ordinalBallot")]
    Ordinal,
    #[serde(rename = "cardinalBallot")]
    Cardinal,
    #[serde(rename = "boundedApprovalBallot")]
    BoundedApproval,
}

impl Display for BallotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BallotKind::Approval => "approvalBallot",
            BallotKind::Ordinal => "ordinalBallot",
            BallotKind::Cardinal => "cardinalBallot",
            BallotKind::BoundedApproval => "boundedApprovalBallot",
        };
        write!(f, "{}", s)
    }
}

/// The multi-winner rule used to select the committee.
///
/// - Approval, SAV, Borda, Utilitarian and Copeland score each candidate on its own
/// and greedily take the best K.
/// - PAV, BoundedApproval and BordaCC score whole committees and search all of them.
/// - STV runs rounds of weighted plurality with a Droop quota.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    #[serde(rename = "approvalElection")]
    Approval,
    #[serde(rename = "savElection")]
    Sav,
    #[serde(rename = "pavElection")]
    Pav,
    #[serde(rename = "boundedApprovalElection")]
    BoundedApproval,
    #[serde(rename = "bordaElection")]
    Borda,
    #[serde(rename = "bordaCCElection")]
    BordaCc,
    #[serde(rename = "stvElection")]
    Stv,
    #[serde(rename = "utilitarianElection")]
    Utilitarian,
    #[serde(rename = "copelandElection")]
    Copeland,
}

impl RuleKind {
    pub const ALL: [RuleKind; 9] = [
        RuleKind::Approval,
        RuleKind::Sav,
        RuleKind::Pav,
        RuleKind::BoundedApproval,
        RuleKind::Borda,
        RuleKind::BordaCc,
        RuleKind::Stv,
        RuleKind::Utilitarian,
        RuleKind::Copeland,
    ];

    pub fn ballot_kind(&self) -> BallotKind {
        match self {
            RuleKind::Approval | RuleKind::Sav | RuleKind::Pav => BallotKind::Approval,
            RuleKind::BoundedApproval => BallotKind::BoundedApproval,
            RuleKind::Borda | RuleKind::BordaCc | RuleKind::Stv | RuleKind::Copeland => {
                BallotKind::Ordinal
            }
            RuleKind::Utilitarian => BallotKind::Cardinal,
        }
    }

    /// Rules that need every ballot to rank all the candidates.
    pub fn requires_complete_ranking(&self) -> bool {
        self.ballot_kind() == BallotKind::Ordinal
    }

    /// Rules whose cost grows with the number of committees, C(n, K).
    pub fn is_exhaustive(&self) -> bool {
        matches!(
            self,
            RuleKind::Pav | RuleKind::BoundedApproval | RuleKind::BordaCc
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            RuleKind::Approval => "approvalElection",
            RuleKind::Sav => "savElection",
            RuleKind::Pav => "pavElection",
            RuleKind::BoundedApproval => "boundedApprovalElection",
            RuleKind::Borda => "bordaElection",
            RuleKind::BordaCc => "bordaCCElection",
            RuleKind::Stv => "stvElection",
            RuleKind::Utilitarian => "utilitarianElection",
            RuleKind::Copeland => "copelandElection",
        }
    }
}

impl Display for RuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for RuleKind {
    type Err = VotingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleKind::ALL
            .iter()
            .find(|r| r.label() == s)
            .copied()
            .ok_or_else(|| VotingError::Validation {
                message: format!("unknown rule kind {:?}", s),
            })
    }
}

// ******** Output data structures *********

/// Statistics for one STV round
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RoundStats {
    pub round: u32,
    pub tally: Vec<(CandidateId, f64)>,
    pub elected: Option<CandidateId>,
    pub eliminated: Option<CandidateId>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VotingResult {
    pub rule: RuleKind,
    /// The committee, in candidate registration order.
    /// It may hold fewer than K members (no ballots, or STV running out of weight).
    pub winners: Vec<CandidateId>,
    /// Per-candidate scores, for the rules that score candidates one by one.
    pub tally: Vec<(CandidateId, f64)>,
    /// Score of the winning committee, for the rules that score committees.
    pub committee_score: Option<f64>,
    /// Droop quota, STV only.
    pub threshold: Option<u64>,
    pub round_stats: Vec<RoundStats>,
}

impl VotingResult {
    pub(crate) fn empty(rule: RuleKind) -> VotingResult {
        VotingResult {
            rule,
            winners: Vec::new(),
            tally: Vec::new(),
            committee_score: None,
            threshold: None,
            round_stats: Vec::new(),
        }
    }

    pub fn is_winner(&self, cid: &CandidateId) -> bool {
        self.winners.contains(cid)
    }
}

/// Errors surfaced by the engine. The caller maps them to its own responses.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum VotingError {
    #[snafu(display("Invalid input: {message}"))]
    Validation { message: String },

    #[snafu(display("The election expects a {expected} but received a {actual}"))]
    KindMismatch {
        expected: BallotKind,
        actual: BallotKind,
    },

    #[snafu(display("Candidate {candidate} is not part of this election"))]
    CandidateMismatch { candidate: CandidateId },

    #[snafu(display("The creator stopped the voting process. You can no longer vote."))]
    ElectionStopped {},

    #[snafu(display("No {what} with id {id}"))]
    NotFound { what: String, id: String },

    #[snafu(display("User {user} is not allowed to manage election {election}"))]
    Authorization { user: String, election: ElectionId },

    #[snafu(display("Search is too long ({len} characters, at most {max})"))]
    QueryTooLong { len: usize, max: usize },

    #[snafu(display("Search is empty."))]
    EmptyQuery {},
}

// ********* Configuration **********

/// Bounds on election sizes and input lengths.
///
/// The committee rules that search all committees grow as C(n, K), so the number
/// of candidates must stay small.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionLimits {
    pub max_candidates: usize,
    pub max_committee_size: usize,
    pub min_title_len: usize,
    pub max_title_len: usize,
    pub max_description_len: usize,
    pub max_candidate_name_len: usize,
    pub max_query_len: usize,
}

impl ElectionLimits {
    pub const DEFAULT_LIMITS: ElectionLimits = ElectionLimits {
        max_candidates: 12,
        max_committee_size: 11,
        min_title_len: 3,
        max_title_len: 60,
        max_description_len: 500,
        max_candidate_name_len: 30,
        max_query_len: 60,
    };
}

impl Default for ElectionLimits {
    fn default() -> Self {
        ElectionLimits::DEFAULT_LIMITS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_kinds_parse_from_their_labels() {
        for rule in RuleKind::ALL {
            assert_eq!(rule.label().parse::<RuleKind>(), Ok(rule));
        }
        assert!(matches!(
            "condorcetElection".parse::<RuleKind>(),
            Err(VotingError::Validation { .. })
        ));
    }

    #[test]
    fn ordinal_rules_require_complete_rankings() {
        assert!(RuleKind::Stv.requires_complete_ranking());
        assert!(RuleKind::Copeland.requires_complete_ranking());
        assert!(!RuleKind::Pav.requires_complete_ranking());
        assert_eq!(RuleKind::Utilitarian.ballot_kind(), BallotKind::Cardinal);
    }

    #[test]
    fn rule_kind_serde_uses_wire_names() {
        let js = serde_json::to_string(&RuleKind::BordaCc).unwrap();
        assert_eq!(js, "\"bordaCCElection\"");
        let r: RuleKind = serde_json::from_str("\"savElection\"").unwrap();
        assert_eq!(r, RuleKind::Sav);
    }
}
