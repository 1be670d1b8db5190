use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::config::{BallotKind, CandidateId, VotingError};
use crate::scored_subset::ScoredSubset;

/// A ballot as it is submitted and stored, tagged by its kind.
///
/// ```
/// use committee_voting::BallotPayload;
///
/// let p: BallotPayload = serde_json::from_str(
///     r#"{"type": "approvalBallot", "app_candidates": ["1", "3"]}"#,
/// ).unwrap();
/// assert!(matches!(p, BallotPayload::Approval { .. }));
/// ```
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BallotPayload {
    #[serde(rename = "approvalBallot")]
    Approval { app_candidates: Vec<CandidateId> },
    #[serde(rename = "ordinalBallot")]
    Ordinal { order: Vec<CandidateId> },
    #[serde(rename = "cardinalBallot")]
    Cardinal { ratings: BTreeMap<CandidateId, i64> },
    #[serde(rename = "boundedApprovalBallot")]
    BoundedApproval {
        sets: BTreeMap<String, Vec<CandidateId>>,
        bounds: BTreeMap<String, Vec<i64>>,
    },
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ApprovalBallot {
    approved: BTreeSet<CandidateId>,
}

impl ApprovalBallot {
    pub fn new<I>(approved: I) -> ApprovalBallot
    where
        I: IntoIterator,
        I::Item: Into<CandidateId>,
    {
        ApprovalBallot {
            approved: approved.into_iter().map(|c| c.into()).collect(),
        }
    }

    pub fn approved(&self) -> &BTreeSet<CandidateId> {
        &self.approved
    }

    pub fn approves(&self, cid: &CandidateId) -> bool {
        self.approved.contains(cid)
    }
}

/// A ranking of candidates, most preferred first.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct OrdinalBallot {
    order: Vec<CandidateId>,
}

impl OrdinalBallot {
    pub fn new<I>(order: I) -> Result<OrdinalBallot, VotingError>
    where
        I: IntoIterator,
        I::Item: Into<CandidateId>,
    {
        let b = OrdinalBallot {
            order: order.into_iter().map(|c| c.into()).collect(),
        };
        if !b.check_validity() {
            return Err(VotingError::Validation {
                message: "a candidate is ranked more than once".to_string(),
            });
        }
        Ok(b)
    }

    pub fn order(&self) -> &[CandidateId] {
        &self.order
    }

    /// 1-based rank of the candidate, if ranked.
    pub fn position_of(&self, cid: &CandidateId) -> Option<usize> {
        self.order.iter().position(|c| c == cid).map(|idx| idx + 1)
    }

    fn check_validity(&self) -> bool {
        let mut seen: HashSet<&CandidateId> = HashSet::new();
        self.order.iter().all(|c| seen.insert(c))
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CardinalBallot {
    ratings: BTreeMap<CandidateId, i64>,
}

impl CardinalBallot {
    pub const MIN_UTILITY: i64 = -10;
    pub const MAX_UTILITY: i64 = 10;

    pub fn new<I, C>(ratings: I) -> Result<CardinalBallot, VotingError>
    where
        I: IntoIterator<Item = (C, i64)>,
        C: Into<CandidateId>,
    {
        let b = CardinalBallot {
            ratings: ratings.into_iter().map(|(c, u)| (c.into(), u)).collect(),
        };
        if let Some((cid, u)) = b.out_of_range().next() {
            return Err(VotingError::Validation {
                message: format!(
                    "utility {} for candidate {} is outside [{}, {}]",
                    u,
                    cid,
                    CardinalBallot::MIN_UTILITY,
                    CardinalBallot::MAX_UTILITY
                ),
            });
        }
        Ok(b)
    }

    pub fn ratings(&self) -> &BTreeMap<CandidateId, i64> {
        &self.ratings
    }

    /// Unrated candidates count as 0.
    pub fn utility_for(&self, cid: &CandidateId) -> i64 {
        self.ratings.get(cid).copied().unwrap_or(0)
    }

    fn out_of_range(&self) -> impl Iterator<Item = (&CandidateId, i64)> {
        self.ratings
            .iter()
            .filter(|(_, u)| !(CardinalBallot::MIN_UTILITY..=CardinalBallot::MAX_UTILITY).contains(*u))
            .map(|(c, u)| (c, *u))
    }

    fn check_validity(&self) -> bool {
        self.out_of_range().next().is_none()
    }
}

/// Labelled groups of candidates, each with its bounds. Groups never overlap.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BoundedApprovalBallot {
    groups: Vec<(String, ScoredSubset)>,
}

impl BoundedApprovalBallot {
    pub fn new(groups: Vec<(String, ScoredSubset)>) -> Result<BoundedApprovalBallot, VotingError> {
        let b = BoundedApprovalBallot { groups };
        if let Some(message) = b.first_violation() {
            return Err(VotingError::Validation { message });
        }
        Ok(b)
    }

    pub fn groups(&self) -> &[(String, ScoredSubset)] {
        &self.groups
    }

    /// Sum of the group contributions for this committee.
    pub fn score<'a, I>(&self, committee: I) -> f64
    where
        I: IntoIterator<Item = &'a CandidateId>,
    {
        let committee: Vec<&CandidateId> = committee.into_iter().collect();
        self.groups
            .iter()
            .map(|(_, bs)| bs.score(committee.iter().copied()))
            .sum()
    }

    fn first_violation(&self) -> Option<String> {
        for (label, bs) in self.groups.iter() {
            if !bs.is_satisfiable() {
                let (l, s, u) = bs.bounds();
                return Some(format!(
                    "group {:?} has bounds ({}, {}, {}) that cannot be met by its {} candidates",
                    label,
                    l,
                    s,
                    u,
                    bs.len()
                ));
            }
        }
        for (idx, (label1, bs1)) in self.groups.iter().enumerate() {
            for (label2, bs2) in self.groups[..idx].iter() {
                if !bs1.is_disjoint(bs2) {
                    return Some(format!(
                        "groups {:?} and {:?} share candidates",
                        label2, label1
                    ));
                }
            }
        }
        None
    }

    fn check_validity(&self) -> bool {
        self.first_violation().is_none()
    }
}

/// A validated ballot. Only the constructors that check validity can build one.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Ballot {
    Approval(ApprovalBallot),
    Ordinal(OrdinalBallot),
    Cardinal(CardinalBallot),
    BoundedApproval(BoundedApprovalBallot),
}

impl Ballot {
    pub fn parse(payload: BallotPayload) -> Result<Ballot, VotingError> {
        let ballot = match payload {
            BallotPayload::Approval { app_candidates } => {
                Ballot::Approval(ApprovalBallot::new(app_candidates))
            }
            BallotPayload::Ordinal { order } => Ballot::Ordinal(OrdinalBallot::new(order)?),
            BallotPayload::Cardinal { ratings } => Ballot::Cardinal(CardinalBallot::new(ratings)?),
            BallotPayload::BoundedApproval { sets, bounds } => {
                let mut groups: Vec<(String, ScoredSubset)> = Vec::new();
                for (label, members) in sets {
                    let bound = bounds.get(&label).ok_or_else(|| VotingError::Validation {
                        message: format!("no bounds given for group {:?}", label),
                    })?;
                    let (lower, saturation, upper) = read_bound(&label, bound)?;
                    groups.push((label, ScoredSubset::new(lower, saturation, upper, members)));
                }
                Ballot::BoundedApproval(BoundedApprovalBallot::new(groups)?)
            }
        };
        debug!("Ballot::parse: {:?}", ballot);
        Ok(ballot)
    }

    pub fn from_json(js: &serde_json::Value) -> Result<Ballot, VotingError> {
        let payload: BallotPayload =
            serde_json::from_value(js.clone()).map_err(|e| VotingError::Validation {
                message: format!("malformed ballot: {}", e),
            })?;
        Ballot::parse(payload)
    }

    pub fn kind(&self) -> BallotKind {
        match self {
            Ballot::Approval(_) => BallotKind::Approval,
            Ballot::Ordinal(_) => BallotKind::Ordinal,
            Ballot::Cardinal(_) => BallotKind::Cardinal,
            Ballot::BoundedApproval(_) => BallotKind::BoundedApproval,
        }
    }

    pub fn check_validity(&self) -> bool {
        match self {
            Ballot::Approval(_) => true,
            Ballot::Ordinal(b) => b.check_validity(),
            Ballot::Cardinal(b) => b.check_validity(),
            Ballot::BoundedApproval(b) => b.check_validity(),
        }
    }

    pub fn involved_candidates(&self) -> BTreeSet<CandidateId> {
        match self {
            Ballot::Approval(b) => b.approved.clone(),
            Ballot::Ordinal(b) => b.order.iter().cloned().collect(),
            Ballot::Cardinal(b) => b.ratings.keys().cloned().collect(),
            Ballot::BoundedApproval(b) => b
                .groups
                .iter()
                .flat_map(|(_, bs)| bs.members().iter().cloned())
                .collect(),
        }
    }

    /// The raw form of this ballot, for storage. Parsing it gives back the same ballot.
    pub fn to_payload(&self) -> BallotPayload {
        match self {
            Ballot::Approval(b) => BallotPayload::Approval {
                app_candidates: b.approved.iter().cloned().collect(),
            },
            Ballot::Ordinal(b) => BallotPayload::Ordinal {
                order: b.order.clone(),
            },
            Ballot::Cardinal(b) => BallotPayload::Cardinal {
                ratings: b.ratings.clone(),
            },
            Ballot::BoundedApproval(b) => {
                let mut sets = BTreeMap::new();
                let mut bounds = BTreeMap::new();
                for (label, bs) in b.groups.iter() {
                    let (l, s, u) = bs.bounds();
                    sets.insert(label.clone(), bs.members().iter().cloned().collect());
                    bounds.insert(label.clone(), vec![l as i64, s as i64, u as i64]);
                }
                BallotPayload::BoundedApproval { sets, bounds }
            }
        }
    }
}

fn read_bound(label: &str, bound: &[i64]) -> Result<(u32, u32, u32), VotingError> {
    let conv = |x: i64| {
        u32::try_from(x).map_err(|_| VotingError::Validation {
            message: format!("bound {} of group {:?} is not a valid count", x, label),
        })
    };
    match bound {
        [l, s, u] => Ok((conv(*l)?, conv(*s)?, conv(*u)?)),
        _ => Err(VotingError::Validation {
            message: format!(
                "group {:?} needs 3 bounds (lower, saturation, upper), found {}",
                label,
                bound.len()
            ),
        }),
    }
}
