use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::ballot::{Ballot, BallotPayload};
use crate::config::*;
use crate::rules;
use crate::search;

/// One election: a fixed candidate list, a rule and the ballots cast so far.
///
/// The candidate order given at creation is the canonical order. Every tie
/// between candidates or committees is broken in favour of the earliest one in
/// that order, which keeps the outcome reproducible.
#[derive(Debug, Clone)]
pub struct Election {
    id: ElectionId,
    owner: String,
    title: String,
    description: String,
    candidates: Vec<Candidate>,
    committee_size: usize,
    rule: RuleKind,
    stopped: bool,
    vote_count: u64,
    ballots: Vec<Ballot>,
    keywords: BTreeSet<String>,
    // Dropped every time a ballot is admitted.
    cached_result: Option<VotingResult>,
}

/// The stored form of an election. Winners are not part of it; they are
/// recomputed from the ballots.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionRecord {
    pub id: ElectionId,
    pub owner: String,
    pub title: String,
    pub description: String,
    pub candidates: Vec<Candidate>,
    pub committee_size: usize,
    pub rule_kind: RuleKind,
    pub is_stopped: bool,
    pub votecount: u64,
    pub ballots: Vec<BallotPayload>,
}

impl Election {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ElectionId,
        owner: &str,
        title: &str,
        description: &str,
        candidates: Vec<Candidate>,
        committee_size: usize,
        rule: RuleKind,
        limits: &ElectionLimits,
    ) -> Result<Election, VotingError> {
        check_fields(title, description, &candidates, committee_size, limits)?;
        let keywords = search::build_keywords(title, description, id);
        info!(
            "Election {}: {:?} with {} candidates, committee size {}, rule {}",
            id,
            title,
            candidates.len(),
            committee_size,
            rule
        );
        Ok(Election {
            id,
            owner: owner.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            candidates,
            committee_size,
            rule,
            stopped: false,
            vote_count: 0,
            ballots: Vec::new(),
            keywords,
            cached_result: None,
        })
    }

    pub fn id(&self) -> ElectionId {
        self.id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn committee_size(&self) -> usize {
        self.committee_size
    }

    pub fn rule(&self) -> RuleKind {
        self.rule
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn vote_count(&self) -> u64 {
        self.vote_count
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }

    pub fn keywords(&self) -> &BTreeSet<String> {
        &self.keywords
    }

    pub fn is_candidate(&self, cid: &CandidateId) -> bool {
        self.candidates.iter().any(|c| c.id == *cid)
    }

    /// Admits a ballot.
    ///
    /// All the checks run before anything is written: on error the ballots and the
    /// vote count are exactly as they were.
    pub fn add_ballot(&mut self, ballot: Ballot) -> Result<(), VotingError> {
        if self.stopped {
            warn!("add_ballot: election {} is stopped", self.id);
            return Err(VotingError::ElectionStopped {});
        }
        self.check_admission(&ballot)?;
        self.ballots.push(ballot);
        self.vote_count += 1;
        self.cached_result = None;
        debug!(
            "add_ballot: election {} now has {} votes",
            self.id, self.vote_count
        );
        Ok(())
    }

    pub fn add_ballot_json(&mut self, js: &serde_json::Value) -> Result<(), VotingError> {
        let ballot = Ballot::from_json(js)?;
        self.add_ballot(ballot)
    }

    fn check_admission(&self, ballot: &Ballot) -> Result<(), VotingError> {
        let expected = self.rule.ballot_kind();
        if ballot.kind() != expected {
            warn!(
                "add_ballot: election {} expects {}, got {}",
                self.id,
                expected,
                ballot.kind()
            );
            return Err(VotingError::KindMismatch {
                expected,
                actual: ballot.kind(),
            });
        }
        let involved = ballot.involved_candidates();
        if let Some(cid) = involved.iter().find(|cid| !self.is_candidate(cid)) {
            warn!("add_ballot: election {}: unknown candidate {}", self.id, cid);
            return Err(VotingError::CandidateMismatch {
                candidate: cid.clone(),
            });
        }
        if !ballot.check_validity() {
            return Err(VotingError::Validation {
                message: "the ballot doesn't seem to be valid".to_string(),
            });
        }
        if self.rule.requires_complete_ranking() && involved.len() != self.candidates.len() {
            return Err(VotingError::Validation {
                message: format!(
                    "the ranking must contain all {} candidates, found {}",
                    self.candidates.len(),
                    involved.len()
                ),
            });
        }
        Ok(())
    }

    /// Prevents further votes from being submitted.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    /// Allows votes to be submitted again.
    pub fn restart(&mut self) {
        self.stopped = false;
    }

    /// Runs the election rule over the current ballots.
    ///
    /// The result is kept until the next ballot is admitted. Calling it again
    /// without new ballots gives the same winners.
    pub fn recompute_winners(&mut self) -> &VotingResult {
        let result = rules::compute_winners(
            self.rule,
            &self.candidates,
            &self.ballots,
            self.committee_size,
        );
        info!(
            "Election {}: winners {:?} after {} ballots",
            self.id,
            result.winners,
            self.ballots.len()
        );
        self.cached_result.insert(result)
    }

    /// Same as `recompute_winners` but only runs the rule when no result is cached.
    pub fn evaluate(&mut self) -> &VotingResult {
        let (rule, committee_size) = (self.rule, self.committee_size);
        let (candidates, ballots) = (&self.candidates, &self.ballots);
        self.cached_result
            .get_or_insert_with(|| rules::compute_winners(rule, candidates, ballots, committee_size))
    }

    pub fn current_result(&self) -> Option<&VotingResult> {
        self.cached_result.as_ref()
    }

    pub fn winners(&self) -> Option<&[CandidateId]> {
        self.cached_result.as_ref().map(|r| r.winners.as_slice())
    }

    pub fn search_relevance(&self, query: &str) -> Result<u32, VotingError> {
        search::search_relevance(self, query)
    }

    pub fn to_record(&self) -> ElectionRecord {
        ElectionRecord {
            id: self.id,
            owner: self.owner.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            candidates: self.candidates.clone(),
            committee_size: self.committee_size,
            rule_kind: self.rule,
            is_stopped: self.stopped,
            votecount: self.vote_count,
            ballots: self.ballots.iter().map(|b| b.to_payload()).collect(),
        }
    }

    /// Rebuilds an election. Every stored ballot goes through the same checks as a
    /// freshly submitted one.
    pub fn from_record(
        record: &ElectionRecord,
        limits: &ElectionLimits,
    ) -> Result<Election, VotingError> {
        let mut e = Election::new(
            record.id,
            &record.owner,
            &record.title,
            &record.description,
            record.candidates.clone(),
            record.committee_size,
            record.rule_kind,
            limits,
        )?;
        for payload in record.ballots.iter() {
            e.add_ballot(Ballot::parse(payload.clone())?)?;
        }
        if record.votecount < e.vote_count {
            return Err(VotingError::Validation {
                message: format!(
                    "vote count {} is lower than the {} stored ballots",
                    record.votecount, e.vote_count
                ),
            });
        }
        e.vote_count = record.votecount;
        e.stopped = record.is_stopped;
        debug!(
            "from_record: election {} restored with {} ballots",
            e.id,
            e.ballots.len()
        );
        Ok(e)
    }
}

fn check_fields(
    title: &str,
    description: &str,
    candidates: &[Candidate],
    committee_size: usize,
    limits: &ElectionLimits,
) -> Result<(), VotingError> {
    let invalid = |message: String| -> Result<(), VotingError> {
        Err(VotingError::Validation { message })
    };
    let title_len = title.chars().count();
    if title_len < limits.min_title_len {
        return invalid("Title is too short.".to_string());
    }
    if title_len > limits.max_title_len {
        return invalid("Title is too long.".to_string());
    }
    if description.chars().count() > limits.max_description_len {
        return invalid("Description is too long.".to_string());
    }
    if candidates.len() > limits.max_candidates {
        return invalid(format!(
            "Too many candidates: {} (at most {}).",
            candidates.len(),
            limits.max_candidates
        ));
    }
    let mut seen: HashSet<&CandidateId> = HashSet::new();
    for c in candidates.iter() {
        let name_len = c.name.chars().count();
        if name_len == 0 || name_len > limits.max_candidate_name_len {
            return invalid(format!("Candidate name has a bad length: {:?}.", c.name));
        }
        if !seen.insert(&c.id) {
            return invalid(format!("Candidate id {} is used twice.", c.id));
        }
    }
    if committee_size == 0 {
        return invalid("Committee size must be at least 1.".to_string());
    }
    if committee_size >= candidates.len() {
        return invalid("Committee size too large.".to_string());
    }
    if committee_size > limits.max_committee_size {
        return invalid(format!(
            "Committee size {} exceeds the limit of {}.",
            committee_size, limits.max_committee_size
        ));
    }
    Ok(())
}
