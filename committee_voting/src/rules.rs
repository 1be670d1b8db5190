use itertools::Itertools;
use log::{debug, info};
use std::collections::HashMap;

use crate::ballot::{Ballot, BoundedApprovalBallot};
use crate::config::*;
use crate::scored_subset::ScoredSubset;

// **** Private structures ****

// Position of a candidate in the registration order of the election.
type CandidateIdx = usize;

// Maps the candidate ids to their canonical index.
struct CandidateIndex<'a> {
    candidates: &'a [Candidate],
    by_id: HashMap<&'a CandidateId, CandidateIdx>,
}

impl<'a> CandidateIndex<'a> {
    fn new(candidates: &'a [Candidate]) -> CandidateIndex<'a> {
        CandidateIndex {
            candidates,
            by_id: candidates
                .iter()
                .enumerate()
                .map(|(idx, c)| (&c.id, idx))
                .collect(),
        }
    }

    fn len(&self) -> usize {
        self.candidates.len()
    }

    fn get(&self, cid: &CandidateId) -> Option<CandidateIdx> {
        self.by_id.get(cid).copied()
    }

    fn id(&self, idx: CandidateIdx) -> CandidateId {
        self.candidates[idx].id.clone()
    }

    fn membership<'b, I>(&self, cids: I) -> Vec<bool>
    where
        I: IntoIterator<Item = &'b CandidateId>,
    {
        let mut res = vec![false; self.len()];
        for idx in cids.into_iter().filter_map(|cid| self.get(cid)) {
            res[idx] = true;
        }
        res
    }

    // 1-based rank of each candidate in an ordinal ballot.
    fn positions(&self, order: &[CandidateId]) -> Vec<Option<usize>> {
        let mut res = vec![None; self.len()];
        for (rank, cid) in order.iter().enumerate() {
            if let Some(idx) = self.get(cid) {
                res[idx] = Some(rank + 1);
            }
        }
        res
    }

    // The ranking restricted to registered candidates, as indices.
    fn ranking(&self, order: &[CandidateId]) -> Vec<CandidateIdx> {
        order.iter().filter_map(|cid| self.get(cid)).collect()
    }

    fn to_ids(&self, idxs: &[CandidateIdx]) -> Vec<CandidateId> {
        let mut sorted = idxs.to_vec();
        sorted.sort_unstable();
        sorted.into_iter().map(|idx| self.id(idx)).collect()
    }
}

struct BoundedGroup<'a> {
    members: Vec<bool>,
    subset: &'a ScoredSubset,
}

/// The Droop quota: `floor(ballots / (K + 1)) + 1`.
pub fn droop_quota(num_ballots: usize, committee_size: usize) -> u64 {
    (num_ballots / (committee_size + 1)) as u64 + 1
}

/// `H(m) = 1 + 1/2 + ... + 1/m`
pub fn harmonic(m: usize) -> f64 {
    (1..=m).map(|i| 1.0 / i as f64).sum()
}

/// Runs the rule and returns the winning committee with its statistics.
///
/// Arguments:
/// * `rule` the rule of the election
/// * `candidates` the registered candidates. Their order breaks every tie.
/// * `ballots` the admitted ballots. Ballots of another kind than the one the rule
/// expects are skipped.
/// * `committee_size` the number of seats
///
/// Without ballots, the committee is empty.
pub fn compute_winners(
    rule: RuleKind,
    candidates: &[Candidate],
    ballots: &[Ballot],
    committee_size: usize,
) -> VotingResult {
    info!(
        "compute_winners: rule {}, {} candidates, {} ballots, committee size {}",
        rule,
        candidates.len(),
        ballots.len(),
        committee_size
    );
    if ballots.is_empty() {
        debug!("compute_winners: no ballots, no winners");
        return VotingResult::empty(rule);
    }
    let index = CandidateIndex::new(candidates);

    let result = match rule {
        RuleKind::Approval
        | RuleKind::Sav
        | RuleKind::Borda
        | RuleKind::Utilitarian
        | RuleKind::Copeland => {
            let scores = candidate_scores_idx(rule, &index, ballots);
            let picked = select_top_k(&scores, committee_size);
            VotingResult {
                winners: index.to_ids(&picked),
                tally: scores
                    .iter()
                    .enumerate()
                    .map(|(idx, s)| (index.id(idx), *s))
                    .collect(),
                ..VotingResult::empty(rule)
            }
        }
        RuleKind::Pav | RuleKind::BoundedApproval | RuleKind::BordaCc => {
            let scorer = committee_scorer(rule, &index, ballots);
            match best_committee(index.len(), committee_size, scorer) {
                Some((committee, score)) => VotingResult {
                    winners: index.to_ids(&committee),
                    committee_score: Some(score),
                    ..VotingResult::empty(rule)
                },
                None => VotingResult::empty(rule),
            }
        }
        RuleKind::Stv => run_stv(&index, ballots, committee_size),
    };
    info!("compute_winners: rule {}: winners {:?}", rule, result.winners);
    result
}

/// Per-candidate scores, in registration order, for the rules that rank candidates
/// one by one. `None` for the rules that score committees or run rounds.
pub fn candidate_scores(
    rule: RuleKind,
    candidates: &[Candidate],
    ballots: &[Ballot],
) -> Option<Vec<(CandidateId, f64)>> {
    match rule {
        RuleKind::Approval
        | RuleKind::Sav
        | RuleKind::Borda
        | RuleKind::Utilitarian
        | RuleKind::Copeland => {
            let index = CandidateIndex::new(candidates);
            let scores = candidate_scores_idx(rule, &index, ballots);
            Some(
                scores
                    .into_iter()
                    .enumerate()
                    .map(|(idx, s)| (index.id(idx), s))
                    .collect(),
            )
        }
        RuleKind::Pav | RuleKind::BoundedApproval | RuleKind::BordaCc | RuleKind::Stv => None,
    }
}

/// The score of one committee, for the rules that score committees.
/// Committee members that are not registered candidates are ignored.
pub fn committee_score(
    rule: RuleKind,
    candidates: &[Candidate],
    ballots: &[Ballot],
    committee: &[CandidateId],
) -> Option<f64> {
    if !rule.is_exhaustive() {
        return None;
    }
    let index = CandidateIndex::new(candidates);
    let members: Vec<CandidateIdx> = committee
        .iter()
        .filter_map(|cid| index.get(cid))
        .unique()
        .collect();
    let scorer = committee_scorer(rule, &index, ballots);
    Some(scorer(members.as_slice()))
}

fn candidate_scores_idx(rule: RuleKind, index: &CandidateIndex, ballots: &[Ballot]) -> Vec<f64> {
    let n = index.len();
    let mut scores = vec![0.0; n];
    match rule {
        RuleKind::Approval | RuleKind::Sav => {
            for b in ballots.iter() {
                if let Ballot::Approval(ab) = b {
                    // SAV splits one point between all the approved candidates.
                    let weight = match rule {
                        RuleKind::Sav => 1.0 / ab.approved().len() as f64,
                        _ => 1.0,
                    };
                    for idx in ab.approved().iter().filter_map(|cid| index.get(cid)) {
                        scores[idx] += weight;
                    }
                }
            }
        }
        RuleKind::Borda => {
            for b in ballots.iter() {
                if let Ballot::Ordinal(ob) = b {
                    for (idx, pos) in index.positions(ob.order()).iter().enumerate() {
                        scores[idx] += borda_points(n, *pos);
                    }
                }
            }
        }
        RuleKind::Utilitarian => {
            for b in ballots.iter() {
                if let Ballot::Cardinal(cb) = b {
                    for (idx, c) in index.candidates.iter().enumerate() {
                        scores[idx] += cb.utility_for(&c.id) as f64;
                    }
                }
            }
        }
        RuleKind::Copeland => {
            scores = copeland_scores(index, ballots);
        }
        RuleKind::Pav | RuleKind::BoundedApproval | RuleKind::BordaCc | RuleKind::Stv => {
            unreachable!("candidate_scores_idx: {} scores committees", rule)
        }
    }
    debug!("candidate_scores: rule {}: {:?}", rule, scores);
    scores
}

// Points of a candidate at this (1-based) position among n candidates.
fn borda_points(n: usize, pos: Option<usize>) -> f64 {
    match pos {
        Some(p) => n.saturating_sub(p) as f64,
        None => 0.0,
    }
}

// Net pairwise wins: +1 for every candidate beaten by a strict majority of the
// ballots ranking both, -1 for every candidate that wins against this one.
fn copeland_scores(index: &CandidateIndex, ballots: &[Ballot]) -> Vec<f64> {
    let n = index.len();
    // wins[a][b]: the number of ballots that rank a above b
    let mut wins = vec![vec![0u64; n]; n];
    for ballot in ballots.iter() {
        if let Ballot::Ordinal(ob) = ballot {
            let positions = index.positions(ob.order());
            for (a, b) in (0..n).tuple_combinations() {
                match (positions[a], positions[b]) {
                    (Some(pa), Some(pb)) if pa < pb => wins[a][b] += 1,
                    (Some(_), Some(_)) => wins[b][a] += 1,
                    _ => {}
                }
            }
        }
    }
    let mut scores = vec![0.0; n];
    for (a, b) in (0..n).tuple_combinations() {
        match wins[a][b].cmp(&wins[b][a]) {
            std::cmp::Ordering::Greater => {
                scores[a] += 1.0;
                scores[b] -= 1.0;
            }
            std::cmp::Ordering::Less => {
                scores[a] -= 1.0;
                scores[b] += 1.0;
            }
            std::cmp::Ordering::Equal => {}
        }
    }
    scores
}

/// Takes the best remaining candidate K times. On equal scores the first candidate
/// in registration order wins.
fn select_top_k(scores: &[f64], committee_size: usize) -> Vec<CandidateIdx> {
    let mut still_running: Vec<bool> = vec![true; scores.len()];
    let mut picked: Vec<CandidateIdx> = Vec::new();
    for _ in 0..committee_size {
        let best = (0..scores.len())
            .filter(|idx| still_running[*idx])
            .fold(None, |best: Option<CandidateIdx>, idx| match best {
                Some(b) if scores[b] >= scores[idx] => Some(b),
                _ => Some(idx),
            });
        match best {
            Some(b) => {
                debug!("select_top_k: picking {} with score {}", b, scores[b]);
                still_running[b] = false;
                picked.push(b);
            }
            None => break,
        }
    }
    picked
}

type CommitteeScorer<'a> = Box<dyn Fn(&[CandidateIdx]) -> f64 + 'a>;

fn committee_scorer<'a>(
    rule: RuleKind,
    index: &CandidateIndex,
    ballots: &'a [Ballot],
) -> CommitteeScorer<'a> {
    let n = index.len();
    match rule {
        RuleKind::Pav => {
            let approvals: Vec<Vec<bool>> = ballots
                .iter()
                .filter_map(|b| match b {
                    Ballot::Approval(ab) => Some(index.membership(ab.approved())),
                    _ => None,
                })
                .collect();
            let harmonics: Vec<f64> = (0..=n).map(harmonic).collect();
            Box::new(move |committee: &[CandidateIdx]| {
                approvals
                    .iter()
                    .map(|approved| {
                        let m = committee.iter().filter(|idx| approved[**idx]).count();
                        harmonics[m]
                    })
                    .sum()
            })
        }
        RuleKind::BoundedApproval => {
            let groups: Vec<Vec<BoundedGroup<'a>>> = ballots
                .iter()
                .filter_map(|b| match b {
                    Ballot::BoundedApproval(bb) => Some(bounded_groups(index, bb)),
                    _ => None,
                })
                .collect();
            Box::new(move |committee: &[CandidateIdx]| {
                groups
                    .iter()
                    .flat_map(|ballot_groups| ballot_groups.iter())
                    .map(|g| {
                        let x = committee.iter().filter(|idx| g.members[**idx]).count();
                        g.subset.contribution(x)
                    })
                    .sum()
            })
        }
        RuleKind::BordaCc => {
            let positions: Vec<Vec<Option<usize>>> = ballots
                .iter()
                .filter_map(|b| match b {
                    Ballot::Ordinal(ob) => Some(index.positions(ob.order())),
                    _ => None,
                })
                .collect();
            // Each ballot counts its best-placed committee member.
            Box::new(move |committee: &[CandidateIdx]| {
                positions
                    .iter()
                    .map(|pos| {
                        committee
                            .iter()
                            .map(|idx| borda_points(n, pos[*idx]))
                            .fold(0.0, f64::max)
                    })
                    .sum()
            })
        }
        _ => unreachable!("committee_scorer: {} does not score committees", rule),
    }
}

fn bounded_groups<'a>(index: &CandidateIndex, ballot: &'a BoundedApprovalBallot) -> Vec<BoundedGroup<'a>> {
    ballot
        .groups()
        .iter()
        .map(|(_, subset)| BoundedGroup {
            members: index.membership(subset.members()),
            subset,
        })
        .collect()
}

/// Scores every committee of the given size, in lexicographic order of the
/// registration indices, and keeps the first one with the strictly best score.
fn best_committee(
    num_candidates: usize,
    committee_size: usize,
    scorer: CommitteeScorer,
) -> Option<(Vec<CandidateIdx>, f64)> {
    let mut best: Option<(Vec<CandidateIdx>, f64)> = None;
    let mut num_committees: u64 = 0;
    for committee in (0..num_candidates).combinations(committee_size) {
        num_committees += 1;
        let score = scorer(committee.as_slice());
        let improves = match &best {
            Some((_, best_score)) => score > *best_score,
            None => true,
        };
        if improves {
            debug!("best_committee: {:?} improves to {}", committee, score);
            best = Some((committee, score));
        }
    }
    debug!("best_committee: scored {} committees", num_committees);
    best
}

/// Single transferable vote with a Droop quota.
///
/// Surplus handling is simplified: the ballots that elected a candidate keep the
/// fraction `(score - quota) / score` of their weight for the next rounds, but that
/// weight is not handed to their next preference within the round.
fn run_stv(index: &CandidateIndex, ballots: &[Ballot], committee_size: usize) -> VotingResult {
    let rankings: Vec<Vec<CandidateIdx>> = ballots
        .iter()
        .filter_map(|b| match b {
            Ballot::Ordinal(ob) => Some(index.ranking(ob.order())),
            _ => None,
        })
        .collect();
    let quota = droop_quota(rankings.len(), committee_size);
    let quota_f = quota as f64;
    info!("run_stv: {} ballots, quota {}", rankings.len(), quota);

    let mut weights: Vec<f64> = vec![1.0; rankings.len()];
    // Kept in registration order.
    let mut remaining: Vec<CandidateIdx> = (0..index.len()).collect();
    let mut committee: Vec<CandidateIdx> = Vec::new();
    let mut round_stats: Vec<RoundStats> = Vec::new();

    while committee.len() < committee_size && !remaining.is_empty() {
        let total_weight: f64 = weights.iter().sum();
        if total_weight < quota_f {
            debug!(
                "run_stv: remaining weight {} is below the quota, stopping",
                total_weight
            );
            break;
        }
        let round_id = (round_stats.len() + 1) as u32;

        // Current first preference of every ballot among the remaining candidates.
        let firsts: Vec<Option<CandidateIdx>> = rankings
            .iter()
            .map(|r| r.iter().find(|idx| remaining.contains(idx)).copied())
            .collect();
        let mut tally: HashMap<CandidateIdx, f64> = remaining.iter().map(|idx| (*idx, 0.0)).collect();
        for (first, w) in firsts.iter().zip(weights.iter()) {
            if let Some(idx) = first {
                if let Some(t) = tally.get_mut(idx) {
                    *t += *w;
                }
            }
        }
        let score_of = |idx: &CandidateIdx| tally.get(idx).copied().unwrap_or(0.0);

        let mut winner = remaining[0];
        let mut loser = remaining[0];
        for idx in remaining.iter() {
            if score_of(idx) > score_of(&winner) {
                winner = *idx;
            }
            if score_of(idx) < score_of(&loser) {
                loser = *idx;
            }
        }
        let win_score = score_of(&winner);
        debug!(
            "run_stv: round {}: best {} with {}, worst {} with {}",
            round_id,
            winner,
            win_score,
            loser,
            score_of(&loser)
        );

        let mut stats = RoundStats {
            round: round_id,
            tally: remaining
                .iter()
                .map(|idx| (index.id(*idx), score_of(idx)))
                .collect(),
            elected: None,
            eliminated: None,
        };

        if win_score >= quota_f {
            let keep = (win_score - quota_f) / win_score;
            for (first, w) in firsts.iter().zip(weights.iter_mut()) {
                if *first == Some(winner) {
                    *w *= keep;
                }
            }
            committee.push(winner);
            remaining.retain(|idx| *idx != winner);
            stats.elected = Some(index.id(winner));
        } else {
            remaining.retain(|idx| *idx != loser);
            stats.eliminated = Some(index.id(loser));
        }
        round_stats.push(stats);
    }

    if committee.len() < committee_size {
        info!(
            "run_stv: only {} of {} seats filled",
            committee.len(),
            committee_size
        );
    }

    VotingResult {
        winners: index.to_ids(&committee),
        threshold: Some(quota),
        round_stats,
        ..VotingResult::empty(RuleKind::Stv)
    }
}
