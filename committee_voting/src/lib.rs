/*!
Evaluation engine for committee elections: a fixed set of candidates, a committee
size K and ballots of one shape, from which a rule selects K winners.

The supported rules are Approval, SAV, PAV, bounded approval, Borda, BordaCC,
STV, utilitarian and Copeland voting. See the [manual] for the ballot formats and
the description of each rule.

```
use committee_voting::*;

let candidates = vec![
    Candidate::new("1", "Anna"),
    Candidate::new("2", "Bob"),
    Candidate::new("3", "Clara"),
];
let mut election = Election::new(
    ElectionId(1),
    "alice",
    "Board election",
    "",
    candidates,
    2,
    RuleKind::Pav,
    &ElectionLimits::DEFAULT_LIMITS,
)?;
election.add_ballot(Ballot::Approval(ApprovalBallot::new(["1", "2"])))?;
election.add_ballot(Ballot::Approval(ApprovalBallot::new(["3"])))?;
let result = election.recompute_winners();
assert_eq!(result.winners, vec![CandidateId::from("1"), CandidateId::from("3")]);
# Ok::<(), VotingError>(())
```
*/

mod ballot;
mod config;
mod election;
mod rules;
mod scored_subset;
mod search;
mod store;

pub mod builder;
pub mod manual;

pub use crate::ballot::{
    ApprovalBallot, Ballot, BallotPayload, BoundedApprovalBallot, CardinalBallot, OrdinalBallot,
};
pub use crate::config::*;
pub use crate::election::{Election, ElectionRecord};
pub use crate::rules::{candidate_scores, committee_score, compute_winners, droop_quota, harmonic};
pub use crate::scored_subset::ScoredSubset;
pub use crate::search::{search, search_relevance, ID_MATCH_RELEVANCE};
pub use crate::store::{ElectionStore, TRENDING_COUNT};
