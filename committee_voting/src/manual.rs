/*!

This is the long-form manual for `committee_voting` and `comvote`.

## Elections

An election has a title (3 to 60 characters), a description (at most 500
characters), a list of candidates (at most 12, names of 1 to 30 characters), a
committee size K with `1 <= K < number of candidates`, and a rule.

The creation payload only names the candidates. They receive the ids `"1"`,
`"2"`, ... in the order of the list, and this order breaks every tie.

```text
{
  "title": "Board 2024",
  "description": "Pick two members",
  "candidate_names": ["Anna", "Bob", "Clara", "Dan"],
  "committee_size": 2,
  "rule_kind": "pavElection"
}
```

All the limits are in `ElectionLimits::DEFAULT_LIMITS` and can be changed.

## Ballot formats

A ballot is a JSON object whose `type` field gives its kind. Each rule accepts
one kind only.

### `approvalBallot`

The set of approved candidates.

```text
{ "type": "approvalBallot", "app_candidates": ["1", "3"] }
```

### `ordinalBallot`

A ranking, most preferred first. No candidate may appear twice. The rules using
rankings require every ballot to rank all the candidates.

```text
{ "type": "ordinalBallot", "order": ["3", "1", "2", "4"] }
```

### `cardinalBallot`

A utility between -10 and 10 for some candidates. Unrated candidates count as 0.

```text
{ "type": "cardinalBallot", "ratings": { "1": 5, "2": -3 } }
```

### `boundedApprovalBallot`

Labelled groups of candidates, each with a triple `[lower, saturation, upper]`.
The groups must not share candidates and each triple must satisfy
`lower <= saturation <= upper` with at least `lower` members in the group.

```text
{
  "type": "boundedApprovalBallot",
  "sets": { "left": ["1", "2", "3"], "right": ["4", "5"] },
  "bounds": { "left": [1, 2, 3], "right": [1, 1, 2] }
}
```

If a committee holds `x` members of a group, the group adds `phi(x) * x` to the
score of the ballot, where `phi(x)` is 1 for `lower <= x <= saturation`,
`saturation / x` for `saturation < x <= upper` and 0 otherwise.

## Rules

| Rule kind                 | Ballot                  | Method                                            |
|---------------------------|-------------------------|---------------------------------------------------|
| `approvalElection`        | `approvalBallot`        | K candidates with the most approvals              |
| `savElection`             | `approvalBallot`        | each ballot splits one point between its approvals|
| `pavElection`             | `approvalBallot`        | best committee for the harmonic score H(x)        |
| `boundedApprovalElection` | `boundedApprovalBallot` | best committee for the sum of the ballot scores   |
| `bordaElection`           | `ordinalBallot`         | K candidates with the most Borda points (n - pos) |
| `bordaCCElection`         | `ordinalBallot`         | best committee for the best Borda points per ballot |
| `stvElection`             | `ordinalBallot`         | rounds of weighted plurality with a Droop quota   |
| `utilitarianElection`     | `cardinalBallot`        | K candidates with the highest sum of utilities    |
| `copelandElection`        | `ordinalBallot`         | K candidates with the most pairwise wins minus losses |

The rules searching the best committee look at all the `C(n, K)` committees,
which is why the number of candidates is kept small.

STV computes the quota `floor(ballots / (K + 1)) + 1`. In each round, every
ballot gives its weight to its first remaining candidate. A candidate reaching
the quota is elected and the ballots that chose it keep the fraction
`(score - quota) / score` of their weight. Otherwise the candidate with the
lowest score is eliminated. The rounds stop when K candidates are elected, when
no candidate remains, or when the remaining weight is below the quota, in which
case the committee is smaller than K.

An election without ballots has an empty committee.

## Search

Elections are found by keywords: the words of at least 4 characters of the
title, the description and the id, plus the whole title. The relevance of a
query is the number of its words found in the keywords, or 100 when the query
is the id of the election. Queries are at most 60 characters long.

## `comvote`

`comvote --input <file> [--input-type poll|records] [--out <file|stdout>] [--reference <file>] [--verbose]`

With `--input-type poll` (the default), the input is a creation payload with a
`ballots` array. Each ballot may carry a `count` field for that many identical
ballots. Ballots the election refuses are skipped and counted in the summary.
An optional `limits` object replaces the default limits.

```text
{
  "title": "Board 2024",
  "candidate_names": ["Anna", "Bob", "Clara", "Dan"],
  "committee_size": 2,
  "rule_kind": "approvalElection",
  "ballots": [
    { "type": "approvalBallot", "app_candidates": ["1", "3"], "count": 3 },
    { "type": "approvalBallot", "app_candidates": ["2", "3"] }
  ]
}
```

With `--input-type records`, the input is a list of stored elections as written
by `ElectionStore::records`, and every election is evaluated.

The summary is written in JSON. If a reference summary is given, `comvote`
prints the differences and fails when the two do not match.

 */
