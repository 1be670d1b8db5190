use log::debug;
use std::collections::BTreeSet;

use crate::config::*;
use crate::election::Election;

// Words shorter than this carry no meaning for the search.
const MIN_KEYWORD_LEN: usize = 4;

/// Relevance of a query that names the election id.
pub const ID_MATCH_RELEVANCE: u32 = 100;

fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_KEYWORD_LEN)
        .map(|w| w.to_string())
        .collect()
}

/// The keywords of an election: the long words of its title, description and id,
/// plus the whole lower-cased title.
pub(crate) fn build_keywords(title: &str, description: &str, id: ElectionId) -> BTreeSet<String> {
    let mut keywords = tokenize(&format!("{} {} {}", title, description, id));
    keywords.insert(title.to_lowercase());
    keywords
}

// Relevance against an already lower-cased query and its words.
fn relevance(election: &Election, query: &str, words: &BTreeSet<String>) -> u32 {
    if query.trim() == election.id().to_string() {
        return ID_MATCH_RELEVANCE;
    }
    words.intersection(election.keywords()).count() as u32
}

/// How well an election matches a query.
///
/// A query equal to the election id scores `ID_MATCH_RELEVANCE`. Otherwise the
/// score is the number of query words found in the election keywords. A query
/// without any word of at least 4 characters is rejected.
pub fn search_relevance(election: &Election, query: &str) -> Result<u32, VotingError> {
    let query = query.to_lowercase();
    let words = tokenize(&query);
    let res = relevance(election, &query, &words);
    if res == 0 && words.is_empty() {
        return Err(VotingError::EmptyQuery {});
    }
    Ok(res)
}

/// Orders the elections matching a query, most relevant first.
///
/// Elections with no common keyword are left out. Elections with the same
/// relevance keep the order in which they were given. A query made only of
/// short words is rejected unless it names one of the elections.
pub fn search<'a, I>(
    elections: I,
    query: &str,
    limits: &ElectionLimits,
) -> Result<Vec<&'a Election>, VotingError>
where
    I: IntoIterator<Item = &'a Election>,
{
    let len = query.chars().count();
    if len > limits.max_query_len {
        return Err(VotingError::QueryTooLong {
            len,
            max: limits.max_query_len,
        });
    }
    let query = query.to_lowercase();
    let words = tokenize(&query);
    let mut scored: Vec<(u32, &Election)> = elections
        .into_iter()
        .map(|e| (relevance(e, &query, &words), e))
        .filter(|(r, _)| *r > 0)
        .collect();
    if scored.is_empty() && words.is_empty() {
        return Err(VotingError::EmptyQuery {});
    }
    // Stable: equal relevance keeps the source order.
    scored.sort_by(|(r1, _), (r2, _)| r2.cmp(r1));
    debug!("search: {:?} matched {} elections", query, scored.len());
    Ok(scored.into_iter().map(|(_, e)| e).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food_election() -> Election {
        Election::new(
            ElectionId(42),
            "owner",
            "This Year Food Selection: What should be served?",
            "You decide on Food: Banana, or Fish? Döner?",
            vec![Candidate::new("1", "a"), Candidate::new("2", "b")],
            1,
            RuleKind::Approval,
            &ElectionLimits::DEFAULT_LIMITS,
        )
        .unwrap()
    }

    fn titled(id: u64, title: &str, description: &str) -> Election {
        let candidates = ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, n)| Candidate::new((i + 1).to_string(), *n))
            .collect();
        Election::new(
            ElectionId(id),
            "owner",
            title,
            description,
            candidates,
            2,
            RuleKind::Approval,
            &ElectionLimits::DEFAULT_LIMITS,
        )
        .unwrap()
    }

    #[test]
    fn relevance_counts_common_keywords() {
        let e = food_election();
        assert_eq!(e.search_relevance("Food"), Ok(1));
        assert_eq!(e.search_relevance("fOod"), Ok(1));
        assert_eq!(e.search_relevance("Food Selection?"), Ok(2));
        assert_eq!(e.search_relevance("You be or Banana"), Ok(1));
        assert_eq!(e.search_relevance("Apple"), Ok(0));
        assert_eq!(e.search_relevance("döner"), Ok(1));
        assert_eq!(
            e.search_relevance("What should be served? Banana or Fish?"),
            Ok(5)
        );
    }

    #[test]
    fn relevance_of_the_id() {
        let e = food_election();
        assert_eq!(e.search_relevance("42"), Ok(ID_MATCH_RELEVANCE));
    }

    #[test]
    fn short_words_only_is_an_empty_query() {
        let e = food_election();
        assert_eq!(e.search_relevance("be"), Err(VotingError::EmptyQuery {}));
        assert_eq!(e.search_relevance("?!"), Err(VotingError::EmptyQuery {}));
    }

    #[test]
    fn full_title_is_a_keyword() {
        let e = food_election();
        assert!(e
            .keywords()
            .contains("this year food selection: what should be served?"));
        assert!(!e.keywords().contains("year "));
        assert!(e.keywords().contains("year"));
    }

    #[test]
    fn search_orders_by_relevance() {
        let e1 = titled(
            1,
            "Test Election Major 2023",
            "A test election for who will become major!",
        );
        let e2 = titled(2, "Election Junior", "Who will become junior in our test?");
        let e3 = titled(3, "Is Gollum an animal?", "New date received: DNA Test positive!");
        let e4 = titled(4, "What to take on mars", "New Mars mission!");
        let all = vec![e1, e2, e3, e4];
        let res = search(&all, "Major test election", &ElectionLimits::DEFAULT_LIMITS).unwrap();
        let ids: Vec<ElectionId> = res.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![ElectionId(1), ElectionId(2), ElectionId(3)]);
    }

    #[test]
    fn search_ties_keep_source_order() {
        let all = vec![
            titled(43, "Food for lunch", ""),
            titled(42, "Food for dinner", ""),
        ];
        let res = search(&all, "food", &ElectionLimits::DEFAULT_LIMITS).unwrap();
        let ids: Vec<ElectionId> = res.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![ElectionId(43), ElectionId(42)]);
        let res = search(&all, "42", &ElectionLimits::DEFAULT_LIMITS).unwrap();
        let ids: Vec<ElectionId> = res.iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![ElectionId(42)]);
        assert!(matches!(
            search(&all, "7", &ElectionLimits::DEFAULT_LIMITS),
            Err(VotingError::EmptyQuery {})
        ));
    }

    #[test]
    fn long_queries_are_rejected() {
        let all = vec![food_election()];
        let query = "food ".repeat(13);
        assert!(matches!(
            search(&all, &query, &ElectionLimits::DEFAULT_LIMITS),
            Err(VotingError::QueryTooLong { len: 65, max: 60 })
        ));
    }
}
