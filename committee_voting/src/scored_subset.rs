use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::CandidateId;

/// A group of candidates with a bound triple `(lower, saturation, upper)`.
///
/// A committee taking between `lower` and `saturation` members of the group gets full
/// credit for each of them. Above `saturation` the credit per member shrinks to
/// `saturation / x`, and outside `[lower, upper]` the group contributes nothing.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ScoredSubset {
    members: BTreeSet<CandidateId>,
    lower: u32,
    saturation: u32,
    upper: u32,
}

impl ScoredSubset {
    pub fn new<I>(lower: u32, saturation: u32, upper: u32, members: I) -> ScoredSubset
    where
        I: IntoIterator,
        I::Item: Into<CandidateId>,
    {
        ScoredSubset {
            members: members.into_iter().map(|c| c.into()).collect(),
            lower,
            saturation,
            upper,
        }
    }

    pub fn members(&self) -> &BTreeSet<CandidateId> {
        &self.members
    }

    pub fn bounds(&self) -> (u32, u32, u32) {
        (self.lower, self.saturation, self.upper)
    }

    pub fn contains(&self, cid: &CandidateId) -> bool {
        self.members.contains(cid)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_disjoint(&self, other: &ScoredSubset) -> bool {
        self.members.is_disjoint(&other.members)
    }

    /// The bounds are ordered and the group is large enough to reach `lower`.
    pub fn is_satisfiable(&self) -> bool {
        self.lower <= self.saturation
            && self.saturation <= self.upper
            && self.members.len() >= self.lower as usize
    }

    pub fn intersection_size<'a, I>(&self, committee: I) -> usize
    where
        I: IntoIterator<Item = &'a CandidateId>,
    {
        committee
            .into_iter()
            .filter(|cid| self.members.contains(*cid))
            .count()
    }

    pub fn phi(&self, intersect_size: usize) -> f64 {
        let x = intersect_size as u64;
        if x < self.lower as u64 || x > self.upper as u64 {
            return 0.0;
        }
        if x > self.saturation as u64 {
            return self.saturation as f64 / x as f64;
        }
        1.0
    }

    /// `phi(x) * x` where `x` is the number of members of the committee in this group.
    pub fn contribution(&self, intersect_size: usize) -> f64 {
        // Above saturation phi(x) * x is exactly the saturation.
        if intersect_size > self.saturation as usize && intersect_size <= self.upper as usize {
            return self.saturation as f64;
        }
        self.phi(intersect_size) * intersect_size as f64
    }

    pub fn score<'a, I>(&self, committee: I) -> f64
    where
        I: IntoIterator<Item = &'a CandidateId>,
    {
        self.contribution(self.intersection_size(committee))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<CandidateId> {
        names.iter().map(|n| CandidateId::from(*n)).collect()
    }

    #[test]
    fn phi_follows_the_bounds() {
        let bs = ScoredSubset::new(2, 3, 5, ["a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(bs.phi(bs.intersection_size(&ids(&["a"]))), 0.0);
        assert_eq!(bs.phi(bs.intersection_size(&ids(&["a", "c"]))), 1.0);
        assert_eq!(bs.phi(bs.intersection_size(&ids(&["a", "c", "e"]))), 1.0);
        assert_eq!(
            bs.phi(bs.intersection_size(&ids(&["a", "c", "e", "f"]))),
            3.0 / 4.0
        );
        assert_eq!(
            bs.phi(bs.intersection_size(&ids(&["a", "c", "e", "f", "g"]))),
            3.0 / 5.0
        );
        assert_eq!(
            bs.phi(bs.intersection_size(&ids(&["a", "c", "e", "f", "g", "b"]))),
            0.0
        );
    }

    #[test]
    fn phi_stays_in_unit_interval() {
        for lower in 0..4 {
            for saturation in lower..5 {
                for upper in saturation..6 {
                    let bs = ScoredSubset::new(lower, saturation, upper, ["a"]);
                    for x in 0..10 {
                        let p = bs.phi(x);
                        assert!((0.0..=1.0).contains(&p), "phi({}) = {} for {:?}", x, p, bs);
                    }
                }
            }
        }
    }

    #[test]
    fn intersections_ignore_outsiders() {
        let b1 = ScoredSubset::new(1, 3, 3, ["a", "b", "c"]);
        let b3 = ScoredSubset::new(1, 3, 4, ["e", "f", "g", "h"]);
        let s5 = ids(&["b", "d", "g", "h"]);
        assert!(b1.is_disjoint(&b3));
        assert_eq!(b1.intersection_size(&s5), 1);
        assert_eq!(b3.intersection_size(&s5), 2);
        assert_eq!(b3.score(&s5), 2.0);
    }

    #[test]
    fn duplicated_members_collapse() {
        let bs = ScoredSubset::new(1, 1, 2, ["a", "a", "b"]);
        assert_eq!(bs.len(), 2);
        assert!(bs.contains(&CandidateId::from("b")));
    }

    #[test]
    fn satisfiability() {
        assert!(ScoredSubset::new(1, 2, 3, ["a", "b"]).is_satisfiable());
        assert!(!ScoredSubset::new(3, 3, 3, ["a", "b"]).is_satisfiable());
        assert!(!ScoredSubset::new(2, 1, 3, ["a", "b"]).is_satisfiable());
        assert!(!ScoredSubset::new(1, 3, 2, ["a", "b", "c"]).is_satisfiable());
    }
}
