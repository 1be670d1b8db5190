use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::builder::{CreateElectionRequest, ElectionBuilder};
use crate::config::*;
use crate::election::{Election, ElectionRecord};
use crate::search;

type ElectionMap = BTreeMap<ElectionId, Arc<Mutex<Election>>>;

/// Number of elections returned by `ElectionStore::trending`.
pub const TRENDING_COUNT: usize = 5;

/// All the elections of a service, keyed by id.
///
/// Each election sits behind its own mutex: the operations on one election are
/// serialized, operations on different elections do not wait for each other.
/// The management operations (evaluate, stop, restart, delete) are reserved to
/// the owner of the election.
#[derive(Debug)]
pub struct ElectionStore {
    limits: ElectionLimits,
    next_id: Mutex<u64>,
    elections: RwLock<ElectionMap>,
}

impl Default for ElectionStore {
    fn default() -> Self {
        ElectionStore::new(&ElectionLimits::DEFAULT_LIMITS)
    }
}

// A poisoned lock only means that another caller panicked. The election itself
// is never left half-updated, so the data is still usable.
fn lock(e: &Mutex<Election>) -> MutexGuard<'_, Election> {
    e.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ElectionStore {
    pub fn new(limits: &ElectionLimits) -> ElectionStore {
        ElectionStore {
            limits: limits.clone(),
            next_id: Mutex::new(1),
            elections: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn limits(&self) -> &ElectionLimits {
        &self.limits
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_map().is_empty()
    }

    fn read_map(&self) -> RwLockReadGuard<'_, ElectionMap> {
        self.elections.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, ElectionMap> {
        self.elections.write().unwrap_or_else(PoisonError::into_inner)
    }

    // The elections in id order, so that callers see them in creation order.
    fn all(&self) -> Vec<Arc<Mutex<Election>>> {
        self.read_map().values().cloned().collect()
    }

    /// Creates an election owned by `owner` and returns its id.
    pub fn register_election(
        &self,
        owner: &str,
        request: &CreateElectionRequest,
    ) -> Result<ElectionId, VotingError> {
        let mut next_id = self.next_id.lock().unwrap_or_else(PoisonError::into_inner);
        let id = ElectionId(*next_id);
        let election = ElectionBuilder::from_request(request, &self.limits)?.build(id, owner)?;
        *next_id += 1;
        self.write_map().insert(id, Arc::new(Mutex::new(election)));
        info!("register_election: {} registered election {}", owner, id);
        Ok(id)
    }

    /// The shared handle to an election.
    pub fn election(&self, id: ElectionId) -> Result<Arc<Mutex<Election>>, VotingError> {
        self.read_map()
            .get(&id)
            .cloned()
            .ok_or_else(|| VotingError::NotFound {
                what: "election".to_string(),
                id: id.to_string(),
            })
    }

    /// A copy of the current state of an election.
    pub fn snapshot(&self, id: ElectionId) -> Result<Election, VotingError> {
        let e = self.election(id)?;
        let guard = lock(&e);
        Ok(guard.clone())
    }

    fn with_owned_election<T, F>(&self, id: ElectionId, user: &str, f: F) -> Result<T, VotingError>
    where
        F: FnOnce(&mut Election) -> T,
    {
        let e = self.election(id)?;
        let mut guard = lock(&e);
        if guard.owner() != user {
            warn!("election {}: {} is not the owner", id, user);
            return Err(VotingError::Authorization {
                user: user.to_string(),
                election: id,
            });
        }
        Ok(f(&mut guard))
    }

    /// Submits a ballot given in its JSON form. Anybody can vote.
    pub fn add_vote_from_json(
        &self,
        id: ElectionId,
        js: &serde_json::Value,
    ) -> Result<(), VotingError> {
        let e = self.election(id)?;
        let mut guard = lock(&e);
        guard.add_ballot_json(js)
    }

    /// Recomputes the winners of an election.
    pub fn evaluate(&self, id: ElectionId, user: &str) -> Result<VotingResult, VotingError> {
        self.with_owned_election(id, user, |e| e.recompute_winners().clone())
    }

    pub fn stop_election(&self, id: ElectionId, user: &str) -> Result<(), VotingError> {
        self.with_owned_election(id, user, |e| e.stop())
    }

    pub fn restart_election(&self, id: ElectionId, user: &str) -> Result<(), VotingError> {
        self.with_owned_election(id, user, |e| e.restart())
    }

    pub fn delete_election(&self, id: ElectionId, user: &str) -> Result<(), VotingError> {
        self.with_owned_election(id, user, |_| ())?;
        self.write_map().remove(&id);
        info!("delete_election: {} deleted election {}", user, id);
        Ok(())
    }

    /// The ids of the elections created by a user.
    pub fn elections_of(&self, owner: &str) -> Vec<ElectionId> {
        self.all()
            .iter()
            .map(|e| lock(e))
            .filter(|e| e.owner() == owner)
            .map(|e| e.id())
            .collect()
    }

    /// Elections matching a query, most relevant first.
    pub fn search(&self, query: &str) -> Result<Vec<Election>, VotingError> {
        let all = self.all();
        let guards: Vec<MutexGuard<'_, Election>> = all.iter().map(|e| lock(e)).collect();
        let found = search::search(guards.iter().map(|g| &**g), query, &self.limits)?;
        Ok(found.into_iter().cloned().collect())
    }

    /// The open elections with the most votes, at most `TRENDING_COUNT` of them.
    pub fn trending(&self) -> Vec<ElectionId> {
        let mut open: Vec<(u64, ElectionId)> = self
            .all()
            .iter()
            .map(|e| lock(e))
            .filter(|e| !e.is_stopped())
            .map(|e| (e.vote_count(), e.id()))
            .collect();
        open.sort_by(|(c1, _), (c2, _)| c2.cmp(c1));
        open.into_iter()
            .take(TRENDING_COUNT)
            .map(|(_, id)| id)
            .collect()
    }

    /// The stored form of every election, in id order.
    pub fn records(&self) -> Vec<ElectionRecord> {
        self.all().iter().map(|e| lock(e).to_record()).collect()
    }

    /// Rebuilds a store. New elections get ids above the largest stored one.
    pub fn from_records(
        records: &[ElectionRecord],
        limits: &ElectionLimits,
    ) -> Result<ElectionStore, VotingError> {
        let mut elections = ElectionMap::new();
        for record in records.iter() {
            let e = Election::from_record(record, limits)?;
            if elections.insert(e.id(), Arc::new(Mutex::new(e))).is_some() {
                return Err(VotingError::Validation {
                    message: format!("election id {} is used twice", record.id),
                });
            }
        }
        let next_id = elections.keys().next_back().map(|id| id.0 + 1).unwrap_or(1);
        debug!(
            "from_records: restored {} elections, next id {}",
            elections.len(),
            next_id
        );
        Ok(ElectionStore {
            limits: limits.clone(),
            next_id: Mutex::new(next_id),
            elections: RwLock::new(elections),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn request(title: &str, rule: RuleKind, k: usize) -> CreateElectionRequest {
        CreateElectionRequest {
            title: title.to_string(),
            description: "".to_string(),
            candidate_names: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            committee_size: k,
            rule_kind: rule,
        }
    }

    fn approve(ids: &[&str]) -> serde_json::Value {
        json!({"type": "approvalBallot", "app_candidates": ids})
    }

    #[test]
    fn register_and_vote() {
        init();
        let store = ElectionStore::default();
        let id = store
            .register_election("alice", &request("Board", RuleKind::Approval, 2))
            .unwrap();
        assert_eq!(id, ElectionId(1));
        store.add_vote_from_json(id, &approve(&["1", "2"])).unwrap();
        store.add_vote_from_json(id, &approve(&["2", "3"])).unwrap();
        let res = store.evaluate(id, "alice").unwrap();
        assert_eq!(res.winners, vec![CandidateId::from("1"), CandidateId::from("2")]);
        assert_eq!(store.snapshot(id).unwrap().vote_count(), 2);
    }

    #[test]
    fn unknown_elections() {
        let store = ElectionStore::default();
        assert!(matches!(
            store.add_vote_from_json(ElectionId(9), &approve(&["1"])),
            Err(VotingError::NotFound { .. })
        ));
        assert!(matches!(
            store.evaluate(ElectionId(9), "alice"),
            Err(VotingError::NotFound { .. })
        ));
    }

    #[test]
    fn only_the_owner_manages() {
        let store = ElectionStore::default();
        let id = store
            .register_election("alice", &request("Board", RuleKind::Approval, 2))
            .unwrap();
        let denied = VotingError::Authorization {
            user: "bob".to_string(),
            election: id,
        };
        assert_eq!(store.evaluate(id, "bob").err(), Some(denied.clone()));
        assert_eq!(store.stop_election(id, "bob"), Err(denied.clone()));
        assert_eq!(store.delete_election(id, "bob"), Err(denied));
        assert_eq!(store.len(), 1);

        store.stop_election(id, "alice").unwrap();
        assert_eq!(
            store.add_vote_from_json(id, &approve(&["1"])),
            Err(VotingError::ElectionStopped {})
        );
        store.restart_election(id, "alice").unwrap();
        store.add_vote_from_json(id, &approve(&["1"])).unwrap();

        store.delete_election(id, "alice").unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            store.snapshot(id),
            Err(VotingError::NotFound { .. })
        ));
    }

    #[test]
    fn failed_registration_uses_no_id() {
        let store = ElectionStore::default();
        assert!(store
            .register_election("alice", &request("B", RuleKind::Approval, 2))
            .is_err());
        let id = store
            .register_election("alice", &request("Board", RuleKind::Approval, 2))
            .unwrap();
        assert_eq!(id, ElectionId(1));
        assert_eq!(store.elections_of("alice"), vec![id]);
        assert!(store.elections_of("bob").is_empty());
    }

    #[test]
    fn search_and_trending() {
        let store = ElectionStore::default();
        let e1 = store
            .register_election("alice", &request("Food for lunch", RuleKind::Approval, 1))
            .unwrap();
        let e2 = store
            .register_election("bob", &request("Food for dinner", RuleKind::Approval, 1))
            .unwrap();
        let e3 = store
            .register_election("bob", &request("Music tonight", RuleKind::Approval, 1))
            .unwrap();
        store.add_vote_from_json(e2, &approve(&["1"])).unwrap();
        store.add_vote_from_json(e3, &approve(&["1"])).unwrap();
        store.add_vote_from_json(e3, &approve(&["2"])).unwrap();

        let found: Vec<ElectionId> = store
            .search("dinner food")
            .unwrap()
            .iter()
            .map(|e| e.id())
            .collect();
        assert_eq!(found, vec![e2, e1]);

        assert_eq!(store.trending(), vec![e3, e2, e1]);
        store.stop_election(e3, "bob").unwrap();
        assert_eq!(store.trending(), vec![e2, e1]);
    }

    #[test]
    fn records_restore_the_store() {
        let store = ElectionStore::default();
        let id = store
            .register_election("alice", &request("Board", RuleKind::Pav, 2))
            .unwrap();
        store.add_vote_from_json(id, &approve(&["1", "2"])).unwrap();
        store.add_vote_from_json(id, &approve(&["3"])).unwrap();
        store.stop_election(id, "alice").unwrap();
        let before = store.evaluate(id, "alice").unwrap();

        let js = serde_json::to_string(&store.records()).unwrap();
        let records: Vec<ElectionRecord> = serde_json::from_str(&js).unwrap();
        let restored = ElectionStore::from_records(&records, &ElectionLimits::DEFAULT_LIMITS).unwrap();
        let e = restored.snapshot(id).unwrap();
        assert!(e.is_stopped());
        assert_eq!(e.vote_count(), 2);
        assert_eq!(e.current_result(), None);
        assert_eq!(restored.evaluate(id, "alice").unwrap(), before);

        let next = restored
            .register_election("bob", &request("Another board", RuleKind::Approval, 1))
            .unwrap();
        assert_eq!(next, ElectionId(2));

        let twice = vec![records[0].clone(), records[0].clone()];
        assert!(matches!(
            ElectionStore::from_records(&twice, &ElectionLimits::DEFAULT_LIMITS),
            Err(VotingError::Validation { .. })
        ));
    }

    #[test]
    fn concurrent_votes_are_all_counted() {
        let store = Arc::new(ElectionStore::default());
        let id = store
            .register_election("alice", &request("Board", RuleKind::Approval, 1))
            .unwrap();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..10 {
                        let cid = if i % 2 == 0 { "1" } else { "2" };
                        store.add_vote_from_json(id, &approve(&[cid])).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.snapshot(id).unwrap().vote_count(), 80);
        let res = store.evaluate(id, "alice").unwrap();
        assert_eq!(res.tally[0], (CandidateId::from("1"), 40.0));
        assert_eq!(res.winners, vec![CandidateId::from("1")]);
    }
}
