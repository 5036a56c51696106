//! Capacity-bounded keyed object store with least-recently-used eviction.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::id::{RecordKey, normalize_id};
use crate::records::Record;

/// Keyed collection with auto-incrementing ids and LRU eviction.
///
/// Ids are decimal renderings of a monotonic counter that is never reused,
/// even after evictions or deletes. Recency is tracked in an explicit
/// access-order list, oldest first; [`get`](Self::get) moves an id to the
/// back, [`peek`](Self::peek) does not.
///
/// Inserting into a full store evicts the single oldest id after the insert,
/// so the new record always survives.
#[derive(Debug, Clone)]
pub struct BoundedObjectStore<T> {
    name: &'static str,
    capacity: usize,
    max_id_len: usize,
    objects: HashMap<String, T>,
    access_order: Vec<String>,
    next_id: u64,
}

impl<T: Record> BoundedObjectStore<T> {
    /// Create an empty store. `capacity` must be at least 1.
    pub fn new(name: &'static str, capacity: usize, max_id_len: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity {
                store: name,
                capacity,
            });
        }
        Ok(Self {
            name,
            capacity,
            max_id_len,
            objects: HashMap::new(),
            access_order: Vec::new(),
            next_id: 1,
        })
    }

    /// Rebuild a store from persisted parts.
    ///
    /// The parts are repaired rather than trusted: access-order entries that
    /// name no object are dropped, duplicates collapse to their last
    /// occurrence, objects missing from the order are treated as oldest, the
    /// counter is advanced past every numeric id, and the store is trimmed
    /// oldest-first down to `capacity`.
    pub fn from_parts(
        name: &'static str,
        capacity: usize,
        max_id_len: usize,
        objects: impl IntoIterator<Item = (String, T)>,
        access_order: Vec<String>,
        next_id: u64,
    ) -> Result<Self> {
        let mut store = Self::new(name, capacity, max_id_len)?;
        for (id, mut record) in objects {
            normalize_id(&id, max_id_len)?;
            record.set_id(id.clone());
            store.objects.insert(id, record);
        }

        let mut order: Vec<String> = Vec::with_capacity(store.objects.len());
        for id in access_order {
            if store.objects.contains_key(&id) {
                order.retain(|existing| existing != &id);
                order.push(id);
            }
        }
        let mut unordered: Vec<String> = store
            .objects
            .keys()
            .filter(|id| !order.contains(*id))
            .cloned()
            .collect();
        unordered.sort_by_key(|id| id.parse::<u64>().unwrap_or(0));
        unordered.extend(order);
        store.access_order = unordered;

        let highest = store
            .objects
            .keys()
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        let exhausted = || Error::IdSpaceExhausted { max: max_id_len };
        let after_highest = highest.checked_add(1).ok_or_else(exhausted)?;
        store.next_id = next_id.max(after_highest).max(1);

        while store.objects.len() > store.capacity {
            store.evict_oldest();
        }
        Ok(store)
    }

    /// Insert a record, assigning it the next id. Returns that id.
    ///
    /// Fails with [`Error::IdSpaceExhausted`] once the counter no longer
    /// fits in `max_id_len` digits or cannot advance; capacity pressure
    /// never fails.
    pub fn add(&mut self, mut record: T) -> Result<String> {
        let id = self.next_id.to_string();
        let following = self.next_id.checked_add(1);
        let Some(following) = following.filter(|_| id.len() <= self.max_id_len) else {
            return Err(Error::IdSpaceExhausted {
                max: self.max_id_len,
            });
        };
        record.set_id(id.clone());
        self.objects.insert(id.clone(), record);
        self.access_order.push(id.clone());
        self.next_id = following;

        if self.objects.len() > self.capacity
            && let Some(evicted) = self.evict_oldest()
        {
            warn!(
                rate_limit = "object_storage",
                store = self.name,
                max_count = self.capacity,
                evicted_id = %evicted,
                new_id = %id,
                "Object storage full, evicting oldest object"
            );
        }

        debug!(
            store = self.name,
            object_id = %id,
            total_objects = self.objects.len(),
            "Object added"
        );
        Ok(id)
    }

    /// Fetch a record and mark it most recently used.
    pub fn get<K: RecordKey>(&mut self, id: K) -> Result<Option<&mut T>> {
        let id = normalize_id(&id, self.max_id_len)?;
        if !self.objects.contains_key(id.as_ref()) {
            trace!(store = self.name, object_id = %id, found = false, "Object lookup");
            return Ok(None);
        }
        self.access_order.retain(|existing| existing.as_str() != id.as_ref());
        self.access_order.push(id.to_string());
        trace!(store = self.name, object_id = %id, found = true, "Object lookup");
        Ok(self.objects.get_mut(id.as_ref()))
    }

    /// Fetch a record without changing its recency.
    pub fn peek<K: RecordKey>(&self, id: K) -> Result<Option<&T>> {
        let id = normalize_id(&id, self.max_id_len)?;
        Ok(self.objects.get(id.as_ref()))
    }

    /// Remove a record. Returns whether it was present.
    pub fn delete<K: RecordKey>(&mut self, id: K) -> Result<bool> {
        let id = normalize_id(&id, self.max_id_len)?;
        let removed = self.objects.remove(id.as_ref()).is_some();
        if removed {
            self.access_order.retain(|existing| existing.as_str() != id.as_ref());
        }
        debug!(store = self.name, object_id = %id, success = removed, "Object delete");
        Ok(removed)
    }

    /// Whether a record with this id exists.
    pub fn contains<K: RecordKey>(&self, id: K) -> bool {
        self.objects.contains_key(id.as_key().as_ref())
    }

    /// Iterate over ids (arbitrary order).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    /// Iterate over records (arbitrary order) without touching recency.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.objects.values()
    }

    /// Iterate over `(id, record)` pairs (arbitrary order).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.objects.iter().map(|(id, record)| (id.as_str(), record))
    }

    /// Ids from least to most recently used.
    pub fn access_order(&self) -> &[String] {
        &self.access_order
    }

    /// The counter value the next insert will use.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Maximum number of records held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn evict_oldest(&mut self) -> Option<String> {
        if self.access_order.is_empty() {
            return None;
        }
        let evicted = self.access_order.remove(0);
        self.objects.remove(&evicted);
        Some(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::User;

    fn user(name: &str) -> User {
        User::new(format!("{name}@example.com"), name, "hash")
    }

    fn store(capacity: usize) -> BoundedObjectStore<User> {
        BoundedObjectStore::new("users", capacity, 64).unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = BoundedObjectStore::<User>::new("users", 0, 64);
        assert!(matches!(
            result,
            Err(Error::InvalidCapacity { capacity: 0, .. })
        ));
    }

    #[test]
    fn test_add_assigns_sequential_ids() {
        let mut users = store(10);
        let first = users.add(user("alice")).unwrap();
        let second = users.add(user("bob")).unwrap();

        assert_eq!(first, "1");
        assert_eq!(second, "2");
        assert_eq!(users.peek("1").unwrap().unwrap().id, "1");
        assert_eq!(users.next_id(), 3);
        assert_eq!(users.access_order(), ["1", "2"]);
    }

    #[test]
    fn test_eviction_removes_oldest() {
        let mut users = store(3);
        let ids: Vec<String> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|name| users.add(user(name)).unwrap())
            .collect();

        assert_eq!(users.len(), 3);
        assert!(users.get(&ids[0]).unwrap().is_none());
        assert_eq!(users.access_order(), &ids[1..]);
        for id in &ids[1..] {
            assert!(users.contains(id));
        }
    }

    #[test]
    fn test_get_refreshes_recency() {
        let mut users = store(3);
        for name in ["a", "b", "c"] {
            users.add(user(name)).unwrap();
        }

        // Touch the oldest so "2" becomes the eviction candidate.
        assert!(users.get(1).unwrap().is_some());
        users.add(user("d")).unwrap();

        assert!(users.contains("1"));
        assert!(!users.contains("2"));
        assert_eq!(users.access_order(), ["3", "1", "4"]);
    }

    #[test]
    fn test_peek_does_not_refresh_recency() {
        let mut users = store(2);
        users.add(user("a")).unwrap();
        users.add(user("b")).unwrap();

        assert!(users.peek("1").unwrap().is_some());
        users.add(user("c")).unwrap();

        assert!(!users.contains("1"));
    }

    #[test]
    fn test_ids_never_reused() {
        let mut users = store(1);
        users.add(user("a")).unwrap();
        users.delete("1").unwrap();
        let id = users.add(user("b")).unwrap();
        assert_eq!(id, "2");
    }

    #[test]
    fn test_mutations_visible_through_get() {
        let mut users = store(5);
        let id = users.add(user("alice")).unwrap();

        users.get(&id).unwrap().unwrap().bio = "hello".to_string();

        assert_eq!(users.get(&id).unwrap().unwrap().bio, "hello");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut users = store(5);
        users.add(user("a")).unwrap();
        users.add(user("b")).unwrap();

        assert!(users.delete(1).unwrap());
        assert!(!users.delete(1).unwrap());
        assert!(!users.delete("404").unwrap());
        assert_eq!(users.access_order(), ["2"]);
    }

    #[test]
    fn test_long_id_rejected() {
        let mut users = BoundedObjectStore::<User>::new("users", 5, 3).unwrap();
        assert!(matches!(
            users.get("1234"),
            Err(Error::IdTooLong { len: 4, max: 3 })
        ));
        assert!(matches!(users.delete("1234"), Err(Error::IdTooLong { .. })));
        // Failed lookups leave the store untouched.
        assert!(users.is_empty());
    }

    #[test]
    fn test_id_space_exhausted() {
        let mut users = BoundedObjectStore::<User>::new("users", 100, 1).unwrap();
        for _ in 0..9 {
            users.add(user("x")).unwrap();
        }
        assert!(matches!(
            users.add(user("overflow")),
            Err(Error::IdSpaceExhausted { max: 1 })
        ));
        assert_eq!(users.len(), 9);
    }

    #[test]
    fn test_capacity_one() {
        let mut users = store(1);
        users.add(user("a")).unwrap();
        let id = users.add(user("b")).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users.access_order(), [id]);
    }

    #[test]
    fn test_from_parts_repairs_state() {
        let objects = vec![
            ("1".to_string(), user("a")),
            ("2".to_string(), user("b")),
            ("5".to_string(), user("c")),
        ];
        let order = vec!["2".to_string(), "9".to_string(), "2".to_string(), "5".to_string()];
        let users = BoundedObjectStore::from_parts("users", 2, 64, objects, order, 3).unwrap();

        // "1" was missing from the order, so it counted as oldest and was trimmed.
        assert_eq!(users.access_order(), ["2", "5"]);
        assert_eq!(users.peek("5").unwrap().unwrap().id, "5");
        assert_eq!(users.next_id(), 6);
    }

    #[test]
    fn test_from_parts_rejects_counter_overflow() {
        let objects = vec![(u64::MAX.to_string(), user("a"))];
        let result = BoundedObjectStore::from_parts("users", 5, 64, objects, vec![], 1);
        assert!(matches!(result, Err(Error::IdSpaceExhausted { max: 64 })));
    }

    #[test]
    fn test_exhausted_store_restores_and_stays_exhausted() {
        let objects = vec![("9".to_string(), user("a"))];
        let mut users =
            BoundedObjectStore::from_parts("users", 5, 1, objects, vec![], 10).unwrap();
        assert_eq!(users.len(), 1);
        assert!(matches!(
            users.add(user("b")),
            Err(Error::IdSpaceExhausted { max: 1 })
        ));
        assert_eq!(users.access_order(), ["9"]);
    }

    #[test]
    fn test_add_at_counter_limit_fails_cleanly() {
        let mut users =
            BoundedObjectStore::<User>::from_parts("users", 5, 64, vec![], vec![], u64::MAX)
                .unwrap();
        assert!(matches!(
            users.add(user("a")),
            Err(Error::IdSpaceExhausted { max: 64 })
        ));
        assert!(users.is_empty());
        assert_eq!(users.next_id(), u64::MAX);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add,
            Get(u64),
            Delete(u64),
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                3 => Just(Op::Add),
                1 => (1u64..40).prop_map(Op::Get),
                1 => (1u64..40).prop_map(Op::Delete),
            ]
        }

        proptest! {
            /// Property: size stays bounded, order mirrors the key set, ids only grow.
            #[test]
            fn bounded_and_monotonic(capacity in 1usize..6, ops in prop::collection::vec(op_strategy(), 1..60)) {
                let mut users = BoundedObjectStore::<User>::new("users", capacity, 64).unwrap();
                let mut last_id = 0u64;

                for op in ops {
                    match op {
                        Op::Add => {
                            let id: u64 = users.add(user("u")).unwrap().parse().unwrap();
                            prop_assert!(id > last_id);
                            last_id = id;
                        }
                        Op::Get(id) => {
                            users.get(id).unwrap();
                        }
                        Op::Delete(id) => {
                            users.delete(id).unwrap();
                        }
                    }

                    prop_assert!(users.len() <= capacity);
                    prop_assert_eq!(users.access_order().len(), users.len());
                    for id in users.access_order() {
                        prop_assert!(users.contains(id));
                    }
                }
            }
        }
    }
}
