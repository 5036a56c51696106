//! Bounded token → session bindings.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, info};

use crate::queue::IndexedPriorityQueue;

/// Maps authentication tokens to the session they were issued for.
///
/// Bindings are kept in insertion order. When the table is full the oldest
/// binding is dropped, regardless of how recently its session was used.
#[derive(Debug, Clone)]
pub struct TokenBindingTable {
    capacity: usize,
    bindings: HashMap<String, String>,
    order: VecDeque<String>,
}

impl TokenBindingTable {
    /// Create a table holding at most `capacity` bindings.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            bindings: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bind `token` to `session_id`.
    ///
    /// Any binding for the same token or the same session is replaced. If
    /// the table is still full afterwards, the oldest binding is evicted and
    /// its token returned.
    pub fn bind(&mut self, token: &str, session_id: &str) -> Option<String> {
        let bindings = &mut self.bindings;
        self.order.retain(|bound| {
            let replaced = bound == token
                || bindings.get(bound).is_some_and(|session| session == session_id);
            if replaced {
                bindings.remove(bound);
            }
            !replaced
        });

        let mut evicted = None;
        if self.capacity > 0 && self.bindings.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                let session = self.bindings.remove(&oldest);
                info!(
                    capacity = self.capacity,
                    session_id = ?session,
                    "Token binding table full, dropping oldest binding"
                );
                evicted = Some(oldest);
            }
        }
        if self.capacity == 0 {
            return evicted;
        }

        self.bindings.insert(token.to_string(), session_id.to_string());
        self.order.push_back(token.to_string());
        debug!(session_id = %session_id, bindings = self.bindings.len(), "Token bound");
        evicted
    }

    /// The session bound to `token`, if that session is still queued.
    ///
    /// A binding whose session has been evicted is a miss.
    pub fn resolve<'a, P>(
        &'a self,
        token: &str,
        queue: &IndexedPriorityQueue<P>,
    ) -> Option<&'a str> {
        let session_id = self.session_for(token)?;
        if queue.contains(session_id) {
            Some(session_id)
        } else {
            debug!(session_id = %session_id, "Token bound to evicted session");
            None
        }
    }

    /// The raw binding for `token`, live or stale.
    pub fn session_for(&self, token: &str) -> Option<&str> {
        self.bindings.get(token).map(String::as_str)
    }

    /// Tokens in binding order, oldest first.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_lookup() {
        let mut table = TokenBindingTable::new(10);
        assert!(table.bind("t1", "s1").is_none());
        assert_eq!(table.session_for("t1"), Some("s1"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_rebinding_token_replaces_session() {
        let mut table = TokenBindingTable::new(10);
        table.bind("t1", "s1");
        table.bind("t1", "s2");
        assert_eq!(table.session_for("t1"), Some("s2"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_new_token_replaces_session_binding() {
        let mut table = TokenBindingTable::new(10);
        table.bind("old", "s1");
        table.bind("other", "s2");
        table.bind("new", "s1");

        assert!(table.session_for("old").is_none());
        assert_eq!(table.session_for("new"), Some("s1"));
        assert_eq!(table.tokens().collect::<Vec<_>>(), vec!["other", "new"]);
    }

    #[test]
    fn test_full_table_evicts_oldest_binding() {
        let mut table = TokenBindingTable::new(2);
        table.bind("t1", "s1");
        table.bind("t2", "s2");
        assert_eq!(table.bind("t3", "s3"), Some("t1".to_string()));

        assert!(table.session_for("t1").is_none());
        assert_eq!(table.tokens().collect::<Vec<_>>(), vec!["t2", "t3"]);
    }

    #[test]
    fn test_replacement_frees_room_before_capacity_check() {
        let mut table = TokenBindingTable::new(2);
        table.bind("t1", "s1");
        table.bind("t2", "s2");
        // Rebinding s2 removes its old entry, so nothing else is evicted.
        assert!(table.bind("t2b", "s2").is_none());
        assert_eq!(table.session_for("t1"), Some("s1"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_resolve_ignores_stale_sessions() {
        let mut queue = IndexedPriorityQueue::<()>::new();
        queue.push(1, "live", None, None).unwrap();

        let mut table = TokenBindingTable::new(4);
        table.bind("t-live", "live");
        table.bind("t-gone", "gone");

        assert_eq!(table.resolve("t-live", &queue), Some("live"));
        assert_eq!(table.resolve("t-gone", &queue), None);
        assert_eq!(table.resolve("unknown", &queue), None);
        // Stale bindings stay until replaced or evicted.
        assert_eq!(table.session_for("t-gone"), Some("gone"));
    }
}
