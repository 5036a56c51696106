//! Snapshot format and file persistence.
//!
//! A snapshot is a JSON object keyed by session id, oldest session first:
//!
//! ```json
//! {
//!   "6f1c...": {
//!     "users":    { "objects": { "1": { ... } }, "last_accessed_ids": ["1"], "current_id_counter": 2 },
//!     "articles": { "objects": {}, "last_accessed_ids": [], "current_id_counter": 1 },
//!     "comments": { "objects": {}, "last_accessed_ids": [], "current_id_counter": 1 },
//!     "follows":   [["1", "2"]],
//!     "favorites": []
//!   }
//! }
//! ```
//!
//! The file is written on shutdown and deleted right after a successful
//! restore, so persisted state is applied at most once.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use conduit_store::{
    Article, BoundedObjectStore, BoundedRelationStore, Comment, Record, SessionData, StoreLimits,
    User,
};
use parking_lot::RwLock;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, error, info, warn};

use crate::container::SessionContainer;
use crate::error::{Error, Result};

/// Session id used for the single dataset of a non-isolated container.
pub const SHARED_SESSION_ID: &str = "shared";

/// Every session's data, oldest session first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub sessions: Vec<(String, SessionSnapshot)>,
}

impl Snapshot {
    /// Number of sessions in the snapshot.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.sessions.iter().map(|(id, session)| (id, session)))
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedSessions;

        impl<'de> Visitor<'de> for OrderedSessions {
            type Value = Snapshot;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of session id to session data")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Snapshot, A::Error> {
                let mut sessions = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, SessionSnapshot>()? {
                    sessions.push(entry);
                }
                Ok(Snapshot { sessions })
            }
        }

        deserializer.deserialize_map(OrderedSessions)
    }
}

/// One session's five stores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSnapshot {
    pub users: ObjectStoreSnapshot<User>,
    pub articles: ObjectStoreSnapshot<Article>,
    pub comments: ObjectStoreSnapshot<Comment>,
    pub follows: Vec<(String, String)>,
    pub favorites: Vec<(String, String)>,
}

impl SessionSnapshot {
    /// Copy out the contents of `data`.
    pub fn capture(data: &SessionData) -> Self {
        Self {
            users: ObjectStoreSnapshot::capture(&data.users),
            articles: ObjectStoreSnapshot::capture(&data.articles),
            comments: ObjectStoreSnapshot::capture(&data.comments),
            follows: data.follows.links().to_vec(),
            favorites: data.favorites.links().to_vec(),
        }
    }

    /// Rebuild session data sized by `limits`.
    ///
    /// Stores are repaired on the way in; anything over the current
    /// capacities is dropped oldest-first.
    pub fn into_session_data(self, limits: &StoreLimits) -> conduit_store::Result<SessionData> {
        Ok(SessionData {
            users: self
                .users
                .into_store("users", limits.max_users, limits.max_id_len)?,
            articles: self
                .articles
                .into_store("articles", limits.max_articles, limits.max_id_len)?,
            comments: self
                .comments
                .into_store("comments", limits.max_comments, limits.max_id_len)?,
            follows: BoundedRelationStore::from_links(
                "follows",
                limits.max_follows,
                limits.max_id_len,
                self.follows,
            )?,
            favorites: BoundedRelationStore::from_links(
                "favorites",
                limits.max_favorites,
                limits.max_id_len,
                self.favorites,
            )?,
        })
    }
}

/// Persisted form of a [`BoundedObjectStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStoreSnapshot<T> {
    pub objects: BTreeMap<String, T>,
    #[serde(rename = "last_accessed_ids")]
    pub access_order: Vec<String>,
    #[serde(rename = "current_id_counter")]
    pub next_id: u64,
}

impl<T> Default for ObjectStoreSnapshot<T> {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            access_order: Vec::new(),
            next_id: 1,
        }
    }
}

impl<T: Record + Clone> ObjectStoreSnapshot<T> {
    pub fn capture(store: &BoundedObjectStore<T>) -> Self {
        Self {
            objects: store
                .iter()
                .map(|(id, record)| (id.to_string(), record.clone()))
                .collect(),
            access_order: store.access_order().to_vec(),
            next_id: store.next_id(),
        }
    }

    pub fn into_store(
        self,
        name: &'static str,
        capacity: usize,
        max_id_len: usize,
    ) -> conduit_store::Result<BoundedObjectStore<T>> {
        BoundedObjectStore::from_parts(
            name,
            capacity,
            max_id_len,
            self.objects,
            self.access_order,
            self.next_id,
        )
    }
}

impl SessionContainer {
    /// Capture every live session, oldest first, without changing the
    /// container.
    ///
    /// Data referenced by several session ids is written once per id. A
    /// non-isolated container produces a single [`SHARED_SESSION_ID`] entry
    /// once its shared data exists.
    pub fn snapshot(&mut self) -> Result<Snapshot> {
        if self.config.disable_isolation {
            let sessions = self
                .shared
                .iter()
                .map(|data| {
                    (
                        SHARED_SESSION_ID.to_string(),
                        SessionSnapshot::capture(&data.read()),
                    )
                })
                .collect();
            return Ok(Snapshot { sessions });
        }

        let items = self.queue.drain_ordered();
        let sessions = items
            .iter()
            .filter_map(|item| {
                let data = item.payload.as_ref()?;
                Some((item.session_id.clone(), SessionSnapshot::capture(&data.read())))
            })
            .collect();
        for item in items {
            self.queue.push(
                item.priority,
                item.session_id,
                item.payload,
                item.owner_address,
            )?;
        }
        debug!(sessions = self.queue.len(), "Snapshot captured");
        Ok(Snapshot { sessions })
    }

    /// Re-create the sessions in `snapshot`. Returns how many were inserted.
    ///
    /// Sessions are pushed in snapshot order with fresh priorities and no
    /// address attribution, through the global cap. Ids that are already
    /// live are skipped. Every session is decoded before any is inserted, so
    /// a bad entry leaves the container unchanged.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<usize> {
        let limits = self.config.store_limits.clone();
        let mut decoded = Vec::with_capacity(snapshot.len());
        for (session_id, session) in snapshot.sessions {
            decoded.push((session_id, session.into_session_data(&limits)?));
        }

        if self.config.disable_isolation {
            let Some((_, data)) = decoded.into_iter().next() else {
                return Ok(0);
            };
            self.shared = Some(Arc::new(RwLock::new(data)));
            info!("Shared session data restored");
            return Ok(1);
        }

        let mut restored = 0;
        for (session_id, data) in decoded {
            if self.queue.contains(&session_id) {
                warn!(session_id = %session_id, "Session already live, skipping restore");
                continue;
            }
            self.insert_session(session_id, Arc::new(RwLock::new(data)), None)?;
            restored += 1;
        }
        info!(sessions = restored, "Sessions restored from snapshot");
        Ok(restored)
    }

    /// Write a snapshot of every live session to `path`.
    pub fn save_snapshot(&mut self, path: &Path) -> Result<usize> {
        let snapshot = self.snapshot()?;
        write_snapshot_file(path, &snapshot)?;
        info!(path = %path.display(), sessions = snapshot.len(), "Sessions saved");
        Ok(snapshot.len())
    }

    /// Restore from `path`, then delete the file.
    ///
    /// A missing file restores nothing and is not an error.
    pub fn load_snapshot(&mut self, path: &Path) -> Result<usize> {
        if !path.exists() {
            info!(path = %path.display(), "No snapshot file, starting empty");
            return Ok(0);
        }
        let snapshot = read_snapshot_file(path)?;
        let restored = self.restore(snapshot)?;
        discard_snapshot_file(path);
        Ok(restored)
    }
}

/// Delete a snapshot file that has been applied. Returns whether it is gone.
///
/// The sessions are already live at this point, so a failed delete is
/// logged instead of failing the restore.
fn discard_snapshot_file(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Snapshot file removed after restore");
            true
        }
        Err(e) => {
            error!(
                path = %path.display(),
                error = %e,
                "Failed to remove restored snapshot file; it will be applied again on next start"
            );
            false
        }
    }
}

/// Read and decode a snapshot file without applying or deleting it.
pub fn read_snapshot_file(path: &Path) -> Result<Snapshot> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Encode and write a snapshot file, creating parent directories.
pub fn write_snapshot_file(path: &Path, snapshot: &Snapshot) -> Result<()> {
    let io_error = |source: std::io::Error| Error::Io {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let content = serde_json::to_string(snapshot)?;
    fs::write(path, content).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContainerConfig;
    use conduit_store::hash_password;

    fn container() -> SessionContainer {
        SessionContainer::new(ContainerConfig::new().with_max_sessions(10)).unwrap()
    }

    fn add_user(sessions: &mut SessionContainer, id: &str, email: &str) {
        let resolved = sessions
            .get_or_create_session(Some(id), Some("10.0.0.1"), None)
            .unwrap();
        let mut data = resolved.data.write();
        let user_id = data
            .users
            .add(User::new(email, id, hash_password("pw")))
            .unwrap();
        data.follows.add(&user_id, "42").unwrap();
    }

    #[test]
    fn test_snapshot_is_non_destructive() {
        let mut sessions = container();
        add_user(&mut sessions, "a", "a@example.com");
        add_user(&mut sessions, "b", "b@example.com");

        let snapshot = sessions.snapshot().unwrap();
        let ids: Vec<&str> = snapshot.sessions.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions.sessions_for_address("10.0.0.1"), vec!["a", "b"]);
        sessions.check_invariants().unwrap();

        // Eviction order survives the drain and re-push.
        let mut small = sessions;
        small.config.max_sessions = 2;
        let resolved = small.get_or_create_session(Some("c"), None, None).unwrap();
        assert_eq!(resolved.evicted, vec!["a"]);
    }

    #[test]
    fn test_wire_format_field_names() {
        let mut sessions = container();
        add_user(&mut sessions, "a", "a@example.com");
        let json = serde_json::to_value(sessions.snapshot().unwrap()).unwrap();

        let users = &json["a"]["users"];
        assert_eq!(users["last_accessed_ids"], serde_json::json!(["1"]));
        assert_eq!(users["current_id_counter"], 2);
        assert_eq!(users["objects"]["1"]["email"], "a@example.com");
        assert_eq!(json["a"]["follows"], serde_json::json!([["1", "42"]]));
        assert_eq!(json["a"]["favorites"], serde_json::json!([]));
    }

    #[test]
    fn test_decode_preserves_session_order() {
        let json = r#"{"z": {}, "a": {}, "m": {}}"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let ids: Vec<&str> = snapshot.sessions.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
        assert_eq!(snapshot.sessions[0].1.users.next_id, 1);
    }

    #[test]
    fn test_restore_rebuilds_stores() {
        let mut source = container();
        add_user(&mut source, "a", "a@example.com");
        let snapshot = source.snapshot().unwrap();

        let mut target = container();
        assert_eq!(target.restore(snapshot).unwrap(), 1);

        let data = target.session("a").unwrap();
        let data = data.read();
        assert_eq!(data.users.peek("1").unwrap().unwrap().email, "a@example.com");
        assert_eq!(data.users.next_id(), 2);
        assert!(data.follows.is_linked("1", "42").unwrap());
        // Restored sessions carry no address.
        assert!(target.sessions_for_address("10.0.0.1").is_empty());
        target.check_invariants().unwrap();
    }

    #[test]
    fn test_restore_skips_live_ids() {
        let mut sessions = container();
        add_user(&mut sessions, "a", "a@example.com");
        let snapshot = sessions.snapshot().unwrap();

        assert_eq!(sessions.restore(snapshot).unwrap(), 0);
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn test_restore_rejects_bad_ids_atomically() {
        let json = r#"{
            "ok": {},
            "bad": {"users": {"objects": {}, "last_accessed_ids": [], "current_id_counter": 1},
                    "follows": [["1", "this-id-is-much-too-long-for-the-configured-limit-of-sixty-four-chars"]]}
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();

        let mut sessions = container();
        assert!(matches!(sessions.restore(snapshot), Err(Error::Store(_))));
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sessions.json");

        let mut source = container();
        add_user(&mut source, "a", "a@example.com");
        add_user(&mut source, "b", "b@example.com");
        assert_eq!(source.save_snapshot(&path).unwrap(), 2);
        assert!(path.exists());

        let mut target = container();
        assert_eq!(target.load_snapshot(&path).unwrap(), 2);
        assert!(!path.exists());
        assert!(target.contains("a"));
        assert!(target.contains("b"));
    }

    #[test]
    fn test_discard_failure_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(&path, "{}").unwrap();

        assert!(discard_snapshot_file(&path));
        assert!(!path.exists());
        // A directory cannot be removed as a file.
        assert!(!discard_snapshot_file(dir.path()));
        assert!(dir.path().exists());
    }

    #[test]
    fn test_restore_rejects_counter_overflow() {
        let json = format!(
            r#"{{"ok": {{}}, "bad": {{"users": {{"objects": {{"{}": {{"email": "a@example.com", "username": "a", "password": "x"}}}}, "last_accessed_ids": [], "current_id_counter": 1}}}}}}"#,
            u64::MAX
        );
        let snapshot: Snapshot = serde_json::from_str(&json).unwrap();

        let mut sessions = container();
        assert!(matches!(
            sessions.restore(snapshot),
            Err(Error::Store(conduit_store::Error::IdSpaceExhausted { .. }))
        ));
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sessions = container();
        assert_eq!(
            sessions
                .load_snapshot(&dir.path().join("missing.json"))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_load_corrupt_file_keeps_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(&path, "not json").unwrap();

        let mut sessions = container();
        assert!(matches!(
            sessions.load_snapshot(&path),
            Err(Error::Snapshot(_))
        ));
        assert!(path.exists());
    }

    #[test]
    fn test_shared_data_round_trip() {
        let config = ContainerConfig::new().with_isolation(false);
        let mut source = SessionContainer::new(config.clone()).unwrap();
        assert!(source.snapshot().unwrap().is_empty());

        let shared = source.get_or_create_session(None, None, None).unwrap();
        shared
            .data
            .write()
            .users
            .add(User::new("s@example.com", "shared", hash_password("pw")))
            .unwrap();
        let snapshot = source.snapshot().unwrap();
        assert_eq!(snapshot.sessions[0].0, SHARED_SESSION_ID);

        let mut target = SessionContainer::new(config).unwrap();
        assert_eq!(target.restore(snapshot).unwrap(), 1);
        let resolved = target.get_or_create_session(None, None, None).unwrap();
        assert!(!resolved.created);
        assert_eq!(resolved.data.read().users.len(), 1);
    }
}
