//! Capacity-bounded store of directed `(source, target)` links.

use tracing::warn;

use crate::error::Result;
use crate::id::{RecordKey, normalize_id};

/// Ordered list of unique `(source, target)` pairs, oldest first.
///
/// Re-adding an existing pair moves it to the back instead of growing the
/// list. A full store drops its oldest pair before appending. A capacity of
/// zero turns [`add`](Self::add) into a no-op.
#[derive(Debug, Clone)]
pub struct BoundedRelationStore {
    name: &'static str,
    capacity: usize,
    max_id_len: usize,
    links: Vec<(String, String)>,
}

impl BoundedRelationStore {
    /// Create an empty store.
    pub fn new(name: &'static str, capacity: usize, max_id_len: usize) -> Self {
        Self {
            name,
            capacity,
            max_id_len,
            links: Vec::new(),
        }
    }

    /// Rebuild a store from a persisted pair list.
    ///
    /// Duplicates collapse to their last occurrence and the oldest pairs are
    /// dropped until the list fits `capacity`.
    pub fn from_links(
        name: &'static str,
        capacity: usize,
        max_id_len: usize,
        links: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let mut store = Self::new(name, capacity, max_id_len);
        for (source, target) in links {
            normalize_id(&source, max_id_len)?;
            normalize_id(&target, max_id_len)?;
            store.links.retain(|(s, t)| !(s == &source && t == &target));
            store.links.push((source, target));
        }
        let overflow = store.links.len().saturating_sub(capacity);
        store.links.drain(..overflow);
        Ok(store)
    }

    /// Link `source` to `target`, or refresh the link if it already exists.
    pub fn add<S: RecordKey, T: RecordKey>(&mut self, source: S, target: T) -> Result<()> {
        let source = normalize_id(&source, self.max_id_len)?;
        let target = normalize_id(&target, self.max_id_len)?;
        if self.capacity == 0 {
            return Ok(());
        }

        let link = (source.into_owned(), target.into_owned());
        if let Some(index) = self.links.iter().position(|existing| existing == &link) {
            let touched = self.links.remove(index);
            self.links.push(touched);
            return Ok(());
        }

        if self.links.len() >= self.capacity {
            let evicted = self.links.remove(0);
            warn!(
                rate_limit = "link_storage",
                store = self.name,
                max_count = self.capacity,
                evicted_source = %evicted.0,
                evicted_target = %evicted.1,
                new_source = %link.0,
                new_target = %link.1,
                "Link storage full, evicting oldest link"
            );
        }
        self.links.push(link);
        Ok(())
    }

    /// Remove a link if present.
    pub fn remove<S: RecordKey, T: RecordKey>(&mut self, source: S, target: T) -> Result<()> {
        let source = normalize_id(&source, self.max_id_len)?;
        let target = normalize_id(&target, self.max_id_len)?;
        if let Some(index) = self
            .links
            .iter()
            .position(|(s, t)| s.as_str() == source.as_ref() && t.as_str() == target.as_ref())
        {
            self.links.remove(index);
        }
        Ok(())
    }

    /// Whether `source` links to `target`.
    pub fn is_linked<S: RecordKey, T: RecordKey>(&self, source: S, target: T) -> Result<bool> {
        let source = normalize_id(&source, self.max_id_len)?;
        let target = normalize_id(&target, self.max_id_len)?;
        Ok(self
            .links
            .iter()
            .any(|(s, t)| s.as_str() == source.as_ref() && t.as_str() == target.as_ref()))
    }

    /// Targets linked from `source`, oldest link first.
    pub fn targets_for_source<S: RecordKey>(&self, source: S) -> Result<Vec<String>> {
        let source = normalize_id(&source, self.max_id_len)?;
        Ok(self
            .links
            .iter()
            .filter(|(s, _)| s.as_str() == source.as_ref())
            .map(|(_, t)| t.clone())
            .collect())
    }

    /// Sources linking to `target`, oldest link first.
    pub fn sources_for_target<T: RecordKey>(&self, target: T) -> Result<Vec<String>> {
        let target = normalize_id(&target, self.max_id_len)?;
        Ok(self
            .links
            .iter()
            .filter(|(_, t)| t.as_str() == target.as_ref())
            .map(|(s, _)| s.clone())
            .collect())
    }

    /// Drop every link whose source is `source`.
    pub fn delete_by_source<S: RecordKey>(&mut self, source: S) -> Result<()> {
        let source = normalize_id(&source, self.max_id_len)?;
        self.links.retain(|(s, _)| s.as_str() != source.as_ref());
        Ok(())
    }

    /// Drop every link whose target is `target`.
    pub fn delete_by_target<T: RecordKey>(&mut self, target: T) -> Result<()> {
        let target = normalize_id(&target, self.max_id_len)?;
        self.links.retain(|(_, t)| t.as_str() != target.as_ref());
        Ok(())
    }

    /// All links, oldest first.
    pub fn links(&self) -> &[(String, String)] {
        &self.links
    }

    /// Maximum number of links held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of links held.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the store holds no links.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
