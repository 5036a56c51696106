//! Indexed binary min-heap keyed by session id.
//!
//! A plain binary heap only supports removing its root. Session eviction also
//! needs to bump an arbitrary session's priority on every access and to pull
//! an arbitrary session out when its address exceeds its quota, so every
//! item's array position is mirrored in an id → position map:
//!
//! ```text
//!   heap:  [ (3,"d") , (5,"b") , (15,"c") , (10,"a") ]
//!             0          1          2           3
//!   index: { "d": 0, "b": 1, "c": 2, "a": 3 }
//! ```
//!
//! All moves go through one swap routine that updates the array, the item's
//! stored position and the map together, so the three never disagree between
//! calls.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Recency timestamp; lower is older and is evicted first.
pub type Priority = u64;

/// One tracked session.
#[derive(Debug, Clone)]
pub struct QueueItem<P> {
    /// Recency timestamp.
    pub priority: Priority,
    /// Session id (unique within the queue).
    pub session_id: String,
    /// Session payload; `None` for bare bookkeeping entries.
    pub payload: Option<P>,
    /// Current index in the heap array.
    pub position: usize,
    /// Normalized address the session is attributed to, if any.
    pub owner_address: Option<String>,
}

/// Min-heap over session priorities with O(log n) update and removal by id.
///
/// Ordering between equal priorities is unspecified.
#[derive(Debug, Clone)]
pub struct IndexedPriorityQueue<P> {
    heap: Vec<QueueItem<P>>,
    index: HashMap<String, usize>,
}

impl<P> Default for IndexedPriorityQueue<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> IndexedPriorityQueue<P> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no sessions are tracked.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Whether `session_id` is tracked.
    pub fn contains(&self, session_id: &str) -> bool {
        self.index.contains_key(session_id)
    }

    /// Look up an item by id.
    pub fn get(&self, session_id: &str) -> Option<&QueueItem<P>> {
        self.index.get(session_id).map(|&pos| &self.heap[pos])
    }

    /// The payload of a tracked session.
    pub fn payload(&self, session_id: &str) -> Option<&P> {
        self.get(session_id).and_then(|item| item.payload.as_ref())
    }

    /// The item with the lowest priority.
    pub fn peek(&self) -> Option<&QueueItem<P>> {
        self.heap.first()
    }

    /// The lowest priority in the queue.
    pub fn peek_priority(&self) -> Option<Priority> {
        self.heap.first().map(|item| item.priority)
    }

    /// Items in heap-array order (not sorted).
    pub fn iter(&self) -> impl Iterator<Item = &QueueItem<P>> {
        self.heap.iter()
    }

    /// Insert a new session and restore heap order by sifting up.
    pub fn push(
        &mut self,
        priority: Priority,
        session_id: impl Into<String>,
        payload: Option<P>,
        owner_address: Option<String>,
    ) -> Result<()> {
        let session_id = session_id.into();
        if self.index.contains_key(&session_id) {
            return Err(Error::AlreadyQueued(session_id));
        }
        let position = self.heap.len();
        self.index.insert(session_id.clone(), position);
        self.heap.push(QueueItem {
            priority,
            session_id,
            payload,
            position,
            owner_address,
        });
        self.sift_up(position);
        Ok(())
    }

    /// Remove and return the lowest-priority item.
    pub fn pop(&mut self) -> Option<QueueItem<P>> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let root = self.heap.pop()?;
        self.index.remove(&root.session_id);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(root)
    }

    /// Change a session's priority, sifting up or down as needed.
    pub fn update_priority(&mut self, session_id: &str, priority: Priority) -> Result<()> {
        let position = self.position_of(session_id)?;
        let old = self.heap[position].priority;
        self.heap[position].priority = priority;
        if priority < old {
            self.sift_up(position);
        } else if priority > old {
            self.sift_down(position);
        }
        Ok(())
    }

    /// Remove an arbitrary session regardless of its priority.
    pub fn remove(&mut self, session_id: &str) -> Result<QueueItem<P>> {
        let position = self.position_of(session_id)?;
        let last = self.heap.len() - 1;
        self.swap(position, last);
        let item = self
            .heap
            .pop()
            .ok_or_else(|| Error::NotFound(session_id.to_string()))?;
        self.index.remove(&item.session_id);
        if position < self.heap.len() {
            self.restore(position);
        }
        Ok(item)
    }

    /// The address a session is attributed to.
    pub fn owner_address(&self, session_id: &str) -> Result<Option<&str>> {
        let position = self.position_of(session_id)?;
        Ok(self.heap[position].owner_address.as_deref())
    }

    /// Reattribute a session to another address.
    pub fn set_owner_address(&mut self, session_id: &str, address: Option<String>) -> Result<()> {
        let position = self.position_of(session_id)?;
        self.heap[position].owner_address = address;
        Ok(())
    }

    /// Pop every item, oldest first, leaving the queue empty.
    pub fn drain_ordered(&mut self) -> Vec<QueueItem<P>> {
        let mut items = Vec::with_capacity(self.heap.len());
        while let Some(item) = self.pop() {
            items.push(item);
        }
        items
    }

    fn position_of(&self, session_id: &str) -> Result<usize> {
        self.index
            .get(session_id)
            .copied()
            .ok_or_else(|| Error::NotFound(session_id.to_string()))
    }

    fn restore(&mut self, position: usize) {
        if position > 0 && self.heap[position].priority < self.heap[(position - 1) / 2].priority {
            self.sift_up(position);
        } else {
            self.sift_down(position);
        }
    }

    fn sift_up(&mut self, mut position: usize) {
        while position > 0 {
            let parent = (position - 1) / 2;
            if self.heap[position].priority >= self.heap[parent].priority {
                break;
            }
            self.swap(position, parent);
            position = parent;
        }
    }

    fn sift_down(&mut self, mut position: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * position + 1;
            let right = left + 1;
            let mut smallest = position;
            if left < len && self.heap[left].priority < self.heap[smallest].priority {
                smallest = left;
            }
            if right < len && self.heap[right].priority < self.heap[smallest].priority {
                smallest = right;
            }
            if smallest == position {
                break;
            }
            self.swap(position, smallest);
            position = smallest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        self.heap[a].position = a;
        self.heap[b].position = b;
        self.index.insert(self.heap[a].session_id.clone(), a);
        self.index.insert(self.heap[b].session_id.clone(), b);
    }

    /// Check the heap order and the index map against the array.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.index.len() != self.heap.len() {
            return Err(format!(
                "index has {} entries, heap has {}",
                self.index.len(),
                self.heap.len()
            ));
        }
        for (i, item) in self.heap.iter().enumerate() {
            if item.position != i {
                return Err(format!("{} stores position {} at {i}", item.session_id, item.position));
            }
            if self.index.get(&item.session_id) != Some(&i) {
                return Err(format!("index disagrees for {}", item.session_id));
            }
            for child in [2 * i + 1, 2 * i + 2] {
                if child < self.heap.len() && self.heap[child].priority < item.priority {
                    return Err(format!("heap order broken between {i} and {child}"));
                }
            }
        }
        Ok(())
    }
}
