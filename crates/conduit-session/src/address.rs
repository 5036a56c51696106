//! Per-address session quotas.
//!
//! Sessions are attributed to the client address that last used them. Each
//! normalized address may own at most `max_per_address` live sessions; going
//! over evicts that address's oldest-attributed session from the priority
//! queue, whatever its global recency.
//!
//! The index reacts to three events raised by the container:
//! - [`on_session_added`](AddressQuotaIndex::on_session_added)
//! - [`on_session_removed`](AddressQuotaIndex::on_session_removed)
//! - [`on_session_touched`](AddressQuotaIndex::on_session_touched)

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::queue::{IndexedPriorityQueue, QueueItem};

/// Reduce a client address to its quota bucket.
///
/// IPv4 addresses are kept as-is. IPv6 addresses collapse to their /64
/// prefix (`2001:db8:1:2::/64`), so every host on one network shares a
/// bucket. IPv4-mapped IPv6 addresses count as their IPv4 form. Already
/// normalized values come back unchanged.
pub fn normalize_address(address: &str) -> String {
    let address = address.trim();
    if address.ends_with("/64") {
        return address.to_string();
    }
    match address.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => v4.to_string(),
        Ok(IpAddr::V6(v6)) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.to_string(),
            None => {
                let s = v6.segments();
                format!("{:x}:{:x}:{:x}:{:x}::/64", s[0], s[1], s[2], s[3])
            }
        },
        // Unparseable input: fall back to textual grouping.
        Err(_) if address.contains(':') => {
            let groups: Vec<&str> = address.split(':').collect();
            if groups.len() >= 4 {
                format!("{}::/64", groups[..4].join(":"))
            } else {
                format!("{address}/64")
            }
        }
        Err(_) => address.to_string(),
    }
}

/// Normalized address → session ids attributed to it, oldest first.
#[derive(Debug, Clone)]
pub struct AddressQuotaIndex {
    max_per_address: usize,
    sessions: HashMap<String, VecDeque<String>>,
}

impl AddressQuotaIndex {
    /// Create an index. `max_per_address` must be at least 1.
    pub fn new(max_per_address: usize) -> Result<Self> {
        if max_per_address < 1 {
            return Err(Error::InvalidConfig(format!(
                "max_sessions_per_address is set to {max_per_address}, you need at least one"
            )));
        }
        Ok(Self {
            max_per_address,
            sessions: HashMap::new(),
        })
    }

    /// The per-address session cap.
    pub fn max_per_address(&self) -> usize {
        self.max_per_address
    }

    /// Number of addresses with at least one session.
    pub fn address_count(&self) -> usize {
        self.sessions.len()
    }

    /// Session ids attributed to `address`, oldest first.
    pub fn sessions_for(&self, address: &str) -> Vec<&str> {
        self.sessions
            .get(&normalize_address(address))
            .map(|ids| ids.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Record a freshly pushed session.
    ///
    /// Returns the sessions evicted from `queue` to bring the address back
    /// under its cap. Sessions without an address are not tracked.
    pub fn on_session_added<P>(
        &mut self,
        queue: &mut IndexedPriorityQueue<P>,
        session_id: &str,
        address: Option<&str>,
    ) -> Result<Vec<QueueItem<P>>> {
        let Some(address) = address.filter(|a| !a.is_empty()) else {
            debug!(session_id = %session_id, "Address bookkeeping skipped, no client address");
            return Ok(Vec::new());
        };
        let normalized = normalize_address(address);
        self.sessions
            .entry(normalized.clone())
            .or_default()
            .push_back(session_id.to_string());
        let evicted = self.enforce_cap(queue, &normalized)?;
        debug!(
            session_id = %session_id,
            address = %normalized,
            sessions = self.sessions.get(&normalized).map_or(0, VecDeque::len),
            sessions_removed = evicted.len(),
            "Session attributed to address"
        );
        Ok(evicted)
    }

    /// Forget a session that left the queue.
    pub fn on_session_removed(&mut self, session_id: &str, address: Option<&str>) {
        let Some(address) = address.filter(|a| !a.is_empty()) else {
            return;
        };
        let normalized = normalize_address(address);
        self.detach(session_id, &normalized);
        debug!(session_id = %session_id, address = %normalized, "Session detached from address");
    }

    /// Refresh a session's attribution after an access from `address`.
    ///
    /// Same address: the session moves to the back of that address's list.
    /// Different address: the session is reattributed, which can evict some
    /// other session now over the new address's cap.
    pub fn on_session_touched<P>(
        &mut self,
        queue: &mut IndexedPriorityQueue<P>,
        session_id: &str,
        address: Option<&str>,
    ) -> Result<Vec<QueueItem<P>>> {
        let Some(address) = address.filter(|a| !a.is_empty()) else {
            return Ok(Vec::new());
        };
        let normalized = normalize_address(address);
        let saved = queue.owner_address(session_id)?.map(str::to_string);

        if saved.as_deref() == Some(normalized.as_str()) {
            let ids = self.sessions.entry(normalized).or_default();
            ids.retain(|id| id != session_id);
            ids.push_back(session_id.to_string());
            return Ok(Vec::new());
        }

        debug!(
            session_id = %session_id,
            saved_address = ?saved,
            address = %normalized,
            "Reattributing session to new address"
        );
        queue.set_owner_address(session_id, Some(normalized.clone()))?;
        if let Some(saved) = saved.as_deref() {
            self.detach(session_id, saved);
        }
        let ids = self.sessions.entry(normalized.clone()).or_default();
        ids.retain(|id| id != session_id);
        ids.push_back(session_id.to_string());
        self.enforce_cap(queue, &normalized)
    }

    fn detach(&mut self, session_id: &str, normalized: &str) {
        if let Some(ids) = self.sessions.get_mut(normalized) {
            ids.retain(|id| id != session_id);
            if ids.is_empty() {
                self.sessions.remove(normalized);
            }
        }
    }

    fn enforce_cap<P>(
        &mut self,
        queue: &mut IndexedPriorityQueue<P>,
        normalized: &str,
    ) -> Result<Vec<QueueItem<P>>> {
        let mut evicted = Vec::new();
        let Some(ids) = self.sessions.get_mut(normalized) else {
            return Ok(evicted);
        };
        while ids.len() > self.max_per_address {
            let Some(oldest) = ids.pop_front() else {
                break;
            };
            let item = queue.remove(&oldest)?;
            warn!(
                rate_limit = "sessions_per_address",
                address = %normalized,
                max_sessions_per_address = self.max_per_address,
                evicted_session_id = %item.session_id,
                "Address session quota reached, evicting oldest session"
            );
            evicted.push(item);
        }
        Ok(evicted)
    }

    /// Check that every listed session is queued under the same address and
    /// that no list is empty or over the cap.
    #[cfg(test)]
    pub(crate) fn check_invariants<P>(
        &self,
        queue: &IndexedPriorityQueue<P>,
    ) -> std::result::Result<(), String> {
        let mut listed = 0;
        for (address, ids) in &self.sessions {
            if ids.is_empty() {
                return Err(format!("empty list kept for {address}"));
            }
            if ids.len() > self.max_per_address {
                return Err(format!("{address} holds {} sessions", ids.len()));
            }
            for id in ids {
                match queue.owner_address(id) {
                    Ok(Some(owner)) if owner == address => listed += 1,
                    other => return Err(format!("{id} listed under {address}, queue says {other:?}")),
                }
            }
        }
        let owned = queue.iter().filter(|item| item.owner_address.is_some()).count();
        if owned != listed {
            return Err(format!("{owned} owned sessions but {listed} listed"));
        }
        Ok(())
    }
}
