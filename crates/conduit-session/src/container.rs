//! Session container façade.
//!
//! Coordinates the three bookkeeping structures:
//!
//! - [`IndexedPriorityQueue`]: every live session, ordered by last access
//! - [`AddressQuotaIndex`]: which sessions each client address owns
//! - [`TokenBindingTable`]: which session a bearer token was issued for
//!
//! Every structural change goes through [`SessionContainer::insert_session`]
//! or the touch path in [`SessionContainer::get_or_create_session`], which
//! raise the matching address events so the three never drift apart.

use std::sync::Arc;

use conduit_store::{SessionData, demo};
use parking_lot::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::address::{AddressQuotaIndex, normalize_address};
use crate::clock::MonotonicClock;
use crate::config::ContainerConfig;
use crate::error::{Error, Result};
use crate::queue::{IndexedPriorityQueue, QueueItem};
use crate::tokens::TokenBindingTable;

/// Session data shared between every session id that references it.
///
/// Several ids can point at the same data (one per device after a login);
/// the data lives as long as any of them is still queued.
pub type SharedSessionData = Arc<RwLock<SessionData>>;

/// Outcome of resolving a request to its session.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    /// The session id, or `None` when isolation is disabled.
    pub session_id: Option<String>,
    /// The session's data.
    pub data: SharedSessionData,
    /// Whether the session was created by this call.
    pub created: bool,
    /// Sessions evicted as a side effect, in eviction order.
    pub evicted: Vec<String>,
}

/// Container occupancy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerStats {
    /// Number of live sessions.
    pub sessions: usize,
    /// Number of addresses owning at least one session.
    pub addresses: usize,
    /// Number of token bindings, including stale ones.
    pub token_bindings: usize,
    /// Global session cap.
    pub capacity: usize,
}

/// Per-session in-memory storage with global LRU eviction, per-address
/// quotas and token bindings.
///
/// The container is not internally synchronized. Share it behind a lock
/// (see [`SharedContainer`](crate::SharedContainer)).
#[derive(Debug)]
pub struct SessionContainer {
    pub(crate) config: ContainerConfig,
    pub(crate) queue: IndexedPriorityQueue<SharedSessionData>,
    pub(crate) addresses: AddressQuotaIndex,
    pub(crate) tokens: TokenBindingTable,
    pub(crate) shared: Option<SharedSessionData>,
    pub(crate) clock: MonotonicClock,
}

impl SessionContainer {
    /// Create an empty container.
    ///
    /// Fails if the configuration is invalid, including store limits that
    /// [`SessionData::new`] would reject.
    pub fn new(config: ContainerConfig) -> Result<Self> {
        config.validate()?;
        SessionData::new(&config.store_limits)?;
        let addresses = AddressQuotaIndex::new(config.max_sessions_per_address)?;
        let tokens = TokenBindingTable::new(config.max_sessions);
        debug!(
            max_sessions = config.max_sessions,
            max_sessions_per_address = config.max_sessions_per_address,
            disable_isolation = config.disable_isolation,
            "Session container created"
        );
        Ok(Self {
            config,
            queue: IndexedPriorityQueue::new(),
            addresses,
            tokens,
            shared: None,
            clock: MonotonicClock::new(),
        })
    }

    /// The container configuration.
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Whether sessions are isolated from each other.
    pub fn is_isolated(&self) -> bool {
        !self.config.disable_isolation
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether `session_id` is live.
    pub fn contains(&self, session_id: &str) -> bool {
        self.queue.contains(session_id)
    }

    /// A live session's data, without touching its recency.
    pub fn session(&self, session_id: &str) -> Option<SharedSessionData> {
        self.queue.payload(session_id).cloned()
    }

    /// Live session ids attributed to `address`, oldest first.
    pub fn sessions_for_address(&self, address: &str) -> Vec<&str> {
        self.addresses.sessions_for(address)
    }

    /// Current occupancy.
    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            sessions: self.queue.len(),
            addresses: self.addresses.address_count(),
            token_bindings: self.tokens.len(),
            capacity: self.config.max_sessions,
        }
    }

    /// Resolve a request to its session, creating one if needed.
    ///
    /// The target id is the cookie id if given, else the session bound to
    /// `token` if it is still live, else a fresh random id. A live target is
    /// touched (recency and address attribution); a missing one is created,
    /// evicting the globally oldest session first when the container is full.
    pub fn get_or_create_session(
        &mut self,
        cookie_id: Option<&str>,
        address: Option<&str>,
        token: Option<&str>,
    ) -> Result<ResolvedSession> {
        if self.config.disable_isolation {
            let created = self.shared.is_none();
            return Ok(ResolvedSession {
                session_id: None,
                data: self.shared_data()?,
                created,
                evicted: Vec::new(),
            });
        }

        let target = match cookie_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => token
                .and_then(|token| self.tokens.resolve(token, &self.queue))
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        };

        if !self.queue.contains(&target) {
            let data = self.new_session_data()?;
            let evicted = self.insert_session(target.clone(), Arc::clone(&data), address)?;
            return Ok(ResolvedSession {
                session_id: Some(target),
                data,
                created: true,
                evicted,
            });
        }

        let now = self.clock.now();
        self.queue.update_priority(&target, now)?;
        let evicted = ids(
            self.addresses
                .on_session_touched(&mut self.queue, &target, address)?,
        );
        let data = self
            .session(&target)
            .ok_or_else(|| Error::NotFound(target.clone()))?;
        debug!(session_id = %target, "Session touched");
        Ok(ResolvedSession {
            session_id: Some(target),
            data,
            created: false,
            evicted,
        })
    }

    /// Register a fresh session id pointing at existing `data`.
    ///
    /// Used after a login so another device shares the same dataset. The
    /// new session counts against the global cap and `address`'s quota like
    /// any created session.
    pub fn attach_session(
        &mut self,
        data: SharedSessionData,
        address: Option<&str>,
    ) -> Result<ResolvedSession> {
        if self.config.disable_isolation {
            return Ok(ResolvedSession {
                session_id: None,
                data: self.shared_data()?,
                created: false,
                evicted: Vec::new(),
            });
        }
        let session_id = Uuid::new_v4().to_string();
        let evicted = self.insert_session(session_id.clone(), Arc::clone(&data), address)?;
        Ok(ResolvedSession {
            session_id: Some(session_id),
            data,
            created: true,
            evicted,
        })
    }

    /// Find a live session holding a user with these credentials.
    ///
    /// Scans every session's user store in heap order and returns the first
    /// match. Recency is not touched. Always `None` when isolation is
    /// disabled, since there is only one dataset.
    pub fn find_session_by_credentials(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Option<(String, SharedSessionData)> {
        self.queue.iter().find_map(|item| {
            let data = item.payload.as_ref()?;
            data.read()
                .find_user_by_credentials(email, hashed_password)
                .is_some()
                .then(|| (item.session_id.clone(), Arc::clone(data)))
        })
    }

    /// Log in from a new session id: find the dataset holding these
    /// credentials and attach a fresh session to it.
    pub fn recover_by_credentials(
        &mut self,
        email: &str,
        hashed_password: &str,
        address: Option<&str>,
    ) -> Result<Option<ResolvedSession>> {
        let Some((found, data)) = self.find_session_by_credentials(email, hashed_password) else {
            debug!("No live session holds these credentials");
            return Ok(None);
        };
        let resolved = self.attach_session(data, address)?;
        info!(
            found_session_id = %found,
            session_id = ?resolved.session_id,
            "Session recovered by credentials"
        );
        Ok(Some(resolved))
    }

    /// Bind a token to a session. Returns the token evicted to make room.
    ///
    /// No-op when isolation is disabled.
    pub fn bind_token(&mut self, token: &str, session_id: &str) -> Option<String> {
        if self.config.disable_isolation {
            return None;
        }
        self.tokens.bind(token, session_id)
    }

    /// The live session bound to `token`.
    pub fn resolve_token(&self, token: &str) -> Option<&str> {
        self.tokens.resolve(token, &self.queue)
    }

    /// Push a session, evicting first for the global cap and then for the
    /// address quota. Returns evicted session ids in eviction order.
    pub(crate) fn insert_session(
        &mut self,
        session_id: String,
        data: SharedSessionData,
        address: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut evicted = Vec::new();
        if self.queue.len() >= self.config.max_sessions
            && let Some(oldest) = self.queue.pop()
        {
            self.addresses
                .on_session_removed(&oldest.session_id, oldest.owner_address.as_deref());
            info!(
                rate_limit = "max_sessions",
                max_sessions = self.config.max_sessions,
                evicted_session_id = %oldest.session_id,
                "Session limit reached, evicting least recently used session"
            );
            evicted.push(oldest.session_id);
        }

        let address = address.filter(|a| !a.is_empty());
        let priority = self.clock.now();
        self.queue.push(
            priority,
            session_id.clone(),
            Some(data),
            address.map(normalize_address),
        )?;
        evicted.extend(ids(
            self.addresses
                .on_session_added(&mut self.queue, &session_id, address)?,
        ));

        info!(
            session_id = %session_id,
            address = ?address,
            sessions = self.queue.len(),
            "Session created"
        );
        Ok(evicted)
    }

    pub(crate) fn new_session_data(&self) -> Result<SharedSessionData> {
        let mut data = SessionData::new(&self.config.store_limits)?;
        if self.config.populate_demo_data {
            demo::populate(&mut data, &self.config.demo_image)?;
        }
        Ok(Arc::new(RwLock::new(data)))
    }

    fn shared_data(&mut self) -> Result<SharedSessionData> {
        if let Some(data) = &self.shared {
            return Ok(Arc::clone(data));
        }
        let data = self.new_session_data()?;
        self.shared = Some(Arc::clone(&data));
        info!("Shared session data created, isolation disabled");
        Ok(data)
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> std::result::Result<(), String> {
        self.queue.check_invariants()?;
        self.addresses.check_invariants(&self.queue)?;
        if self.queue.len() > self.config.max_sessions {
            return Err(format!("{} sessions over cap", self.queue.len()));
        }
        if self.tokens.len() > self.config.max_sessions {
            return Err(format!("{} token bindings over cap", self.tokens.len()));
        }
        Ok(())
    }
}

fn ids(items: Vec<QueueItem<SharedSessionData>>) -> Vec<String> {
    items.into_iter().map(|item| item.session_id).collect()
}
