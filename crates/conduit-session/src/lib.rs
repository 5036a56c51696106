//! Per-session storage container with LRU eviction and address quotas.
//!
//! This crate keeps one [`SessionData`](conduit_store::SessionData) per
//! client session with:
//! - Global least-recently-used eviction once `max_sessions` is reached
//! - A per-address cap on live sessions (IPv6 grouped by /64)
//! - Token bindings so a bearer token finds its session without a cookie
//! - Credential lookup across sessions, so login survives eviction
//! - JSON snapshots written on shutdown and consumed on startup
//!
//! # Example
//!
//! ```rust,ignore
//! use conduit_session::{ContainerConfig, SessionContainer};
//!
//! let config = ContainerConfig::default()
//!     .with_max_sessions(1000)
//!     .with_max_sessions_per_address(10);
//!
//! let mut sessions = SessionContainer::new(config)?;
//! let resolved = sessions.get_or_create_session(cookie, Some("203.0.113.7"), token)?;
//! resolved.data.write().users.add(user)?;
//! ```

mod address;
mod clock;
mod config;
mod container;
mod error;
mod queue;
mod shared;
mod snapshot;
mod tokens;

pub use address::{AddressQuotaIndex, normalize_address};
pub use clock::MonotonicClock;
pub use config::{ContainerConfig, DEFAULT_MAX_SESSIONS, DEFAULT_MAX_SESSIONS_PER_ADDRESS};
pub use container::{ContainerStats, ResolvedSession, SessionContainer, SharedSessionData};
pub use error::{Error, Result};
pub use queue::{IndexedPriorityQueue, Priority, QueueItem};
pub use shared::SharedContainer;
pub use snapshot::{
    ObjectStoreSnapshot, SHARED_SESSION_ID, SessionSnapshot, Snapshot, read_snapshot_file,
    write_snapshot_file,
};
pub use tokens::TokenBindingTable;
