//! Capacity-bounded in-memory stores backing each Conduit session.
//!
//! Every session owns a [`SessionData`]: three keyed object stores (users,
//! articles, comments) and two link stores (follows, favorites). Each store
//! has a fixed capacity and evicts its oldest entry instead of rejecting
//! writes, so one tenant can never grow without bound.
//!
//! # Example
//!
//! ```rust,ignore
//! use conduit_store::{SessionData, StoreLimits, User, hash_password};
//!
//! let mut data = SessionData::new(&StoreLimits::default())?;
//! let id = data.users.add(User::new("a@example.com", "alice", hash_password("pw")))?;
//! data.follows.add(&id, "2")?;
//! ```

pub mod demo;

mod data;
mod error;
mod id;
mod links;
mod objects;
mod records;

pub use data::{
    DEFAULT_MAX_ARTICLES, DEFAULT_MAX_COMMENTS, DEFAULT_MAX_FAVORITES, DEFAULT_MAX_FOLLOWS,
    DEFAULT_MAX_USERS, SessionData, StoreLimits,
};
pub use error::{Error, Result};
pub use id::{DEFAULT_MAX_ID_LEN, RecordKey, normalize_id};
pub use links::BoundedRelationStore;
pub use objects::BoundedObjectStore;
pub use records::{Article, Comment, Record, User, hash_password};
