//! One session's isolated dataset.

use crate::error::Result;
use crate::id::DEFAULT_MAX_ID_LEN;
use crate::links::BoundedRelationStore;
use crate::objects::BoundedObjectStore;
use crate::records::{Article, Comment, User};

/// Default number of users kept per session.
pub const DEFAULT_MAX_USERS: usize = 60;
/// Default number of articles kept per session.
pub const DEFAULT_MAX_ARTICLES: usize = 20;
/// Default number of comments kept per session.
pub const DEFAULT_MAX_COMMENTS: usize = 20;
/// Default number of follow links kept per session.
pub const DEFAULT_MAX_FOLLOWS: usize = 100;
/// Default number of favorite links kept per session.
pub const DEFAULT_MAX_FAVORITES: usize = 100;

/// Per-store capacities and the id length bound shared by all stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLimits {
    pub max_users: usize,
    pub max_articles: usize,
    pub max_comments: usize,
    pub max_follows: usize,
    pub max_favorites: usize,
    pub max_id_len: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_users: DEFAULT_MAX_USERS,
            max_articles: DEFAULT_MAX_ARTICLES,
            max_comments: DEFAULT_MAX_COMMENTS,
            max_follows: DEFAULT_MAX_FOLLOWS,
            max_favorites: DEFAULT_MAX_FAVORITES,
            max_id_len: DEFAULT_MAX_ID_LEN,
        }
    }
}

impl StoreLimits {
    /// Create limits with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user store capacity.
    pub fn with_max_users(mut self, max: usize) -> Self {
        self.max_users = max;
        self
    }

    /// Set the article store capacity.
    pub fn with_max_articles(mut self, max: usize) -> Self {
        self.max_articles = max;
        self
    }

    /// Set the comment store capacity.
    pub fn with_max_comments(mut self, max: usize) -> Self {
        self.max_comments = max;
        self
    }

    /// Set the follow link capacity.
    pub fn with_max_follows(mut self, max: usize) -> Self {
        self.max_follows = max;
        self
    }

    /// Set the favorite link capacity.
    pub fn with_max_favorites(mut self, max: usize) -> Self {
        self.max_favorites = max;
        self
    }

    /// Set the maximum id length.
    pub fn with_max_id_len(mut self, max: usize) -> Self {
        self.max_id_len = max;
        self
    }
}

/// The five bounded stores making up one tenant's data.
///
/// Stores are independent: referential cleanup (e.g. dropping an article's
/// comments and favorites when it is deleted) belongs to the caller.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub users: BoundedObjectStore<User>,
    pub articles: BoundedObjectStore<Article>,
    pub comments: BoundedObjectStore<Comment>,
    /// user id -> followed user id
    pub follows: BoundedRelationStore,
    /// user id -> favorited article id
    pub favorites: BoundedRelationStore,
}

impl SessionData {
    /// Create empty stores sized by `limits`.
    pub fn new(limits: &StoreLimits) -> Result<Self> {
        Ok(Self {
            users: BoundedObjectStore::new("users", limits.max_users, limits.max_id_len)?,
            articles: BoundedObjectStore::new("articles", limits.max_articles, limits.max_id_len)?,
            comments: BoundedObjectStore::new("comments", limits.max_comments, limits.max_id_len)?,
            follows: BoundedRelationStore::new("follows", limits.max_follows, limits.max_id_len),
            favorites: BoundedRelationStore::new(
                "favorites",
                limits.max_favorites,
                limits.max_id_len,
            ),
        })
    }

    /// Find a user by login credentials without touching recency.
    pub fn find_user_by_credentials(&self, email: &str, hashed_password: &str) -> Option<&User> {
        self.users
            .values()
            .find(|user| user.has_credentials(email, hashed_password))
    }
}
