//! Error types for session container operations.

/// Error type for session container operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The session id is not tracked by the priority queue.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The session id is already tracked by the priority queue.
    #[error("Session already queued: {0}")]
    AlreadyQueued(String),

    /// The container was configured with unusable limits.
    #[error("Invalid container configuration: {0}")]
    InvalidConfig(String),

    /// Error from one of the session's bounded stores.
    #[error("Store error: {0}")]
    Store(#[from] conduit_store::Error),

    /// Failed to read, write, or delete the snapshot file.
    #[error("Snapshot file error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// The snapshot file could not be encoded or decoded.
    #[error("Snapshot format error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Result type for session container operations.
pub type Result<T> = std::result::Result<T, Error>;
