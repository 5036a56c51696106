//! Error types for bounded store operations.

/// Error type for bounded store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A store was configured with a capacity it cannot honor.
    #[error("invalid capacity for {store}: {capacity}")]
    InvalidCapacity { store: &'static str, capacity: usize },

    /// An identifier exceeds the configured maximum length.
    #[error("id is too long: {len} characters (max {max})")]
    IdTooLong { len: usize, max: usize },

    /// The id counter would render past the configured maximum length.
    #[error("cannot allocate id: counter exceeds {max} digits")]
    IdSpaceExhausted { max: usize },
}

/// Result type for bounded store operations.
pub type Result<T> = std::result::Result<T, Error>;
