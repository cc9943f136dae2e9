//! Error types for filelock.

use thiserror::Error;

/// Common error type for filelock.
#[derive(Error, Debug)]
pub enum FilelockError {
    /// The acting owner does not own the resource, or presented the wrong key.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// A required field is missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The upload session is not tracked (never existed, expired, abandoned,
    /// already completed, or lost in a restart).
    #[error("unknown upload session: {0}")]
    UnknownSession(String),

    /// Assembly was requested before every chunk arrived.
    #[error("upload incomplete: {received} of {total} chunks received")]
    IncompleteUpload {
        /// Distinct chunks received so far.
        received: u32,
        /// Chunks declared at init.
        total: u32,
    },

    /// Chunks on disk do not add up to the declared upload.
    #[error("corrupt upload: {0}")]
    CorruptUpload(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for FilelockError {
    fn from(e: sqlx::Error) -> Self {
        FilelockError::Database(e.to_string())
    }
}

/// Result type alias for filelock operations.
pub type Result<T> = std::result::Result<T, FilelockError>;
