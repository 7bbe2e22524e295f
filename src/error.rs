//! Error types for habitlog.

use thiserror::Error;

/// Main error type for the habitlog library.
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A referenced record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// The write would violate a uniqueness rule
    #[error("conflict: {0}")]
    Conflict(String),

    /// Input rejected before reaching storage or the statistics engine
    #[error("invalid input: {0}")]
    Validation(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for habitlog.
pub type Result<T> = std::result::Result<T, Error>;
