//! Error taxonomy for the blocking engine.
//!
//! Fetch and pattern failures are recoverable by design of the engine
//! (the previous snapshot stays active, a bad keyword is skipped). Storage
//! failures are always propagated: a caller must never assume a write landed.

/// A remote blocklist could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to reach '{endpoint}': {message}")]
    Unreachable { endpoint: String, message: String },
    #[error("'{endpoint}' responded with HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("Timed out fetching '{endpoint}'")]
    Timeout { endpoint: String },
}

/// A keyword entry that cannot be compiled into a regular expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid keyword pattern '{pattern}': {message}")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

/// The persistence layer failed to read or write a record.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error on '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Corrupt record '{key}': {message}")]
    Corrupt { key: String, message: String },
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, Error>;
