//! Error types for Hearth
//!
//! One unified error enum for the whole system, built with `thiserror`.
//! Durability and upstream failures are deliberately non-fatal at the
//! operation boundary (the engine logs and continues); the variants here
//! exist so the lower layers can report precisely what went wrong.

use std::io;
use thiserror::Error;

/// Result type alias for Hearth operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the Hearth server
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations, sockets)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Data corruption detected (torn WAL record, unreadable snapshot)
    #[error("data corruption: {0}")]
    Corruption(String),

    /// Invalid operation or lifecycle state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Upstream origin fetch failed (treated as a cache miss by callers)
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Check whether this error indicates on-disk corruption.
    ///
    /// Corruption stops WAL replay at the faulty record; everything applied
    /// before it stays in memory and truncation-then-snapshot recovers.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption(_))
    }
}
