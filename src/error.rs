//! Error types for catalog-harvest
//!
//! Page-level problems (blocking, dropped connections, odd bodies) are not errors:
//! they are reported as [`PageOutcome`](crate::types::PageOutcome) values and absorbed
//! by the retry controller. The variants here cover everything that can actually stop
//! a run or a single operation: bad configuration, client construction, disk I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for catalog-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for catalog-harvest
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "pagination.max_pages")
        key: Option<String>,
    },

    /// The configured search target is neither standards nor plans
    #[error("unknown retrieval target: {0:?} (expected \"standards\" or \"plans\")")]
    UnknownRetrievalTarget(String),

    /// Network error from the HTTP client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A snapshot could not be written to disk
    #[error("failed to write snapshot {path}: {reason}")]
    Snapshot {
        /// Destination path of the snapshot
        path: PathBuf,
        /// What went wrong
        reason: String,
    },
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Whether this error should abort the run before any fetch happens
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::UnknownRetrievalTarget(_)
        )
    }
}
