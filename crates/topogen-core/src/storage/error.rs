//! Storage client error taxonomy.

use thiserror::Error;

/// Errors that can occur during storage operations.
///
/// The taxonomy maps to recovery strategies: `Configuration` is fatal
/// before any write, `Connection` is retryable by re-running the whole
/// generation (all writes are idempotent), `Query` indicates a statement
/// bug and is never retried automatically, `Batch` means an atomic batch
/// failed entirely with no partial state to clean up.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {status} - {message}")]
    Query { status: String, message: String },

    #[error("Batch write failed: {0}")]
    Batch(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl StorageError {
    /// Backend rejected a statement.
    pub fn query(status: impl Into<String>, message: impl Into<String>) -> Self {
        StorageError::Query {
            status: status.into(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Connection(err.to_string())
    }
}
