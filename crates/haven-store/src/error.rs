//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// "Not found" is deliberately absent: loading a missing channel yields a
/// fresh channel, never an error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Record serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backend task could not complete.
    #[error("backend unavailable: {0}")]
    Backend(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
