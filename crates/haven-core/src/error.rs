//! Error types for haven-core.

use thiserror::Error;

/// Errors from channel state and authorization operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// An access check failed. The caller must not learn which facet denied.
    #[error("Unauthorized")]
    Unauthorized,

    /// Channel id is empty or contains reserved characters.
    #[error("invalid channel id: {0}")]
    InvalidChannelId(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
