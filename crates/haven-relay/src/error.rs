//! Error types for the relay module.

use thiserror::Error;

/// Errors surfaced by the relay and its broker backends.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The connection id is not registered with this relay instance.
    #[error("unknown connection: {0}")]
    UnknownConnection(u64),

    /// A publish was attempted on a channel the connection never joined.
    #[error("not subscribed to channel: {0}")]
    NotSubscribed(String),

    /// The broker backend failed.
    #[error("broker error: {0}")]
    Broker(String),

    /// The relay has been shut down.
    #[error("relay is shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, RelayError>;
