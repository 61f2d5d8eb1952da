//! Error types for the Haven gateway.

use haven_core::CoreError;
use haven_relay::RelayError;
use haven_store::StoreError;
use haven_verify::VerifyError;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during gateway operations.
#[derive(Debug, Error)]
pub enum HavenError {
    /// Access check failed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Head verification failed.
    #[error("verification error: {0}")]
    Verify(#[from] VerifyError),

    /// Relay error.
    #[error("relay error: {0}")]
    Relay(#[from] RelayError),

    /// The auth header was missing or not in the expected scheme.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Credentials name an existing user but do not match its record.
    #[error("Invalid username or password")]
    InvalidUserPassword,

    /// The request was structurally invalid.
    #[error("Invalid request")]
    InvalidRequest,

    /// User directory I/O failure.
    #[error("directory error: {0}")]
    Io(#[from] std::io::Error),

    /// User record could not be parsed.
    #[error("record error: {0}")]
    Record(#[from] serde_json::Error),
}

impl HavenError {
    /// The client-facing message for this error.
    ///
    /// Internal failure detail never crosses the trust boundary; callers
    /// only learn which class of rejection they hit.
    pub fn message(&self) -> &'static str {
        match self {
            HavenError::Core(CoreError::Unauthorized) => "Unauthorized",
            HavenError::InvalidCredentials => "Invalid credentials",
            HavenError::InvalidUserPassword => "Invalid username or password",
            _ => "Invalid request",
        }
    }

    /// The HTTP-style status hint for this error. Every rejection maps to
    /// the same status so probes cannot distinguish "exists but gated"
    /// from "malformed".
    pub fn status_hint(&self) -> u16 {
        403
    }

    /// The uniform wire-shaped error body.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status: "error",
            message: self.message(),
        }
    }
}

/// Uniform error body returned for every rejected operation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: &'static str,
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, HavenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_partition_by_class() {
        assert_eq!(HavenError::Core(CoreError::Unauthorized).message(), "Unauthorized");
        assert_eq!(HavenError::InvalidCredentials.message(), "Invalid credentials");
        assert_eq!(
            HavenError::InvalidUserPassword.message(),
            "Invalid username or password"
        );
        assert_eq!(HavenError::InvalidRequest.message(), "Invalid request");
    }

    #[test]
    fn test_error_body_shape() {
        let body = HavenError::InvalidRequest.body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "error", "message": "Invalid request" })
        );
    }

    #[test]
    fn test_internal_detail_is_not_leaked() {
        let err = HavenError::Verify(VerifyError::InvalidSignature);
        assert_eq!(err.message(), "Invalid request");
        assert_eq!(err.status_hint(), 403);
    }
}
