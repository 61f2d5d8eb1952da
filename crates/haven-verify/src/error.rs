//! Error types for the verification module.

use thiserror::Error;

/// Errors that can occur while validating a candidate head.
///
/// Callers must not surface these verbatim; they all collapse into a single
/// "Invalid request" failure class at the boundary.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The candidate address could not be resolved.
    #[error("unresolvable content address: {0}")]
    Unresolvable(String),

    /// The resolved bytes are not a well-formed envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The envelope sequence does not advance the channel sequence.
    #[error("stale sequence: candidate {candidate} <= current {current}")]
    StaleSequence { candidate: i64, current: i64 },

    /// The author public key is not a valid Ed25519 key.
    #[error("invalid author key")]
    InvalidKey,

    /// Signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,
}

/// Result type for verification operations.
pub type Result<T> = std::result::Result<T, VerifyError>;
