//! Credential header parsing.
//!
//! Clients authenticate with a `Basic <username>=<password>` header. The
//! scheme predates this implementation and is kept wire-compatible:
//! the username may not contain `=`, the password may.

use crate::error::{HavenError, Result};

/// Parsed client credentials. The raw password lives only as long as the
/// request; derivation into hashes happens in `haven-core`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Parse an auth header of the form `Basic <username>=<password>`.
    pub fn parse(header: &str) -> Result<Self> {
        let rest = header
            .strip_prefix("Basic ")
            .ok_or(HavenError::InvalidCredentials)?;
        let (username, password) = rest
            .split_once('=')
            .ok_or(HavenError::InvalidCredentials)?;
        if username.is_empty() {
            return Err(HavenError::InvalidCredentials);
        }
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}
