//! Identity derivation.
//!
//! Users are never persisted as live objects. A [`User`] is recomputed per
//! request from submitted credentials and the network salt; only a directory
//! record keyed by [`Handle`] is stored externally.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain prefix for handle derivation.
const HANDLE_DOMAIN: &str = "haven/handle/v1:";

/// Domain prefix for password hashing. Distinct from the handle domain so
/// one output is never derivable from the other.
const PASSWORD_DOMAIN: &str = "haven/password/v1:";

/// A derived, stable user identifier.
///
/// Computed as hex(Blake3(domain || salt || "." || username)). Hex output is
/// printable and free of reserved characters, so a handle is safe to use
/// both as a storage key and as a write-allowlist entry.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// Derive a handle from a username and the network salt.
    ///
    /// Deterministic: identical inputs always produce identical handles.
    pub fn derive(username: &str, salt: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(HANDLE_DOMAIN.as_bytes());
        hasher.update(salt.as_bytes());
        hasher.update(b".");
        hasher.update(username.as_bytes());
        Self(hex::encode(hasher.finalize().as_bytes()))
    }

    /// Wrap an already-derived handle (e.g. read back from an allowlist).
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The handle as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", &self.0[..self.0.len().min(16)])
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A salted one-way password hash.
///
/// Lives in a separate hash domain from [`Handle`]; knowing a user's handle
/// gives no purchase on their password hash.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Derive the password hash for a password and the network salt.
    pub fn derive(password: &str, salt: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(PASSWORD_DOMAIN.as_bytes());
        hasher.update(salt.as_bytes());
        hasher.update(b":");
        hasher.update(password.as_bytes());
        Self(hex::encode(hasher.finalize().as_bytes()))
    }

    /// Wrap a stored hash string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print hash material in logs.
        write!(f, "PasswordHash(..)")
    }
}

/// A user identity recomputed per request from submitted credentials.
#[derive(Debug, Clone)]
pub struct User {
    /// The username as submitted.
    pub username: String,
    /// Derived stable handle.
    pub handle: Handle,
    /// Salted one-way password hash.
    pub password_hash: PasswordHash,
    /// The network this identity belongs to.
    pub network_id: String,
}

impl User {
    /// Build a user from credentials and network parameters.
    pub fn new(username: &str, password: &str, salt: &str, network_id: &str) -> Self {
        Self {
            username: username.to_string(),
            handle: Handle::derive(username, salt),
            password_hash: PasswordHash::derive(password, salt),
            network_id: network_id.to_string(),
        }
    }
}
