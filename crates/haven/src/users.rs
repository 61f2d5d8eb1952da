//! File-backed user directory.
//!
//! One JSON record per user, keyed by derived handle. Records store only
//! derived material (handle, password hash, network id); the raw username
//! and password never reach disk.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::debug;

use haven_core::{Handle, PasswordHash, User};

use crate::error::{HavenError, Result};

/// Persisted user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "userId")]
    pub user_id: Handle,
    pub password: PasswordHash,
    #[serde(rename = "networkId")]
    pub network_id: String,
}

/// Result of an authentication attempt.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub record: UserRecord,
    /// True when this attempt created the record (first login).
    pub created: bool,
}

/// Directory of user records on the local filesystem.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    dir: PathBuf,
}

impl UserDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Authenticate a derived user, registering it on first contact.
    ///
    /// An existing record must match both the password hash and the network
    /// id; a mismatch on either is reported identically so callers cannot
    /// probe which field was wrong.
    pub async fn authenticate(&self, user: &User) -> Result<AuthOutcome> {
        let path = self.record_path(&user.handle);
        let dir = self.dir.clone();
        let candidate = UserRecord {
            user_id: user.handle.clone(),
            password: user.password_hash.clone(),
            network_id: user.network_id.clone(),
        };

        task::spawn_blocking(move || {
            if path.exists() {
                let raw = std::fs::read_to_string(&path)?;
                let record: UserRecord = serde_json::from_str(&raw)?;
                if record.password != candidate.password
                    || record.network_id != candidate.network_id
                {
                    return Err(HavenError::InvalidUserPassword);
                }
                Ok(AuthOutcome {
                    record,
                    created: false,
                })
            } else {
                std::fs::create_dir_all(&dir)?;
                std::fs::write(&path, serde_json::to_vec(&candidate)?)?;
                debug!(handle = %candidate.user_id, "registered new user");
                Ok(AuthOutcome {
                    record: candidate,
                    created: true,
                })
            }
        })
        .await
        .map_err(|e| HavenError::Io(std::io::Error::other(e)))?
    }

    fn record_path(&self, handle: &Handle) -> PathBuf {
        // Handles are hex, so they are safe as file names.
        self.dir.join(format!("{}.json", handle.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user(name: &str, password: &str) -> User {
        User::new(name, password, "salt", "net-1")
    }

    #[tokio::test]
    async fn first_login_creates_record() {
        let dir = TempDir::new().unwrap();
        let users = UserDirectory::new(dir.path());

        let outcome = users.authenticate(&user("alice", "pw")).await.unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.record.user_id, Handle::derive("alice", "salt"));
    }

    #[tokio::test]
    async fn repeat_login_matches_record() {
        let dir = TempDir::new().unwrap();
        let users = UserDirectory::new(dir.path());

        users.authenticate(&user("alice", "pw")).await.unwrap();
        let outcome = users.authenticate(&user("alice", "pw")).await.unwrap();
        assert!(!outcome.created);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let dir = TempDir::new().unwrap();
        let users = UserDirectory::new(dir.path());

        users.authenticate(&user("alice", "pw")).await.unwrap();
        let err = users.authenticate(&user("alice", "other")).await.unwrap_err();
        assert!(matches!(err, HavenError::InvalidUserPassword));
    }

    #[tokio::test]
    async fn wrong_network_is_rejected() {
        let dir = TempDir::new().unwrap();
        let users = UserDirectory::new(dir.path());

        users.authenticate(&user("alice", "pw")).await.unwrap();
        let other_net = User::new("alice", "pw", "salt", "net-2");
        let err = users.authenticate(&other_net).await.unwrap_err();
        assert!(matches!(err, HavenError::InvalidUserPassword));
    }

    #[tokio::test]
    async fn record_survives_on_disk() {
        let dir = TempDir::new().unwrap();
        {
            let users = UserDirectory::new(dir.path());
            users.authenticate(&user("alice", "pw")).await.unwrap();
        }
        let users = UserDirectory::new(dir.path());
        let outcome = users.authenticate(&user("alice", "pw")).await.unwrap();
        assert!(!outcome.created);
    }
}
