//! Channel: a named mutable pointer into a content-addressed log.
//!
//! A channel holds the latest accepted content-address ("head"), a monotonic
//! sequence counter, and its access modes. Channels are lazily materialized:
//! the absence of a stored record is equivalent to a fresh channel.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::identity::Handle;
use crate::modes::ChannelModes;

/// Sequence value of a channel that has never been written.
pub const FRESH_SEQ: i64 = -1;

/// A validated channel identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Validate and wrap a channel id.
    ///
    /// Ids must be non-empty and free of path separators and NUL, so they
    /// are safe as storage keys and broker topics.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.contains('/') || id.contains('\0') {
            return Err(CoreError::InvalidChannelId(id));
        }
        Ok(Self(id))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChannelId({})", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ChannelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Per-channel state: head pointer, sequence counter, and access modes.
///
/// Head and sequence change together via [`Channel::record_head`]; the
/// sequence is non-decreasing across the channel's life.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// The channel identifier.
    pub id: ChannelId,

    /// Latest accepted content-address, if any head was ever written.
    pub head: Option<String>,

    /// Monotonic sequence counter; [`FRESH_SEQ`] means never written.
    pub seq: i64,

    /// Access-mode facets.
    pub modes: ChannelModes,
}

impl Channel {
    /// A channel that has no persisted record yet.
    pub fn fresh(id: ChannelId) -> Self {
        Self {
            id,
            head: None,
            seq: FRESH_SEQ,
            modes: ChannelModes::default(),
        }
    }

    /// Whether the channel has never been written.
    pub fn is_fresh(&self) -> bool {
        self.seq == FRESH_SEQ
    }

    /// Accept a new head: head and sequence advance together, the sequence
    /// by exactly one.
    pub fn record_head(&mut self, head: impl Into<String>) {
        self.head = Some(head.into());
        self.seq += 1;
    }

    /// Check read access with an optionally supplied password.
    ///
    /// Evaluates state before any mutation the request may go on to apply:
    /// a never-written, non-secret channel is open to everyone (bootstrap);
    /// a secret channel requires the gate password to match.
    pub fn authenticate_read(&self, supplied_password: Option<&str>) -> Result<()> {
        if self.is_fresh() && !self.modes.is_secret() {
            return Ok(());
        }

        if let Some(gate) = &self.modes.read {
            if supplied_password != gate.password.as_deref() {
                return Err(CoreError::Unauthorized);
            }
        }

        Ok(())
    }

    /// Check write access for a derived handle.
    ///
    /// A never-written, non-moderated channel accepts any writer; a
    /// moderated channel only handles on its allowlist.
    pub fn authenticate_write(&self, writer: &Handle) -> Result<()> {
        if self.is_fresh() && !self.modes.is_moderated() {
            return Ok(());
        }

        if let Some(list) = &self.modes.write {
            if !list.ops.contains(writer) {
                return Err(CoreError::Unauthorized);
            }
        }

        Ok(())
    }
}
