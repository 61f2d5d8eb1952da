//! Store trait: the abstract interface for channel-record persistence.
//!
//! Implementations include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use haven_core::{Channel, ChannelId};

use crate::error::Result;

/// The ChannelStore trait: async interface for channel persistence.
///
/// # Contract
///
/// - **Lazy materialization**: `load` returns a fresh channel for an absent
///   record; it fails only on backend failure.
/// - **Partial writes**: `persist_head` must leave any stored modes intact;
///   `persist_modes` upserts head, seq and modes in one write.
/// - **Read-modify-write**: there is no conditional update. Two writers
///   racing on the same channel are resolved by last write wins; replay
///   protection is enforced upstream by the sequence check, which only
///   rejects already-seen sequences.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Load the persisted state of a channel, or a fresh channel if none
    /// exists.
    async fn load(&self, id: &ChannelId) -> Result<Channel>;

    /// Write `{head, seq}` without touching the stored modes.
    async fn persist_head(&self, channel: &Channel) -> Result<()>;

    /// Write `{head, seq, modes}` as one upsert.
    async fn persist_modes(&self, channel: &Channel) -> Result<()>;

    /// Delete the record entirely. Idempotent.
    async fn remove(&self, id: &ChannelId) -> Result<()>;
}

#[async_trait]
impl<S: ChannelStore + ?Sized> ChannelStore for std::sync::Arc<S> {
    async fn load(&self, id: &ChannelId) -> Result<Channel> {
        (**self).load(id).await
    }

    async fn persist_head(&self, channel: &Channel) -> Result<()> {
        (**self).persist_head(channel).await
    }

    async fn persist_modes(&self, channel: &Channel) -> Result<()> {
        (**self).persist_modes(channel).await
    }

    async fn remove(&self, id: &ChannelId) -> Result<()> {
        (**self).remove(id).await
    }
}
