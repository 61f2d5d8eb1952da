//! In-memory implementation of the ChannelStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use haven_core::{Channel, ChannelId, ChannelModes};

use crate::error::{Result, StoreError};
use crate::traits::ChannelStore;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    records: RwLock<HashMap<ChannelId, Record>>,
}

/// The persisted shape of a channel, minus its id.
#[derive(Clone)]
struct Record {
    head: Option<String>,
    seq: i64,
    modes: ChannelModes,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<ChannelId, Record>>> {
        self.records
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<ChannelId, Record>>> {
        self.records
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelStore for MemoryStore {
    async fn load(&self, id: &ChannelId) -> Result<Channel> {
        let records = self.read()?;
        Ok(match records.get(id) {
            Some(record) => Channel {
                id: id.clone(),
                head: record.head.clone(),
                seq: record.seq,
                modes: record.modes.clone(),
            },
            None => Channel::fresh(id.clone()),
        })
    }

    async fn persist_head(&self, channel: &Channel) -> Result<()> {
        let mut records = self.write()?;
        let record = records.entry(channel.id.clone()).or_insert_with(|| Record {
            head: None,
            seq: haven_core::FRESH_SEQ,
            modes: ChannelModes::default(),
        });
        record.head = channel.head.clone();
        record.seq = channel.seq;
        Ok(())
    }

    async fn persist_modes(&self, channel: &Channel) -> Result<()> {
        let mut records = self.write()?;
        records.insert(
            channel.id.clone(),
            Record {
                head: channel.head.clone(),
                seq: channel.seq,
                modes: channel.modes.clone(),
            },
        );
        Ok(())
    }

    async fn remove(&self, id: &ChannelId) -> Result<()> {
        let mut records = self.write()?;
        records.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_core::{apply_mode_batch, ModeOp};
    use serde_json::json;

    fn id(s: &str) -> ChannelId {
        ChannelId::new(s).unwrap()
    }

    fn op(mode: &str, params: serde_json::Value) -> ModeOp {
        serde_json::from_value(json!({ "mode": mode, "params": params })).unwrap()
    }

    #[tokio::test]
    async fn test_load_missing_is_fresh() {
        let store = MemoryStore::new();
        let ch = store.load(&id("nope")).await.unwrap();
        assert!(ch.is_fresh());
        assert_eq!(ch.head, None);
    }

    #[tokio::test]
    async fn test_persist_head_keeps_modes() {
        let store = MemoryStore::new();

        let mut ch = Channel::fresh(id("c"));
        apply_mode_batch(&mut ch, &[op("+r", json!({ "password": "p" }))]);
        store.persist_modes(&ch).await.unwrap();

        ch.record_head("h1");
        store.persist_head(&ch).await.unwrap();

        let loaded = store.load(&id("c")).await.unwrap();
        assert_eq!(loaded.head.as_deref(), Some("h1"));
        assert_eq!(loaded.seq, 0);
        assert!(loaded.modes.is_secret());
    }

    #[tokio::test]
    async fn test_remove_then_load_is_fresh() {
        let store = MemoryStore::new();

        let mut ch = Channel::fresh(id("c"));
        ch.record_head("h1");
        store.persist_head(&ch).await.unwrap();

        store.remove(&id("c")).await.unwrap();
        let loaded = store.load(&id("c")).await.unwrap();
        assert!(loaded.is_fresh());

        // Removing again is fine.
        store.remove(&id("c")).await.unwrap();
    }
}
