//! SQLite implementation of the ChannelStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use haven_core::{Channel, ChannelId, ChannelModes};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::ChannelStore;

/// SQLite-based store implementation.
///
/// The connection is shared behind a Mutex; every operation runs on the
/// blocking pool so the async runtime is never stalled on disk I/O.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database. Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the locked connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = lock(&conn)?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("spawn_blocking failed: {}", e)))?
    }
}

fn lock(conn: &Arc<Mutex<Connection>>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| StoreError::Backend(format!("mutex poisoned: {}", e)))
}

/// Encode the mode facets for the `modes` column. Open channels store NULL.
fn encode_modes(modes: &ChannelModes) -> Result<Option<Vec<u8>>> {
    if *modes == ChannelModes::default() {
        return Ok(None);
    }
    let mut buf = Vec::new();
    ciborium::into_writer(modes, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(Some(buf))
}

/// Decode the `modes` column; NULL means no facets set.
fn decode_modes(blob: Option<Vec<u8>>) -> Result<ChannelModes> {
    match blob {
        Some(bytes) => ciborium::from_reader(&bytes[..])
            .map_err(|e| StoreError::Serialization(e.to_string())),
        None => Ok(ChannelModes::default()),
    }
}

#[async_trait]
impl ChannelStore for SqliteStore {
    async fn load(&self, id: &ChannelId) -> Result<Channel> {
        let id = id.clone();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT head, seq, modes FROM channels WHERE channel_id = ?1",
                    params![id.as_str()],
                    |row| {
                        Ok((
                            row.get::<_, Option<String>>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, Option<Vec<u8>>>(2)?,
                        ))
                    },
                )
                .optional()?;

            match row {
                Some((head, seq, modes_blob)) => Ok(Channel {
                    id,
                    head,
                    seq,
                    modes: decode_modes(modes_blob)?,
                }),
                None => {
                    debug!(channel = %id, "no record, materializing fresh channel");
                    Ok(Channel::fresh(id))
                }
            }
        })
        .await
    }

    async fn persist_head(&self, channel: &Channel) -> Result<()> {
        let id = channel.id.clone();
        let head = channel.head.clone();
        let seq = channel.seq;
        self.with_conn(move |conn| {
            let now = now_millis();
            // Modes are left untouched on conflict; a brand-new row starts
            // with no facets.
            conn.execute(
                "INSERT INTO channels (channel_id, head, seq, modes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, NULL, ?4, ?4)
                 ON CONFLICT(channel_id) DO UPDATE SET
                     head = excluded.head,
                     seq = excluded.seq,
                     updated_at = excluded.updated_at",
                params![id.as_str(), head, seq, now],
            )?;
            Ok(())
        })
        .await
    }

    async fn persist_modes(&self, channel: &Channel) -> Result<()> {
        let id = channel.id.clone();
        let head = channel.head.clone();
        let seq = channel.seq;
        let modes_blob = encode_modes(&channel.modes)?;
        self.with_conn(move |conn| {
            let now = now_millis();
            conn.execute(
                "INSERT INTO channels (channel_id, head, seq, modes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(channel_id) DO UPDATE SET
                     head = excluded.head,
                     seq = excluded.seq,
                     modes = excluded.modes,
                     updated_at = excluded.updated_at",
                params![id.as_str(), head, seq, modes_blob, now],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, id: &ChannelId) -> Result<()> {
        let id = id.clone();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM channels WHERE channel_id = ?1", params![id.as_str()])?;
            Ok(())
        })
        .await
    }
}
