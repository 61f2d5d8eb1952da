//! # Haven Store
//!
//! Persistence for channel records. The [`ChannelStore`] trait keeps the
//! rest of the system storage-agnostic; [`SqliteStore`] is the primary
//! backend, [`MemoryStore`] serves tests.
//!
//! ## Contract
//!
//! - `load` never fails on "not found": an absent record materializes as a
//!   fresh channel (head=None, seq=-1, modes empty).
//! - `persist_head` writes `{head, seq}` without touching modes;
//!   `persist_modes` upserts the whole record.
//! - Updates are read-modify-write, not compare-and-swap. Concurrent
//!   writers on the same channel can race; the last persisted write wins.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::ChannelStore;
