//! # Haven Core
//!
//! Pure primitives for haven: identity derivation, channel state, and the
//! access-mode state machine.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over channel records and derived identities.
//!
//! ## Key Types
//!
//! - [`Handle`] - Derived stable user identifier (Blake3, hex-encoded)
//! - [`Channel`] - Named mutable head pointer with sequence and modes
//! - [`ChannelModes`] - The "r" (read-gate) and "w" (write-allowlist) facets
//! - [`ModeOp`] - One `+r`/`-r`/`+w`/`-w` operation in a batch
//!
//! ## Access control
//!
//! Both authorization checks live on [`Channel`] and evaluate the state
//! *before* the mutation they guard is applied.

pub mod channel;
pub mod error;
pub mod identity;
pub mod modes;

pub use channel::{Channel, ChannelId, FRESH_SEQ};
pub use error::CoreError;
pub use identity::{Handle, PasswordHash, User};
pub use modes::{apply_mode_batch, ChannelModes, ModeBatch, ModeOp, ModeParams, ReadGate, WriteAllowlist};
