//! # Haven Relay
//!
//! Cross-process event distribution for Haven channels.
//!
//! ## Overview
//!
//! A [`Relay`] manages locally attached connections and their channel
//! memberships; a [`Broker`] carries payloads between relay instances and
//! keeps a last-value cache per channel. Together they give every member
//! of a channel the same view of its traffic, regardless of which process
//! they happen to be attached to.
//!
//! ## Key Properties
//!
//! - **Single upstream feed**: each process opens at most one broker
//!   subscription per channel, no matter how many local members join
//! - **Late-joiner catch-up**: subscriptions are acknowledged with the
//!   channel's most recent payload when one exists
//! - **Membership-gated publish**: a connection can only publish to
//!   channels it has joined
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use haven_relay::{MemoryBroker, Relay};
//!
//! async fn example() -> haven_relay::Result<()> {
//!     let relay = Relay::new(MemoryBroker::new());
//!     let (conn, mut events) = relay.connect().await?;
//!     relay.subscribe(conn, "general").await?;
//!     relay.publish(conn, "general", Bytes::from_static(b"hi")).await?;
//!     while let Some(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod broker;
pub mod error;
pub mod relay;

pub use broker::{Broker, MemoryBroker};
pub use error::{RelayError, Result};
pub use relay::{ConnectionId, Relay, RelayEvent};
