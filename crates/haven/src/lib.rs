//! # Haven
//!
//! The unified API for Haven networks - named channels over a
//! content-addressed log, with derived identities and per-channel access
//! modes.
//!
//! ## Overview
//!
//! Haven provides a transport-agnostic gateway for:
//!
//! - **Channels**: A name bound to a mutable head pointer and a monotonic
//!   sequence counter
//! - **Identities**: Handles and password hashes derived per request from
//!   credentials and the network salt, never stored raw
//! - **Modes**: Per-channel read gates (secret) and write allowlists
//!   (moderated)
//! - **Verification**: Candidate heads resolved and checked for sequence
//!   advancement and author signature before acceptance
//!
//! ## Key Concepts
//!
//! - **Head**: The latest accepted content-address of a channel.
//! - **Fresh channel**: Never written; open to all unless made secret.
//! - **Handle**: A salted hash of a username; the unit of write access.
//! - **Mode batch**: One or more `+r`/`-r`/`+w`/`-w` operations applied
//!   in order.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use haven::{Gateway, GatewayConfig, UserDirectory};
//! use haven::store::MemoryStore;
//! use haven::verify::{StaticResolver, UpdateVerifier};
//! use haven_core::ChannelId;
//!
//! async fn example() -> haven::Result<()> {
//!     let config = GatewayConfig {
//!         network_id: "net-1".into(),
//!         network_name: "example".into(),
//!         salt: "salt".into(),
//!         routing: vec!["wss://relay.example".into()],
//!     };
//!     let gateway = Gateway::new(
//!         MemoryStore::new(),
//!         UserDirectory::new("/var/lib/haven/users"),
//!         UpdateVerifier::disabled(StaticResolver::new()),
//!         config,
//!     );
//!
//!     let auth = Some("Basic alice=secret");
//!     let registration = gateway.register(auth).await?;
//!     println!("registered as {}", registration.user.id);
//!
//!     let id = ChannelId::new("general")?;
//!     gateway.add_head(auth, &id, "bafy...head", None).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `haven::core` - Channels, identities, and modes
//! - `haven::store` - Storage abstraction, SQLite and memory backends
//! - `haven::verify` - Envelope resolution and signature checks
//! - `haven::relay` - Cross-process event fan-out

pub mod auth;
pub mod counters;
pub mod error;
pub mod gateway;
pub mod users;

pub use auth::Credentials;
pub use counters::{CounterWindow, Counters};
pub use error::{ErrorBody, HavenError, Result};
pub use gateway::{
    ChannelInfo, Gateway, GatewayConfig, HeadResponse, ModesResponse, RegisterResponse,
};
pub use users::{AuthOutcome, UserDirectory, UserRecord};

pub use haven_core as core;
pub use haven_relay as relay;
pub use haven_store as store;
pub use haven_verify as verify;
