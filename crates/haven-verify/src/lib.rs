//! # Haven Verify
//!
//! Validation of incoming head updates.
//!
//! ## Overview
//!
//! When a client proposes a new head for a channel, the candidate address
//! is resolved through the external content-addressed network into an
//! [`Envelope`], then checked against the channel's stored state:
//!
//! - the envelope sequence must be strictly greater than the channel's
//!   (ascending-sequence rule, the replay guard);
//! - the envelope signature must verify over the payload with the
//!   channel's read-gate password as additional signing context.
//!
//! ## Failure model
//!
//! Every resolution, parse, and verification failure is a [`VerifyError`].
//! Callers collapse all of them into one "Invalid request" class; detail
//! only reaches logs.
//!
//! ## Disabling
//!
//! [`UpdateVerifier`] can be constructed disabled (e.g. for tests), in
//! which case `verify` succeeds without resolving anything.

pub mod envelope;
pub mod error;
pub mod resolver;
pub mod verifier;

pub use envelope::{Envelope, SigningIdentity};
pub use error::{Result, VerifyError};
pub use resolver::{Resolver, StaticResolver};
pub use verifier::UpdateVerifier;
