//! The update verifier: sequence and signature checks for candidate heads.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use tracing::{debug, warn};

use haven_core::Channel;

use crate::envelope::Envelope;
use crate::error::{Result, VerifyError};
use crate::resolver::Resolver;

/// Verifies candidate head updates against a channel's stored state.
///
/// Construction decides whether verification is active; when disabled
/// (test deployments), `verify` accepts everything without resolving.
pub struct UpdateVerifier<R> {
    resolver: R,
    enabled: bool,
}

impl<R: Resolver> UpdateVerifier<R> {
    /// A verifier that performs full resolution and validation.
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            enabled: true,
        }
    }

    /// A verifier that accepts every candidate without resolving.
    pub fn disabled(resolver: R) -> Self {
        Self {
            resolver,
            enabled: false,
        }
    }

    /// Whether verification is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Validate `candidate_head` as the next update for `channel`.
    ///
    /// Resolves the address to an envelope, rejects non-advancing
    /// sequences, and verifies the author signature over the payload with
    /// the channel's read-gate password as signing context.
    pub async fn verify(&self, candidate_head: &str, channel: &Channel) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        let bytes = self.resolver.resolve(candidate_head).await.map_err(|e| {
            warn!(head = candidate_head, error = %e, "candidate head did not resolve");
            e
        })?;

        let envelope = Envelope::from_json_bytes(&bytes)?;

        if envelope.seq <= channel.seq {
            debug!(
                channel = %channel.id,
                candidate = envelope.seq,
                current = channel.seq,
                "rejecting non-advancing sequence"
            );
            return Err(VerifyError::StaleSequence {
                candidate: envelope.seq,
                current: channel.seq,
            });
        }

        let password = channel
            .modes
            .read
            .as_ref()
            .and_then(|gate| gate.password.as_deref())
            .unwrap_or("");

        verify_signature(&envelope, password)
    }
}

/// Check the envelope signature over payload || channel password.
fn verify_signature(envelope: &Envelope, channel_password: &str) -> Result<()> {
    let key_bytes: [u8; 32] = hex::decode(&envelope.key)
        .map_err(|_| VerifyError::InvalidKey)?
        .try_into()
        .map_err(|_| VerifyError::InvalidKey)?;
    let key = VerifyingKey::from_bytes(&key_bytes).map_err(|_| VerifyError::InvalidKey)?;

    let sig_bytes: [u8; 64] = hex::decode(&envelope.sig)
        .map_err(|_| VerifyError::InvalidSignature)?
        .try_into()
        .map_err(|_| VerifyError::InvalidSignature)?;
    let sig = Signature::from_bytes(&sig_bytes);

    let message = Envelope::signing_message(&envelope.payload, channel_password);
    key.verify(&message, &sig)
        .map_err(|_| VerifyError::InvalidSignature)
}
