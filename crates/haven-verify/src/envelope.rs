//! The signed envelope a head address resolves to.
//!
//! An envelope carries the sequence number, the author's public key, the
//! signature, and an opaque payload. Two payload field names are accepted
//! on the wire: `payload` (current) and `content` (legacy). Parsing
//! normalizes both into [`Envelope::payload`]; this is a compatibility
//! shim, new envelopes are always written with `payload`.

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifyError};

/// A head-update envelope, as stored in the content-addressed network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sequence number this update claims.
    pub seq: i64,

    /// Author's Ed25519 public key, hex-encoded.
    pub key: String,

    /// Ed25519 signature over the signing message, hex-encoded.
    pub sig: String,

    /// Opaque payload. `content` is the accepted legacy field name.
    #[serde(alias = "content")]
    pub payload: String,
}

impl Envelope {
    /// Parse an envelope from resolved JSON bytes.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| VerifyError::MalformedEnvelope(e.to_string()))
    }

    /// Serialize to JSON bytes.
    pub fn to_json_bytes(&self) -> Vec<u8> {
        // Envelope serialization cannot fail: all fields are strings/ints.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// The message the signature covers: the payload bytes followed by the
    /// channel's read-gate password (empty string when the channel is open).
    pub fn signing_message(payload: &str, channel_password: &str) -> Vec<u8> {
        let mut message = Vec::with_capacity(payload.len() + channel_password.len());
        message.extend_from_slice(payload.as_bytes());
        message.extend_from_slice(channel_password.as_bytes());
        message
    }
}

/// An Ed25519 signing identity for producing envelopes.
#[derive(Clone)]
pub struct SigningIdentity {
    signing_key: SigningKey,
}

impl SigningIdentity {
    /// Generate a new random identity.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// The public key, hex-encoded as it appears in envelopes.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Build a signed envelope for a payload at the given sequence.
    ///
    /// `channel_password` must be the target channel's read-gate password,
    /// or the empty string for an open channel.
    pub fn envelope(&self, seq: i64, payload: &str, channel_password: &str) -> Envelope {
        let message = Envelope::signing_message(payload, channel_password);
        let sig = self.signing_key.sign(&message);
        Envelope {
            seq,
            key: self.public_key_hex(),
            sig: hex::encode(sig.to_bytes()),
            payload: payload.to_string(),
        }
    }
}

impl std::fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningIdentity({})", &self.public_key_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_json_roundtrip() {
        let identity = SigningIdentity::from_seed(&[0x42; 32]);
        let envelope = identity.envelope(3, "some payload", "");

        let bytes = envelope.to_json_bytes();
        let parsed = Envelope::from_json_bytes(&bytes).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn test_legacy_content_field_normalized() {
        let json = br#"{"seq": 1, "key": "aa", "sig": "bb", "content": "old style"}"#;
        let envelope = Envelope::from_json_bytes(json).unwrap();
        assert_eq!(envelope.payload, "old style");

        // Normalized output always uses the current field name.
        let out = String::from_utf8(envelope.to_json_bytes()).unwrap();
        assert!(out.contains("\"payload\""));
        assert!(!out.contains("\"content\""));
    }

    #[test]
    fn test_malformed_envelope_rejected() {
        assert!(Envelope::from_json_bytes(b"not json").is_err());
        assert!(Envelope::from_json_bytes(br#"{"seq": 1}"#).is_err());
    }

    #[test]
    fn test_signing_message_includes_password() {
        let open = Envelope::signing_message("p", "");
        let gated = Envelope::signing_message("p", "secret");
        assert_ne!(open, gated);
        assert_eq!(open, b"p".to_vec());
    }
}
