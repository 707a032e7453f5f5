//! End-user signed auth envelopes.
//!
//! Plugins that accept direct API submissions authenticate the caller with
//! a signature over `message ‖ timestamp_ms(BE)`. The timestamp bounds
//! replay: envelopes older than the configured window (or stamped in the
//! future beyond a small skew allowance) are rejected before the signature
//! is checked.

use crate::ecdsa::{NodePublicKey, NodeSignature};
use crate::errors::CryptoError;

/// Clock skew tolerated for future-dated envelopes.
const MAX_FUTURE_SKEW_MS: u64 = 5_000;

/// A signed, timestamped message from an end user.
#[derive(Debug, Clone)]
pub struct AuthEnvelope {
    /// The signed message bytes.
    pub message: Vec<u8>,
    /// Millisecond timestamp the signer stamped.
    pub timestamp_ms: u64,
    /// The signer's public key.
    pub public_key: NodePublicKey,
    /// Signature over `message ‖ timestamp_ms(BE)`.
    pub signature: NodeSignature,
}

impl AuthEnvelope {
    /// Verify freshness and signature.
    ///
    /// Freshness is checked first so expired envelopes are rejected without
    /// curve work.
    pub fn verify(&self, now_ms: u64, max_age_ms: u64) -> Result<(), CryptoError> {
        let stale = self.timestamp_ms + max_age_ms < now_ms;
        let future_dated = self.timestamp_ms > now_ms + MAX_FUTURE_SKEW_MS;
        if stale || future_dated {
            return Err(CryptoError::StaleEnvelope {
                stamped_ms: self.timestamp_ms,
                now_ms,
            });
        }

        self.public_key.verify(&self.signed_bytes(), &self.signature)
    }

    /// The exact bytes the signature covers.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut bytes = self.message.clone();
        bytes.extend_from_slice(&self.timestamp_ms.to_be_bytes());
        bytes
    }

    /// Sign a message with the given keypair, producing a fresh envelope.
    pub fn sign(message: Vec<u8>, timestamp_ms: u64, keypair: &crate::NodeKeyPair) -> Self {
        let mut bytes = message.clone();
        bytes.extend_from_slice(&timestamp_ms.to_be_bytes());
        let signature = keypair.sign(&bytes);

        Self {
            message,
            timestamp_ms,
            public_key: keypair.public_key(),
            signature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeKeyPair;

    const MAX_AGE_MS: u64 = 60_000;

    #[test]
    fn test_fresh_envelope_verifies() {
        let keypair = NodeKeyPair::generate();
        let envelope = AuthEnvelope::sign(b"link account".to_vec(), 1_000_000, &keypair);

        assert!(envelope.verify(1_000_500, MAX_AGE_MS).is_ok());
    }

    #[test]
    fn test_expired_envelope_rejected() {
        let keypair = NodeKeyPair::generate();
        let envelope = AuthEnvelope::sign(b"link account".to_vec(), 1_000_000, &keypair);

        let result = envelope.verify(1_000_000 + MAX_AGE_MS + 1, MAX_AGE_MS);
        assert!(matches!(result, Err(CryptoError::StaleEnvelope { .. })));
    }

    #[test]
    fn test_future_dated_envelope_rejected() {
        let keypair = NodeKeyPair::generate();
        let envelope = AuthEnvelope::sign(b"link account".to_vec(), 2_000_000, &keypair);

        let result = envelope.verify(1_000_000, MAX_AGE_MS);
        assert!(matches!(result, Err(CryptoError::StaleEnvelope { .. })));
    }

    #[test]
    fn test_tampered_message_rejected() {
        let keypair = NodeKeyPair::generate();
        let mut envelope = AuthEnvelope::sign(b"link account".to_vec(), 1_000_000, &keypair);
        envelope.message = b"link other account".to_vec();

        assert!(envelope.verify(1_000_500, MAX_AGE_MS).is_err());
    }

    #[test]
    fn test_timestamp_is_signature_covered() {
        let keypair = NodeKeyPair::generate();
        let mut envelope = AuthEnvelope::sign(b"link account".to_vec(), 1_000_000, &keypair);
        envelope.timestamp_ms = 1_000_001;

        assert!(envelope.verify(1_000_500, MAX_AGE_MS).is_err());
    }
}
