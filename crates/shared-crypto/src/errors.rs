//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid signature format
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Invalid signature
    #[error("Invalid signature")]
    InvalidSignature,

    /// Auth envelope timestamp outside the accepted freshness window
    #[error("Stale auth envelope: stamped {stamped_ms}, now {now_ms}")]
    StaleEnvelope {
        /// Timestamp carried by the envelope.
        stamped_ms: u64,
        /// Wall-clock time at verification.
        now_ms: u64,
    },
}
