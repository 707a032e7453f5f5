//! # Shared Crypto - Protocol Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Payload digests, event ids |
//! | `ecdsa` | secp256k1 | Peer prepare/validate signatures |
//! | `auth` | secp256k1 + freshness window | End-user signed auth envelopes |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, low-S normalization
//! - Protocol signatures are always computed over the SHA-256 of the
//!   canonical codec encoding, never over ad-hoc JSON
//! - Secret key material is zeroized on drop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod ecdsa;
pub mod errors;
pub mod hashing;

// Re-exports
pub use auth::AuthEnvelope;
pub use ecdsa::{NodeKeyPair, NodePublicKey, NodeSignature};
pub use errors::CryptoError;
pub use hashing::{sha256, Digest};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
