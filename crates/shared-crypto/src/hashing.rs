//! # SHA-256 Hashing
//!
//! One-shot digests over canonical payload bytes. Every protocol signature
//! in the network covers `sha256(encode(payload))`.

use sha2::{Digest as _, Sha256};

/// 256-bit digest.
pub type Digest = [u8; 32];

/// Hash data with SHA-256 (one-shot).
pub fn sha256(data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash multiple inputs as one message.
pub fn sha256_many(inputs: &[&[u8]]) -> Digest {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}
