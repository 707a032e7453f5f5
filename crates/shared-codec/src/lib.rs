//! # Shared Codec Crate
//!
//! Deterministic, type-tagged binary encoding of structured values. This is
//! the canonical byte form of every payload in the oracle network: protocol
//! signatures are computed over it, and peer request bodies carry it.
//!
//! ## Design Principles
//!
//! - **Single Canonical Form**: a value has exactly one encoding. Map keys
//!   are sorted with natural number ordering before emission, so every
//!   honest node produces byte-identical output for equal inputs.
//! - **Lossless Round-Trip**: `decode(encode(x)) == x` for the whole value
//!   grammar, including arbitrary-precision integers.
//! - **Strict Decoding**: unknown markers, truncated buffers, malformed
//!   payloads, and trailing bytes are decode errors, never best-effort.
//!
//! ## Wire Layout
//!
//! Every value starts with a single-byte type marker:
//!
//! | Marker | Type | Payload |
//! |--------|------|---------|
//! | 0 | null | empty |
//! | 1 | string | UTF-8 bytes |
//! | 2 | number | decimal text |
//! | 3 | boolean | `'1'` / `'0'` |
//! | 4 | big integer | decimal text |
//! | 5 | byte blob | raw bytes |
//! | 6 | timestamp | millisecond integer as decimal text |
//! | 7 | array | u32-BE count, then (u32-BE size, element) per item |
//! | 8 | map | u32-BE count, then (u32-BE key size, key, u32-BE value size, value) per entry |
//!
//! All length fields are unsigned 32-bit big-endian.

pub mod decode;
pub mod encode;
pub mod error;
pub mod json;
pub mod ordering;
pub mod value;

pub use decode::decode;
pub use encode::encode;
pub use error::CodecError;
pub use json::{from_json, to_json};
pub use ordering::natural_cmp;
pub use value::Value;
