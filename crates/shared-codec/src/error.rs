//! Codec error types.

use thiserror::Error;

/// Errors produced while encoding, decoding, or converting values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The first byte of a value is not a known type marker.
    #[error("Unknown type marker: {0}")]
    UnknownMarker(u8),

    /// The buffer ended before the value did.
    #[error("Truncated input while reading {context}")]
    Truncated { context: &'static str },

    /// Bytes remained after the value was fully read.
    #[error("Trailing bytes after {context}")]
    TrailingBytes { context: &'static str },

    /// A string payload was not valid UTF-8.
    #[error("Invalid UTF-8 in {context}")]
    InvalidUtf8 { context: &'static str },

    /// A numeric payload was not valid decimal text.
    #[error("Invalid decimal payload: {payload:?}")]
    InvalidNumber { payload: String },

    /// A boolean payload was something other than '1' or '0'.
    #[error("Invalid boolean payload")]
    InvalidBool,

    /// A map carried the same key twice.
    #[error("Duplicate map key: {key}")]
    DuplicateKey { key: String },

    /// A JSON number with a fractional part reached the bridge; the value
    /// grammar has no float form.
    #[error("Non-integer JSON number: {payload}")]
    NonIntegerNumber { payload: String },

    /// A caller expected a different value shape.
    #[error("Wrong value shape: expected {expected}")]
    WrongShape { expected: &'static str },
}
