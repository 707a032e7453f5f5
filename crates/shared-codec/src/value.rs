//! The structured value grammar the codec operates on.

use std::collections::BTreeMap;

use num_bigint::BigInt;

/// A structured value in the oracle payload grammar.
///
/// `Dict` keys are plain strings; the canonical key ordering is applied at
/// encode time (see [`crate::ordering::natural_cmp`]), so two dicts with the
/// same entries are equal regardless of insertion history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Absent value.
    Null,
    /// UTF-8 string.
    Text(String),
    /// Machine-width signed integer.
    Int(i64),
    /// Boolean.
    Bool(bool),
    /// Arbitrary-precision integer.
    BigInt(BigInt),
    /// Opaque byte blob.
    Bytes(Vec<u8>),
    /// Millisecond UNIX timestamp.
    Timestamp(u64),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// String-keyed map.
    Dict(BTreeMap<String, Value>),
}

impl Value {
    /// Build a `Text` value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Build a `Bytes` value.
    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(b.into())
    }

    /// Build a `Dict` from key/value pairs.
    pub fn dict<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Dict(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// Borrow the string payload, if this is a `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean payload, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the blob payload, if this is `Bytes`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The millisecond timestamp, if this is a `Timestamp`.
    pub fn as_timestamp(&self) -> Option<u64> {
        match self {
            Value::Timestamp(ms) => Some(*ms),
            _ => None,
        }
    }

    /// Borrow the elements, if this is an `Array`.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the entries, if this is a `Dict`.
    pub fn as_dict(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key in a `Dict` value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_dict().and_then(|d| d.get(key))
    }

    /// True for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dict_builder_and_lookup() {
        let v = Value::dict([("chain", Value::text("ethereum")), ("height", Value::Int(7))]);

        assert_eq!(v.get("chain").and_then(Value::as_text), Some("ethereum"));
        assert_eq!(v.get("height").and_then(Value::as_int), Some(7));
        assert!(v.get("missing").is_none());
    }

    #[test]
    fn test_accessors_reject_wrong_variant() {
        let v = Value::Int(1);
        assert!(v.as_text().is_none());
        assert!(v.as_dict().is_none());
        assert!(v.as_array().is_none());
        assert!(!v.is_null());
    }

    #[test]
    fn test_dict_equality_ignores_insertion_order() {
        let a = Value::dict([("x", Value::Int(1)), ("y", Value::Int(2))]);
        let b = Value::dict([("y", Value::Int(2)), ("x", Value::Int(1))]);
        assert_eq!(a, b);
    }
}
