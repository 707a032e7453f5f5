//! Bridge between JSON (the external API surface) and the codec grammar.

use std::collections::BTreeMap;

use num_bigint::BigInt;

use crate::error::CodecError;
use crate::value::Value;

/// Convert a JSON document into a codec value.
///
/// Integral numbers map to `Int` (or `BigInt` above the i64 range); the
/// grammar has no float form, so fractional numbers are rejected.
pub fn from_json(json: &serde_json::Value) -> Result<Value, CodecError> {
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Int(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::BigInt(BigInt::from(u)))
            } else {
                Err(CodecError::NonIntegerNumber { payload: n.to_string() })
            }
        }
        serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
        serde_json::Value::Array(items) => {
            let converted: Result<Vec<Value>, CodecError> = items.iter().map(from_json).collect();
            Ok(Value::Array(converted?))
        }
        serde_json::Value::Object(entries) => {
            let mut dict = BTreeMap::new();
            for (key, value) in entries {
                dict.insert(key.clone(), from_json(value)?);
            }
            Ok(Value::Dict(dict))
        }
    }
}

/// Convert a codec value into JSON for API responses.
///
/// Byte blobs become lowercase hex strings; big integers outside the i64
/// range become decimal strings to avoid JSON number precision loss.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Int(n) => serde_json::Value::from(*n),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::BigInt(n) => match i64::try_from(n.clone()) {
            Ok(i) => serde_json::Value::from(i),
            Err(_) => serde_json::Value::String(n.to_string()),
        },
        Value::Bytes(b) => serde_json::Value::String(hex::encode(b)),
        Value::Timestamp(ms) => serde_json::Value::from(*ms),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Dict(entries) => {
            let mut object = serde_json::Map::new();
            for (key, value) in entries {
                object.insert(key.clone(), to_json(value));
            }
            serde_json::Value::Object(object)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_basic_document() {
        let json: serde_json::Value = serde_json::json!({
            "chain": "ethereum",
            "txHash": "0xabc",
            "logIndex": 2,
            "confirmed": true,
            "extra": null,
            "amounts": [1, 2]
        });

        let value = from_json(&json).expect("converts");
        assert_eq!(value.get("chain").and_then(Value::as_text), Some("ethereum"));
        assert_eq!(value.get("logIndex").and_then(Value::as_int), Some(2));
        assert_eq!(value.get("confirmed").and_then(Value::as_bool), Some(true));
        assert!(value.get("extra").map(Value::is_null).unwrap_or(false));
        assert_eq!(
            value.get("amounts").and_then(Value::as_array).map(<[Value]>::len),
            Some(2)
        );
    }

    #[test]
    fn test_from_json_large_unsigned_becomes_bigint() {
        let json = serde_json::json!(u64::MAX);
        let value = from_json(&json).expect("converts");
        assert!(matches!(value, Value::BigInt(_)));
    }

    #[test]
    fn test_from_json_rejects_floats() {
        let json = serde_json::json!(1.5);
        assert!(matches!(
            from_json(&json),
            Err(CodecError::NonIntegerNumber { .. })
        ));
    }

    #[test]
    fn test_to_json_bytes_become_hex() {
        let json = to_json(&Value::bytes(vec![0xDE, 0xAD]));
        assert_eq!(json, serde_json::json!("dead"));
    }

    #[test]
    fn test_to_json_big_bigint_becomes_string() {
        let huge: BigInt = "99999999999999999999999999".parse().unwrap();
        let json = to_json(&Value::BigInt(huge));
        assert_eq!(json, serde_json::json!("99999999999999999999999999"));
    }
}
