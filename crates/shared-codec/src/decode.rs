//! Strict decoder for the canonical binary form.

use std::collections::BTreeMap;

use num_bigint::BigInt;

use crate::encode::{
    MARKER_ARRAY, MARKER_BIGINT, MARKER_BOOL, MARKER_BYTES, MARKER_DICT, MARKER_INT, MARKER_NULL,
    MARKER_TEXT, MARKER_TIMESTAMP,
};
use crate::error::CodecError;
use crate::value::Value;

/// Decode a single value occupying the whole buffer.
///
/// The decoder is strict: every malformed input maps to a [`CodecError`],
/// and a buffer with bytes left over after the value is rejected.
pub fn decode(buf: &[u8]) -> Result<Value, CodecError> {
    let (&marker, payload) = buf
        .split_first()
        .ok_or(CodecError::Truncated { context: "type marker" })?;

    match marker {
        MARKER_NULL => {
            if payload.is_empty() {
                Ok(Value::Null)
            } else {
                Err(CodecError::TrailingBytes { context: "null" })
            }
        }
        MARKER_TEXT => {
            let text = std::str::from_utf8(payload)
                .map_err(|_| CodecError::InvalidUtf8 { context: "string payload" })?;
            Ok(Value::Text(text.to_string()))
        }
        MARKER_INT => {
            let text = decimal_text(payload)?;
            let n: i64 = text
                .parse()
                .map_err(|_| CodecError::InvalidNumber { payload: text.to_string() })?;
            Ok(Value::Int(n))
        }
        MARKER_BOOL => match payload {
            b"1" => Ok(Value::Bool(true)),
            b"0" => Ok(Value::Bool(false)),
            _ => Err(CodecError::InvalidBool),
        },
        MARKER_BIGINT => {
            let text = decimal_text(payload)?;
            let n = text
                .parse::<BigInt>()
                .map_err(|_| CodecError::InvalidNumber { payload: text.to_string() })?;
            Ok(Value::BigInt(n))
        }
        MARKER_BYTES => Ok(Value::Bytes(payload.to_vec())),
        MARKER_TIMESTAMP => {
            let text = decimal_text(payload)?;
            let ms: u64 = text
                .parse()
                .map_err(|_| CodecError::InvalidNumber { payload: text.to_string() })?;
            Ok(Value::Timestamp(ms))
        }
        MARKER_ARRAY => decode_array(payload),
        MARKER_DICT => decode_dict(payload),
        other => Err(CodecError::UnknownMarker(other)),
    }
}

fn decimal_text(payload: &[u8]) -> Result<&str, CodecError> {
    std::str::from_utf8(payload)
        .map_err(|_| CodecError::InvalidUtf8 { context: "decimal payload" })
}

fn decode_array(payload: &[u8]) -> Result<Value, CodecError> {
    let mut reader = Reader::new(payload);
    let count = reader.read_u32("array count")?;

    let mut items = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let size = reader.read_u32("array element size")?;
        let element = reader.read_bytes(size as usize, "array element")?;
        items.push(decode(element)?);
    }

    reader.finish("array")?;
    Ok(Value::Array(items))
}

fn decode_dict(payload: &[u8]) -> Result<Value, CodecError> {
    let mut reader = Reader::new(payload);
    let count = reader.read_u32("map count")?;

    let mut entries = BTreeMap::new();
    for _ in 0..count {
        let key_size = reader.read_u32("map key size")?;
        let key_bytes = reader.read_bytes(key_size as usize, "map key")?;
        let key = std::str::from_utf8(key_bytes)
            .map_err(|_| CodecError::InvalidUtf8 { context: "map key" })?
            .to_string();

        let value_size = reader.read_u32("map value size")?;
        let value_bytes = reader.read_bytes(value_size as usize, "map value")?;
        let value = decode(value_bytes)?;

        if entries.insert(key.clone(), value).is_some() {
            return Err(CodecError::DuplicateKey { key });
        }
    }

    reader.finish("map")?;
    Ok(Value::Dict(entries))
}

/// Cursor over a container payload.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_u32(&mut self, context: &'static str) -> Result<u32, CodecError> {
        let bytes = self.read_bytes(4, context)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_bytes(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or(CodecError::Truncated { context })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn finish(&self, context: &'static str) -> Result<(), CodecError> {
        if self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(CodecError::TrailingBytes { context })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;

    fn roundtrip(value: Value) {
        assert_eq!(decode(&encode(&value)).expect("decodes"), value);
    }

    #[test]
    fn test_roundtrip_scalars() {
        roundtrip(Value::Null);
        roundtrip(Value::text("hello world"));
        roundtrip(Value::text(""));
        roundtrip(Value::Int(0));
        roundtrip(Value::Int(i64::MIN));
        roundtrip(Value::Int(i64::MAX));
        roundtrip(Value::Bool(true));
        roundtrip(Value::Bool(false));
        roundtrip(Value::bytes(vec![]));
        roundtrip(Value::bytes(vec![0xFF; 64]));
        roundtrip(Value::Timestamp(1_700_000_000_000));
    }

    #[test]
    fn test_roundtrip_bigint_beyond_machine_width() {
        let huge: BigInt = "340282366920938463463374607431768211456".parse().unwrap();
        roundtrip(Value::BigInt(huge));
        roundtrip(Value::BigInt(BigInt::from(-1)));
    }

    #[test]
    fn test_roundtrip_nested_structure() {
        roundtrip(Value::dict([
            ("chain", Value::text("ethereum")),
            (
                "events",
                Value::Array(vec![
                    Value::dict([
                        ("txHash", Value::bytes(vec![0xAB; 32])),
                        ("logIndex", Value::Int(3)),
                    ]),
                    Value::Null,
                ]),
            ),
            ("seenAt", Value::Timestamp(1_700_000_000_000)),
        ]));
    }

    #[test]
    fn test_empty_containers() {
        roundtrip(Value::Array(vec![]));
        roundtrip(Value::Dict(Default::default()));
    }

    #[test]
    fn test_unknown_marker_rejected() {
        assert_eq!(decode(&[9]), Err(CodecError::UnknownMarker(9)));
        assert_eq!(decode(&[0xFF, 1, 2]), Err(CodecError::UnknownMarker(0xFF)));
    }

    #[test]
    fn test_empty_buffer_rejected() {
        assert!(matches!(decode(&[]), Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn test_truncated_array_rejected() {
        let mut encoded = encode(&Value::Array(vec![Value::Int(7)]));
        encoded.truncate(encoded.len() - 1);
        assert!(matches!(decode(&encoded), Err(CodecError::Truncated { .. })));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut encoded = encode(&Value::Array(vec![Value::Int(7)]));
        encoded.push(0);
        assert!(matches!(decode(&encoded), Err(CodecError::TrailingBytes { .. })));
    }

    #[test]
    fn test_duplicate_map_key_rejected() {
        // Hand-built map payload carrying the key "k" twice.
        let entry_value = encode(&Value::Int(1));
        let mut payload = Vec::new();
        payload.push(8);
        payload.extend_from_slice(&2u32.to_be_bytes());
        for _ in 0..2 {
            payload.extend_from_slice(&1u32.to_be_bytes());
            payload.push(b'k');
            payload.extend_from_slice(&(entry_value.len() as u32).to_be_bytes());
            payload.extend_from_slice(&entry_value);
        }

        assert_eq!(
            decode(&payload),
            Err(CodecError::DuplicateKey { key: "k".to_string() })
        );
    }

    #[test]
    fn test_malformed_bool_rejected() {
        assert_eq!(decode(&[3, b'2']), Err(CodecError::InvalidBool));
        assert_eq!(decode(&[3]), Err(CodecError::InvalidBool));
    }

    #[test]
    fn test_malformed_number_rejected() {
        assert!(matches!(
            decode(b"\x02not-a-number"),
            Err(CodecError::InvalidNumber { .. })
        ));
        // Negative timestamps are invalid.
        assert!(matches!(
            decode(b"\x06-5"),
            Err(CodecError::InvalidNumber { .. })
        ));
    }
}
