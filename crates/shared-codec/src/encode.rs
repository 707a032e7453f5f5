//! Canonical binary encoder.

use crate::ordering::natural_cmp;
use crate::value::Value;

pub(crate) const MARKER_NULL: u8 = 0;
pub(crate) const MARKER_TEXT: u8 = 1;
pub(crate) const MARKER_INT: u8 = 2;
pub(crate) const MARKER_BOOL: u8 = 3;
pub(crate) const MARKER_BIGINT: u8 = 4;
pub(crate) const MARKER_BYTES: u8 = 5;
pub(crate) const MARKER_TIMESTAMP: u8 = 6;
pub(crate) const MARKER_ARRAY: u8 = 7;
pub(crate) const MARKER_DICT: u8 = 8;

/// Encode a value into its canonical byte form.
///
/// Equal values always produce byte-identical output: map keys are emitted
/// in natural order and numeric payloads use minimal decimal text.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.push(MARKER_NULL),
        Value::Text(s) => {
            out.push(MARKER_TEXT);
            out.extend_from_slice(s.as_bytes());
        }
        Value::Int(n) => {
            out.push(MARKER_INT);
            out.extend_from_slice(n.to_string().as_bytes());
        }
        Value::Bool(b) => {
            out.push(MARKER_BOOL);
            out.push(if *b { b'1' } else { b'0' });
        }
        Value::BigInt(n) => {
            out.push(MARKER_BIGINT);
            out.extend_from_slice(n.to_string().as_bytes());
        }
        Value::Bytes(b) => {
            out.push(MARKER_BYTES);
            out.extend_from_slice(b);
        }
        Value::Timestamp(ms) => {
            out.push(MARKER_TIMESTAMP);
            out.extend_from_slice(ms.to_string().as_bytes());
        }
        Value::Array(items) => {
            out.push(MARKER_ARRAY);
            out.extend_from_slice(&(items.len() as u32).to_be_bytes());
            for item in items {
                write_sized(item, out);
            }
        }
        Value::Dict(entries) => {
            out.push(MARKER_DICT);
            out.extend_from_slice(&(entries.len() as u32).to_be_bytes());

            let mut keys: Vec<&String> = entries.keys().collect();
            keys.sort_by(|a, b| natural_cmp(a, b));

            for key in keys {
                out.extend_from_slice(&(key.len() as u32).to_be_bytes());
                out.extend_from_slice(key.as_bytes());
                write_sized(&entries[key.as_str()], out);
            }
        }
    }
}

/// Emit a u32-BE size prefix followed by the element's full encoding.
fn write_sized(value: &Value, out: &mut Vec<u8>) {
    let encoded = encode(value);
    out.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
    out.extend_from_slice(&encoded);
}
