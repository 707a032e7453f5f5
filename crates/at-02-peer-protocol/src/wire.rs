//! Peer request/response shapes.
//!
//! Requests travel as canonical codec dicts; responses are JSON with hex
//! fields. Both request shapes are integrity-relevant: the validate
//! signature covers `encode(preparedData)` only, and `pluginId`/`input`
//! are covered transitively because `validate` rejects mismatches.

use serde::{Deserialize, Serialize};
use shared_codec::{decode, encode, CodecError, Value};
use shared_crypto::NodeSignature;
use shared_types::OracleError;

/// Body of `POST /task/prepare`.
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareRequest {
    /// Target plugin.
    pub plugin_id: String,
    /// The task input.
    pub input: Value,
}

impl PrepareRequest {
    /// Canonical wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        encode(&Value::dict([
            ("pluginId", Value::text(self.plugin_id.clone())),
            ("input", self.input.clone()),
        ]))
    }

    /// Parse wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, OracleError> {
        let value = decode(bytes)?;
        Ok(Self {
            plugin_id: required_text(&value, "pluginId")?,
            input: required(&value, "input")?,
        })
    }
}

/// Body of `POST /task/validate`.
#[derive(Debug, Clone)]
pub struct ValidateRequest {
    /// Target plugin.
    pub plugin_id: String,
    /// The current aggregated artifact.
    pub input: Value,
    /// The serving peer's prepared data from the Prepare phase.
    pub prepared_data: Value,
    /// The primary's signature over `encode(preparedData)`.
    pub signature: NodeSignature,
}

impl ValidateRequest {
    /// Canonical wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        encode(&Value::dict([
            ("pluginId", Value::text(self.plugin_id.clone())),
            ("input", self.input.clone()),
            ("preparedData", self.prepared_data.clone()),
            ("signature", Value::bytes(self.signature.as_bytes().to_vec())),
        ]))
    }

    /// Parse wire bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, OracleError> {
        let value = decode(bytes)?;

        let signature_bytes = value
            .get("signature")
            .and_then(Value::as_bytes)
            .ok_or(CodecError::WrongShape { expected: "signature byte blob" })?;
        let signature_array: [u8; 64] = signature_bytes
            .try_into()
            .map_err(|_| CodecError::WrongShape { expected: "64-byte signature" })?;

        Ok(Self {
            plugin_id: required_text(&value, "pluginId")?,
            input: required(&value, "input")?,
            prepared_data: required(&value, "preparedData")?,
            signature: NodeSignature::from_bytes(signature_array),
        })
    }
}

fn required(value: &Value, key: &'static str) -> Result<Value, OracleError> {
    value
        .get(key)
        .cloned()
        .ok_or_else(|| CodecError::WrongShape { expected: key }.into())
}

fn required_text(value: &Value, key: &'static str) -> Result<String, OracleError> {
    value
        .get(key)
        .and_then(Value::as_text)
        .map(String::from)
        .ok_or_else(|| CodecError::WrongShape { expected: key }.into())
}

/// `200` body of `/task/prepare`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareResponseBody {
    /// Hex of the canonical encoding of the prepared data.
    pub encoded_data: String,
    /// Hex of the peer's signature over those bytes.
    pub signature: String,
}

/// `200` body of `/task/validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponseBody {
    /// Hex of the canonical encoding of the validated aggregate.
    pub encoded_data: String,
}

/// Error body shared by both endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error tag (or the literal `Invalid signature`).
    pub error: String,
    /// Optional human-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::NodeKeyPair;

    #[test]
    fn test_prepare_request_roundtrip() {
        let request = PrepareRequest {
            plugin_id: "evm-forwarder".to_string(),
            input: Value::dict([("txHash", Value::text("0xbeef"))]),
        };

        let decoded = PrepareRequest::decode(&request.encode()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_validate_request_roundtrip() {
        let keypair = NodeKeyPair::generate();
        let prepared = Value::dict([("height", Value::Int(7))]);
        let signature = keypair.sign(&encode(&prepared));

        let request = ValidateRequest {
            plugin_id: "evm-forwarder".to_string(),
            input: Value::dict([("signers", Value::Array(vec![]))]),
            prepared_data: prepared.clone(),
            signature,
        };

        let decoded = ValidateRequest::decode(&request.encode()).unwrap();
        assert_eq!(decoded.plugin_id, "evm-forwarder");
        assert_eq!(decoded.prepared_data, prepared);
        assert_eq!(decoded.signature, signature);
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let body = encode(&Value::dict([("pluginId", Value::text("x"))]));
        let err = PrepareRequest::decode(&body).unwrap_err();
        assert_eq!(err.kind(), "codec_error");
    }

    #[test]
    fn test_decode_rejects_non_codec_bytes() {
        assert!(PrepareRequest::decode(b"{\"pluginId\":\"json\"}").is_err());
        assert!(ValidateRequest::decode(&[]).is_err());
    }

    #[test]
    fn test_response_json_field_names() {
        let body = PrepareResponseBody {
            encoded_data: "aabb".to_string(),
            signature: "ccdd".to_string(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"encodedData\""));
        assert!(json.contains("\"signature\""));

        let error = ErrorBody {
            error: "Invalid signature".to_string(),
            context: None,
        };
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(json, "{\"error\":\"Invalid signature\"}");
    }
}
