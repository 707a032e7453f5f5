//! Per-task prepare records.

use shared_codec::Value;
use shared_crypto::{NodePublicKey, NodeSignature};

/// Marker standing in for the primary's own encoded data in its record.
pub const PRIMARY_MARKER: &str = "<PRIMARY>";

/// One node's prepare contribution as tracked by the coordinator.
///
/// The primary's own entry carries no signature and the `<PRIMARY>`
/// marker instead of hex; peer entries carry the exact bytes the peer
/// signed, hex-encoded, plus its signature over them.
#[derive(Debug, Clone)]
pub struct PeerPrepareRecord {
    /// The contributing node's identity key.
    pub public_key: NodePublicKey,
    /// The decoded prepared data.
    pub prepared: Value,
    /// Hex of the peer's canonical encoding, or [`PRIMARY_MARKER`].
    pub encoded_hex: String,
    /// The peer's signature over its encoded data; `None` for the local
    /// record.
    pub signature: Option<NodeSignature>,
}

impl PeerPrepareRecord {
    /// The primary's own record.
    pub fn local(public_key: NodePublicKey, prepared: Value) -> Self {
        Self {
            public_key,
            prepared,
            encoded_hex: PRIMARY_MARKER.to_string(),
            signature: None,
        }
    }

    /// A record built from a peer's prepare response.
    pub fn from_peer(
        public_key: NodePublicKey,
        prepared: Value,
        encoded: &[u8],
        signature: NodeSignature,
    ) -> Self {
        Self {
            public_key,
            prepared,
            encoded_hex: hex::encode(encoded),
            signature: Some(signature),
        }
    }

    /// True for the primary's own record.
    pub fn is_local(&self) -> bool {
        self.signature.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::NodeKeyPair;

    #[test]
    fn test_local_record_shape() {
        let keypair = NodeKeyPair::generate();
        let record = PeerPrepareRecord::local(keypair.public_key(), Value::Int(1));

        assert!(record.is_local());
        assert_eq!(record.encoded_hex, PRIMARY_MARKER);
        assert!(record.signature.is_none());
    }

    #[test]
    fn test_peer_record_shape() {
        let keypair = NodeKeyPair::generate();
        let encoded = shared_codec::encode(&Value::Int(1));
        let signature = keypair.sign(&encoded);
        let record =
            PeerPrepareRecord::from_peer(keypair.public_key(), Value::Int(1), &encoded, signature);

        assert!(!record.is_local());
        assert_eq!(record.encoded_hex, hex::encode(&encoded));
    }
}
