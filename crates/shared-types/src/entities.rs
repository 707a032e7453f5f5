//! # Domain Entities
//!
//! Core identities shared across subsystems.

use std::fmt;
use std::str::FromStr;

use shared_crypto::NodePublicKey;

/// A remote node in the cluster.
///
/// Immutable from config; the local node never appears in its own peer
/// list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Logical node name.
    pub id: String,
    /// Compressed secp256k1 identity key.
    pub public_key: NodePublicKey,
    /// `host:port` of the peer-protocol listener.
    pub address: String,
}

impl Peer {
    /// Base URL of the peer's protocol endpoints.
    pub fn base_url(&self) -> String {
        if self.address.starts_with("http://") || self.address.starts_with("https://") {
            self.address.clone()
        } else {
            format!("http://{}", self.address)
        }
    }
}

/// Stable identifier of a source-chain event: `txHash-logIndex`.
///
/// This is the deduplication key observed both by the listener cache and by
/// the abstraction chain's processed-event table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventId {
    /// Transaction hash on the source chain (hex, `0x`-prefixed or not).
    pub tx_hash: String,
    /// Log index within the transaction.
    pub log_index: u64,
}

impl EventId {
    /// Build an event id.
    pub fn new(tx_hash: impl Into<String>, log_index: u64) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            log_index,
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.tx_hash, self.log_index)
    }
}

impl FromStr for EventId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tx_hash, index) = s
            .rsplit_once('-')
            .ok_or_else(|| format!("Malformed event id: {s}"))?;
        let log_index: u64 = index
            .parse()
            .map_err(|_| format!("Malformed log index in event id: {s}"))?;
        Ok(Self {
            tx_hash: tx_hash.to_string(),
            log_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_id_display_parse_roundtrip() {
        let id = EventId::new("0xabc123", 7);
        assert_eq!(id.to_string(), "0xabc123-7");
        assert_eq!("0xabc123-7".parse::<EventId>().unwrap(), id);
    }

    #[test]
    fn test_event_id_parse_uses_last_dash() {
        // Tx hashes never contain dashes, but the parse must still anchor
        // on the final separator.
        let id = "abc-def-3".parse::<EventId>().unwrap();
        assert_eq!(id.tx_hash, "abc-def");
        assert_eq!(id.log_index, 3);
    }

    #[test]
    fn test_event_id_parse_rejects_garbage() {
        assert!("no-separator-here".parse::<EventId>().is_err());
        assert!("plain".parse::<EventId>().is_err());
    }

    #[test]
    fn test_peer_base_url() {
        let keypair = shared_crypto::NodeKeyPair::generate();
        let peer = Peer {
            id: "node-b".to_string(),
            public_key: keypair.public_key(),
            address: "10.0.0.2:7740".to_string(),
        };
        assert_eq!(peer.base_url(), "http://10.0.0.2:7740");

        let peer = Peer {
            address: "https://node-b.example.com".to_string(),
            ..peer
        };
        assert_eq!(peer.base_url(), "https://node-b.example.com");
    }
}
