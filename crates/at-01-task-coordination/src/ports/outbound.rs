//! Outbound ports: what the coordinator needs from the outside world.

use async_trait::async_trait;
use shared_codec::Value;
use shared_crypto::NodeSignature;
use shared_types::{OracleError, Peer};

/// A verified prepare response from one peer.
#[derive(Debug, Clone)]
pub struct PeerPrepareResponse {
    /// The peer's prepared data, decoded from its canonical form.
    pub prepared: Value,
    /// The exact bytes the peer signed.
    pub encoded: Vec<u8>,
    /// The peer's signature over `encoded`.
    pub signature: NodeSignature,
}

/// Fan-out interface to the rest of the cluster.
///
/// Implementations own transport details (HTTP, timeouts, retries) and
/// MUST verify a prepare response's signature under the peer's public key
/// before returning it; the coordinator treats returned responses as
/// authenticated.
#[async_trait]
pub trait PeerCoordination: Send + Sync {
    /// Ask a peer to prepare `input` for `plugin_id`.
    async fn prepare(
        &self,
        peer: &Peer,
        plugin_id: &str,
        input: &Value,
    ) -> Result<PeerPrepareResponse, OracleError>;

    /// Ask a peer to validate the aggregate against `prepared`.
    ///
    /// `signature` is the primary's signature over the canonical encoding
    /// of `prepared`; the peer checks it before running plugin code. The
    /// returned value is the new aggregate carrying the peer's signature.
    async fn validate(
        &self,
        peer: &Peer,
        plugin_id: &str,
        aggregated: &Value,
        prepared: &Value,
        signature: &NodeSignature,
    ) -> Result<Value, OracleError>;
}
