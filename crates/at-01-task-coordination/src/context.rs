//! Shared per-process task context.

use std::sync::Arc;
use std::time::Duration;

use shared_crypto::{NodeKeyPair, NodePublicKey};
use shared_types::{NodeConfig, OracleError, Peer};

use crate::ports::outbound::PeerCoordination;
use crate::registry::PluginRegistry;

/// Everything a task needs beyond its own input: identity, cluster shape,
/// quorum, the plugin registry, and the peer transport.
///
/// Built once at startup and shared read-only across all tasks.
pub struct TaskContext {
    /// Logical node name (metric label).
    pub node_id: String,
    /// Local signing identity.
    pub keypair: NodeKeyPair,
    /// Remote cluster members, in config order.
    pub peers: Vec<Peer>,
    /// The statically configured primary's key.
    pub primary_key: NodePublicKey,
    /// Quorum threshold, counting the local node.
    pub min_signatures_required: usize,
    /// Prepare fan-out deadline.
    pub peer_timeout: Duration,
    /// Plugin lookup.
    pub registry: Arc<PluginRegistry>,
    /// Peer transport.
    pub peer_client: Arc<dyn PeerCoordination>,
}

impl TaskContext {
    /// Assemble a context from validated config.
    pub fn from_config(
        config: &NodeConfig,
        registry: Arc<PluginRegistry>,
        peer_client: Arc<dyn PeerCoordination>,
    ) -> Result<Self, OracleError> {
        Ok(Self {
            node_id: config.id.clone(),
            keypair: config.keypair()?,
            peers: config.parsed_peers()?,
            primary_key: config.primary_key()?,
            min_signatures_required: config.min_signatures_required,
            peer_timeout: Duration::from_millis(config.peer_timeout_ms),
            registry,
            peer_client,
        })
    }
}
