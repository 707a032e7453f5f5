//! # Node Configuration
//!
//! The static snapshot a node boots with: identity keys, ports, peer list,
//! quorum, per-source RPC providers, downstream-chain endpoints, and
//! per-plugin / per-listener tuning. Loaded once from YAML (preferred) or
//! JSON and read-only for the process lifetime.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use shared_crypto::{NodeKeyPair, NodePublicKey};

use crate::entities::Peer;
use crate::errors::OracleError;

/// Full node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
    /// Logical node name; used as a metric label.
    pub id: String,
    /// Hex-encoded secp256k1 secret key.
    pub private_key: String,
    /// Hex-encoded compressed public key; must match `privateKey`.
    pub public_key: String,
    /// Peer-protocol TCP port.
    pub port: u16,
    /// External-API TCP port.
    pub api_port: u16,
    /// Prometheus exposition TCP port.
    pub metrics_port: u16,
    /// Whether this node initiates tasks and runs listeners.
    pub primary: bool,
    /// Compressed public key of the statically configured primary.
    ///
    /// Secondary nodes need it to check validate-request signatures; on
    /// the primary itself it defaults to `publicKey`.
    pub primary_public_key: Option<String>,
    /// Remote cluster members. Never contains the local node.
    pub peers: Vec<PeerConfig>,
    /// Prepare fan-out deadline in milliseconds.
    pub peer_timeout_ms: u64,
    /// Quorum threshold, counting the local node.
    pub min_signatures_required: usize,
    /// Source-chain RPC providers, keyed by source name.
    pub rpc: HashMap<String, Vec<RpcProviderConfig>>,
    /// Downstream-chain endpoint configuration.
    pub abstraction_chain: AbstractionChainConfig,
    /// Free-form per-plugin settings.
    pub plugins: HashMap<String, serde_json::Value>,
    /// Per-listener tuning.
    pub listeners: HashMap<String, ListenerTuning>,
    /// End-user auth settings.
    pub auth: AuthConfig,
    /// Third-party webhook credentials.
    pub webhooks: WebhooksConfig,
    /// Tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            private_key: String::new(),
            public_key: String::new(),
            port: 7740,
            api_port: 7741,
            metrics_port: 9184,
            primary: false,
            primary_public_key: None,
            peers: Vec::new(),
            peer_timeout_ms: 30_000,
            min_signatures_required: 1,
            rpc: HashMap::new(),
            abstraction_chain: AbstractionChainConfig::default(),
            plugins: HashMap::new(),
            listeners: HashMap::new(),
            auth: AuthConfig::default(),
            webhooks: WebhooksConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

/// A peer entry from config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct PeerConfig {
    /// Logical peer name.
    pub id: String,
    /// Hex-encoded compressed public key.
    pub public_key: String,
    /// `host:port` of the peer-protocol listener.
    pub address: String,
}

/// Supported source-chain RPC provider flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Alchemy hosted endpoint (needs `apiKey`).
    Alchemy,
    /// Infura hosted endpoint (needs `apiKey`).
    Infura,
    /// QuickNode hosted endpoint (needs `url`).
    Quicknode,
    /// Ankr hosted endpoint (needs `apiKey`).
    Ankr,
    /// Plain JSON-RPC endpoint (needs `url`).
    Json,
}

/// One provider for a source chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcProviderConfig {
    /// Provider flavour.
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    /// Chain discriminator for multi-chain providers.
    pub chain: Option<String>,
    /// Hosted-provider API key.
    pub api_key: Option<String>,
    /// Endpoint URL for url-based providers.
    pub url: Option<String>,
    /// Token-bucket limit fed to the rate limiter.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

fn default_requests_per_second() -> u32 {
    10
}

/// Downstream ("abstraction") chain endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AbstractionChainConfig {
    /// Directory-node URLs to round-robin over.
    pub directory_node_url_pool: Vec<String>,
    /// Target blockchain RID.
    pub blockchain_rid: String,
}

/// Per-listener tuning knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListenerTuning {
    /// Maximum blocks scanned per run.
    pub block_height_increment: u64,
    /// Idle delay once a listener is caught up, in milliseconds.
    pub throttle_on_success_ms: u64,
    /// Maximum events dispatched as a single batched task.
    pub batch_size: usize,
    /// TTL for the listener's cursor and dedup cache entries.
    pub cache_ttl_ms: u64,
}

impl Default for ListenerTuning {
    fn default() -> Self {
        Self {
            block_height_increment: 100,
            throttle_on_success_ms: 15_000,
            batch_size: 50,
            cache_ttl_ms: 300_000,
        }
    }
}

/// End-user auth settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    /// Freshness window for signed auth envelopes.
    pub signature_max_age_ms: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signature_max_age_ms: 30_000,
        }
    }
}

/// Third-party webhook credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhooksConfig {
    /// Helius token-balance webhook, if configured.
    pub helius: Option<HeliusWebhookConfig>,
}

/// Helius webhook credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct HeliusWebhookConfig {
    /// Shared secret expected in the `Authorization` header.
    pub api_key: String,
    /// Helius-side webhook id.
    pub webhook_id: String,
    /// Registered delivery URL.
    pub url: String,
}

impl NodeConfig {
    /// Load and validate a config file. YAML is preferred; `.json` files
    /// are parsed as JSON.
    pub fn load(path: &Path) -> Result<Self, OracleError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| OracleError::config(format!("Cannot read {}: {e}", path.display())))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config: NodeConfig = if is_json {
            serde_json::from_str(&raw)
                .map_err(|e| OracleError::config(format!("Malformed JSON config: {e}")))?
        } else {
            serde_yaml::from_str(&raw)
                .map_err(|e| OracleError::config(format!("Malformed YAML config: {e}")))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the snapshot for internal consistency.
    pub fn validate(&self) -> Result<(), OracleError> {
        if self.id.is_empty() {
            return Err(OracleError::config("id must be set"));
        }

        let keypair = self.keypair()?;
        let configured = NodePublicKey::from_hex(&self.public_key)
            .map_err(|e| OracleError::config(format!("publicKey: {e}")))?;
        if keypair.public_key() != configured {
            return Err(OracleError::config(
                "publicKey does not match the key derived from privateKey",
            ));
        }

        let ports = [self.port, self.api_port, self.metrics_port];
        let distinct: std::collections::HashSet<_> = ports.iter().collect();
        if distinct.len() != ports.len() {
            return Err(OracleError::config(
                "port, apiPort and metricsPort must be distinct",
            ));
        }

        if self.min_signatures_required == 0 {
            return Err(OracleError::config("minSignaturesRequired must be >= 1"));
        }

        let mut seen_ids = std::collections::HashSet::new();
        for peer in &self.peers {
            if !seen_ids.insert(&peer.id) {
                return Err(OracleError::config(format!("Duplicate peer id: {}", peer.id)));
            }
            let peer_key = NodePublicKey::from_hex(&peer.public_key)
                .map_err(|e| OracleError::config(format!("Peer {} publicKey: {e}", peer.id)))?;
            if peer_key == configured {
                return Err(OracleError::config(format!(
                    "Peer {} carries the local node's key; a node is never in its own peer list",
                    peer.id
                )));
            }
        }

        // Secondaries must know the primary's key for the validate boundary.
        self.primary_key()?;

        Ok(())
    }

    /// The local signing keypair.
    pub fn keypair(&self) -> Result<NodeKeyPair, OracleError> {
        NodeKeyPair::from_hex(&self.private_key)
            .map_err(|e| OracleError::config(format!("privateKey: {e}")))
    }

    /// The cluster's primary public key.
    pub fn primary_key(&self) -> Result<NodePublicKey, OracleError> {
        match &self.primary_public_key {
            Some(hex_key) => NodePublicKey::from_hex(hex_key)
                .map_err(|e| OracleError::config(format!("primaryPublicKey: {e}"))),
            None if self.primary => NodePublicKey::from_hex(&self.public_key)
                .map_err(|e| OracleError::config(format!("publicKey: {e}"))),
            None => Err(OracleError::config(
                "primaryPublicKey must be set on secondary nodes",
            )),
        }
    }

    /// Peer list with parsed keys, in config order.
    pub fn parsed_peers(&self) -> Result<Vec<Peer>, OracleError> {
        self.peers
            .iter()
            .map(|peer| {
                Ok(Peer {
                    id: peer.id.clone(),
                    public_key: NodePublicKey::from_hex(&peer.public_key)
                        .map_err(|e| OracleError::config(format!("Peer {} publicKey: {e}", peer.id)))?,
                    address: peer.address.clone(),
                })
            })
            .collect()
    }

    /// Configured source-chain names, sorted for stable output.
    pub fn source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rpc.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tuning for a listener, falling back to defaults.
    pub fn listener_tuning(&self, listener_id: &str) -> ListenerTuning {
        self.listeners
            .get(listener_id)
            .copied()
            .unwrap_or_default()
    }

    /// The configured rate limit for a source, falling back to the
    /// first provider's setting or the global default.
    pub fn source_rate_limit(&self, source: &str) -> u32 {
        self.rpc
            .get(source)
            .and_then(|providers| providers.first())
            .map(|provider| provider.requests_per_second)
            .unwrap_or_else(default_requests_per_second)
    }
}
