//! # Attestor Node Runtime
//!
//! Explicit construction and wiring of every subsystem:
//!
//! ```text
//! config ──► TaskContext ──► TaskRunner ──────────┐
//!    │            │                               │
//!    │            └──► PeerServer (port)          │
//!    ├──► ApiGateway (apiPort) ◄──────────────────┤
//!    ├──► Metrics listener (metricsPort)          │
//!    └──► ListenerScheduler (primary only) ◄──────┘
//! ```
//!
//! Concrete plugin bodies and listeners are supplied by the embedding
//! application through [`NodeRuntime::register_plugin`] and
//! [`NodeRuntime::register_listener`]; the shipped binary boots with an
//! empty registry and serves the protocol surfaces only.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use at_01_task_coordination::{
    Plugin, PluginRegistry, TaskContext, TaskDispatcher, TaskRunner,
};
use at_02_peer_protocol::{HttpPeerClient, PeerServerState};
use at_03_listener_scheduler::{Listener, ListenerScheduler};
use at_04_api_gateway::{GatewayState, StaticMintDirectory};
use shared_codec::Value;
use shared_types::{NodeConfig, OracleError, ThrottleManager, TtlCache};

/// Default TTL of the shared cache, when no listener tuning overrides it.
const DEFAULT_CACHE_TTL_MS: u64 = 300_000;

/// Plugin id the Helius webhook dispatches to.
const WEBHOOK_PLUGIN_ID: &str = "balance-updater";

/// Dependencies handed to listener factories at start time.
pub struct ListenerDeps {
    /// The validated config snapshot.
    pub config: NodeConfig,
    /// Shared TTL cache (cursors, dedup).
    pub cache: Arc<TtlCache<Value>>,
    /// Keyed rate limiter for source RPC.
    pub throttle: Arc<ThrottleManager>,
    /// Registry-backed task dispatch.
    pub dispatcher: Arc<dyn TaskDispatcher>,
}

/// Factory producing a listener once the runtime's shared pieces exist.
pub type ListenerFactory = Box<dyn FnOnce(&ListenerDeps) -> Arc<dyn Listener> + Send>;

/// The assembled node.
pub struct NodeRuntime {
    config: NodeConfig,
    registry: PluginRegistry,
    listener_factories: Vec<ListenerFactory>,
}

impl NodeRuntime {
    /// Start assembling a node from validated config.
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            registry: PluginRegistry::new(),
            listener_factories: Vec::new(),
        }
    }

    /// Register a plugin. Startup-only; duplicate ids error.
    pub fn register_plugin<P: Plugin>(&mut self, plugin: P) -> Result<(), OracleError> {
        self.registry.register(plugin)
    }

    /// Queue a listener factory; listeners spawn only on primary nodes.
    pub fn register_listener(&mut self, factory: ListenerFactory) {
        self.listener_factories.push(factory);
    }

    /// Number of registered plugins.
    pub fn plugin_count(&self) -> usize {
        self.registry.len()
    }

    /// Wire everything and spawn the listeners/servers.
    ///
    /// Returns once all subsystems are running; the caller owns process
    /// lifetime (typically by waiting for ctrl-c). In-flight tasks are
    /// lost on shutdown; the downstream chain's 409 semantics recover
    /// replays after restart.
    pub async fn start(self) -> Result<(), OracleError> {
        let config = self.config;
        config.validate()?;

        info!(node_id = %config.id, primary = config.primary, "Starting attestor node");

        let registry = Arc::new(self.registry);
        if registry.is_empty() {
            warn!("No plugins registered; every task will answer not_found");
        }

        // Peer client request budget: slightly past the fan-out deadline
        // so the coordinator's own timer is the one that fires.
        let request_timeout = Duration::from_millis(config.peer_timeout_ms.max(1_000)) * 2;
        let peer_client = Arc::new(HttpPeerClient::new(request_timeout)?);

        let context = Arc::new(TaskContext::from_config(
            &config,
            Arc::clone(&registry),
            peer_client,
        )?);
        let dispatcher: Arc<dyn TaskDispatcher> = Arc::new(TaskRunner::new(Arc::clone(&context)));

        let cache: Arc<TtlCache<Value>> = Arc::new(TtlCache::new(DEFAULT_CACHE_TTL_MS));
        let throttle = Arc::new(ThrottleManager::new());

        // Peer protocol listener.
        let peer_state = Arc::new(PeerServerState {
            registry: Arc::clone(&registry),
            keypair: config.keypair()?,
            primary_key: config.primary_key()?,
        });
        spawn_server(
            "peer-protocol",
            at_02_peer_protocol::serve(peer_state, bind_addr(config.port)),
        );

        // External API + metrics listeners.
        let webhook_tuning = config.listener_tuning("helius-webhook");
        let gateway_state = Arc::new(GatewayState {
            dispatcher: Arc::clone(&dispatcher),
            sources: config.source_names(),
            cache: Arc::clone(&cache),
            mints: Arc::new(StaticMintDirectory::new(tracked_mints_from_config(&config))),
            helius: config.webhooks.helius.clone(),
            webhook_plugin_id: WEBHOOK_PLUGIN_ID.to_string(),
            webhook_cache_ttl: Duration::from_millis(webhook_tuning.cache_ttl_ms),
        });
        spawn_server(
            "api-gateway",
            at_04_api_gateway::serve_api(gateway_state, bind_addr(config.api_port)),
        );
        spawn_server(
            "metrics",
            at_04_api_gateway::serve_metrics(bind_addr(config.metrics_port)),
        );

        // Listeners run on the primary only; secondaries serve the peer
        // protocol and wait.
        if config.primary {
            let deps = ListenerDeps {
                config: config.clone(),
                cache,
                throttle,
                dispatcher,
            };

            let scheduler = ListenerScheduler::new();
            for factory in self.listener_factories {
                scheduler.register(factory(&deps))?;
            }
            scheduler.start()?;
            info!(listeners = scheduler.len(), "Listener scheduler running");
        } else if !self.listener_factories.is_empty() {
            info!(
                queued = self.listener_factories.len(),
                "Secondary node: listeners registered but not started"
            );
        }

        info!("Node started");
        Ok(())
    }
}

fn bind_addr(port: u16) -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], port))
}

fn spawn_server(
    name: &'static str,
    server: impl std::future::Future<Output = Result<(), OracleError>> + Send + 'static,
) {
    tokio::spawn(async move {
        if let Err(err) = server.await {
            error!(server = name, kind = err.kind(), context = %err, "Server exited");
        }
    });
}

/// Tracked token mints from the webhook plugin's free-form settings.
pub fn tracked_mints_from_config(config: &NodeConfig) -> Vec<String> {
    config
        .plugins
        .get(WEBHOOK_PLUGIN_ID)
        .and_then(|settings| settings.get("mints"))
        .and_then(|mints| mints.as_array())
        .map(|mints| {
            mints
                .iter()
                .filter_map(|mint| mint.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
