//! Gateway wiring: routers and listeners.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use at_01_task_coordination::TaskDispatcher;
use shared_codec::Value;
use shared_types::{HeliusWebhookConfig, OracleError, TtlCache};

use crate::cors;
use crate::ports::outbound::MintDirectory;
use crate::routes;
use crate::webhook;

/// Shared state of the external API.
pub struct GatewayState {
    /// Runs tasks for API callers and the webhook.
    pub dispatcher: Arc<dyn TaskDispatcher>,
    /// Configured source-chain names for `GET /sources`.
    pub sources: Vec<String>,
    /// Shared short-TTL cache (webhook dedup + allow-list).
    pub cache: Arc<TtlCache<Value>>,
    /// Tracked-mint allow-list source.
    pub mints: Arc<dyn MintDirectory>,
    /// Webhook credentials; webhook route answers 401 without them.
    pub helius: Option<HeliusWebhookConfig>,
    /// Plugin the webhook dispatches to.
    pub webhook_plugin_id: String,
    /// TTL for webhook dedup entries and the cached allow-list.
    pub webhook_cache_ttl: Duration,
}

/// Build the external API router.
pub fn api_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(routes::handle_health))
        .route("/sources", get(routes::handle_sources))
        .route("/task", post(routes::handle_task))
        .route("/helius/webhook", post(webhook::handle_helius_webhook))
        .layer(axum::middleware::from_fn(cors::apply))
        .with_state(state)
}

/// Build the metrics exposition router.
pub fn metrics_router() -> Router {
    Router::new().route("/metrics", get(handle_metrics))
}

async fn handle_metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        attestor_telemetry::gather(),
    )
}

/// Bind and serve the external API until the process exits.
pub async fn serve_api(state: Arc<GatewayState>, addr: SocketAddr) -> Result<(), OracleError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| OracleError::transport(format!("API listener bind {addr}: {e}")))?;

    info!(%addr, "External API listening");
    axum::serve(listener, api_router(state))
        .await
        .map_err(|e| OracleError::transport(format!("API server: {e}")))
}

/// Bind and serve Prometheus exposition until the process exits.
pub async fn serve_metrics(addr: SocketAddr) -> Result<(), OracleError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| OracleError::transport(format!("Metrics listener bind {addr}: {e}")))?;

    info!(%addr, "Metrics exposition listening");
    axum::serve(listener, metrics_router())
        .await
        .map_err(|e| OracleError::transport(format!("Metrics server: {e}")))
}
