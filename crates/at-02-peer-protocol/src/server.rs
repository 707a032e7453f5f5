//! The peer-facing endpoints.
//!
//! Both endpoints are stateless with respect to tasks; any node can serve
//! either. A node in primary mode additionally runs the listener
//! scheduler, but that lives outside this crate.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tracing::{debug, info, warn};

use at_01_task_coordination::PluginRegistry;
use shared_codec::encode;
use shared_crypto::{NodeKeyPair, NodePublicKey};
use shared_types::OracleError;

use crate::wire::{
    ErrorBody, PrepareRequest, PrepareResponseBody, ValidateRequest, ValidateResponseBody,
};

/// Shared state of the peer server.
pub struct PeerServerState {
    /// Plugin lookup.
    pub registry: Arc<PluginRegistry>,
    /// Local signing identity (signs prepare responses).
    pub keypair: NodeKeyPair,
    /// The cluster primary's key (validate-boundary check).
    pub primary_key: NodePublicKey,
}

/// Build the peer-protocol router.
pub fn peer_router(state: Arc<PeerServerState>) -> Router {
    Router::new()
        .route("/task/prepare", post(handle_prepare))
        .route("/task/validate", post(handle_validate))
        .with_state(state)
}

/// Bind and serve the peer protocol until the process exits.
pub async fn serve(state: Arc<PeerServerState>, addr: SocketAddr) -> Result<(), OracleError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| OracleError::transport(format!("peer listener bind {addr}: {e}")))?;

    info!(%addr, "Peer protocol listening");
    axum::serve(listener, peer_router(state))
        .await
        .map_err(|e| OracleError::transport(format!("peer server: {e}")))
}

async fn handle_prepare(
    State(state): State<Arc<PeerServerState>>,
    body: Bytes,
) -> Response {
    match prepare_inner(&state, &body).await {
        Ok(response) => {
            attestor_telemetry::record_peer_request("prepare", "ok");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => error_response("prepare", err),
    }
}

async fn prepare_inner(
    state: &PeerServerState,
    body: &[u8],
) -> Result<PrepareResponseBody, OracleError> {
    let request = PrepareRequest::decode(body)?;
    debug!(plugin_id = %request.plugin_id, "Serving prepare");

    let plugin = state.registry.get(&request.plugin_id)?;
    let prepared = plugin.prepare(request.input).await?;

    let encoded = encode(&prepared);
    let signature = state.keypair.sign(&encoded);

    Ok(PrepareResponseBody {
        encoded_data: hex::encode(&encoded),
        signature: signature.to_hex(),
    })
}

async fn handle_validate(
    State(state): State<Arc<PeerServerState>>,
    body: Bytes,
) -> Response {
    match validate_inner(&state, &body).await {
        Ok(response) => {
            attestor_telemetry::record_peer_request("validate", "ok");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => error_response("validate", err),
    }
}

async fn validate_inner(
    state: &PeerServerState,
    body: &[u8],
) -> Result<ValidateResponseBody, OracleError> {
    let request = ValidateRequest::decode(body)?;
    debug!(plugin_id = %request.plugin_id, "Serving validate");

    // The primary must have signed the prepared data this request claims;
    // reject before any plugin code runs.
    state
        .primary_key
        .verify(&encode(&request.prepared_data), &request.signature)?;

    let plugin = state.registry.get(&request.plugin_id)?;
    let validated = plugin.validate(request.input, request.prepared_data).await?;

    Ok(ValidateResponseBody {
        encoded_data: hex::encode(encode(&validated)),
    })
}

fn error_response(endpoint: &'static str, err: OracleError) -> Response {
    let (status, outcome, body) = match &err {
        OracleError::NotFound { .. } => (
            StatusCode::NOT_FOUND,
            "not_found",
            ErrorBody {
                error: err.kind().to_string(),
                context: Some(err.to_string()),
            },
        ),
        OracleError::Crypto(_) => (
            StatusCode::BAD_REQUEST,
            "invalid_signature",
            ErrorBody {
                error: "Invalid signature".to_string(),
                context: None,
            },
        ),
        OracleError::Codec(_) => (
            StatusCode::BAD_REQUEST,
            "malformed",
            ErrorBody {
                error: err.kind().to_string(),
                context: Some(err.to_string()),
            },
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "error",
            ErrorBody {
                error: err.kind().to_string(),
                context: Some(err.to_string()),
            },
        ),
    };

    warn!(endpoint, status = %status, kind = err.kind(), context = %err, "Peer request rejected");
    attestor_telemetry::record_peer_request(endpoint, outcome);
    (status, Json(body)).into_response()
}
