//! Helius token-balance webhook intake.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, warn};

use shared_codec::Value;
use shared_types::OracleError;

use crate::routes::error_response;
use crate::service::GatewayState;

const TRACKED_MINTS_KEY: &str = "webhook:helius:tracked-mints";

/// One delivery from Helius; only the balance deltas matter here.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    /// Token balance changes carried by the transaction.
    #[serde(default)]
    pub token_balance_deltas: Vec<TokenBalanceDelta>,
}

/// A single token-balance change.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalanceDelta {
    /// Token mint address.
    pub mint: String,
    /// Affected user token account.
    pub user_account: String,
}

/// `POST /helius/webhook`.
///
/// Authenticated by the shared secret in `Authorization` (the single
/// accepted credential; any other header name is ignored). Deltas whose
/// mint is not on the cached allow-list are dropped; the rest dispatch
/// one task per distinct `(mint, userAccount)`, deduplicated in the
/// short-TTL cache to absorb bursts from a single on-chain event.
pub async fn handle_helius_webhook(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(events): Json<Vec<WebhookEvent>>,
) -> Response {
    let Some(config) = &state.helius else {
        return unauthorized("webhook not configured");
    };

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == config.api_key);
    if !authorized {
        return unauthorized("bad or missing Authorization");
    }

    let tracked = match tracked_mints(&state).await {
        Ok(tracked) => tracked,
        Err(err) => return error_response(err),
    };

    // Distinct (mint, userAccount) pairs, in delivery order.
    let mut seen_pairs = HashSet::new();
    let mut pairs = Vec::new();
    for event in &events {
        for delta in &event.token_balance_deltas {
            if !tracked.contains(&delta.mint) {
                continue;
            }
            let pair = (delta.mint.clone(), delta.user_account.clone());
            if seen_pairs.insert(pair.clone()) {
                pairs.push(pair);
            }
        }
    }

    let mut dispatched = 0usize;
    for (mint, user_account) in pairs {
        let dedup_key = format!("webhook:helius:{mint}:{user_account}");
        if state.cache.contains(&dedup_key) {
            debug!(%mint, %user_account, "Webhook delta suppressed by dedup cache");
            continue;
        }

        let input = Value::dict([
            ("source", Value::text("helius")),
            ("mint", Value::text(mint.clone())),
            ("userAccount", Value::text(user_account.clone())),
        ]);

        match state.dispatcher.dispatch(&state.webhook_plugin_id, input).await {
            Ok(_) => {
                state
                    .cache
                    .insert_with_ttl(dedup_key, Value::Bool(true), state.webhook_cache_ttl);
                dispatched += 1;
            }
            Err(err) => return error_response(err),
        }
    }

    debug!(dispatched, "Webhook delivery processed");
    (
        StatusCode::OK,
        Json(serde_json::json!({ "message": "OK", "dispatched": dispatched })),
    )
        .into_response()
}

async fn tracked_mints(state: &GatewayState) -> Result<HashSet<String>, OracleError> {
    if let Some(cached) = state.cache.get(TRACKED_MINTS_KEY) {
        if let Some(items) = cached.as_array() {
            return Ok(items
                .iter()
                .filter_map(|item| item.as_text().map(String::from))
                .collect());
        }
    }

    let mints = state.mints.tracked_mints().await?;
    state.cache.insert_with_ttl(
        TRACKED_MINTS_KEY,
        Value::Array(mints.iter().cloned().map(Value::Text).collect()),
        state.webhook_cache_ttl,
    );
    Ok(mints.into_iter().collect())
}

fn unauthorized(reason: &str) -> Response {
    warn!(reason, "Webhook delivery rejected");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "Unauthorized" })),
    )
        .into_response()
}
