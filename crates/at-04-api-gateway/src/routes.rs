//! Core API handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, warn};

use shared_codec::from_json;
use shared_types::OracleError;

use crate::service::GatewayState;

/// `POST /task` body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSubmission {
    /// Target plugin.
    pub plugin_id: String,
    /// Free-form JSON input, bridged into the codec grammar.
    pub input: serde_json::Value,
}

/// `GET /health`.
pub async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "OK" }))
}

/// `GET /sources`.
pub async fn handle_sources(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(state.sources.clone())
}

/// `POST /task`: run one task synchronously.
pub async fn handle_task(
    State(state): State<Arc<GatewayState>>,
    Json(submission): Json<TaskSubmission>,
) -> Response {
    debug!(plugin_id = %submission.plugin_id, "API task submitted");

    let input = match from_json(&submission.input) {
        Ok(input) => input,
        Err(err) => return error_response(OracleError::from(err)),
    };

    match state.dispatcher.dispatch(&submission.plugin_id, input).await {
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(err) => error_response(err),
    }
}

/// Map a task failure onto the `5xx {error, context}` contract.
pub fn error_response(err: OracleError) -> Response {
    warn!(kind = err.kind(), context = %err, "API request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": err.kind(),
            "context": err.to_string(),
        })),
    )
        .into_response()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ports::outbound::StaticMintDirectory;
    use crate::service::{api_router, metrics_router};
    use async_trait::async_trait;
    use at_01_task_coordination::TaskDispatcher;
    use axum::body::Body;
    use axum::http::{header, Request};
    use parking_lot::Mutex;
    use shared_codec::Value;
    use shared_types::TtlCache;
    use std::time::Duration;
    use tower::ServiceExt;

    pub(crate) struct RecordingDispatcher {
        pub calls: Mutex<Vec<(String, Value)>>,
        pub fail_with: Mutex<Option<OracleError>>,
    }

    impl Default for RecordingDispatcher {
        fn default() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_with: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl TaskDispatcher for RecordingDispatcher {
        async fn dispatch(&self, plugin_id: &str, input: Value) -> Result<Value, OracleError> {
            if let Some(err) = self.fail_with.lock().clone() {
                return Err(err);
            }
            self.calls.lock().push((plugin_id.to_string(), input));
            Ok(Value::Null)
        }
    }

    pub(crate) fn test_state(dispatcher: Arc<RecordingDispatcher>) -> Arc<GatewayState> {
        Arc::new(GatewayState {
            dispatcher,
            sources: vec!["ethereum".to_string(), "solana".to_string()],
            cache: Arc::new(TtlCache::new(60_000)),
            mints: Arc::new(StaticMintDirectory::new(vec!["MintAAA".to_string()])),
            helius: Some(shared_types::HeliusWebhookConfig {
                api_key: "hook-secret".to_string(),
                webhook_id: "wh-1".to_string(),
                url: "https://node.example.com/helius/webhook".to_string(),
            }),
            webhook_plugin_id: "balance-updater".to_string(),
            webhook_cache_ttl: Duration::from_secs(60),
        })
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>, axum::http::HeaderMap) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec(), headers)
    }

    use axum::Router;

    #[tokio::test]
    async fn test_health_reports_ok_with_cors() {
        let state = test_state(Arc::new(RecordingDispatcher::default()));
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, body, headers) = send(api_router(state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&body).unwrap(),
            serde_json::json!({ "message": "OK" })
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_preflight_is_204_with_allow_headers() {
        let state = test_state(Arc::new(RecordingDispatcher::default()));
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/task")
            .body(Body::empty())
            .unwrap();

        let (status, _, headers) = send(api_router(state), request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
        assert!(headers.contains_key(header::ACCESS_CONTROL_ALLOW_HEADERS));
    }

    #[tokio::test]
    async fn test_sources_lists_configured_chains() {
        let state = test_state(Arc::new(RecordingDispatcher::default()));
        let request = Request::builder()
            .uri("/sources")
            .body(Body::empty())
            .unwrap();

        let (status, body, _) = send(api_router(state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_slice::<Vec<String>>(&body).unwrap(),
            vec!["ethereum", "solana"]
        );
    }

    #[tokio::test]
    async fn test_task_submission_bridges_json_to_codec() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let state = test_state(Arc::clone(&dispatcher));

        let body = serde_json::json!({
            "pluginId": "evm-forwarder",
            "input": { "chain": "ethereum", "txHash": "0xbeef", "logIndex": 2 }
        });
        let request = Request::builder()
            .method("POST")
            .uri("/task")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let (status, body, _) = send(api_router(state), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");

        let calls = dispatcher.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "evm-forwarder");
        assert_eq!(
            calls[0].1.get("logIndex").and_then(Value::as_int),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_task_failure_maps_to_5xx_tagged_body() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        *dispatcher.fail_with.lock() = Some(OracleError::InsufficientPeers {
            collected: 1,
            required: 3,
        });
        let state = test_state(Arc::clone(&dispatcher));

        let body = serde_json::json!({ "pluginId": "evm-forwarder", "input": {} });
        let request = Request::builder()
            .method("POST")
            .uri("/task")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let (status, body, _) = send(api_router(state), request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"], "insufficient_peers");
        assert!(parsed["context"].as_str().unwrap().contains("required 3"));
    }

    #[tokio::test]
    async fn test_float_input_is_rejected_by_the_bridge() {
        let state = test_state(Arc::new(RecordingDispatcher::default()));
        let body = serde_json::json!({ "pluginId": "evm-forwarder", "input": { "amount": 1.5 } });
        let request = Request::builder()
            .method("POST")
            .uri("/task")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let (status, body, _) = send(api_router(state), request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"], "codec_error");
    }

    #[tokio::test]
    async fn test_metrics_router_serves_text_exposition() {
        attestor_telemetry::record_task_completed("gateway-test-plugin", 0.1);

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let (status, body, headers) = send(metrics_router(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(headers
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        assert!(String::from_utf8(body)
            .unwrap()
            .contains("attestor_tasks_completed_total"));
    }
}
