//! HTTP implementation of the coordinator's peer port.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use at_01_task_coordination::ports::outbound::{PeerCoordination, PeerPrepareResponse};
use shared_codec::{decode, Value};
use shared_crypto::NodeSignature;
use shared_types::{retry_with, OracleError, Peer, RetryPolicy};

use crate::wire::{
    ErrorBody, PrepareRequest, PrepareResponseBody, ValidateRequest, ValidateResponseBody,
};

/// Peer client over plain HTTP.
///
/// One connect retry per call (the shared backoff policy); everything else
/// surfaces to the coordinator, which treats a failed peer as a missing
/// contribution.
pub struct HttpPeerClient {
    http: reqwest::Client,
}

impl HttpPeerClient {
    /// Build a client with the given per-request timeout.
    pub fn new(request_timeout: Duration) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| OracleError::transport(format!("HTTP client build failed: {e}")))?;

        Ok(Self { http })
    }

    async fn post(&self, url: &str, body: Vec<u8>) -> Result<reqwest::Response, OracleError> {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
            max_attempts: 2,
        };

        retry_with(
            policy,
            |err: &OracleError| matches!(err, OracleError::Transport { context } if context.starts_with("connect")),
            || async {
                self.http
                    .post(url)
                    // Historically fixed mislabel; bodies are the binary codec.
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body.clone())
                    .send()
                    .await
                    .map_err(|e| {
                        if e.is_connect() {
                            OracleError::transport(format!("connect: {e}"))
                        } else if e.is_timeout() {
                            OracleError::Timeout { context: format!("peer request: {e}") }
                        } else {
                            OracleError::transport(e.to_string())
                        }
                    })
            },
        )
        .await
    }

    async fn read_error(response: reqwest::Response) -> OracleError {
        let status = response.status();
        let body: Option<ErrorBody> = response.json().await.ok();
        let detail = body
            .map(|b| match b.context {
                Some(context) => format!("{}: {}", b.error, context),
                None => b.error,
            })
            .unwrap_or_else(|| "unreadable error body".to_string());

        match status {
            StatusCode::NOT_FOUND => OracleError::NotFound { what: detail },
            StatusCode::BAD_REQUEST => OracleError::Validation { context: detail },
            _ => OracleError::transport(format!("peer answered {status}: {detail}")),
        }
    }
}

#[async_trait]
impl PeerCoordination for HttpPeerClient {
    async fn prepare(
        &self,
        peer: &Peer,
        plugin_id: &str,
        input: &Value,
    ) -> Result<PeerPrepareResponse, OracleError> {
        let url = format!("{}/task/prepare", peer.base_url());
        debug!(peer = %peer.id, plugin_id, "Sending prepare");

        let body = PrepareRequest {
            plugin_id: plugin_id.to_string(),
            input: input.clone(),
        }
        .encode();

        let response = self.post(&url, body).await?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let parsed: PrepareResponseBody = response
            .json()
            .await
            .map_err(|e| OracleError::transport(format!("malformed prepare response: {e}")))?;

        let encoded = hex::decode(&parsed.encoded_data)
            .map_err(|e| OracleError::transport(format!("malformed encodedData hex: {e}")))?;
        let signature = NodeSignature::from_hex(&parsed.signature)?;

        // Authenticate before the coordinator ever sees the data.
        peer.public_key.verify(&encoded, &signature)?;

        Ok(PeerPrepareResponse {
            prepared: decode(&encoded)?,
            encoded,
            signature,
        })
    }

    async fn validate(
        &self,
        peer: &Peer,
        plugin_id: &str,
        aggregated: &Value,
        prepared: &Value,
        signature: &NodeSignature,
    ) -> Result<Value, OracleError> {
        let url = format!("{}/task/validate", peer.base_url());
        debug!(peer = %peer.id, plugin_id, "Sending validate");

        let body = ValidateRequest {
            plugin_id: plugin_id.to_string(),
            input: aggregated.clone(),
            prepared_data: prepared.clone(),
            signature: *signature,
        }
        .encode();

        let response = self.post(&url, body).await?;
        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        let parsed: ValidateResponseBody = response
            .json()
            .await
            .map_err(|e| OracleError::transport(format!("malformed validate response: {e}")))?;

        let encoded = hex::decode(&parsed.encoded_data)
            .map_err(|e| OracleError::transport(format!("malformed encodedData hex: {e}")))?;
        Ok(decode(&encoded)?)
    }
}
