//! # AT-04 API Gateway
//!
//! The node's external surface, served on `apiPort`:
//!
//! - `GET /health`: liveness.
//! - `GET /sources`: configured source-chain names.
//! - `POST /task`: run a task synchronously for `{pluginId, input}`.
//! - `POST /helius/webhook`: authenticated token-balance intake that
//!   dispatches one task per distinct `(mint, userAccount)`.
//!
//! Prometheus text exposition is served by a separate listener on
//! `metricsPort`. Every response carries `Access-Control-Allow-Origin: *`
//! and `OPTIONS` preflights answer 204 with the standard `Allow-*`
//! headers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cors;
pub mod ports;
pub mod routes;
pub mod service;
pub mod webhook;

pub use ports::outbound::{MintDirectory, StaticMintDirectory};
pub use service::{api_router, metrics_router, serve_api, serve_metrics, GatewayState};
