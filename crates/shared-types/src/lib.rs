//! # Shared Types Crate
//!
//! Cross-subsystem building blocks for the oracle network: domain entities,
//! the `OracleError` taxonomy every boundary speaks, the static node
//! configuration model, the TTL cache, the queueing rate limiter, and the
//! retry combinator.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type shared by two or more
//!   subsystems is defined here.
//! - **Tagged Errors**: `OracleError` carries a stable snake_case kind at
//!   every boundary; conversions between kinds happen only where the
//!   protocol explicitly demands them.
//! - **Read-Only After Startup**: the config snapshot and peer list are
//!   immutable for the process lifetime; only the cache and rate-limiter
//!   buckets mutate, each atomic per key.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod entities;
pub mod errors;
pub mod retry;
pub mod throttle;

pub use cache::TtlCache;
pub use config::{
    AbstractionChainConfig, AuthConfig, HeliusWebhookConfig, ListenerTuning, NodeConfig,
    PeerConfig, ProviderKind, RpcProviderConfig, WebhooksConfig,
};
pub use entities::{EventId, Peer};
pub use errors::OracleError;
pub use retry::{retry_with, RetryPolicy};
pub use throttle::{retry_on_429, ThrottleManager};
