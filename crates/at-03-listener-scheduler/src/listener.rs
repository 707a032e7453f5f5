//! The contract the scheduler relies on.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use shared_types::OracleError;

/// Current wall-clock time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A source observer the scheduler re-fires forever.
///
/// A well-behaved listener is idempotent with respect to its own progress
/// marker: it keeps a per-source cursor in the shared cache, scans a
/// bounded window per run, dispatches events in `(blockNumber, logIndex)`
/// order, and dedups by stable event id so a replayed window produces no
/// new effects.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Stable listener id (cache-key prefix and metric label).
    fn id(&self) -> &str;

    /// Observe the source once and dispatch any due tasks.
    ///
    /// Returns the absolute millisecond timestamp at which the scheduler
    /// should fire this listener again.
    async fn run(&self) -> Result<u64, OracleError>;
}
