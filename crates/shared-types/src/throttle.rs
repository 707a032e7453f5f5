//! # Rate Limiter
//!
//! Keyed moving-window rate limiting for external RPC calls. Every
//! source-chain provider call runs through `execute`, keyed by the source
//! name.
//!
//! ## Semantics
//!
//! - Each key owns a moving one-second window with a caller-supplied call
//!   limit.
//! - Callers queue when the window is full; nothing is dropped. The queue
//!   is process-memory only, bounded only by application concurrency.
//! - Queue depth and per-call wait time are exported as metrics per key.
//! - A 429 from a provider transiently halves the key's effective rate
//!   (see [`retry_on_429`]).

use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::errors::OracleError;
use crate::retry::{retry_with, RetryPolicy};

/// The moving-window interval.
const WINDOW: Duration = Duration::from_millis(1000);

/// How long a 429 keeps a key's rate reduced.
const PENALTY_WINDOW: Duration = Duration::from_secs(30);

struct Bucket {
    /// Timestamps of calls admitted within the current window.
    window: Mutex<VecDeque<Instant>>,
    /// Callers currently queued (including the one holding a slot check).
    waiting: AtomicI64,
    /// While set and in the future, the effective limit is halved.
    penalty_until: parking_lot::Mutex<Option<Instant>>,
}

impl Bucket {
    fn new() -> Self {
        Self {
            window: Mutex::new(VecDeque::new()),
            waiting: AtomicI64::new(0),
            penalty_until: parking_lot::Mutex::new(None),
        }
    }

    fn effective_limit(&self, limit: u32, now: Instant) -> u32 {
        let mut penalty = self.penalty_until.lock();
        match *penalty {
            Some(until) if now < until => (limit / 2).max(1),
            Some(_) => {
                *penalty = None;
                limit.max(1)
            }
            None => limit.max(1),
        }
    }
}

/// Per-key moving-window rate limiter.
///
/// Buckets are created lazily on first use; cross-key calls never contend.
pub struct ThrottleManager {
    buckets: DashMap<String, Arc<Bucket>>,
}

impl ThrottleManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    fn bucket(&self, key: &str) -> Arc<Bucket> {
        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Bucket::new()))
            .clone()
    }

    /// Run `op` once a window slot is available for `key`.
    ///
    /// Queues (sleeps until the oldest slot expires) instead of dropping;
    /// the op's own error propagates unchanged.
    pub async fn execute<T, E, F, Fut>(&self, key: &str, limit: u32, op: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let bucket = self.bucket(key);
        let started = Instant::now();

        let depth = bucket.waiting.fetch_add(1, Ordering::SeqCst) + 1;
        attestor_telemetry::set_throttle_queue_depth(key, depth);

        loop {
            let wait = {
                let mut window = bucket.window.lock().await;
                let now = Instant::now();

                while window
                    .front()
                    .is_some_and(|&admitted| now.duration_since(admitted) >= WINDOW)
                {
                    window.pop_front();
                }

                let effective = bucket.effective_limit(limit, now);
                if (window.len() as u32) < effective {
                    window.push_back(now);
                    None
                } else {
                    window
                        .front()
                        .map(|&oldest| WINDOW.saturating_sub(now.duration_since(oldest)))
                }
            };

            match wait {
                None => break,
                Some(delay) => {
                    debug!(key, delay_ms = delay.as_millis() as u64, "Rate limit window full, queuing");
                    tokio::time::sleep(delay.max(Duration::from_millis(1))).await;
                }
            }
        }

        let depth = bucket.waiting.fetch_sub(1, Ordering::SeqCst) - 1;
        attestor_telemetry::set_throttle_queue_depth(key, depth);
        attestor_telemetry::record_throttle_wait(key, started.elapsed().as_secs_f64());

        op().await
    }

    /// Like [`execute`](Self::execute), folding the op's error into the
    /// `throttle_error` taxonomy tag.
    pub async fn execute_throttled<T, E, F, Fut>(
        &self,
        key: &str,
        limit: u32,
        op: F,
    ) -> Result<T, OracleError>
    where
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute(key, limit, op)
            .await
            .map_err(|e| OracleError::Throttle { context: e.to_string() })
    }

    /// Transiently reduce a key's effective rate.
    pub fn penalize(&self, key: &str, duration: Duration) {
        let bucket = self.bucket(key);
        let until = Instant::now() + duration;
        let mut penalty = bucket.penalty_until.lock();
        *penalty = Some(penalty.map_or(until, |existing| existing.max(until)));
    }

    /// True while a penalty window is active for `key`.
    pub fn penalty_active(&self, key: &str) -> bool {
        self.buckets.get(key).is_some_and(|bucket| {
            bucket
                .penalty_until
                .lock()
                .is_some_and(|until| Instant::now() < until)
        })
    }

    /// Callers currently queued on `key`.
    pub fn queue_depth(&self, key: &str) -> i64 {
        self.buckets
            .get(key)
            .map_or(0, |bucket| bucket.waiting.load(Ordering::SeqCst))
    }
}

impl Default for ThrottleManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a provider call that may surface HTTP 429.
///
/// Retries once with the standard backoff and halves the key's effective
/// rate for the penalty window. On exhaustion the original error
/// propagates.
pub async fn retry_on_429<T, E, F, Fut, P>(
    manager: &ThrottleManager,
    key: &str,
    is_rate_limited: P,
    op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    retry_with(
        RetryPolicy::backoff(2),
        |err| {
            if is_rate_limited(err) {
                manager.penalize(key, PENALTY_WINDOW);
                true
            } else {
                false
            }
        },
        op,
    )
    .await
}
