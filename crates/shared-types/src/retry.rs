//! # Retry Combinator
//!
//! One retry policy for the whole system: the rate limiter's 429 handling,
//! the peer client's connect retry, and the downstream submit all go
//! through `retry_with` instead of bespoke try/catch wrapping.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Exponential backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// First delay between attempts.
    pub base_delay: Duration,
    /// Upper bound the doubling stops at.
    pub max_delay: Duration,
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// The standard provider backoff: doubling from 500 ms to a 15 s cap.
    pub const fn backoff(max_attempts: u32) -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(15),
            max_attempts,
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Run `op`, retrying failures the predicate accepts, under the policy's
/// attempt bound. On exhaustion the original error propagates unchanged.
pub async fn retry_with<T, E, F, Fut, P>(
    policy: RetryPolicy,
    mut should_retry: P,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts || !should_retry(&err) {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt - 1);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying after failure");
                tokio::time::sleep(delay).await;
            }
        }
    }
}
