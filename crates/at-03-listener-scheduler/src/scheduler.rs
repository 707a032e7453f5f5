//! The per-listener scheduling loop.
//!
//! One fiber per registered listener; no shared lock across entries. Each
//! fiber checks its own schedule every ~100 ms, runs the listener in a
//! background task when due, and records whatever next-fire timestamp the
//! run returned. A failed (or panicked) run is rescheduled one minute out.
//! Listeners are never cancelled; fibers run until process exit.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use shared_types::OracleError;

use crate::listener::{now_ms, Listener};

const IDLE_TICK: Duration = Duration::from_millis(100);
const ERROR_BACKOFF_MS: u64 = 60_000;

/// One listener's schedule; touched only by its own fiber.
struct ScheduleEntry {
    listener: Arc<dyn Listener>,
    next_fire_at_ms: AtomicU64,
    running: AtomicBool,
}

/// Owns all listener schedules and their fibers.
pub struct ListenerScheduler {
    entries: Mutex<Vec<Arc<ScheduleEntry>>>,
    started: AtomicBool,
}

impl ListenerScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Register a listener, due immediately. Must precede `start`.
    pub fn register(&self, listener: Arc<dyn Listener>) -> Result<(), OracleError> {
        if self.started.load(Ordering::SeqCst) {
            return Err(OracleError::config(
                "Listeners must be registered before the scheduler starts",
            ));
        }

        info!(listener_id = listener.id(), "Registering listener");
        self.entries.lock().push(Arc::new(ScheduleEntry {
            listener,
            next_fire_at_ms: AtomicU64::new(now_ms()),
            running: AtomicBool::new(false),
        }));
        Ok(())
    }

    /// Spawn one fiber per registered listener. Callable once.
    pub fn start(&self) -> Result<(), OracleError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(OracleError::config("Scheduler started twice"));
        }

        let entries = self.entries.lock();
        info!(listeners = entries.len(), "Starting listener scheduler");
        for entry in entries.iter() {
            tokio::spawn(run_loop(Arc::clone(entry)));
        }
        Ok(())
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// True when no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for ListenerScheduler {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_loop(entry: Arc<ScheduleEntry>) {
    let listener_id = entry.listener.id().to_string();
    debug!(listener_id = %listener_id, "Listener fiber started");

    loop {
        let due = !entry.running.load(Ordering::Acquire)
            && now_ms() >= entry.next_fire_at_ms.load(Ordering::Acquire);

        if due {
            entry.running.store(true, Ordering::Release);

            // Run in a background task so a panicking listener only costs
            // this one invocation.
            let listener = Arc::clone(&entry.listener);
            let outcome = tokio::spawn(async move { listener.run().await }).await;

            let next_fire = match outcome {
                Ok(Ok(next_ms)) => next_ms,
                Ok(Err(err)) => {
                    attestor_telemetry::record_listener_error(&listener_id);
                    warn!(
                        listener_id = %listener_id,
                        kind = err.kind(),
                        context = %err,
                        "Listener run failed; backing off one minute"
                    );
                    now_ms() + ERROR_BACKOFF_MS
                }
                Err(join_err) => {
                    attestor_telemetry::record_listener_error(&listener_id);
                    warn!(
                        listener_id = %listener_id,
                        error = %join_err,
                        "Listener run panicked; backing off one minute"
                    );
                    now_ms() + ERROR_BACKOFF_MS
                }
            };

            entry.next_fire_at_ms.store(next_fire, Ordering::Release);
            entry.running.store(false, Ordering::Release);
        }

        tokio::time::sleep(IDLE_TICK).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct CountingListener {
        id: String,
        runs: Arc<AtomicUsize>,
        /// Milliseconds from now each run schedules the next for.
        reschedule_in_ms: u64,
        fail: bool,
    }

    #[async_trait]
    impl Listener for CountingListener {
        fn id(&self) -> &str {
            &self.id
        }

        async fn run(&self) -> Result<u64, OracleError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(OracleError::Throttle { context: "provider down".to_string() });
            }
            Ok(now_ms() + self.reschedule_in_ms)
        }
    }

    struct PanickingListener {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Listener for PanickingListener {
        fn id(&self) -> &str {
            "panicking"
        }

        async fn run(&self) -> Result<u64, OracleError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            panic!("listener bug");
        }
    }

    #[tokio::test]
    async fn test_backlogged_listener_refires_immediately() {
        let scheduler = ListenerScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        scheduler
            .register(Arc::new(CountingListener {
                id: "busy".to_string(),
                runs: Arc::clone(&runs),
                reschedule_in_ms: 0,
                fail: false,
            }))
            .unwrap();
        scheduler.start().unwrap();

        tokio::time::sleep(Duration::from_millis(550)).await;
        // ~100 ms tick: expect several runs, one per tick.
        assert!(runs.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_caught_up_listener_self_throttles() {
        let scheduler = ListenerScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        scheduler
            .register(Arc::new(CountingListener {
                id: "idle".to_string(),
                runs: Arc::clone(&runs),
                reschedule_in_ms: 60_000,
                fail: false,
            }))
            .unwrap();
        scheduler.start().unwrap();

        tokio::time::sleep(Duration::from_millis(550)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_listener_backs_off_one_minute() {
        let scheduler = ListenerScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        scheduler
            .register(Arc::new(CountingListener {
                id: "broken".to_string(),
                runs: Arc::clone(&runs),
                reschedule_in_ms: 0,
                fail: true,
            }))
            .unwrap();
        scheduler.start().unwrap();

        tokio::time::sleep(Duration::from_millis(550)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_kill_the_fiber() {
        let scheduler = ListenerScheduler::new();
        let panic_runs = Arc::new(AtomicUsize::new(0));
        let healthy_runs = Arc::new(AtomicUsize::new(0));

        scheduler
            .register(Arc::new(PanickingListener { runs: Arc::clone(&panic_runs) }))
            .unwrap();
        scheduler
            .register(Arc::new(CountingListener {
                id: "healthy".to_string(),
                runs: Arc::clone(&healthy_runs),
                reschedule_in_ms: 0,
                fail: false,
            }))
            .unwrap();
        scheduler.start().unwrap();

        tokio::time::sleep(Duration::from_millis(550)).await;
        // Panic counted once and backed off; the sibling keeps running.
        assert_eq!(panic_runs.load(Ordering::SeqCst), 1);
        assert!(healthy_runs.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_register_after_start_rejected() {
        let scheduler = ListenerScheduler::new();
        scheduler.start().unwrap();

        let runs = Arc::new(AtomicUsize::new(0));
        let err = scheduler
            .register(Arc::new(CountingListener {
                id: "late".to_string(),
                runs,
                reschedule_in_ms: 0,
                fail: false,
            }))
            .unwrap_err();
        assert_eq!(err.kind(), "config_error");

        assert!(scheduler.start().is_err());
    }
}
