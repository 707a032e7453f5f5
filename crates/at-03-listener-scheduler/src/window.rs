//! Windowed listener for block-oriented sources.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use async_trait::async_trait;
use at_01_task_coordination::TaskDispatcher;
use shared_codec::Value;
use shared_types::{EventId, ListenerTuning, OracleError, ThrottleManager, TtlCache};

use crate::listener::{now_ms, Listener};
use crate::ports::outbound::{BlockSource, ProcessedQuery, SourceEvent};

/// Blocks held back from the window tip to tolerate source-chain reorgs.
const REORG_LAG: u64 = 10;

/// Scans `[cursor+1, min(cursor+1+increment, head−lag)]` each run and
/// dispatches the window's events as ordered, deduplicated task batches.
///
/// The cursor lives in the shared cache under a short TTL; on cold start
/// the listener resumes from the height the downstream chain has already
/// indexed. The cursor only advances when every batch in the window
/// dispatched successfully, so a failed run replays the window and leans
/// on event-id dedup to stay idempotent.
pub struct BlockWindowListener {
    id: String,
    source_name: String,
    plugin_id: String,
    source: Arc<dyn BlockSource>,
    processed: Arc<dyn ProcessedQuery>,
    dispatcher: Arc<dyn TaskDispatcher>,
    cache: Arc<TtlCache<Value>>,
    throttle: Arc<ThrottleManager>,
    tuning: ListenerTuning,
    rate_limit: u32,
}

impl BlockWindowListener {
    /// Wire a windowed listener for one source/plugin pair.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        source_name: impl Into<String>,
        plugin_id: impl Into<String>,
        source: Arc<dyn BlockSource>,
        processed: Arc<dyn ProcessedQuery>,
        dispatcher: Arc<dyn TaskDispatcher>,
        cache: Arc<TtlCache<Value>>,
        throttle: Arc<ThrottleManager>,
        tuning: ListenerTuning,
        rate_limit: u32,
    ) -> Self {
        Self {
            id: id.into(),
            source_name: source_name.into(),
            plugin_id: plugin_id.into(),
            source,
            processed,
            dispatcher,
            cache,
            throttle,
            tuning,
            rate_limit,
        }
    }

    fn cursor_key(&self) -> String {
        format!("listener:{}:cursor", self.id)
    }

    fn seen_key(&self, event_id: &EventId) -> String {
        format!("listener:{}:seen:{}", self.id, event_id)
    }

    async fn scan_window(&self) -> Result<u64, OracleError> {
        let ttl = Duration::from_millis(self.tuning.cache_ttl_ms);

        let last_processed = match self.cache.get(&self.cursor_key()).and_then(|v| v.as_int()) {
            Some(height) => height as u64,
            None => {
                // Cold start: resume from the downstream chain's index.
                self.processed
                    .last_indexed_height(&self.source_name)
                    .await?
            }
        };

        let head = self
            .throttle
            .execute_throttled(&self.source_name, self.rate_limit, || self.source.head())
            .await?;

        let safe_head = head.saturating_sub(REORG_LAG);
        if last_processed >= safe_head {
            return Ok(now_ms() + self.tuning.throttle_on_success_ms);
        }

        let start = last_processed + 1;
        let end = (start + self.tuning.block_height_increment).min(safe_head);

        let mut events = self
            .throttle
            .execute_throttled(&self.source_name, self.rate_limit, || {
                self.source.events_in(start, end)
            })
            .await?;

        // Downstream state updates must reflect source ordering.
        events.sort_by_key(|event| (event.block_number, event.log_index));

        let fresh: Vec<SourceEvent> = events
            .into_iter()
            .filter(|event| !self.cache.contains(&self.seen_key(&event.event_id())))
            .collect();

        let mut dispatched = 0u64;
        for batch in fresh.chunks(self.tuning.batch_size.max(1)) {
            // A task that reports "already processed" resolves Ok here and
            // advances with the window like any other success.
            self.dispatcher
                .dispatch(&self.plugin_id, batch_input(&self.source_name, batch))
                .await?;

            for event in batch {
                self.cache
                    .insert_with_ttl(self.seen_key(&event.event_id()), Value::Bool(true), ttl);
            }
            dispatched += batch.len() as u64;
        }

        if dispatched > 0 {
            attestor_telemetry::record_listener_dispatched(&self.id, dispatched);
        }

        self.cache
            .insert_with_ttl(self.cursor_key(), Value::Int(end as i64), ttl);

        debug!(
            listener_id = %self.id,
            window_start = start,
            window_end = end,
            safe_head,
            dispatched,
            "Window scanned"
        );

        if end < safe_head {
            // Backlogged: ask to be fired again immediately.
            Ok(now_ms())
        } else {
            Ok(now_ms() + self.tuning.throttle_on_success_ms)
        }
    }
}

fn batch_input(source: &str, batch: &[SourceEvent]) -> Value {
    let events: Vec<Value> = batch
        .iter()
        .map(|event| {
            Value::dict([
                ("blockNumber", Value::Int(event.block_number as i64)),
                ("logIndex", Value::Int(event.log_index as i64)),
                ("txHash", Value::text(event.tx_hash.clone())),
                ("eventId", Value::text(event.event_id().to_string())),
                ("payload", event.payload.clone()),
            ])
        })
        .collect();

    Value::dict([
        ("source", Value::text(source)),
        ("events", Value::Array(events)),
    ])
}

#[async_trait]
impl Listener for BlockWindowListener {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self) -> Result<u64, OracleError> {
        self.scan_window().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    struct FakeSource {
        head: AtomicU64,
        events: Mutex<Vec<SourceEvent>>,
    }

    #[async_trait]
    impl BlockSource for FakeSource {
        async fn head(&self) -> Result<u64, OracleError> {
            Ok(self.head.load(Ordering::SeqCst))
        }

        async fn events_in(&self, from: u64, to: u64) -> Result<Vec<SourceEvent>, OracleError> {
            Ok(self
                .events
                .lock()
                .iter()
                .filter(|e| e.block_number >= from && e.block_number <= to)
                .cloned()
                .collect())
        }
    }

    struct FakeProcessed {
        height: u64,
    }

    #[async_trait]
    impl ProcessedQuery for FakeProcessed {
        async fn last_indexed_height(&self, _source: &str) -> Result<u64, OracleError> {
            Ok(self.height)
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        calls: Mutex<Vec<(String, Value)>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl TaskDispatcher for RecordingDispatcher {
        async fn dispatch(&self, plugin_id: &str, input: Value) -> Result<Value, OracleError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(OracleError::Execute { context: "chain down".to_string() });
            }
            self.calls.lock().push((plugin_id.to_string(), input));
            Ok(Value::Null)
        }
    }

    fn event(block: u64, index: u64, tx: &str) -> SourceEvent {
        SourceEvent {
            block_number: block,
            log_index: index,
            tx_hash: tx.to_string(),
            payload: Value::dict([("amount", Value::Int(1))]),
        }
    }

    struct Fixture {
        listener: BlockWindowListener,
        source: Arc<FakeSource>,
        dispatcher: Arc<RecordingDispatcher>,
        cache: Arc<TtlCache<Value>>,
    }

    fn fixture(head: u64, indexed: u64, events: Vec<SourceEvent>, tuning: ListenerTuning) -> Fixture {
        let source = Arc::new(FakeSource {
            head: AtomicU64::new(head),
            events: Mutex::new(events),
        });
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let cache = Arc::new(TtlCache::new(300_000));

        let listener = BlockWindowListener::new(
            "eth-logs",
            "ethereum",
            "evm-forwarder",
            Arc::clone(&source) as Arc<dyn BlockSource>,
            Arc::new(FakeProcessed { height: indexed }),
            Arc::clone(&dispatcher) as Arc<dyn TaskDispatcher>,
            Arc::clone(&cache),
            Arc::new(ThrottleManager::new()),
            tuning,
            100,
        );

        Fixture {
            listener,
            source,
            dispatcher,
            cache,
        }
    }

    fn dispatched_event_ids(dispatcher: &RecordingDispatcher) -> Vec<String> {
        dispatcher
            .calls
            .lock()
            .iter()
            .flat_map(|(_, input)| {
                input
                    .get("events")
                    .and_then(Value::as_array)
                    .map(|events| {
                        events
                            .iter()
                            .filter_map(|e| e.get("eventId").and_then(Value::as_text).map(String::from))
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_cold_start_scans_from_downstream_index() {
        let f = fixture(
            160,
            100,
            vec![event(103, 1, "0xa"), event(101, 0, "0xb"), event(103, 0, "0xa")],
            ListenerTuning::default(),
        );

        let next = f.listener.run().await.expect("run succeeds");

        // Events arrive sorted (blockNumber, logIndex).
        assert_eq!(
            dispatched_event_ids(&f.dispatcher),
            vec!["0xb-0", "0xa-0", "0xa-1"]
        );

        // Window [101, 150] consumed up to head−lag: caught up, so the
        // next fire is pushed out.
        assert!(next > now_ms() + 10_000);
        assert_eq!(
            f.cache.get("listener:eth-logs:cursor").and_then(|v| v.as_int()),
            Some(150)
        );
    }

    #[tokio::test]
    async fn test_backlogged_listener_asks_for_immediate_refire() {
        let tuning = ListenerTuning {
            block_height_increment: 20,
            ..Default::default()
        };
        let f = fixture(1_000, 100, vec![], tuning);

        let next = f.listener.run().await.expect("run succeeds");

        // Window [101, 121] of a 990-deep backlog: fire again now.
        assert!(next <= now_ms());
        assert_eq!(
            f.cache.get("listener:eth-logs:cursor").and_then(|v| v.as_int()),
            Some(121)
        );
    }

    #[tokio::test]
    async fn test_empty_window_self_throttles_without_dispatch() {
        let f = fixture(105, 100, vec![event(101, 0, "0xa")], ListenerTuning::default());

        // head − lag = 95 < cursor: nothing safe to scan yet.
        let next = f.listener.run().await.expect("run succeeds");
        assert!(next > now_ms() + 10_000);
        assert!(f.dispatcher.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_seen_events_are_not_redispatched() {
        let f = fixture(
            160,
            100,
            vec![event(101, 0, "0xa"), event(102, 0, "0xb")],
            ListenerTuning::default(),
        );
        f.cache.insert("listener:eth-logs:seen:0xa-0", Value::Bool(true));

        f.listener.run().await.expect("run succeeds");
        assert_eq!(dispatched_event_ids(&f.dispatcher), vec!["0xb-0"]);
    }

    #[tokio::test]
    async fn test_batching_respects_order_and_size() {
        let tuning = ListenerTuning {
            batch_size: 2,
            ..Default::default()
        };
        let f = fixture(
            160,
            100,
            vec![
                event(101, 0, "0xa"),
                event(101, 1, "0xa"),
                event(102, 0, "0xb"),
                event(103, 0, "0xc"),
                event(104, 0, "0xd"),
            ],
            tuning,
        );

        f.listener.run().await.expect("run succeeds");

        let calls = f.dispatcher.calls.lock();
        let sizes: Vec<usize> = calls
            .iter()
            .map(|(_, input)| input.get("events").and_then(Value::as_array).map_or(0, <[Value]>::len))
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert!(calls.iter().all(|(plugin, _)| plugin == "evm-forwarder"));
        drop(calls);

        assert_eq!(
            dispatched_event_ids(&f.dispatcher),
            vec!["0xa-0", "0xa-1", "0xb-0", "0xc-0", "0xd-0"]
        );
    }

    #[tokio::test]
    async fn test_dispatch_failure_leaves_cursor_for_replay() {
        let f = fixture(160, 100, vec![event(101, 0, "0xa")], ListenerTuning::default());
        f.dispatcher.fail.store(true, Ordering::SeqCst);

        let err = f.listener.run().await.unwrap_err();
        assert_eq!(err.kind(), "execute_error");
        assert!(f.cache.get("listener:eth-logs:cursor").is_none());

        // Next run replays the window and succeeds.
        f.dispatcher.fail.store(false, Ordering::SeqCst);
        f.listener.run().await.expect("replay succeeds");
        assert_eq!(dispatched_event_ids(&f.dispatcher), vec!["0xa-0"]);
    }

    #[tokio::test]
    async fn test_replaying_a_window_produces_no_new_effects() {
        let f = fixture(160, 100, vec![event(101, 0, "0xa")], ListenerTuning::default());

        f.listener.run().await.expect("first run");
        // Reset the cursor as if the process restarted with a warm dedup
        // cache.
        f.cache.remove("listener:eth-logs:cursor");
        f.listener.run().await.expect("replay run");

        assert_eq!(dispatched_event_ids(&f.dispatcher), vec!["0xa-0"]);
    }

    #[tokio::test]
    async fn test_source_errors_surface_as_throttle_error() {
        struct BrokenSource;

        #[async_trait]
        impl BlockSource for BrokenSource {
            async fn head(&self) -> Result<u64, OracleError> {
                Err(OracleError::transport("rpc 500"))
            }

            async fn events_in(&self, _f: u64, _t: u64) -> Result<Vec<SourceEvent>, OracleError> {
                Ok(vec![])
            }
        }

        let listener = BlockWindowListener::new(
            "eth-logs",
            "ethereum",
            "evm-forwarder",
            Arc::new(BrokenSource),
            Arc::new(FakeProcessed { height: 0 }),
            Arc::new(RecordingDispatcher::default()),
            Arc::new(TtlCache::new(300_000)),
            Arc::new(ThrottleManager::new()),
            ListenerTuning::default(),
            100,
        );

        let err = listener.run().await.unwrap_err();
        assert_eq!(err.kind(), "throttle_error");
    }
}
