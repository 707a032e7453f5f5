//! Windowed listener for slot-oriented sources.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use async_trait::async_trait;
use at_01_task_coordination::TaskDispatcher;
use shared_codec::Value;
use shared_types::{ListenerTuning, OracleError, ThrottleManager, TtlCache};

use crate::listener::{now_ms, Listener};
use crate::ports::outbound::{ProcessedQuery, SlotSignature, SlotSignatureSource};

/// Follows a program's transaction signatures since the last seen slot.
///
/// The dedup cache stores only a boolean "seen" sentinel per signature;
/// transaction bodies are not cacheable.
pub struct SlotSignatureListener {
    id: String,
    source_name: String,
    plugin_id: String,
    source: Arc<dyn SlotSignatureSource>,
    processed: Arc<dyn ProcessedQuery>,
    dispatcher: Arc<dyn TaskDispatcher>,
    cache: Arc<TtlCache<Value>>,
    throttle: Arc<ThrottleManager>,
    tuning: ListenerTuning,
    rate_limit: u32,
}

impl SlotSignatureListener {
    /// Wire a slot listener for one source/plugin pair.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        source_name: impl Into<String>,
        plugin_id: impl Into<String>,
        source: Arc<dyn SlotSignatureSource>,
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

    fn seen_key(&self, signature: &str) -> String {
        format!("listener:{}:seen:{}", self.id, signature)
    }

    async fn scan_slots(&self) -> Result<u64, OracleError> {
        let ttl = Duration::from_millis(self.tuning.cache_ttl_ms);

        let last_slot = match self.cache.get(&self.cursor_key()).and_then(|v| v.as_int()) {
            Some(slot) => slot as u64,
            None => {
                self.processed
                    .last_indexed_height(&self.source_name)
                    .await?
            }
        };

        let head_slot = self
            .throttle
            .execute_throttled(&self.source_name, self.rate_limit, || self.source.head_slot())
            .await?;

        if head_slot <= last_slot {
            return Ok(now_ms() + self.tuning.throttle_on_success_ms);
        }

        let mut signatures = self
            .throttle
            .execute_throttled(&self.source_name, self.rate_limit, || {
                self.source.signatures_since(last_slot)
            })
            .await?;

        signatures.sort_by(|a, b| (a.slot, &a.signature).cmp(&(b.slot, &b.signature)));

        let fresh: Vec<SlotSignature> = signatures
            .iter()
            .filter(|sig| !self.cache.contains(&self.seen_key(&sig.signature)))
            .cloned()
            .collect();

        let fetched = fresh.len();
        let mut dispatched = 0u64;
        for batch in fresh.chunks(self.tuning.batch_size.max(1)) {
            self.dispatcher
                .dispatch(&self.plugin_id, batch_input(&self.source_name, batch))
                .await?;

            for sig in batch {
                // Boolean sentinel only; never the transaction body.
                self.cache
                    .insert_with_ttl(self.seen_key(&sig.signature), Value::Bool(true), ttl);
            }
            dispatched += batch.len() as u64;
        }

        if dispatched > 0 {
            attestor_telemetry::record_listener_dispatched(&self.id, dispatched);
        }

        let new_cursor = signatures
            .iter()
            .map(|sig| sig.slot)
            .max()
            .unwrap_or(head_slot);
        self.cache
            .insert_with_ttl(self.cursor_key(), Value::Int(new_cursor as i64), ttl);

        debug!(
            listener_id = %self.id,
            last_slot,
            head_slot,
            new_cursor,
            dispatched,
            "Slots scanned"
        );

        if fetched >= self.tuning.batch_size.max(1) {
            Ok(now_ms())
        } else {
            Ok(now_ms() + self.tuning.throttle_on_success_ms)
        }
    }
}

fn batch_input(source: &str, batch: &[SlotSignature]) -> Value {
    let signatures: Vec<Value> = batch
        .iter()
        .map(|sig| {
            Value::dict([
                ("slot", Value::Int(sig.slot as i64)),
                ("signature", Value::text(sig.signature.clone())),
                ("payload", sig.payload.clone()),
            ])
        })
        .collect();

    Value::dict([
        ("source", Value::text(source)),
        ("signatures", Value::Array(signatures)),
    ])
}

#[async_trait]
impl Listener for SlotSignatureListener {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self) -> Result<u64, OracleError> {
        self.scan_slots().await
    }
}
