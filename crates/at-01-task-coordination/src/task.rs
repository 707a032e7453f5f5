//! The four-phase task coordinator.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use shared_codec::{encode, Value};
use shared_types::OracleError;

use crate::context::TaskContext;
use crate::handler::PluginHandler;
use crate::plugin::PeerPrepared;
use crate::records::PeerPrepareRecord;

/// How a run ended, before metrics are applied.
enum TaskOutcome {
    /// The pipeline ran to Execute (or hit the downstream 409); counts as
    /// a completion.
    Completed(Value),
    /// The task ended early without an effect (`permanent_error` at
    /// Prepare or a `non_error` sentinel); success, but not counted.
    Vacuous(Value),
}

/// One request driven through Prepare → Process → Validate → Execute.
///
/// A task owns its per-request state exclusively and is consumed by
/// [`start`](Task::start); nothing is persisted across restarts.
pub struct Task {
    context: Arc<TaskContext>,
    plugin: Arc<dyn PluginHandler>,
    input: Value,
    started_at: Instant,
}

impl Task {
    /// Build a task for one plugin invocation.
    pub fn new(context: Arc<TaskContext>, plugin: Arc<dyn PluginHandler>, input: Value) -> Self {
        Self {
            context,
            plugin,
            input,
            started_at: Instant::now(),
        }
    }

    /// Drive the task to a terminal state.
    ///
    /// Success increments the completion metrics; failures are logged with
    /// their kind and context and surface to the caller unchanged.
    pub async fn start(self) -> Result<Value, OracleError> {
        let plugin_id = self.plugin.id().to_string();
        debug!(plugin_id = %plugin_id, "Task starting");

        match self.run(&plugin_id).await {
            Ok(TaskOutcome::Completed(output)) => {
                attestor_telemetry::record_task_completed(
                    &plugin_id,
                    self.started_at.elapsed().as_secs_f64(),
                );
                Ok(output)
            }
            Ok(TaskOutcome::Vacuous(output)) => Ok(output),
            Err(err) => {
                error!(
                    plugin_id = %plugin_id,
                    kind = err.kind(),
                    context = %err,
                    "Task failed"
                );
                Err(err)
            }
        }
    }

    async fn run(&self, plugin_id: &str) -> Result<TaskOutcome, OracleError> {
        // ── Phase 1: Prepare ────────────────────────────────────────────
        let local_prepared = match self.plugin.prepare(self.input.clone()).await {
            Ok(prepared) => prepared,
            Err(OracleError::Permanent { context }) => {
                // Permanent errors are idempotent rejects: peers would
                // refuse the same input, so the task succeeds vacuously.
                info!(
                    plugin_id = %plugin_id,
                    context = %context,
                    "Input permanently unprocessable; completing vacuously"
                );
                return Ok(TaskOutcome::Vacuous(Value::Null));
            }
            Err(OracleError::NonError) => return Ok(TaskOutcome::Vacuous(Value::Null)),
            Err(err) => return Err(err),
        };

        let mut records = vec![PeerPrepareRecord::local(
            self.context.keypair.public_key(),
            local_prepared.clone(),
        )];
        records.extend(self.collect_peer_prepares(plugin_id).await);

        if records.len() < self.context.min_signatures_required {
            return Err(OracleError::InsufficientPeers {
                collected: records.len(),
                required: self.context.min_signatures_required,
            });
        }

        // ── Phase 2: Process ────────────────────────────────────────────
        let prepared_set: Vec<PeerPrepared<Value>> = records
            .iter()
            .map(|record| PeerPrepared {
                public_key: record.public_key,
                prepared: record.prepared.clone(),
            })
            .collect();

        let aggregated = match self.plugin.process(prepared_set).await {
            Ok(aggregated) => aggregated,
            Err(OracleError::NonError) => {
                debug!(plugin_id = %plugin_id, "Nothing to do; completing without execute");
                return Ok(TaskOutcome::Vacuous(Value::Null));
            }
            Err(err) => return Err(err),
        };

        // ── Phase 3: Validate (serial; primary signs first) ─────────────
        let mut current = match self.plugin.validate(aggregated, local_prepared).await {
            Ok(validated) => validated,
            Err(OracleError::NonError) => return Ok(TaskOutcome::Vacuous(Value::Null)),
            Err(err) => return Err(err),
        };

        for peer in &self.context.peers {
            let Some(record) = records
                .iter()
                .find(|record| !record.is_local() && record.public_key == peer.public_key)
            else {
                continue;
            };

            // The peer re-checks this signature under the primary's key
            // before running its plugin.
            let encoded_prepared = encode(&record.prepared);
            let signature = self.context.keypair.sign(&encoded_prepared);

            current = self
                .context
                .peer_client
                .validate(peer, plugin_id, &current, &record.prepared, &signature)
                .await?;
        }

        // ── Phase 4: Execute (at most once) ─────────────────────────────
        match self.plugin.execute(current).await {
            Ok(output) => Ok(TaskOutcome::Completed(output)),
            Err(OracleError::AlreadySubmitted) => {
                // The downstream chain answered 409: the effect already
                // happened, which is exactly what this task wanted.
                info!(plugin_id = %plugin_id, "Duplicate submission; effect already applied");
                Ok(TaskOutcome::Completed(Value::Null))
            }
            Err(OracleError::NonError) => Ok(TaskOutcome::Vacuous(Value::Null)),
            Err(err) => Err(err),
        }
    }

    /// Fan a prepare out to every peer, racing the group against the
    /// single configured deadline. Whatever arrived in time is kept, in
    /// arrival order; the rest is abandoned.
    async fn collect_peer_prepares(&self, plugin_id: &str) -> Vec<PeerPrepareRecord> {
        if self.context.peers.is_empty() || self.context.peer_timeout.is_zero() {
            return Vec::new();
        }

        let mut in_flight = FuturesUnordered::new();
        for peer in &self.context.peers {
            let client = Arc::clone(&self.context.peer_client);
            let input = self.input.clone();
            let plugin_id = plugin_id.to_string();
            let peer = peer.clone();
            in_flight.push(async move {
                let result = client.prepare(&peer, &plugin_id, &input).await;
                (peer, result)
            });
        }

        let deadline = tokio::time::sleep(self.context.peer_timeout);
        tokio::pin!(deadline);

        let mut collected: Vec<PeerPrepareRecord> = Vec::new();
        loop {
            tokio::select! {
                _ = &mut deadline => {
                    warn!(
                        plugin_id = %plugin_id,
                        collected = collected.len(),
                        abandoned = in_flight.len(),
                        "Prepare fan-out deadline reached; abandoning remaining peers"
                    );
                    break;
                }
                next = in_flight.next() => {
                    match next {
                        None => break,
                        Some((peer, Ok(response))) => {
                            // At most one record per public key.
                            if collected.iter().any(|r| r.public_key == peer.public_key) {
                                continue;
                            }
                            collected.push(PeerPrepareRecord::from_peer(
                                peer.public_key,
                                response.prepared,
                                &response.encoded,
                                response.signature,
                            ));
                        }
                        Some((peer, Err(err))) => {
                            warn!(
                                peer = %peer.id,
                                kind = err.kind(),
                                context = %err,
                                "Peer prepare failed"
                            );
                        }
                    }
                }
            }
        }

        // Dropping `in_flight` cancels the stragglers; a response landing
        // after the window never mutates the task.
        collected
    }
}
