//! # Node Metrics
//!
//! Prometheus metrics for monitoring oracle task flow.
//!
//! ## Metrics Exported
//!
//! - `attestor_tasks_completed_total{plugin_id}` - Counter of tasks that reached a successful terminal state
//! - `attestor_task_duration_seconds{plugin_id}` - Histogram of end-to-end task latency
//! - `attestor_throttle_queue_depth{key}` - Gauge of callers waiting on a rate-limiter bucket
//! - `attestor_throttle_wait_seconds{key}` - Histogram of per-call rate-limiter wait time
//! - `attestor_listener_events_dispatched_total{listener_id}` - Counter of events turned into tasks
//! - `attestor_listener_errors_total{listener_id}` - Counter of listener runs that errored
//! - `attestor_peer_requests_total{endpoint,outcome}` - Counter of peer-protocol requests served

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge_vec, Encoder,
    HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};

lazy_static! {
    /// Tasks that reached a successful terminal state, by plugin.
    pub static ref TASKS_COMPLETED: IntCounterVec = register_int_counter_vec!(
        "attestor_tasks_completed_total",
        "Total number of tasks completed successfully",
        &["plugin_id"]
    )
    .expect("Failed to create TASKS_COMPLETED metric");

    /// End-to-end task latency, by plugin.
    pub static ref TASK_DURATION: HistogramVec = register_histogram_vec!(
        "attestor_task_duration_seconds",
        "Time from task start to successful completion in seconds",
        &["plugin_id"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to create TASK_DURATION metric");

    /// Callers currently queued on a rate-limiter bucket, by key.
    pub static ref THROTTLE_QUEUE_DEPTH: IntGaugeVec = register_int_gauge_vec!(
        "attestor_throttle_queue_depth",
        "Number of callers waiting for a rate-limiter slot",
        &["key"]
    )
    .expect("Failed to create THROTTLE_QUEUE_DEPTH metric");

    /// Time spent waiting for a rate-limiter slot, by key.
    pub static ref THROTTLE_WAIT: HistogramVec = register_histogram_vec!(
        "attestor_throttle_wait_seconds",
        "Time a caller waited for a rate-limiter slot in seconds",
        &["key"],
        vec![0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0]
    )
    .expect("Failed to create THROTTLE_WAIT metric");

    /// Source events dispatched as tasks, by listener.
    pub static ref LISTENER_EVENTS_DISPATCHED: IntCounterVec = register_int_counter_vec!(
        "attestor_listener_events_dispatched_total",
        "Total number of source events dispatched as oracle tasks",
        &["listener_id"]
    )
    .expect("Failed to create LISTENER_EVENTS_DISPATCHED metric");

    /// Listener runs that ended in an error.
    pub static ref LISTENER_ERRORS: IntCounterVec = register_int_counter_vec!(
        "attestor_listener_errors_total",
        "Total number of listener runs that returned an error",
        &["listener_id"]
    )
    .expect("Failed to create LISTENER_ERRORS metric");

    /// Peer-protocol requests served, by endpoint and outcome.
    pub static ref PEER_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "attestor_peer_requests_total",
        "Total number of peer-protocol requests served",
        &["endpoint", "outcome"]
    )
    .expect("Failed to create PEER_REQUESTS metric");
}

/// Record a successful task completion with its duration.
pub fn record_task_completed(plugin_id: &str, duration_secs: f64) {
    TASKS_COMPLETED.with_label_values(&[plugin_id]).inc();
    TASK_DURATION
        .with_label_values(&[plugin_id])
        .observe(duration_secs);
}

/// Set the current queue depth for a rate-limiter key.
pub fn set_throttle_queue_depth(key: &str, depth: i64) {
    THROTTLE_QUEUE_DEPTH.with_label_values(&[key]).set(depth);
}

/// Record how long a caller waited for a rate-limiter slot.
pub fn record_throttle_wait(key: &str, wait_secs: f64) {
    THROTTLE_WAIT.with_label_values(&[key]).observe(wait_secs);
}

/// Record events dispatched by a listener.
pub fn record_listener_dispatched(listener_id: &str, count: u64) {
    LISTENER_EVENTS_DISPATCHED
        .with_label_values(&[listener_id])
        .inc_by(count);
}

/// Record a listener run that returned an error.
pub fn record_listener_error(listener_id: &str) {
    LISTENER_ERRORS.with_label_values(&[listener_id]).inc();
}

/// Record a peer-protocol request and its outcome tag.
pub fn record_peer_request(endpoint: &str, outcome: &str) {
    PEER_REQUESTS.with_label_values(&[endpoint, outcome]).inc();
}

/// Render the default registry in Prometheus text exposition format.
pub fn gather() -> String {
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
