//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the timeshift server:
//! - HTTP request metrics (latency, counts)
//! - WebSocket connection metrics
//! - Current batch status (collected dynamically)
//! - Task update delivery, fed by the orchestrator's update callback
//! - Orchestrator metrics registered from the core crate

use std::sync::Arc;

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};
use timeshift_core::{BatchUpdateCallback, TaskUpdate};
use tracing::debug;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "timeshift_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("timeshift_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "timeshift_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "timeshift_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "timeshift_ws_connections_total",
        "Total WebSocket connections since start",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("timeshift_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

/// WebSocket lag events (when client falls behind).
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "timeshift_ws_lag_events_total",
        "WebSocket clients that fell behind the event stream",
    )
    .unwrap()
});

// =============================================================================
// Session Metrics (collected dynamically)
// =============================================================================

/// Items of the current batch by status.
pub static CURRENT_BATCH_ITEMS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "timeshift_current_batch_items",
            "Items of the current batch by status",
        ),
        &["status"],
    )
    .unwrap()
});

/// Id of the current batch (0 when there is none).
pub static CURRENT_BATCH_ID: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("timeshift_current_batch_id", "Id of the current batch").unwrap()
});

/// Unix time of the last task update handed to the session.
pub static LAST_TASK_UPDATE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "timeshift_last_task_update_timestamp_seconds",
        "Unix time of the last task update delivered by the orchestrator",
    )
    .unwrap()
});

/// Build the orchestrator update callback that feeds `LAST_TASK_UPDATE`.
pub fn task_update_callback() -> BatchUpdateCallback {
    Arc::new(|update: &TaskUpdate| {
        LAST_TASK_UPDATE.set(update.completed_at.timestamp());
        debug!(
            "{} reported {} for {}",
            update.batch_id,
            update.state.status(),
            update.label
        );
    })
}

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry.register(Box::new(WS_LAG_EVENTS.clone())).unwrap();

    // Session
    registry
        .register(Box::new(CURRENT_BATCH_ITEMS.clone()))
        .unwrap();
    registry
        .register(Box::new(CURRENT_BATCH_ID.clone()))
        .unwrap();
    registry
        .register(Box::new(LAST_TASK_UPDATE.clone()))
        .unwrap();

    // Core metrics (batches, tasks, stale updates)
    for metric in timeshift_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the current batch.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let Some(batch) = state.session().current().await else {
        CURRENT_BATCH_ID.set(0);
        for status in ["pending", "done", "error"] {
            CURRENT_BATCH_ITEMS.with_label_values(&[status]).set(0);
        }
        return;
    };

    CURRENT_BATCH_ID.set(batch.id.0 as i64);
    let counts = batch.counts();
    CURRENT_BATCH_ITEMS
        .with_label_values(&["pending"])
        .set(counts.pending as i64);
    CURRENT_BATCH_ITEMS
        .with_label_values(&["done"])
        .set(counts.done as i64);
    CURRENT_BATCH_ITEMS
        .with_label_values(&["error"])
        .set(counts.error as i64);
}
