//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator (batches, per-task outcomes and durations)
//! - Session (stale updates from superseded batches)
//! - External generation service latency

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Orchestrator - Batch Metrics
// =============================================================================

/// Batches started total.
pub static BATCHES_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("timeshift_batches_started_total", "Total batches started").unwrap()
});

/// Batch requests rejected before any task started, by reason.
pub static BATCHES_REJECTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "timeshift_batches_rejected_total",
            "Batch requests rejected for violating the input contract",
        ),
        &["reason"], // "empty_source", "no_tasks", "empty_label", "duplicate_label"
    )
    .unwrap()
});

/// Time from batch start until every task is terminal.
pub static BATCH_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "timeshift_batch_duration_seconds",
            "Duration from batch start until all tasks settled",
        )
        .buckets(vec![1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0, 300.0]),
    )
    .unwrap()
});

// =============================================================================
// Orchestrator - Task Metrics
// =============================================================================

/// Generation tasks finished total by result.
pub static TASKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("timeshift_tasks_total", "Total generation tasks finished"),
        &["result"], // "done", "error"
    )
    .unwrap()
});

/// Generation call duration in seconds.
pub static TASK_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "timeshift_task_duration_seconds",
            "Duration of a single generation call",
        )
        .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        &["service", "result"],
    )
    .unwrap()
});

/// Generation tasks currently waiting on the service.
pub static TASKS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "timeshift_tasks_in_flight",
        "Generation tasks currently awaiting the external service",
    )
    .unwrap()
});

// =============================================================================
// Session Metrics
// =============================================================================

/// Updates that arrived for a batch that was no longer current.
pub static STALE_UPDATES_DROPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "timeshift_stale_updates_dropped_total",
        "Task updates dropped because their batch was reset or superseded",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Batches
        Box::new(BATCHES_STARTED.clone()),
        Box::new(BATCHES_REJECTED.clone()),
        Box::new(BATCH_DURATION.clone()),
        // Tasks
        Box::new(TASKS_TOTAL.clone()),
        Box::new(TASK_DURATION.clone()),
        Box::new(TASKS_IN_FLIGHT.clone()),
        // Session
        Box::new(STALE_UPDATES_DROPPED.clone()),
    ]
}
