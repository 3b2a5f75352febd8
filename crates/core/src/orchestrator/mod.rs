//! Batch orchestrator for parallel generation.
//!
//! The orchestrator fires one independent, fallible generation call per label
//! and aggregates the outcomes:
//! - **Fan-out**: every task is spawned at batch start, no ordering between tasks
//! - **Isolation**: a task only ever writes its own label
//! - **Settle-all**: a run completes when every label is `done` or `error`

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::{BatchOrchestrator, BatchRun, BatchUpdateCallback};
pub use types::{OrchestratorError, OrchestratorStatus};
