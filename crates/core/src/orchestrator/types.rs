//! Types for the batch orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generation::Label;

/// Input-contract violations. Raised before any task starts; no batch exists
/// when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// The source artifact reference is empty.
    #[error("source image is empty")]
    EmptySource,

    /// No task parameters were supplied.
    #[error("batch has no tasks")]
    NoTasks,

    /// A task parameter has a blank label.
    #[error("task {index} has an empty label")]
    EmptyLabel { index: usize },

    /// Two task parameters share a label.
    #[error("duplicate label: {0}")]
    DuplicateLabel(Label),
}

impl OrchestratorError {
    /// Short machine-readable reason, used as a metrics label.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::EmptySource => "empty_source",
            Self::NoTasks => "no_tasks",
            Self::EmptyLabel { .. } => "empty_label",
            Self::DuplicateLabel(_) => "duplicate_label",
        }
    }
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Generation service in use.
    pub service: String,
    /// Batches started since creation.
    pub batches_started: u64,
    /// Tasks still awaiting the generation service, across all batches.
    pub tasks_in_flight: usize,
}
