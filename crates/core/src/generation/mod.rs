//! Generation data model and the external generation service seam.
//!
//! A batch maps each label of a fixed, ordered parameter set to a
//! [`GeneratedItem`] that moves `pending -> done` or `pending -> error`
//! exactly once.

mod config;
mod error;
mod gemini;
mod shifts;
mod traits;
mod types;

pub use config::{GenerationBackend, GenerationConfig};
pub use error::GenerationError;
pub use gemini::GeminiImageService;
pub use shifts::{
    default_task_params, directive_for_offset, label_for_offset, task_params_for_offsets,
    DEFAULT_YEAR_OFFSETS,
};
pub use traits::GenerationService;
pub use types::{
    ApplyError, Artifact, Batch, BatchCounts, BatchId, Directive, GeneratedItem, ItemState,
    ItemStatus, Label, TaskParam, TaskUpdate,
};
