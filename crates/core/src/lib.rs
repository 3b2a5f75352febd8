pub mod config;
pub mod generation;
pub mod interpolator;
pub mod metrics;
pub mod orchestrator;
pub mod session;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    ServerConfig,
};
pub use generation::{
    default_task_params, Artifact, Batch, BatchCounts, BatchId, Directive, GeminiImageService,
    GeneratedItem, GenerationBackend, GenerationConfig, GenerationError, GenerationService,
    ItemState, ItemStatus, Label, TaskParam, TaskUpdate,
};
pub use interpolator::{
    clamp_cursor, compute_weight, nearest_index, slider_range, weights, Crossfade,
    CrossfadeLayer,
};
pub use orchestrator::{
    BatchOrchestrator, BatchRun, BatchUpdateCallback, OrchestratorConfig, OrchestratorError,
    OrchestratorStatus,
};
pub use session::{BatchSession, SessionEvent};
