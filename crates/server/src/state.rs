use std::sync::Arc;
use timeshift_core::{BatchOrchestrator, BatchSession, Config, SanitizedConfig, TaskParam};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<BatchOrchestrator>,
    session: Arc<BatchSession>,
}

impl AppState {
    pub fn new(
        config: Config,
        orchestrator: Arc<BatchOrchestrator>,
        session: Arc<BatchSession>,
    ) -> Self {
        Self {
            config,
            orchestrator,
            session,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    /// Ordered task parameters every batch runs with.
    pub fn shifts(&self) -> &[TaskParam] {
        &self.config.shifts
    }

    pub fn orchestrator(&self) -> &Arc<BatchOrchestrator> {
        &self.orchestrator
    }

    pub fn session(&self) -> &Arc<BatchSession> {
        &self.session
    }
}
