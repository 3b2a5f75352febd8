//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the batch orchestrator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound for a single generation task (seconds).
    /// A task still waiting when the bound elapses settles as `error`.
    /// Unset means tasks wait for the service indefinitely.
    #[serde(default)]
    pub task_timeout_secs: Option<u64>,
}

impl OrchestratorConfig {
    pub fn task_timeout(&self) -> Option<Duration> {
        self.task_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert!(config.task_timeout_secs.is_none());
        assert!(config.task_timeout().is_none());
    }

    #[test]
    fn test_deserialize_empty() {
        let config: OrchestratorConfig = toml::from_str("").unwrap();
        assert!(config.task_timeout_secs.is_none());
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            task_timeout_secs = 90
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.task_timeout(), Some(Duration::from_secs(90)));
    }
}
