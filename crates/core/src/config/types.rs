use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::generation::{default_task_params, GenerationConfig, TaskParam};
use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Ordered task parameters run for every source image.
    #[serde(default = "default_task_params")]
    pub shifts: Vec<TaskParam>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            generation: GenerationConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            shifts: default_task_params(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted request body, in bytes (source images arrive inline).
    #[serde(default = "default_body_limit")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_body_limit(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_body_limit() -> usize {
    16 * 1024 * 1024
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub generation: SanitizedGenerationConfig,
    pub orchestrator: OrchestratorConfig,
    pub shifts: Vec<TaskParam>,
}

/// Sanitized generation config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedGenerationConfig {
    pub backend: String,
    pub model: String,
    pub api_base: String,
    pub api_key_configured: bool,
    pub request_timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            generation: SanitizedGenerationConfig {
                backend: format!("{:?}", config.generation.backend).to_lowercase(),
                model: config.generation.model.clone(),
                api_base: config.generation.api_base.clone(),
                api_key_configured: config.generation.api_key.is_some(),
                request_timeout_secs: config.generation.request_timeout_secs,
            },
            orchestrator: config.orchestrator.clone(),
            shifts: config.shifts.clone(),
        }
    }
}
