//! Generation service configuration.

use serde::{Deserialize, Serialize};

/// Available generation backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationBackend {
    #[default]
    Gemini,
    // Future: OpenAi, local diffusion server
}

/// Configuration for the external generation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default)]
    pub backend: GenerationBackend,

    /// API key for the backend. Usually supplied via `TIMESHIFT_GENERATION__API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Image-capable model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the REST API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// HTTP request timeout in seconds (transport level, per call).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-2.5-flash-image-preview".to_string()
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            backend: GenerationBackend::default(),
            api_key: None,
            model: default_model(),
            api_base: default_api_base(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}
