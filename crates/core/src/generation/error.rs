//! Error types for the generation module.

use std::time::Duration;
use thiserror::Error;

/// Errors a generation service call can end with.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Transport-level failure talking to the service.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The service answered but the body held no usable image.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The source artifact cannot be sent to this service.
    #[error("Invalid source image: {0}")]
    InvalidSource(String),

    /// The call did not finish within the configured bound.
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generation service not configured")]
    NotConfigured,
}

impl GenerationError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse(reason.into())
    }

    pub fn invalid_source(reason: impl Into<String>) -> Self {
        Self::InvalidSource(reason.into())
    }
}
