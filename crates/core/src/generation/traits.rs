//! Trait definitions for the generation module.

use async_trait::async_trait;

use super::error::GenerationError;
use super::types::{Artifact, Directive};

/// An external service that derives a new image from a source image.
///
/// One call per task; calls are independent, all-or-nothing, and may fail
/// independently of each other.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Returns the name of this service implementation.
    fn name(&self) -> &str;

    /// Generate a derived image from `source` following `directive`.
    async fn generate(
        &self,
        source: &Artifact,
        directive: &Directive,
    ) -> Result<Artifact, GenerationError>;
}
