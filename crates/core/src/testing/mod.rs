//! Testing utilities and mock implementations.
//!
//! This module provides a mock of the external generation service so the
//! orchestrator and the server can be exercised without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use timeshift_core::testing::{fixtures, MockGenerationService};
//!
//! let service = MockGenerationService::new();
//! let params = fixtures::task_params(6);
//!
//! // Force the second task to fail
//! service.fail_directive(params[1].directive.as_str(), "boom").await;
//! ```

mod mock_generation_service;

pub use mock_generation_service::{MockGenerationService, RecordedGeneration};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::generation::{Artifact, TaskParam};

    /// A tiny JPEG-typed data URL usable as a batch source.
    pub fn source_image() -> Artifact {
        Artifact::from_base64("image/jpeg", "/9j/4AAQSkZJRgABAQAAAQABAAD/2w==")
    }

    /// Label of the fixture task at `index`.
    pub fn label(index: usize) -> String {
        format!("shift-{}", index)
    }

    /// Directive of the fixture task at `index`.
    pub fn directive(index: usize) -> String {
        format!("directive-{}", index)
    }

    /// `count` task params with unique labels and directives.
    pub fn task_params(count: usize) -> Vec<TaskParam> {
        (0..count)
            .map(|i| TaskParam::new(label(i), directive(i)))
            .collect()
    }
}
