//! Mock generation service for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::generation::{Artifact, Directive, GenerationError, GenerationService};

/// A recorded generation call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedGeneration {
    /// Source the call was made with.
    pub source: Artifact,
    /// Directive the call was made with.
    pub directive: Directive,
    /// Whether the call succeeded.
    pub success: bool,
}

/// Scripted behaviour for one directive.
#[derive(Debug, Clone, Default)]
struct Script {
    delay: Option<Duration>,
    failure: Option<String>,
    hang: bool,
}

/// Mock implementation of the GenerationService trait.
///
/// Provides controllable behavior for testing:
/// - Per-directive delays to control completion order
/// - Forced failures for chosen directives
/// - Directives that never return (hung service)
/// - Recorded calls for assertions
///
/// Successful calls return `generated:<directive>`.
///
/// # Example
///
/// ```rust,ignore
/// use timeshift_core::testing::MockGenerationService;
///
/// let service = MockGenerationService::new();
/// service.set_delay("older", Duration::from_millis(50)).await;
/// service.fail_directive("younger", "quota exceeded").await;
///
/// let batch = orchestrator.run_batch(source, params).await?;
/// assert_eq!(service.call_count().await, 2);
/// ```
#[derive(Debug, Clone)]
pub struct MockGenerationService {
    scripts: Arc<RwLock<HashMap<String, Script>>>,
    default_delay: Arc<RwLock<Duration>>,
    calls: Arc<RwLock<Vec<RecordedGeneration>>>,
}

impl Default for MockGenerationService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerationService {
    /// Create a new mock service that succeeds immediately.
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(RwLock::new(HashMap::new())),
            default_delay: Arc::new(RwLock::new(Duration::ZERO)),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Delay applied to directives without their own delay.
    pub async fn set_default_delay(&self, delay: Duration) {
        *self.default_delay.write().await = delay;
    }

    /// Delay the answer for one directive.
    pub async fn set_delay(&self, directive: &str, delay: Duration) {
        self.scripts
            .write()
            .await
            .entry(directive.to_string())
            .or_default()
            .delay = Some(delay);
    }

    /// Make calls with this directive fail with an API error.
    pub async fn fail_directive(&self, directive: &str, message: &str) {
        self.scripts
            .write()
            .await
            .entry(directive.to_string())
            .or_default()
            .failure = Some(message.to_string());
    }

    /// Make calls with this directive never return.
    pub async fn hang_directive(&self, directive: &str) {
        self.scripts
            .write()
            .await
            .entry(directive.to_string())
            .or_default()
            .hang = true;
    }

    /// Get all recorded calls, in completion order.
    pub async fn recorded_calls(&self) -> Vec<RecordedGeneration> {
        self.calls.read().await.clone()
    }

    /// Get the number of finished calls.
    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// The artifact a successful call for `directive` returns.
    pub fn artifact_for(directive: &str) -> Artifact {
        Artifact::new(format!("generated:{}", directive))
    }
}

#[async_trait]
impl GenerationService for MockGenerationService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        source: &Artifact,
        directive: &Directive,
    ) -> Result<Artifact, GenerationError> {
        let script = self
            .scripts
            .read()
            .await
            .get(directive.as_str())
            .cloned()
            .unwrap_or_default();

        if script.hang {
            std::future::pending::<()>().await;
        }

        let delay = match script.delay {
            Some(delay) => delay,
            None => *self.default_delay.read().await,
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = match script.failure {
            Some(message) => Err(GenerationError::Api {
                status: 500,
                message,
            }),
            None => Ok(Self::artifact_for(directive.as_str())),
        };

        self.calls.write().await.push(RecordedGeneration {
            source: source.clone(),
            directive: directive.clone(),
            success: result.is_ok(),
        });

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_success() {
        let service = MockGenerationService::new();
        let result = service
            .generate(&Artifact::new("src"), &Directive::new("older"))
            .await
            .unwrap();
        assert_eq!(result, MockGenerationService::artifact_for("older"));

        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert!(calls[0].success);
        assert_eq!(calls[0].source.as_str(), "src");
    }

    #[tokio::test]
    async fn test_forced_failure() {
        let service = MockGenerationService::new();
        service.fail_directive("younger", "quota exceeded").await;

        let err = service
            .generate(&Artifact::new("src"), &Directive::new("younger"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
        assert!(!service.recorded_calls().await[0].success);

        // Other directives are unaffected
        assert!(service
            .generate(&Artifact::new("src"), &Directive::new("older"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_hang_never_returns() {
        let service = MockGenerationService::new();
        service.hang_directive("stuck").await;

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            service.generate(&Artifact::new("src"), &Directive::new("stuck")),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(service.call_count().await, 0);
    }
}
