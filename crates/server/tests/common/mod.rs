//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock generation service injected, so batches can be driven end to
//! end without network access.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use timeshift_core::{
    testing::MockGenerationService, Batch, BatchOrchestrator, BatchSession, Config,
    OrchestratorConfig, ServerConfig,
};

/// Re-export fixtures for test convenience
pub use timeshift_core::testing::fixtures;

/// Test fixture for E2E testing with a mock generation service.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_start_batch() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/batch", json!({
///         "source": fixtures::source_image(),
///     })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock generation service - script delays and failures per directive
    pub service: Arc<MockGenerationService>,
    /// Session the router drives batches into
    pub session: Arc<BatchSession>,
    /// Orchestrator behind the router
    pub orchestrator: Arc<BatchOrchestrator>,
    /// Config the server was built with
    pub config: Config,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let service = Arc::new(MockGenerationService::new());

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
                ..Default::default()
            },
            orchestrator: OrchestratorConfig {
                task_timeout_secs: test_config.task_timeout_secs,
            },
            shifts: fixtures::task_params(test_config.shift_count),
            ..Default::default()
        };

        let orchestrator = Arc::new(
            BatchOrchestrator::new(
                config.orchestrator.clone(),
                Arc::clone(&service) as Arc<dyn timeshift_core::GenerationService>,
            )
            .with_update_callback(timeshift_server::metrics::task_update_callback()),
        );
        let session = Arc::new(BatchSession::default());

        let state = Arc::new(timeshift_server::state::AppState::new(
            config.clone(),
            Arc::clone(&orchestrator),
            Arc::clone(&session),
        ));

        let router = timeshift_server::api::create_router(state);

        Self {
            router,
            service,
            session,
            orchestrator,
            config,
        }
    }

    /// Directive configured for the shift at `index`.
    pub fn directive(&self, index: usize) -> &str {
        self.config.shifts[index].directive.as_str()
    }

    /// Make the shift at `index` fail.
    pub async fn fail_shift(&self, index: usize) {
        self.service
            .fail_directive(self.directive(index), "scripted failure")
            .await;
    }

    /// Start a batch over the default source image.
    pub async fn start_batch(&self) -> TestResponse {
        self.post(
            "/api/v1/batch",
            serde_json::json!({ "source": fixtures::source_image() }),
        )
        .await
    }

    /// Wait until the session's current batch is fully terminal.
    pub async fn wait_settled(&self) -> Batch {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if let Some(batch) = self.session.current().await {
                    if batch.is_settled() {
                        return batch;
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("Batch did not settle in time")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = self.send_raw(request).await;
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let (status, body_bytes) = self.send_raw(request).await;

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }

    async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, body_bytes.to_vec())
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    /// Number of configured shifts
    pub shift_count: usize,
    /// Per-task timeout passed to the orchestrator
    pub task_timeout_secs: Option<u64>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            shift_count: 6,
            task_timeout_secs: None,
        }
    }
}

impl TestConfig {
    /// Create config with `count` shifts.
    pub fn with_shifts(count: usize) -> Self {
        Self {
            shift_count: count,
            ..Default::default()
        }
    }

    /// Create config with a per-task timeout.
    pub fn with_timeout(secs: u64) -> Self {
        Self {
            task_timeout_secs: Some(secs),
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
