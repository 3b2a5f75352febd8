use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use timeshift_core::{BatchId, OrchestratorStatus, SanitizedConfig, TaskParam};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// Ordered task parameters, one per slider position.
pub async fn get_shifts(State(state): State<Arc<AppState>>) -> Json<Vec<TaskParam>> {
    Json(state.shifts().to_vec())
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub orchestrator: OrchestratorStatus,
    /// Batch the session currently shows.
    pub current_batch: Option<BatchId>,
    /// Updates dropped because their batch was no longer current.
    pub stale_updates: u64,
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let session = state.session();
    Json(StatusResponse {
        orchestrator: state.orchestrator().status(),
        current_batch: session.current_id().await,
        stale_updates: session.stale_updates(),
    })
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
