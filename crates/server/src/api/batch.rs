//! Batch endpoints: start, inspect, reset and crossfade the session's batch.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use timeshift_core::{Artifact, Batch, BatchId, Crossfade, Label};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to start a batch for one source image.
#[derive(Debug, Deserialize)]
pub struct StartBatchRequest {
    /// Source image reference, normally a `data:` URL.
    pub source: Artifact,
}

/// Query parameters for the crossfade view.
#[derive(Debug, Deserialize)]
pub struct CrossfadeParams {
    /// Slider position; clamped to the slider range.
    #[serde(default)]
    pub cursor: f64,
}

/// One visible or hidden layer of the crossfade.
#[derive(Debug, Serialize)]
pub struct CrossfadeLayerResponse {
    pub index: usize,
    pub label: Label,
    pub weight: f64,
    pub artifact: Artifact,
}

/// Crossfade of the current batch at one cursor position.
#[derive(Debug, Serialize)]
pub struct CrossfadeResponse {
    pub batch_id: BatchId,
    pub cursor: f64,
    pub range: (f64, f64),
    /// Label the slider names at this position.
    pub nearest_label: Label,
    pub settled: bool,
    pub layers: Vec<CrossfadeLayerResponse>,
}

impl CrossfadeResponse {
    fn new(batch: &Batch, crossfade: Crossfade) -> Self {
        let successful = batch.successful();
        let nearest_label = successful[crossfade.nearest].label.clone();
        let layers = crossfade
            .layers
            .into_iter()
            .zip(successful.iter())
            .map(|(layer, item)| CrossfadeLayerResponse {
                index: layer.index,
                label: layer.label,
                weight: layer.weight,
                artifact: item.artifact().cloned().unwrap_or_else(|| Artifact::new("")),
            })
            .collect();

        Self {
            batch_id: batch.id,
            cursor: crossfade.cursor,
            range: crossfade.range,
            nearest_label,
            settled: batch.is_settled(),
            layers,
        }
    }
}

/// Response to a reset.
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    /// Batch that was discarded, if any.
    pub discarded: Option<BatchId>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct BatchErrorResponse {
    pub error: String,
    /// Machine-readable reason for rejected batches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl BatchErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            reason: None,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Start a batch over the configured shifts.
///
/// Returns 202 with every label pending; the batch is driven in the background
/// and its progress is published to session subscribers. Returns 409 when a
/// newer batch became current first.
pub async fn start_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartBatchRequest>,
) -> Result<(StatusCode, Json<Batch>), impl IntoResponse> {
    let run = match state
        .orchestrator()
        .start_batch(body.source, state.shifts().to_vec())
    {
        Ok(run) => run,
        Err(e) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(BatchErrorResponse {
                    error: e.to_string(),
                    reason: Some(e.reason().to_string()),
                }),
            ));
        }
    };

    let snapshot = run.snapshot().clone();
    let session = Arc::clone(state.session());
    let installed = session.install(snapshot.clone()).await;

    // Tasks are already running; drain them even when their updates are stale
    tokio::spawn(async move {
        session.drive(run).await;
    });

    if !installed {
        warn!("{} lost the start race to a newer batch", snapshot.id);
        return Err((
            StatusCode::CONFLICT,
            Json(BatchErrorResponse {
                error: format!("{} was superseded by a newer batch", snapshot.id),
                reason: Some("superseded".to_string()),
            }),
        ));
    }

    info!("Accepted {} with {} labels", snapshot.id, snapshot.len());
    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// Get the current batch.
pub async fn get_batch(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Batch>, impl IntoResponse> {
    match state.session().current().await {
        Some(batch) => Ok(Json(batch)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(BatchErrorResponse::new("No batch has been started")),
        )),
    }
}

/// Discard the current batch; updates still in flight for it are dropped.
pub async fn reset_batch(State(state): State<Arc<AppState>>) -> Json<ResetResponse> {
    Json(ResetResponse {
        discarded: state.session().reset().await,
    })
}

/// Per-item weights of the current batch at a cursor position.
pub async fn get_crossfade(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CrossfadeParams>,
) -> Result<Json<CrossfadeResponse>, impl IntoResponse> {
    let Some(batch) = state.session().current().await else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(BatchErrorResponse::new("No batch has been started")),
        ));
    };

    match Crossfade::from_batch(&batch, params.cursor) {
        Some(crossfade) => Ok(Json(CrossfadeResponse::new(&batch, crossfade))),
        None => Err((
            StatusCode::CONFLICT,
            Json(BatchErrorResponse::new(format!(
                "{} has no successful items yet",
                batch.id
            ))),
        )),
    }
}
