//! Thin HTTP edge around the orchestrator (spec.md §1: the public surface is
//! an external collaborator, out of scope for the engine itself — this is
//! the minimal adapter needed to serve it).

use crate::domain::assembler;
use crate::domain::model::{EstimateRequest, EstimateResponse};
use crate::domain::orchestrator::Orchestrator;
use crate::infra::metrics::Metrics;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::post;
use axum::Router;
use std::sync::Arc;

struct ApiState {
    orchestrator: Arc<Orchestrator>,
    metrics: Arc<Metrics>,
    /// Server-side cap on the per-request deadline a caller may request
    /// (`REQUEST_DEADLINE_MS`, spec.md §6).
    max_deadline_ms: u64,
}

pub fn router(orchestrator: Arc<Orchestrator>, metrics: Arc<Metrics>, max_deadline_ms: u64) -> Router {
    let state = Arc::new(ApiState {
        orchestrator,
        metrics,
        max_deadline_ms,
    });
    Router::new()
        .route("/estimate", post(estimate_handler))
        .with_state(state)
}

async fn estimate_handler(
    State(state): State<Arc<ApiState>>,
    Json(mut request): Json<EstimateRequest>,
) -> impl IntoResponse {
    request.deadline_ms = request.deadline_ms.min(state.max_deadline_ms);
    match state.orchestrator.estimate(&request).await {
        Ok(records) => {
            let indexed = records.into_iter().collect();
            let response: EstimateResponse = assembler::assemble(&request, indexed);
            state.metrics.record_estimate("success");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => {
            state.metrics.record_estimate("error");
            let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::BAD_GATEWAY);
            (
                status,
                Json(serde_json::json!({
                    "code": err.code().to_string(),
                    "message": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}
