use crate::{
    AppState,
    types::{AppError, OrchestrateRequest, OrchestrateResponse, Result},
};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

/// Orchestrate a request across the configured providers
///
/// Provider failures never fail the request: when no provider answers, the
/// response is still `200` with a degraded answer and zero confidence.
#[utoipa::path(
    post,
    path = "/api/orchestrate",
    request_body = OrchestrateRequest,
    responses(
        (status = 200, description = "Synthesized answer", body = OrchestrateResponse),
        (status = 400, description = "Invalid input"),
        (status = 500, description = "Orchestration defect")
    ),
    tag = "orchestration"
)]
pub async fn orchestrate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<OrchestrateRequest>, JsonRejection>,
) -> Result<Json<OrchestrateResponse>> {
    let Json(payload) = payload.map_err(|e| AppError::InvalidInput(e.body_text()))?;

    let response = state.service.handle(payload).await?;

    Ok(Json(response))
}
