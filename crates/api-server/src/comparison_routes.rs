use axum::{extract::State, routing::post, Json, Router};
use report_orchestrator::{ComparisonOutcome, ComparisonRequest};

use crate::{ApiResponse, AppError, AppState};

pub fn comparison_routes() -> Router<AppState> {
    Router::new().route("/api/comparisons", post(compare))
}

/// Main company vs competitors. Entities that cannot be resolved or fetched
/// are listed with their status and contribute no rows.
async fn compare(
    State(state): State<AppState>,
    Json(request): Json<ComparisonRequest>,
) -> Result<Json<ApiResponse<ComparisonOutcome>>, AppError> {
    let outcome = state.pipeline.compare(request).await?;
    Ok(Json(ApiResponse::success(outcome)))
}
