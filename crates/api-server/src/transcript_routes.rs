use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use report_orchestrator::TranscriptAnalysis;

use crate::{read_upload, ApiResponse, AppError, AppState};

pub fn transcript_routes() -> Router<AppState> {
    Router::new().route("/api/transcripts", post(analyze_transcript))
}

/// Earnings-call transcript summary and ensemble sentiment
async fn analyze_transcript(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<TranscriptAnalysis>>, AppError> {
    let pdf = read_upload(multipart).await?;
    let analysis = state.pipeline.analyze_transcript(pdf).await?;
    Ok(Json(ApiResponse::success(analysis)))
}
