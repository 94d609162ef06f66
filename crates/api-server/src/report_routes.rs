//! Report upload: PDF in, company name + normalized metrics + summaries out.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use report_orchestrator::DocumentAnalysis;

use crate::{read_upload, ApiResponse, AppError, AppState};

pub fn report_routes() -> Router<AppState> {
    Router::new().route("/api/reports", post(analyze_report))
}

async fn analyze_report(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<DocumentAnalysis>>, AppError> {
    let pdf = read_upload(multipart).await?;
    let analysis = state.pipeline.analyze_document(pdf).await?;
    Ok(Json(ApiResponse::success(analysis)))
}

#[cfg(test)]
mod tests {
    use crate::testing::{json_body, multipart_body, multipart_content_type, test_app};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_upload_report() {
        let request = Request::post("/api/reports")
            .header(header::CONTENT_TYPE, multipart_content_type())
            .body(multipart_body("file", Some("annual.pdf"), b"%PDF-1.4 fake"))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["company_name"], "Acme Corp");
        assert_eq!(body["data"]["metrics"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"]["metrics"][0]["entity"], "Acme Corp");
        assert_eq!(body["data"]["report_summary"], "A short summary.");
    }

    #[tokio::test]
    async fn test_missing_file_is_bad_request() {
        let request = Request::post("/api/reports")
            .header(header::CONTENT_TYPE, multipart_content_type())
            .body(multipart_body("note", None, b"hello"))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_empty_file_is_bad_request() {
        let request = Request::post("/api/reports")
            .header(header::CONTENT_TYPE, multipart_content_type())
            .body(multipart_body("file", Some("empty.pdf"), b""))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
