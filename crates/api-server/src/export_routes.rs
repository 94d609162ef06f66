//! Downloadable exports of metric tables and reports.

use axum::{
    http::header,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use financial_metrics::{render_pdf_report, render_text_report, to_csv, ReportExport};
use finsight_core::MetricTable;
use serde::Deserialize;

use crate::{AppError, AppState};

#[derive(Deserialize)]
pub struct CsvExportRequest {
    pub metrics: MetricTable,
    #[serde(default)]
    pub filename: Option<String>,
}

pub fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/api/exports/csv", post(export_csv))
        .route("/api/exports/report", post(export_report))
        .route("/api/exports/pdf", post(export_pdf))
}

fn attachment(filename: &str, fallback: &str) -> String {
    let name: String = filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    let name = if name.is_empty() { fallback.to_string() } else { name };
    format!("attachment; filename=\"{}\"", name)
}

async fn export_csv(Json(request): Json<CsvExportRequest>) -> Result<impl IntoResponse, AppError> {
    let body = to_csv(&request.metrics).map_err(anyhow::Error::from)?;
    let disposition = attachment(
        request.filename.as_deref().unwrap_or_default(),
        "financial_metrics.csv",
    );
    tracing::info!("Exported {} metric rows as CSV", request.metrics.len());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

async fn export_report(Json(report): Json<ReportExport>) -> Result<impl IntoResponse, AppError> {
    if report.title.trim().is_empty() {
        return Err(AppError::bad_request("Report title is required"));
    }
    let body = render_text_report(&report);

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, attachment("", "financial_report.txt")),
        ],
        body,
    ))
}

async fn export_pdf(Json(report): Json<ReportExport>) -> Result<impl IntoResponse, AppError> {
    if report.title.trim().is_empty() {
        return Err(AppError::bad_request("Report title is required"));
    }
    let body = render_pdf_report(&report).map_err(anyhow::Error::from)?;
    tracing::info!("Exported PDF report '{}' ({} bytes)", report.title.trim(), body.len());

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, attachment("", "financial_report.pdf")),
        ],
        body,
    ))
}
