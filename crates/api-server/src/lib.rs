use axum::{
    extract::{DefaultBodyLimit, Multipart},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use finsight_core::ReportError;
use llm_client::LlmConfig;
use report_orchestrator::{PdfTextExtractor, PipelineConfig, ReportPipeline};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yahoo_client::{YahooClient, YahooConfig};

mod comparison_routes;
mod export_routes;
mod report_routes;
mod ticker_routes;
mod transcript_routes;

#[cfg(test)]
mod testing;

use comparison_routes::comparison_routes;
use export_routes::export_routes;
use report_routes::report_routes;
use ticker_routes::ticker_routes;
use transcript_routes::transcript_routes;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ReportPipeline>,
}

/// JSON envelope shared by every endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error carrying the HTTP status to answer with
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, anyhow::anyhow!(message.into()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

fn status_for(error: &ReportError) -> StatusCode {
    match error {
        ReportError::MalformedInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ReportError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        ReportError::DataUnavailable(_) => StatusCode::BAD_GATEWAY,
        ReportError::ResolutionFailure(_) => StatusCode::NOT_FOUND,
        ReportError::Llm(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl From<ReportError> for AppError {
    fn from(error: ReportError) -> Self {
        Self::with_status(status_for(&error), error.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        let status = error
            .downcast_ref::<ReportError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::with_status(status, error)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed ({}): {:#}", self.status, self.error);
        } else {
            tracing::warn!("Request rejected ({}): {}", self.status, self.error);
        }
        let body = Json(ApiResponse::<()>::error(self.error.to_string()));
        (self.status, body).into_response()
    }
}

/// HTTP listener settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
        }
    }
}

/// Body of the first uploaded file in a multipart form.
///
/// Prefers a field named `file`; otherwise takes the first field carrying a filename.
pub(crate) async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let is_file = field.name() == Some("file") || field.file_name().is_some();
        if !is_file {
            continue;
        }

        let name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::bad_request(format!("Failed to read upload: {}", e)))?;
        tracing::info!("Received upload '{}' ({} bytes)", name, bytes.len());

        if bytes.is_empty() {
            return Err(AppError::bad_request("Uploaded file is empty"));
        }
        return Ok(bytes.to_vec());
    }

    Err(AppError::bad_request("No file uploaded"))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "finsight-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(report_routes())
        .merge(comparison_routes())
        .merge(ticker_routes())
        .merge(transcript_routes())
        .merge(export_routes())
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "api_server=info,report_orchestrator=info,tower_http=info".into());

    if json_logging {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env();
    let llm = llm_client::build_completion_service(&LlmConfig::default())?;
    let market = Arc::new(YahooClient::new(YahooConfig::default())?);
    let pipeline = ReportPipeline::new(
        llm,
        market,
        Arc::new(PdfTextExtractor::new()),
        PipelineConfig::from_env(),
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
    };
    let app = build_router(state, &config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
