//! Ticker search and per-ticker metric lookups.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use financial_metrics::{chart_series, MetricSeries};
use finsight_core::{MetricTable, QuoteMatch, Ticker};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct MetricsQuery {
    #[serde(default)]
    pub years: Option<usize>,
}

#[derive(Serialize)]
pub struct TickerMetrics {
    pub ticker: String,
    pub metrics: MetricTable,
    pub series: Vec<MetricSeries>,
}

pub fn ticker_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tickers/search", get(search_tickers))
        .route("/api/metrics/:ticker", get(get_metrics))
}

async fn search_tickers(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<QuoteMatch>>>, AppError> {
    let limit = query.limit.unwrap_or(10).clamp(1, 25);
    let mut matches = state.pipeline.search_tickers(&query.q).await?;
    matches.truncate(limit);
    Ok(Json(ApiResponse::success(matches)))
}

async fn get_metrics(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<ApiResponse<TickerMetrics>>, AppError> {
    let ticker = Ticker::parse(&ticker)?;
    let metrics = state.pipeline.fetch_metrics(ticker.as_str(), query.years).await?;
    let series = chart_series(&metrics);

    Ok(Json(ApiResponse::success(TickerMetrics {
        ticker: ticker.to_string(),
        metrics,
        series,
    })))
}

#[cfg(test)]
mod tests {
    use crate::testing::{json_body, test_app};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn get(uri: &str) -> axum::response::Response {
        test_app()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_search() {
        let response = get("/api/tickers/search?q=Acme%20Corp").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"][0]["symbol"], "ACME");
    }

    #[tokio::test]
    async fn test_blank_search_is_bad_request() {
        let response = get("/api/tickers/search?q=%20").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_metrics_for_ticker() {
        let response = get("/api/metrics/acme?years=1").await;
        assert_eq!(response.status(), StatusCode::OK);

        let data = json_body(response).await["data"].clone();
        assert_eq!(data["ticker"], "ACME");
        assert_eq!(data["metrics"].as_array().unwrap().len(), 10);
        assert!(!data["series"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_bad_gateway() {
        let response = get("/api/metrics/ZZZZ").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_ticker_with_path_characters_is_bad_request() {
        for uri in ["/api/metrics/AC%2FME", "/api/metrics/..%2Fv7", "/api/metrics/ACME%3Fx%3D1"] {
            let response = get(uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(json_body(response).await["success"], false);
        }
    }

    #[tokio::test]
    async fn test_zero_years_is_bad_request() {
        let response = get("/api/metrics/ACME?years=0").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
