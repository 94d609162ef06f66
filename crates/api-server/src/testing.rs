use async_trait::async_trait;
use axum::{body::Body, response::Response, Router};
use finsight_core::{
    CompletionService, FinancialStatements, MarketDataProvider, QuoteMatch, ReportError,
    TextExtractor,
};
use report_orchestrator::{PipelineConfig, ReportPipeline};
use std::sync::Arc;

use crate::{build_router, AppState, ServerConfig};

pub const BOUNDARY: &str = "finsight-test-boundary";

struct ScriptedLlm;

#[async_trait]
impl CompletionService for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, ReportError> {
        let reply = if prompt.starts_with("Extract the company name") {
            "**Acme Corp**"
        } else if prompt.contains("\"financials\"") {
            r#"{"financials": [{"year": 2023, "Revenue": 1200, "EBITDA": 300}]}"#
        } else if prompt.starts_with("Analyze the sentiment") {
            "Positive: 1\nNeutral: 1\nNegative: 0"
        } else {
            "A short summary."
        };
        Ok(reply.to_string())
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

struct FakeMarket;

#[async_trait]
impl MarketDataProvider for FakeMarket {
    async fn search(&self, query: &str) -> Result<Vec<QuoteMatch>, ReportError> {
        let symbol = match query {
            "Acme Corp" => "ACME",
            "Beta Industries" => "BETA",
            _ => return Ok(Vec::new()),
        };
        Ok(vec![QuoteMatch {
            symbol: symbol.to_string(),
            short_name: Some(query.to_string()),
            long_name: None,
            exchange: Some("NYQ".to_string()),
            quote_type: Some("EQUITY".to_string()),
            score: Some(1000.0),
        }])
    }

    async fn statements(&self, ticker: &str) -> Result<FinancialStatements, ReportError> {
        if ticker != "ACME" && ticker != "BETA" {
            return Err(ReportError::DataUnavailable(format!("no statements for {}", ticker)));
        }
        let mut s = FinancialStatements::new(ticker);
        for (year, revenue) in [(2023, 100.0), (2022, 90.0)] {
            s.income.insert("Total Revenue", year, revenue);
            s.income.insert("EBITDA", year, revenue / 5.0);
        }
        Ok(s)
    }
}

struct FixedText;

impl TextExtractor for FixedText {
    fn extract_text(&self, _pdf: &[u8]) -> Result<String, ReportError> {
        Ok("Acme Corp annual report. Revenue grew on strong demand.".to_string())
    }
}

pub fn test_app() -> Router {
    let pipeline = ReportPipeline::new(
        Arc::new(ScriptedLlm),
        Arc::new(FakeMarket),
        Arc::new(FixedText),
        PipelineConfig::default(),
    );
    build_router(
        AppState {
            pipeline: Arc::new(pipeline),
        },
        &ServerConfig::default(),
    )
}

pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text_body(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Multipart body with a single form field
pub fn multipart_body(field: &str, filename: Option<&str>, content: &[u8]) -> Body {
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"{}\"; filename=\"{}\"", field, name),
        None => format!("form-data; name=\"{}\"", field),
    };
    let mut body = format!(
        "--{}\r\nContent-Disposition: {}\r\nContent-Type: application/pdf\r\n\r\n",
        BOUNDARY, disposition
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    Body::from(body)
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
