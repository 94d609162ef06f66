use async_trait::async_trait;
use crate::{FinancialStatements, QuoteMatch, ReportError};

/// Free-text completion service (the LLM)
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ReportError>;

    fn backend_name(&self) -> &'static str;
}

/// Market-data provider: ticker search and annual financial statements
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Ranked ticker matches for a free-text query, best first
    async fn search(&self, query: &str) -> Result<Vec<QuoteMatch>, ReportError>;

    async fn statements(&self, ticker: &str) -> Result<FinancialStatements, ReportError>;
}

/// Document text extractor
pub trait TextExtractor: Send + Sync {
    /// Plain text of a PDF byte stream. May be empty when nothing is readable.
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ReportError>;
}
