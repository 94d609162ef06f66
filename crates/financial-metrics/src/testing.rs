//! In-memory market-data provider for unit tests.

use async_trait::async_trait;
use finsight_core::{FinancialStatements, MarketDataProvider, QuoteMatch, ReportError};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeMarket {
    quotes: HashMap<String, Vec<QuoteMatch>>,
    statements: HashMap<String, FinancialStatements>,
    fail_search: bool,
    searches: Mutex<Vec<String>>,
}

impl FakeMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quotes(mut self, query: &str, symbols: &[&str]) -> Self {
        let quotes = symbols
            .iter()
            .map(|s| QuoteMatch {
                symbol: s.to_string(),
                short_name: Some(query.to_string()),
                long_name: None,
                exchange: None,
                quote_type: Some("EQUITY".to_string()),
                score: None,
            })
            .collect();
        self.quotes.insert(query.to_string(), quotes);
        self
    }

    pub fn with_statements(mut self, statements: FinancialStatements) -> Self {
        self.statements.insert(statements.ticker.clone(), statements);
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataProvider for FakeMarket {
    async fn search(&self, query: &str) -> Result<Vec<QuoteMatch>, ReportError> {
        self.searches.lock().unwrap().push(query.to_string());
        if self.fail_search {
            return Err(ReportError::DataUnavailable("search endpoint down".to_string()));
        }
        Ok(self.quotes.get(query).cloned().unwrap_or_default())
    }

    async fn statements(&self, ticker: &str) -> Result<FinancialStatements, ReportError> {
        self.statements
            .get(ticker)
            .cloned()
            .ok_or_else(|| ReportError::DataUnavailable(format!("HTTP 404: {}", ticker)))
    }
}
