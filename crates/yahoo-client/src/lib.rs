use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use finsight_core::{
    FinancialStatements, MarketDataProvider, QuoteMatch, ReportError, StatementKind, Ticker,
};
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

const BASE_URL: &str = "https://query2.finance.yahoo.com";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

/// How far back statement requests reach
const STATEMENT_LOOKBACK_YEARS: i64 = 10;

/// Annual fundamentals-timeseries fields requested per ticker, with the
/// statement each one belongs to.
const TIMESERIES_FIELDS: &[(&str, StatementKind)] = &[
    ("TotalRevenue", StatementKind::Income),
    ("GrossProfit", StatementKind::Income),
    ("OperatingIncome", StatementKind::Income),
    ("EBITDA", StatementKind::Income),
    ("NetIncome", StatementKind::Income),
    ("TotalAssets", StatementKind::BalanceSheet),
    ("TotalLiabilitiesNetMinorityInterest", StatementKind::BalanceSheet),
    ("StockholdersEquity", StatementKind::BalanceSheet),
    ("OperatingCashFlow", StatementKind::CashFlow),
    ("InvestingCashFlow", StatementKind::CashFlow),
    ("FinancingCashFlow", StatementKind::CashFlow),
    ("FreeCashFlow", StatementKind::CashFlow),
];

#[derive(Error, Debug)]
pub enum YahooError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid ticker: {0:?}")]
    InvalidTicker(String),
}

impl From<YahooError> for ReportError {
    fn from(e: YahooError) -> Self {
        match e {
            YahooError::InvalidTicker(_) => ReportError::InvalidRequest(e.to_string()),
            other => ReportError::DataUnavailable(other.to_string()),
        }
    }
}

/// Configuration for the Yahoo Finance client
#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    /// Requests allowed per minute
    pub rate_limit: usize,
    pub timeout: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("YAHOO_BASE_URL").unwrap_or_else(|_| BASE_URL.to_string()),
            rate_limit: std::env::var("YAHOO_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            timeout: Duration::from_secs(
                std::env::var("YAHOO_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20),
            ),
        }
    }
}

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            let oldest = match ts.front() {
                Some(&oldest) if ts.len() >= self.max_requests => oldest,
                _ => {
                    ts.push_back(now);
                    return;
                }
            };

            // Wait until the oldest request falls out of the window
            let sleep_dur = (oldest + self.window).duration_since(now) + Duration::from_millis(20);
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Yahoo slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl YahooClient {
    pub fn new(config: YahooConfig) -> Result<Self, YahooError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter: RateLimiter::new(config.rate_limit, Duration::from_secs(60)),
        })
    }

    pub fn with_defaults() -> Result<Self, YahooError> {
        Self::new(YahooConfig::default())
    }

    /// Send a rate-limited request. Each call is attempted once.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<Value, YahooError> {
        self.rate_limiter.acquire().await;
        let response = builder.send().await?;

        if !response.status().is_success() {
            return Err(YahooError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| YahooError::InvalidResponse(e.to_string()))
    }

    /// Search for tickers matching a company name.
    ///
    /// The query is passed through unmodified; ranking is the provider's.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<QuoteMatch>, YahooError> {
        let url = format!("{}/v1/finance/search", self.base_url);
        tracing::debug!("GET {} q={}", url, query);

        let limit = limit.to_string();
        let body = self
            .send_request(self.client.get(&url).query(&[
                ("q", query),
                ("quotesCount", limit.as_str()),
                ("newsCount", "0"),
            ]))
            .await?;

        parse_search(body)
    }

    /// Annual income statement, balance sheet and cash flow for a ticker
    pub async fn get_statements(&self, ticker: &str) -> Result<FinancialStatements, YahooError> {
        let symbol = Ticker::parse(ticker).map_err(|_| YahooError::InvalidTicker(ticker.to_string()))?;
        let ticker = symbol.as_str();
        let url = format!(
            "{}/ws/fundamentals-timeseries/v1/finance/timeseries/{}",
            self.base_url, ticker
        );
        let types = TIMESERIES_FIELDS
            .iter()
            .map(|(field, _)| format!("annual{}", field))
            .collect::<Vec<_>>()
            .join(",");
        let now = Utc::now();
        let start = now - ChronoDuration::days(365 * STATEMENT_LOOKBACK_YEARS);

        tracing::debug!("GET {} ({} fields)", url, TIMESERIES_FIELDS.len());

        let body = self
            .send_request(self.client.get(&url).query(&[
                ("symbol", ticker.to_string()),
                ("type", types),
                ("period1", start.timestamp().to_string()),
                ("period2", now.timestamp().to_string()),
            ]))
            .await?;

        let statements = parse_timeseries(ticker, &body)?;
        tracing::info!(
            "Fetched statements for {}: years {:?}",
            ticker,
            statements.available_years()
        );
        Ok(statements)
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    async fn search(&self, query: &str) -> Result<Vec<QuoteMatch>, ReportError> {
        Ok(YahooClient::search(self, query, 5).await?)
    }

    async fn statements(&self, ticker: &str) -> Result<FinancialStatements, ReportError> {
        Ok(self.get_statements(ticker).await?)
    }
}

// Search response types
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    quotes: Vec<SearchQuote>,
}

#[derive(Debug, Deserialize)]
struct SearchQuote {
    symbol: Option<String>,
    shortname: Option<String>,
    longname: Option<String>,
    exchange: Option<String>,
    #[serde(rename = "quoteType")]
    quote_type: Option<String>,
    score: Option<f64>,
}

fn parse_search(body: Value) -> Result<Vec<QuoteMatch>, YahooError> {
    let response: SearchResponse =
        serde_json::from_value(body).map_err(|e| YahooError::InvalidResponse(e.to_string()))?;

    Ok(response
        .quotes
        .into_iter()
        .filter_map(|q| {
            let symbol = q.symbol.filter(|s| !s.is_empty())?;
            Some(QuoteMatch {
                symbol,
                short_name: q.shortname,
                long_name: q.longname,
                exchange: q.exchange,
                quote_type: q.quote_type,
                score: q.score,
            })
        })
        .collect())
}

/// Decode a fundamentals-timeseries body into statement tables.
///
/// Each result item carries its field name in `meta.type[0]` and its values
/// under that same key; null entries and unknown fields are skipped.
fn parse_timeseries(ticker: &str, body: &Value) -> Result<FinancialStatements, YahooError> {
    let results = body
        .pointer("/timeseries/result")
        .and_then(|v| v.as_array())
        .ok_or_else(|| YahooError::InvalidResponse("missing timeseries.result".to_string()))?;

    let mut statements = FinancialStatements::new(ticker);

    for item in results {
        let Some(type_key) = item.pointer("/meta/type/0").and_then(|v| v.as_str()) else {
            continue;
        };
        let field = type_key.trim_start_matches("annual");
        let Some((_, kind)) = TIMESERIES_FIELDS.iter().find(|(f, _)| *f == field) else {
            continue;
        };
        let label = line_item_label(field);

        let entries = item.get(type_key).and_then(|v| v.as_array());
        for entry in entries.into_iter().flatten() {
            let year = entry
                .get("asOfDate")
                .and_then(|v| v.as_str())
                .and_then(|d| d.get(..4))
                .and_then(|y| y.parse::<i32>().ok());
            let value = entry.pointer("/reportedValue/raw").and_then(|v| v.as_f64());

            if let (Some(year), Some(value)) = (year, value) {
                statements.statement_mut(*kind).insert(label.clone(), year, value);
            }
        }
    }

    Ok(statements)
}

/// "TotalLiabilitiesNetMinorityInterest" -> "Total Liabilities Net Minority Interest".
/// Acronym runs such as "EBITDA" stay intact.
fn line_item_label(field: &str) -> String {
    let chars: Vec<char> = field.chars().collect();
    let mut out = String::with_capacity(field.len() + 8);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                out.push(' ');
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_line_item_labels() {
        assert_eq!(line_item_label("TotalRevenue"), "Total Revenue");
        assert_eq!(line_item_label("EBITDA"), "EBITDA");
        assert_eq!(
            line_item_label("TotalLiabilitiesNetMinorityInterest"),
            "Total Liabilities Net Minority Interest"
        );
        assert_eq!(line_item_label("NetIncome"), "Net Income");
    }

    #[test]
    fn test_parse_timeseries() {
        let body = json!({
            "timeseries": {
                "result": [
                    {
                        "meta": {"symbol": ["ACME"], "type": ["annualTotalRevenue"]},
                        "timestamp": [1672444800, 1703980800],
                        "annualTotalRevenue": [
                            {"asOfDate": "2022-12-31", "periodType": "12M",
                             "reportedValue": {"raw": 900000.0, "fmt": "900K"}},
                            {"asOfDate": "2023-12-31", "periodType": "12M",
                             "reportedValue": {"raw": 1000000.0, "fmt": "1M"}}
                        ]
                    },
                    {
                        "meta": {"symbol": ["ACME"], "type": ["annualEBITDA"]},
                        "annualEBITDA": [
                            null,
                            {"asOfDate": "2023-12-31", "reportedValue": {"raw": 250000.0}}
                        ]
                    },
                    {
                        "meta": {"symbol": ["ACME"], "type": ["annualStockholdersEquity"]}
                    },
                    {
                        "meta": {"symbol": ["ACME"], "type": ["annualSomethingElse"]},
                        "annualSomethingElse": [
                            {"asOfDate": "2023-12-31", "reportedValue": {"raw": 1.0}}
                        ]
                    }
                ],
                "error": null
            }
        });

        let statements = parse_timeseries("ACME", &body).unwrap();

        assert_eq!(statements.ticker, "ACME");
        assert_eq!(statements.income.get("Total Revenue", 2022), Some(900000.0));
        assert_eq!(statements.income.get("Total Revenue", 2023), Some(1000000.0));
        assert_eq!(statements.income.get("EBITDA", 2022), None);
        assert_eq!(statements.income.get("EBITDA", 2023), Some(250000.0));
        assert!(statements.balance_sheet.is_empty());
        assert_eq!(statements.available_years(), vec![2023, 2022]);
    }

    #[test]
    fn test_parse_timeseries_rejects_unknown_shape() {
        let err = parse_timeseries("ACME", &json!({"chart": {}})).unwrap_err();
        assert!(matches!(err, YahooError::InvalidResponse(_)));
    }

    #[test]
    fn test_parse_search() {
        let body = json!({
            "quotes": [
                {"symbol": "AAPL", "shortname": "Apple Inc.", "longname": "Apple Inc.",
                 "exchange": "NMS", "quoteType": "EQUITY", "score": 30000.0},
                {"shortname": "no symbol"},
                {"symbol": "APLE", "shortname": "Apple Hospitality REIT", "exchange": "NYQ"}
            ],
            "news": []
        });

        let matches = parse_search(body).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].symbol, "AAPL");
        assert_eq!(matches[0].quote_type.as_deref(), Some("EQUITY"));
        assert_eq!(matches[1].symbol, "APLE");
    }

    #[test]
    fn test_parse_search_without_quotes() {
        let matches = parse_search(json!({"count": 0})).unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_ticker_is_rejected_before_any_request() {
        let client = YahooClient::new(YahooConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            rate_limit: 60,
            timeout: Duration::from_secs(1),
        })
        .unwrap();

        for bad in ["AC/ME", "../v7/finance", "ACME?symbol=X", "AC%2FME"] {
            assert!(matches!(
                client.get_statements(bad).await,
                Err(YahooError::InvalidTicker(_))
            ));
        }
        let err = MarketDataProvider::statements(&client, "AC/ME").await.unwrap_err();
        assert!(matches!(err, ReportError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_rate_limiter_waits_for_window() {
        let limiter = RateLimiter::new(2, Duration::from_millis(200));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100));

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }
}
