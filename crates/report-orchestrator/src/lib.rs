use financial_metrics::{
    build_comparison, chart_series, normalize, Comparison, EntityResolver, MetricFetcher,
    MetricSeries, ResolveError,
};
use finsight_core::{
    CompletionService, EntityRecord, MarketDataProvider, MetricTable, QuoteMatch, ReportError,
    ReportResult, TextExtractor, Ticker,
};
use llm_client::ReportAssistant;
use sentiment_analysis::{TranscriptSentiment, TranscriptSentimentAnalyzer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub mod cache;
pub mod config;
pub mod pdf;

pub use cache::TickerCache;
pub use config::{PipelineConfig, TickerCacheConfig};
pub use pdf::PdfTextExtractor;

/// How one entity of a comparison fared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum EntityStatus {
    /// Resolved and fetched from the market-data provider
    Fetched,
    /// Metrics were supplied by the caller
    Supplied,
    /// No ticker matched the name
    Unresolved,
    /// Search or fetch failed, or timed out
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityReport {
    pub name: String,
    pub ticker: Option<Ticker>,
    pub status: EntityStatus,
    pub row_count: usize,
}

/// Everything extracted from one uploaded financial report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub company_name: String,
    pub metrics: MetricTable,
    pub report_summary: Option<String>,
    pub metrics_summary: Option<String>,
    pub text_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptAnalysis {
    pub summary: Option<String>,
    pub sentiment: TranscriptSentiment,
    pub text_chars: usize,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonRequest {
    pub company: String,
    #[serde(default)]
    pub competitors: Vec<String>,
    /// Metrics already extracted for the main company; fetched by name when absent
    #[serde(default)]
    pub main_metrics: Option<MetricTable>,
    #[serde(default)]
    pub years: Option<usize>,
    #[serde(default = "default_true")]
    pub summarize: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    pub comparison: Comparison,
    pub entities: Vec<EntityReport>,
    pub series: Vec<MetricSeries>,
    pub summary: Option<String>,
}

struct EntityOutcome {
    name: String,
    ticker: Option<Ticker>,
    status: EntityStatus,
    table: MetricTable,
}

impl EntityOutcome {
    fn empty(name: &str, ticker: Option<Ticker>, status: EntityStatus) -> Self {
        Self {
            name: name.to_string(),
            ticker,
            status,
            table: MetricTable::new(),
        }
    }
}

/// Resolve + fetch for a single entity. Cheap to clone into spawned tasks.
#[derive(Clone)]
struct EntityWorker {
    resolver: EntityResolver,
    fetcher: MetricFetcher,
    ticker_cache: Option<TickerCache>,
}

impl EntityWorker {
    async fn resolve(&self, name: &str) -> Result<EntityRecord, ResolveError> {
        if let Some(ticker) = self.ticker_cache.as_ref().and_then(|c| c.get(name)) {
            tracing::debug!("Ticker cache hit for '{}'", name);
            return Ok(EntityRecord {
                display_name: name.to_string(),
                ticker: Some(ticker),
            });
        }

        let record = self.resolver.resolve_detailed(name).await?;
        if let (Some(cache), Some(ticker)) = (&self.ticker_cache, &record.ticker) {
            cache.insert(name, ticker.clone());
        }
        Ok(record)
    }

    async fn resolve_and_fetch(&self, name: &str, years: usize) -> EntityOutcome {
        let ticker = match self.resolve(name).await {
            Ok(EntityRecord {
                ticker: Some(ticker),
                ..
            }) => ticker,
            Ok(_) | Err(ResolveError::NoMatch(_)) => {
                tracing::warn!("No ticker found for '{}'", name);
                return EntityOutcome::empty(name, None, EntityStatus::Unresolved);
            }
            Err(ResolveError::Provider(e)) => {
                tracing::warn!("Ticker search for '{}' failed: {}", name, e);
                return EntityOutcome::empty(name, None, EntityStatus::Unavailable(e.to_string()));
            }
        };

        match self.fetcher.fetch(ticker.as_str(), years).await {
            Ok(table) => EntityOutcome {
                name: name.to_string(),
                ticker: Some(ticker),
                status: EntityStatus::Fetched,
                // rows arrive stamped with the ticker
                table: table.with_entity(name),
            },
            Err(e) => {
                tracing::warn!("No financial data for {} ({}): {}", name, ticker, e);
                EntityOutcome::empty(name, Some(ticker), EntityStatus::Unavailable(e.to_string()))
            }
        }
    }
}

/// Request-scoped report pipeline: document analysis, competitor comparison,
/// transcript sentiment.
pub struct ReportPipeline {
    assistant: ReportAssistant,
    sentiment: TranscriptSentimentAnalyzer,
    market: Arc<dyn MarketDataProvider>,
    extractor: Arc<dyn TextExtractor>,
    worker: EntityWorker,
    config: PipelineConfig,
}

impl ReportPipeline {
    pub fn new(
        llm: Arc<dyn CompletionService>,
        market: Arc<dyn MarketDataProvider>,
        extractor: Arc<dyn TextExtractor>,
        config: PipelineConfig,
    ) -> Self {
        let worker = EntityWorker {
            resolver: EntityResolver::new(Arc::clone(&market)),
            fetcher: MetricFetcher::new(Arc::clone(&market)),
            ticker_cache: config.ticker_cache.map(TickerCache::new),
        };

        tracing::info!(
            "Report pipeline ready (LLM: {}, years: {}, concurrency: {}, ticker cache: {})",
            llm.backend_name(),
            config.years,
            config.concurrency,
            if config.ticker_cache.is_some() { "on" } else { "off" }
        );

        Self {
            assistant: ReportAssistant::new(Arc::clone(&llm)),
            sentiment: TranscriptSentimentAnalyzer::new(llm),
            market,
            extractor,
            worker,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Plain text of a PDF, rejecting documents with nothing readable.
    pub async fn extract_text(&self, pdf: Vec<u8>) -> ReportResult<String> {
        let extractor = Arc::clone(&self.extractor);
        let text = tokio::task::spawn_blocking(move || extractor.extract_text(&pdf))
            .await
            .map_err(|e| ReportError::MalformedInput(format!("text extraction task failed: {}", e)))??;

        if text.trim().is_empty() {
            return Err(ReportError::MalformedInput(
                "document contains no extractable text".to_string(),
            ));
        }
        Ok(text)
    }

    /// Company name, normalized metrics and summaries for an uploaded report.
    pub async fn analyze_document(&self, pdf: Vec<u8>) -> ReportResult<DocumentAnalysis> {
        let text = self.extract_text(pdf).await?;
        tracing::info!("Extracted {} characters from report", text.chars().count());
        self.analyze_text(&text).await
    }

    pub async fn analyze_text(&self, text: &str) -> ReportResult<DocumentAnalysis> {
        if text.trim().is_empty() {
            return Err(ReportError::MalformedInput("report text is empty".to_string()));
        }

        let (name, raw_metrics, summary) = tokio::join!(
            self.assistant.extract_company_name(text),
            self.assistant.extract_key_metrics(text),
            self.assistant.summarize_text(text, "financial report"),
        );

        let company_name = name?;
        let metrics = normalize(&raw_metrics?, &company_name)?;
        tracing::info!("Extracted {} metric rows for {}", metrics.len(), company_name);

        let report_summary = summary
            .map_err(|e| tracing::warn!("Report summary failed: {}", e))
            .ok();
        let metrics_summary = self
            .assistant
            .summarize_metrics(&metrics)
            .await
            .map_err(|e| tracing::warn!("Metrics summary failed: {}", e))
            .ok();

        Ok(DocumentAnalysis {
            company_name,
            metrics,
            report_summary,
            metrics_summary,
            text_chars: text.chars().count(),
        })
    }

    /// Earnings-call transcript summary and ensemble sentiment.
    pub async fn analyze_transcript(&self, pdf: Vec<u8>) -> ReportResult<TranscriptAnalysis> {
        let text = self.extract_text(pdf).await?;

        let (summary, sentiment) = tokio::join!(
            self.assistant.summarize_text(&text, "earnings call transcript"),
            self.sentiment.analyze(&text),
        );

        Ok(TranscriptAnalysis {
            summary: summary
                .map_err(|e| tracing::warn!("Transcript summary failed: {}", e))
                .ok(),
            sentiment: sentiment?,
            text_chars: text.chars().count(),
        })
    }

    pub async fn search_tickers(&self, query: &str) -> ReportResult<Vec<QuoteMatch>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ReportError::InvalidRequest("search query is empty".to_string()));
        }
        self.market.search(query).await
    }

    pub async fn fetch_metrics(&self, ticker: &str, years: Option<usize>) -> ReportResult<MetricTable> {
        let ticker = Ticker::parse(ticker)?;
        self.worker
            .fetcher
            .fetch(ticker.as_str(), years.unwrap_or(self.config.years))
            .await
    }

    /// Compare the main company against competitors.
    ///
    /// Per-entity failures are reported in `entities` with zero rows rather
    /// than failing the request.
    pub async fn compare(&self, request: ComparisonRequest) -> ReportResult<ComparisonOutcome> {
        let company = request.company.trim().to_string();
        if company.is_empty() {
            return Err(ReportError::InvalidRequest("company name is required".to_string()));
        }
        let competitors = validate_competitors(&company, &request.competitors)?;
        let years = request.years.unwrap_or(self.config.years);
        if years == 0 {
            return Err(ReportError::InvalidRequest("years must be at least 1".to_string()));
        }

        tracing::info!(
            "Comparing {} against {} competitor(s) over {} year(s)",
            company,
            competitors.len(),
            years
        );

        let (main_table, main_ticker, main_status, competitor_outcomes) = match request.main_metrics {
            Some(table) => {
                let outcomes = self.fan_out(competitors, years).await;
                (table.with_entity(&company), None, EntityStatus::Supplied, outcomes)
            }
            None => {
                let mut names = Vec::with_capacity(competitors.len() + 1);
                names.push(company.clone());
                names.extend(competitors);
                let mut outcomes = self.fan_out(names, years).await;
                let main = outcomes.remove(0);
                (main.table, main.ticker, main.status, outcomes)
            }
        };

        let mut statuses = vec![(main_ticker, main_status)];
        let mut competitor_tables = Vec::with_capacity(competitor_outcomes.len());
        for outcome in competitor_outcomes {
            statuses.push((outcome.ticker, outcome.status));
            competitor_tables.push((outcome.name, outcome.table));
        }

        let comparison = build_comparison(&company, main_table, competitor_tables)?;

        let entities: Vec<EntityReport> = comparison
            .entities
            .iter()
            .zip(statuses)
            .map(|(group, (ticker, status))| EntityReport {
                name: group.name.clone(),
                ticker,
                status,
                row_count: group.row_count,
            })
            .collect();

        let series = chart_series(&comparison.table);

        let main_rows = comparison.main_rows();
        let competitor_rows = comparison.competitor_rows();
        let summary = if request.summarize && !main_rows.is_empty() && !competitor_rows.is_empty() {
            self.assistant
                .summarize_comparison(&main_rows, &competitor_rows)
                .await
                .map_err(|e| tracing::warn!("Comparison summary failed: {}", e))
                .ok()
        } else {
            None
        };

        Ok(ComparisonOutcome {
            comparison,
            entities,
            series,
            summary,
        })
    }

    /// Resolve and fetch every name under the worker-pool bound.
    /// Results come back in input order.
    async fn fan_out(&self, names: Vec<String>, years: usize) -> Vec<EntityOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let deadline = self.config.entity_timeout;

        let mut handles = Vec::with_capacity(names.len());
        for name in names {
            let worker = self.worker.clone();
            let semaphore = Arc::clone(&semaphore);
            let task_name = name.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return EntityOutcome::empty(
                            &task_name,
                            None,
                            EntityStatus::Unavailable("worker pool closed".to_string()),
                        )
                    }
                };

                match tokio::time::timeout(deadline, worker.resolve_and_fetch(&task_name, years)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::warn!("'{}' timed out after {:?}", task_name, deadline);
                        EntityOutcome::empty(&task_name, None, EntityStatus::Unavailable(timeout_reason(deadline)))
                    }
                }
            });

            handles.push((name, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => EntityOutcome::empty(
                    &name,
                    None,
                    EntityStatus::Unavailable(format!("task failed: {}", e)),
                ),
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

fn timeout_reason(deadline: Duration) -> String {
    format!("timed out after {} ms", deadline.as_millis())
}

fn validate_competitors(company: &str, competitors: &[String]) -> ReportResult<Vec<String>> {
    let mut seen = vec![company.to_lowercase()];
    let mut names = Vec::with_capacity(competitors.len());

    for raw in competitors {
        let name = raw.trim();
        if name.is_empty() {
            return Err(ReportError::InvalidRequest(
                "competitor names must not be empty".to_string(),
            ));
        }
        let key = name.to_lowercase();
        if seen.contains(&key) {
            return Err(ReportError::InvalidRequest(format!(
                "'{}' is listed more than once",
                name
            )));
        }
        seen.push(key);
        names.push(name.to_string());
    }
    Ok(names)
}
