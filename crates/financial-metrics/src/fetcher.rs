use finsight_core::{
    FinancialStatements, MarketDataProvider, Metric, MetricRow, MetricTable, ReportError,
    ReportResult, StatementKind,
};
use std::sync::Arc;

pub const DEFAULT_YEARS: usize = 3;

/// Provider line items read for each reported metric (exact label match)
const STATEMENT_LABELS: &[(Metric, StatementKind, &str)] = &[
    (Metric::Revenue, StatementKind::Income, "Total Revenue"),
    (Metric::Ebitda, StatementKind::Income, "EBITDA"),
    (Metric::NetProfit, StatementKind::Income, "Net Income"),
    (Metric::TotalAssets, StatementKind::BalanceSheet, "Total Assets"),
    (Metric::TotalLiabilities, StatementKind::BalanceSheet, "Total Liabilities Net Minority Interest"),
    (Metric::Equity, StatementKind::BalanceSheet, "Stockholders Equity"),
    (Metric::OperatingCashFlow, StatementKind::CashFlow, "Operating Cash Flow"),
    (Metric::InvestingCashFlow, StatementKind::CashFlow, "Investing Cash Flow"),
    (Metric::FinancingCashFlow, StatementKind::CashFlow, "Financing Cash Flow"),
];

/// Pulls annual statements for a ticker and shapes them into canonical rows.
#[derive(Clone)]
pub struct MetricFetcher {
    provider: Arc<dyn MarketDataProvider>,
}

impl MetricFetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    /// Canonical metrics for the most recent `years` fiscal years, stamped with the ticker.
    pub async fn fetch(&self, ticker: &str, years: usize) -> ReportResult<MetricTable> {
        if years == 0 {
            return Err(ReportError::InvalidRequest("years must be at least 1".to_string()));
        }

        let statements = self.provider.statements(ticker).await?;
        if statements.is_empty() {
            return Err(ReportError::DataUnavailable(format!(
                "no financial statements for {}",
                ticker
            )));
        }

        let table = shape_statements(ticker, &statements, years);
        tracing::info!("Fetched {} metric rows for {}", table.len(), ticker);
        Ok(table)
    }
}

/// Extract the canonical metric set from provider statements.
///
/// Missing line items or years give absent values; Margins is EBITDA over
/// revenue for the same year.
pub fn shape_statements(ticker: &str, statements: &FinancialStatements, years: usize) -> MetricTable {
    let mut table = MetricTable::new();

    for year in statements.available_years().into_iter().take(years) {
        for (metric, kind, label) in STATEMENT_LABELS {
            let value = statements.statement(*kind).get(label, year);
            table.insert(MetricRow::new(ticker, Some(year), metric.label(), value));
        }

        let revenue = statements.income.get("Total Revenue", year);
        let ebitda = statements.income.get("EBITDA", year);
        table.insert(MetricRow::new(
            ticker,
            Some(year),
            Metric::Margins.label(),
            margin(ebitda, revenue),
        ));
    }

    table
}

fn margin(ebitda: Option<f64>, revenue: Option<f64>) -> Option<f64> {
    match (ebitda, revenue) {
        (Some(e), Some(r)) if r != 0.0 => Some(e / r).filter(|m| m.is_finite()),
        _ => None,
    }
}
