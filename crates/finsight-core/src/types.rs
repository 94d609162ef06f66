use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{Period, ReportError, ReportResult};

/// Longest symbol accepted from callers
const MAX_TICKER_LEN: usize = 20;

/// Market identifier used to query the data provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// Trim and upper-case a caller-supplied symbol, rejecting anything that
    /// is not a plain exchange symbol (letters, digits, `.`, `-`, `^`, `=`).
    pub fn parse(raw: &str) -> ReportResult<Self> {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ReportError::InvalidRequest("ticker is empty".to_string()));
        }
        if symbol.len() > MAX_TICKER_LEN
            || !symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
        {
            return Err(ReportError::InvalidRequest(format!("'{}' is not a valid ticker", raw.trim())));
        }
        Ok(Self(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Result of resolving a company name against the provider's search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub display_name: String,
    pub ticker: Option<Ticker>,
}

/// One ranked match from the provider's search endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteMatch {
    pub symbol: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub exchange: Option<String>,
    pub quote_type: Option<String>,
    pub score: Option<f64>,
}

/// Identity of a row within a table; duplicates resolve last-write-wins.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub entity: String,
    pub period: Period,
    pub year: Option<i32>,
    pub metric: String,
}

/// Canonical (entity, year, metric, value) row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Empty until the row is stamped with its source entity
    #[serde(default)]
    pub entity: String,
    #[serde(default)]
    pub period: Period,
    pub year: Option<i32>,
    pub metric: String,
    pub value: Option<f64>,
}

impl MetricRow {
    pub fn new(
        entity: impl Into<String>,
        year: Option<i32>,
        metric: impl Into<String>,
        value: Option<f64>,
    ) -> Self {
        Self {
            entity: entity.into(),
            period: Period::Yearly,
            year,
            metric: metric.into(),
            value: value.filter(|v| v.is_finite()),
        }
    }

    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn is_stamped(&self) -> bool {
        !self.entity.is_empty()
    }

    pub fn key(&self) -> RowKey {
        RowKey {
            entity: self.entity.clone(),
            period: self.period,
            year: self.year,
            metric: self.metric.clone(),
        }
    }

    fn same_key(&self, other: &MetricRow) -> bool {
        self.entity == other.entity
            && self.period == other.period
            && self.year == other.year
            && self.metric == other.metric
    }
}

/// Long-form metric table.
///
/// Row identity is `(entity, period, year, metric)`; inserting a row whose key
/// already exists replaces the earlier value in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<MetricRow>", into = "Vec<MetricRow>")]
pub struct MetricTable {
    rows: Vec<MetricRow>,
}

impl MetricTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row, returning the row it replaced if the key was present.
    pub fn insert(&mut self, mut row: MetricRow) -> Option<MetricRow> {
        row.value = row.value.filter(|v| v.is_finite());
        match self.rows.iter_mut().find(|r| r.same_key(&row)) {
            Some(existing) => Some(std::mem::replace(existing, row)),
            None => {
                self.rows.push(row);
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MetricRow> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<MetricRow> {
        self.rows
    }

    /// Distinct entity names in first-seen order
    pub fn entities(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for row in &self.rows {
            if !seen.contains(&row.entity) {
                seen.push(row.entity.clone());
            }
        }
        seen
    }

    pub fn filter_entity(&self, entity: &str) -> MetricTable {
        self.rows
            .iter()
            .filter(|r| r.entity == entity)
            .cloned()
            .collect()
    }

    /// Value for a yearly (entity, metric, year) cell
    pub fn value(&self, entity: &str, metric: &str, year: i32) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| {
                r.entity == entity
                    && r.metric == metric
                    && r.year == Some(year)
                    && r.period == Period::Yearly
            })
            .and_then(|r| r.value)
    }

    /// Stamp every unstamped row with `entity`.
    pub fn stamped(self, entity: &str) -> MetricTable {
        self.rows
            .into_iter()
            .map(|mut r| {
                if !r.is_stamped() {
                    r.entity = entity.to_string();
                }
                r
            })
            .collect()
    }

    /// Re-stamp every row with `entity`, replacing any existing stamp.
    pub fn with_entity(self, entity: &str) -> MetricTable {
        self.rows
            .into_iter()
            .map(|mut r| {
                r.entity = entity.to_string();
                r
            })
            .collect()
    }

    /// Metric ascending, then year descending (rows without a year last).
    /// Stable, so ties keep their insertion order.
    pub fn sort_for_display(&mut self) {
        self.rows.sort_by(|a, b| {
            a.metric
                .cmp(&b.metric)
                .then_with(|| match (a.year, b.year) {
                    (Some(x), Some(y)) => y.cmp(&x),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
        });
    }

    /// Render yearly rows as per-year records (`[{"year": 2023, "Revenue": 1.0, ...}]`).
    ///
    /// Intended for single-entity tables; rows without a year or with a
    /// non-yearly period are not representable in this shape and are skipped.
    pub fn to_per_year_records(&self) -> Value {
        let mut records: Vec<(i32, Map<String, Value>)> = Vec::new();
        for row in &self.rows {
            let Some(year) = row.year else { continue };
            if row.period != Period::Yearly {
                continue;
            }
            let idx = match records.iter().position(|(y, _)| *y == year) {
                Some(i) => i,
                None => {
                    let mut record = Map::new();
                    record.insert("year".to_string(), Value::from(year));
                    records.push((year, record));
                    records.len() - 1
                }
            };
            let value = row.value.map(Value::from).unwrap_or(Value::Null);
            records[idx].1.insert(row.metric.clone(), value);
        }
        Value::Array(records.into_iter().map(|(_, r)| Value::Object(r)).collect())
    }

    /// Plain-text rendering used inside LLM prompts
    pub fn to_text_table(&self) -> String {
        let mut out = String::from("Company | Period | Year | Metric | Value\n");
        for row in &self.rows {
            let year = row.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string());
            let value = row
                .value
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "n/a".to_string());
            out.push_str(&format!(
                "{} | {} | {} | {} | {}\n",
                row.entity, row.period, year, row.metric, value
            ));
        }
        out
    }
}

impl From<Vec<MetricRow>> for MetricTable {
    fn from(rows: Vec<MetricRow>) -> Self {
        rows.into_iter().collect()
    }
}

impl From<MetricTable> for Vec<MetricRow> {
    fn from(table: MetricTable) -> Self {
        table.rows
    }
}

impl FromIterator<MetricRow> for MetricTable {
    fn from_iter<I: IntoIterator<Item = MetricRow>>(iter: I) -> Self {
        let mut table = MetricTable::new();
        table.extend(iter);
        table
    }
}

impl Extend<MetricRow> for MetricTable {
    fn extend<I: IntoIterator<Item = MetricRow>>(&mut self, iter: I) {
        for row in iter {
            self.insert(row);
        }
    }
}

impl IntoIterator for MetricTable {
    type Item = MetricRow;
    type IntoIter = std::vec::IntoIter<MetricRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a MetricTable {
    type Item = &'a MetricRow;
    type IntoIter = std::slice::Iter<'a, MetricRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Statement a provider line item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    Income,
    BalanceSheet,
    CashFlow,
}

/// Line items of one statement, indexed by provider label then fiscal year
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    pub line_items: BTreeMap<String, BTreeMap<i32, f64>>,
}

impl StatementTable {
    pub fn insert(&mut self, label: impl Into<String>, year: i32, value: f64) {
        self.line_items
            .entry(label.into())
            .or_default()
            .insert(year, value);
    }

    /// Exact-label lookup
    pub fn get(&self, label: &str, year: i32) -> Option<f64> {
        self.line_items.get(label).and_then(|by_year| by_year.get(&year).copied())
    }

    pub fn years(&self) -> BTreeSet<i32> {
        self.line_items
            .values()
            .flat_map(|by_year| by_year.keys().copied())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.line_items.values().all(|by_year| by_year.is_empty())
    }
}

/// Annual statements returned by the market-data provider for one ticker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatements {
    pub ticker: String,
    pub income: StatementTable,
    pub balance_sheet: StatementTable,
    pub cash_flow: StatementTable,
}

impl FinancialStatements {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Default::default()
        }
    }

    pub fn statement(&self, kind: StatementKind) -> &StatementTable {
        match kind {
            StatementKind::Income => &self.income,
            StatementKind::BalanceSheet => &self.balance_sheet,
            StatementKind::CashFlow => &self.cash_flow,
        }
    }

    pub fn statement_mut(&mut self, kind: StatementKind) -> &mut StatementTable {
        match kind {
            StatementKind::Income => &mut self.income,
            StatementKind::BalanceSheet => &mut self.balance_sheet,
            StatementKind::CashFlow => &mut self.cash_flow,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.income.is_empty() && self.balance_sheet.is_empty() && self.cash_flow.is_empty()
    }

    /// Fiscal years reported by any statement, most recent first
    pub fn available_years(&self) -> Vec<i32> {
        let mut years: BTreeSet<i32> = self.income.years();
        years.extend(self.balance_sheet.years());
        years.extend(self.cash_flow.years());
        years.into_iter().rev().collect()
    }
}
