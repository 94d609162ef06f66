use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical metric vocabulary shared by every table in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    Revenue,
    Ebitda,
    NetProfit,
    TotalAssets,
    TotalLiabilities,
    Equity,
    OperatingCashFlow,
    InvestingCashFlow,
    FinancingCashFlow,
    Margins,
}

/// Provider- and prompt-specific spellings mapped onto the canonical labels.
/// Keys are lowercase with single spaces.
const ALIASES: &[(&str, Metric)] = &[
    ("revenue", Metric::Revenue),
    ("revenues", Metric::Revenue),
    ("total revenue", Metric::Revenue),
    ("sales", Metric::Revenue),
    ("net sales", Metric::Revenue),
    ("ebitda", Metric::Ebitda),
    ("net profit", Metric::NetProfit),
    ("net income", Metric::NetProfit),
    ("profit after tax", Metric::NetProfit),
    ("total assets", Metric::TotalAssets),
    ("assets", Metric::TotalAssets),
    ("total liabilities", Metric::TotalLiabilities),
    ("liabilities", Metric::TotalLiabilities),
    ("total liabilities net minority interest", Metric::TotalLiabilities),
    ("equity", Metric::Equity),
    ("total equity", Metric::Equity),
    ("shareholders equity", Metric::Equity),
    ("shareholders' equity", Metric::Equity),
    ("stockholders equity", Metric::Equity),
    ("operating cash flow", Metric::OperatingCashFlow),
    ("cash flow from operations", Metric::OperatingCashFlow),
    ("investing cash flow", Metric::InvestingCashFlow),
    ("cash flow from investing", Metric::InvestingCashFlow),
    ("financing cash flow", Metric::FinancingCashFlow),
    ("cash flow from financing", Metric::FinancingCashFlow),
    ("margins", Metric::Margins),
    ("margin", Metric::Margins),
    ("ebitda margin", Metric::Margins),
];

impl Metric {
    pub const ALL: [Metric; 10] = [
        Metric::Revenue,
        Metric::Ebitda,
        Metric::NetProfit,
        Metric::TotalAssets,
        Metric::TotalLiabilities,
        Metric::Equity,
        Metric::OperatingCashFlow,
        Metric::InvestingCashFlow,
        Metric::FinancingCashFlow,
        Metric::Margins,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Revenue => "Revenue",
            Metric::Ebitda => "EBITDA",
            Metric::NetProfit => "Net Profit",
            Metric::TotalAssets => "Total Assets",
            Metric::TotalLiabilities => "Total Liabilities",
            Metric::Equity => "Equity",
            Metric::OperatingCashFlow => "Operating Cash Flow",
            Metric::InvestingCashFlow => "Investing Cash Flow",
            Metric::FinancingCashFlow => "Financing Cash Flow",
            Metric::Margins => "Margins",
        }
    }

    /// Look up a label through the alias table (case- and spacing-insensitive).
    pub fn from_label(label: &str) -> Option<Metric> {
        let key = label
            .split(|c: char| c.is_whitespace() || c == '_')
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();

        ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, metric)| *metric)
    }

    /// Metrics a financial report is expected to state directly.
    /// Margins is derived, so it is left out of extraction prompts.
    pub fn reported() -> impl Iterator<Item = Metric> {
        Self::ALL.into_iter().filter(|m| *m != Metric::Margins)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Canonical label for a raw metric name.
///
/// Known spellings map onto the canonical vocabulary; other non-empty labels
/// are kept verbatim (trimmed). Returns `None` for blank labels.
pub fn canonical_metric_label(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        Metric::from_label(trimmed)
            .map(|m| m.label().to_string())
            .unwrap_or_else(|| trimmed.to_string()),
    )
}

/// Period type of a metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Yearly,
    Quarterly { quarter: Option<u8> },
    Total,
}

impl Period {
    /// Parse a period-type key such as "Yearly", "Annual", "Quarterly" or "Total".
    pub fn from_label(label: &str) -> Option<Period> {
        match label.trim().to_lowercase().as_str() {
            "yearly" | "annual" | "annually" | "year" | "fy" => Some(Period::Yearly),
            "quarterly" | "quarter" | "qtr" => Some(Period::Quarterly { quarter: None }),
            "total" | "overall" => Some(Period::Total),
            _ => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Yearly => f.write_str("Yearly"),
            Period::Quarterly { quarter: Some(q) } => write!(f, "Q{}", q),
            Period::Quarterly { quarter: None } => f.write_str("Quarterly"),
            Period::Total => f.write_str("Total"),
        }
    }
}
