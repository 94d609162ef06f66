pub mod comparison;
pub mod export;
pub mod fetcher;
pub mod normalizer;
pub mod resolver;
pub mod series;

#[cfg(test)]
mod testing;

pub use comparison::{build_comparison, Comparison, EntityGroup};
pub use export::{
    render_pdf_report, render_text_report, to_csv, ExportError, ReportExport, ReportSection,
};
pub use fetcher::{shape_statements, MetricFetcher, DEFAULT_YEARS};
pub use normalizer::{normalize, RawMetrics};
pub use resolver::{EntityResolver, ResolveError};
pub use series::{chart_series, EntitySeries, MetricSeries, SeriesPoint};
