use finsight_core::MetricTable;
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),
}

impl From<printpdf::Error> for ExportError {
    fn from(e: printpdf::Error) -> Self {
        ExportError::Pdf(e.to_string())
    }
}

pub const CSV_HEADER: [&str; 5] = ["entity", "period", "year", "metric", "value"];

/// Table as CSV with an `entity,period,year,metric,value` header. Absent cells are empty.
pub fn to_csv(table: &MetricTable) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for row in table {
        writer.write_record([
            row.entity.clone(),
            row.period.to_string(),
            row.year.map(|y| y.to_string()).unwrap_or_default(),
            row.metric.clone(),
            row.value.map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub heading: String,
    pub body: String,
}

/// Content of a downloadable report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportExport {
    pub title: String,
    #[serde(default)]
    pub sections: Vec<ReportSection>,
    #[serde(default)]
    pub metrics: MetricTable,
}

/// Render a report as plain text: title, each non-empty section, then the metric table.
pub fn render_text_report(report: &ReportExport) -> String {
    let mut out = String::new();
    let title = report.title.trim();
    out.push_str(title);
    out.push('\n');
    out.push_str(&"=".repeat(title.chars().count()));
    out.push_str("\n\n");

    for section in report.sections.iter().filter(|s| !s.body.trim().is_empty()) {
        out.push_str(section.heading.trim());
        out.push('\n');
        out.push_str(&"-".repeat(section.heading.trim().chars().count()));
        out.push('\n');
        out.push_str(section.body.trim());
        out.push_str("\n\n");
    }

    if !report.metrics.is_empty() {
        let mut metrics = report.metrics.clone();
        metrics.sort_for_display();
        out.push_str("Financial Metrics\n-----------------\n");
        out.push_str(&render_aligned(&metrics));
    }

    out
}

fn render_aligned(table: &MetricTable) -> String {
    let header = ["Company", "Period", "Year", "Metric", "Value"].map(String::from);
    let mut lines: Vec<[String; 5]> = vec![header];
    for row in table {
        lines.push([
            row.entity.clone(),
            row.period.to_string(),
            row.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string()),
            row.metric.clone(),
            row.value
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "n/a".to_string()),
        ]);
    }

    let mut widths = [0usize; 5];
    for line in &lines {
        for (w, cell) in widths.iter_mut().zip(line.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for line in &lines {
        let cells: Vec<String> = line
            .iter()
            .zip(widths.iter())
            .enumerate()
            .map(|(i, (cell, w))| {
                // right-align the value column
                if i == 4 {
                    format!("{:>width$}", cell, width = *w)
                } else {
                    format!("{:<width$}", cell, width = *w)
                }
            })
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}

// A4, millimetres
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const PT_TO_MM: f32 = 0.3528;

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 13.0;
const BODY_SIZE: f32 = 11.0;
const TABLE_SIZE: f32 = 8.0;

/// Characters per line that fit the text column at each size
const BODY_WRAP: usize = 85;
const TABLE_WRAP: usize = 100;

#[derive(Clone, Copy)]
enum Face {
    Regular,
    Bold,
    Mono,
}

/// Line-by-line writer over A4 pages using the built-in PDF fonts
struct PdfPages {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    cursor: f32,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    mono: IndirectFontRef,
}

impl PdfPages {
    fn new(title: &str) -> Result<Self, ExportError> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let mono = doc.add_builtin_font(BuiltinFont::Courier)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            cursor: PAGE_HEIGHT - MARGIN,
            regular,
            bold,
            mono,
        })
    }

    fn line(&mut self, text: &str, size: f32, face: Face) {
        let height = size * PT_TO_MM * 1.4;
        if self.cursor - height < MARGIN {
            let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.cursor = PAGE_HEIGHT - MARGIN;
        }
        self.cursor -= height;

        let font = match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Mono => &self.mono,
        };
        self.layer
            .use_text(printable(text), size, Mm(MARGIN), Mm(self.cursor), font);
    }

    fn gap(&mut self, size: f32) {
        self.cursor -= size * PT_TO_MM;
    }

    fn finish(self) -> Result<Vec<u8>, ExportError> {
        Ok(self.doc.save_to_bytes()?)
    }
}

/// Render a report as a PDF document with the same content as the text export.
pub fn render_pdf_report(report: &ReportExport) -> Result<Vec<u8>, ExportError> {
    let title = report.title.trim();
    let mut pages = PdfPages::new(title)?;

    for line in wrap(title, BODY_WRAP / 2) {
        pages.line(&line, TITLE_SIZE, Face::Bold);
    }
    pages.gap(TITLE_SIZE);

    for section in report.sections.iter().filter(|s| !s.body.trim().is_empty()) {
        pages.line(section.heading.trim(), HEADING_SIZE, Face::Bold);
        for line in wrap(section.body.trim(), BODY_WRAP) {
            pages.line(&line, BODY_SIZE, Face::Regular);
        }
        pages.gap(BODY_SIZE);
    }

    if !report.metrics.is_empty() {
        let mut metrics = report.metrics.clone();
        metrics.sort_for_display();
        pages.line("Financial Metrics", HEADING_SIZE, Face::Bold);
        for line in render_aligned(&metrics).lines() {
            let clipped: String = line.chars().take(TABLE_WRAP).collect();
            pages.line(&clipped, TABLE_SIZE, Face::Mono);
        }
    }

    let bytes = pages.finish()?;
    tracing::debug!("Rendered PDF report '{}' ({} bytes)", title, bytes.len());
    Ok(bytes)
}

/// Greedy word wrap. Paragraph breaks are kept as empty lines.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let needed = if current.is_empty() { 0 } else { 1 } + word.chars().count();
            if !current.is_empty() && current.chars().count() + needed > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    lines
}

/// The built-in fonts only cover ASCII reliably.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}
