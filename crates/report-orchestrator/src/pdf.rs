use finsight_core::{ReportError, TextExtractor};

/// PDF text extraction backed by `pdf-extract`
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl TextExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf: &[u8]) -> Result<String, ReportError> {
        if pdf.is_empty() {
            return Err(ReportError::MalformedInput("empty document".to_string()));
        }
        // pdf-extract panics on some malformed documents
        let result = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(pdf))
            .map_err(|_| ReportError::MalformedInput("PDF could not be parsed".to_string()))?;

        result.map_err(|e| ReportError::MalformedInput(format!("failed to extract text from PDF: {}", e)))
    }
}
