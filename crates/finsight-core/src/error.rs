use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReportError {
    /// Unparseable LLM output, unreadable document, or empty extracted text
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Market-data provider unreachable or returned no statements
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// No ticker could be found for a company name
    #[error("No ticker found for '{0}'")]
    ResolutionFailure(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type ReportResult<T> = Result<T, ReportError>;
