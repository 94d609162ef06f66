use finsight_core::ReportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model returned no text")]
    EmptyCompletion,

    #[error("Missing API key: {0} is not set")]
    MissingApiKey(&'static str),
}

pub type LlmResult<T> = Result<T, LlmError>;

impl From<reqwest::Error> for LlmError {
    /// Strips the request URL, which may carry credentials.
    fn from(e: reqwest::Error) -> Self {
        LlmError::RequestFailed(e.without_url())
    }
}

impl From<LlmError> for ReportError {
    fn from(e: LlmError) -> Self {
        ReportError::Llm(e.to_string())
    }
}
