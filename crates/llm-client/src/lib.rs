pub mod assistant;
pub mod error;
pub mod gemini;
pub mod json;
pub mod openai;
pub mod prompts;

pub use assistant::ReportAssistant;
pub use error::{LlmError, LlmResult};
pub use gemini::GeminiClient;
pub use json::{extract_json_block, parse_json_response, strip_code_fences};
pub use openai::OpenAiClient;

use finsight_core::CompletionService;
use std::sync::Arc;
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Which completion API to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
    /// Any OpenAI-compatible `/chat/completions` endpoint
    OpenAi,
}

impl LlmBackend {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(LlmBackend::Gemini),
            "openai" | "openai-compatible" => Some(LlmBackend::OpenAi),
            _ => None,
        }
    }
}

/// Configuration for the LLM completion service
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let backend = std::env::var("LLM_PROVIDER")
            .ok()
            .and_then(|v| LlmBackend::from_name(&v))
            .unwrap_or(LlmBackend::Gemini);

        let (api_key, base_url, model) = match backend {
            LlmBackend::Gemini => (
                std::env::var("GEMINI_API_KEY").ok(),
                std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| GEMINI_BASE_URL.to_string()),
                std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            ),
            LlmBackend::OpenAi => (
                std::env::var("OPENAI_API_KEY").ok(),
                std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| OPENAI_BASE_URL.to_string()),
                std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            ),
        };

        Self {
            backend,
            api_key,
            base_url,
            model,
            temperature: 0.2,
            max_tokens: 2048,
            timeout: Duration::from_secs(
                std::env::var("LLM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

/// Construct the configured completion service.
pub fn build_completion_service(config: &LlmConfig) -> LlmResult<Arc<dyn CompletionService>> {
    let service: Arc<dyn CompletionService> = match config.backend {
        LlmBackend::Gemini => Arc::new(GeminiClient::new(config)?),
        LlmBackend::OpenAi => Arc::new(OpenAiClient::new(config)?),
    };
    tracing::info!("LLM backend: {} (model {})", service.backend_name(), config.model);
    Ok(service)
}
