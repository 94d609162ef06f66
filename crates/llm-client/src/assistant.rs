use finsight_core::{CompletionService, MetricTable, ReportError, ReportResult};
use serde_json::Value;
use std::sync::Arc;

use crate::json::parse_json_response;
use crate::prompts;

pub const NO_METRICS_SUMMARY: &str = "No financial metrics available.";

/// Report-level LLM tasks layered over a completion service
#[derive(Clone)]
pub struct ReportAssistant {
    llm: Arc<dyn CompletionService>,
}

impl ReportAssistant {
    pub fn new(llm: Arc<dyn CompletionService>) -> Self {
        Self { llm }
    }

    pub fn backend_name(&self) -> &'static str {
        self.llm.backend_name()
    }

    /// Company name stated in the report
    pub async fn extract_company_name(&self, text: &str) -> ReportResult<String> {
        let reply = self.llm.complete(&prompts::company_name(text)).await?;
        let name = reply
            .lines()
            .map(|l| l.trim().trim_matches(|c| c == '"' || c == '*' || c == '\'').trim())
            .find(|l| !l.is_empty())
            .unwrap_or_default();

        if name.is_empty() {
            return Err(ReportError::MalformedInput(
                "model returned no company name".to_string(),
            ));
        }
        Ok(name.to_string())
    }

    /// Raw metric JSON extracted from the report text
    pub async fn extract_key_metrics(&self, text: &str) -> ReportResult<Value> {
        let reply = self.llm.complete(&prompts::key_metrics(text)).await?;
        tracing::debug!("metric extraction reply: {} chars", reply.len());
        parse_json_response(&reply)
    }

    pub async fn summarize_text(&self, text: &str, context: &str) -> ReportResult<String> {
        let reply = self.llm.complete(&prompts::summarize_text(text, context)).await?;
        Ok(reply.trim().to_string())
    }

    pub async fn summarize_metrics(&self, table: &MetricTable) -> ReportResult<String> {
        if table.is_empty() {
            return Ok(NO_METRICS_SUMMARY.to_string());
        }
        let reply = self
            .llm
            .complete(&prompts::summarize_metrics(&table.to_text_table()))
            .await?;
        Ok(reply.trim().to_string())
    }

    pub async fn summarize_comparison(
        &self,
        main: &MetricTable,
        competitors: &MetricTable,
    ) -> ReportResult<String> {
        let reply = self
            .llm
            .complete(&prompts::compare(&main.to_text_table(), &competitors.to_text_table()))
            .await?;
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use finsight_core::MetricRow;
    use std::sync::Mutex;

    /// Replies with a fixed string and records every prompt
    struct CannedLlm {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedLlm {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionService for CannedLlm {
        async fn complete(&self, prompt: &str) -> Result<String, ReportError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn backend_name(&self) -> &'static str {
            "canned"
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl CompletionService for FailingLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, ReportError> {
            Err(ReportError::Llm("quota exceeded".to_string()))
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_company_name_is_cleaned() {
        let llm = CannedLlm::new("\n**\"Acme Holdings plc\"**\nExtra commentary");
        let assistant = ReportAssistant::new(llm);
        let name = assistant.extract_company_name("Annual report").await.unwrap();
        assert_eq!(name, "Acme Holdings plc");
    }

    #[tokio::test]
    async fn test_blank_company_name_is_malformed() {
        let assistant = ReportAssistant::new(CannedLlm::new("  \n **  \n"));
        assert!(matches!(
            assistant.extract_company_name("text").await,
            Err(ReportError::MalformedInput(_))
        ));
    }

    #[tokio::test]
    async fn test_key_metrics_parses_fenced_reply() {
        let llm = CannedLlm::new(
            "```json\n{\"financials\": [{\"year\": 2023, \"Revenue\": 100}]}\n```",
        );
        let assistant = ReportAssistant::new(llm);
        let value = assistant.extract_key_metrics("report").await.unwrap();
        assert_eq!(value["financials"][0]["Revenue"], 100);
    }

    #[tokio::test]
    async fn test_key_metrics_without_json_is_malformed() {
        let assistant = ReportAssistant::new(CannedLlm::new("No figures found."));
        assert!(matches!(
            assistant.extract_key_metrics("report").await,
            Err(ReportError::MalformedInput(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_metrics_summary_skips_llm() {
        let llm = CannedLlm::new("should not be used");
        let assistant = ReportAssistant::new(llm.clone());
        let summary = assistant.summarize_metrics(&MetricTable::new()).await.unwrap();
        assert_eq!(summary, NO_METRICS_SUMMARY);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_metrics_summary_sends_table() {
        let llm = CannedLlm::new("  Revenue grew.  ");
        let assistant = ReportAssistant::new(llm.clone());
        let table: MetricTable = vec![MetricRow::new("Acme", Some(2023), "Revenue", Some(12.5))].into();

        let summary = assistant.summarize_metrics(&table).await.unwrap();
        assert_eq!(summary, "Revenue grew.");
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Acme | Yearly | 2023 | Revenue | 12.50"));
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let assistant = ReportAssistant::new(Arc::new(FailingLlm));
        assert!(matches!(
            assistant.summarize_text("text", "financial report").await,
            Err(ReportError::Llm(_))
        ));
    }
}
