//! Prompt templates for the report pipeline.

use finsight_core::Metric;

/// Characters of report text shown to the model when naming the company
pub const COMPANY_NAME_CHARS: usize = 2000;
/// Characters of document text shown to the model when summarizing
pub const SUMMARY_CHARS: usize = 3000;
/// Upper bound on report text sent for metric extraction
pub const METRICS_CHARS: usize = 30_000;
/// Upper bound on transcript text sent for sentiment counting
pub const SENTIMENT_CHARS: usize = 12_000;

/// First `max_chars` characters of `text`, never splitting a UTF-8 sequence.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn company_name(text: &str) -> String {
    format!(
        "Extract the company name from the following financial report. \
         Reply with the company name only.\n\n{}",
        truncate_chars(text, COMPANY_NAME_CHARS)
    )
}

/// Per-year metric extraction; the reply is decoded as per-year records.
pub fn key_metrics(text: &str) -> String {
    let fields = Metric::reported()
        .map(|m| format!("      \"{}\": number", m.label()))
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "Extract financial data for every fiscal year reported in this text and return only JSON.\n\
         Use plain numbers without currency symbols; use null when a value is not reported.\n\n\
         {}\n\n\
         Return JSON in this exact format (no extra text), one object per year, most recent first:\n\
         {{\n  \"financials\": [\n    {{\n      \"year\": 2023,\n{}\n    }}\n  ]\n}}",
        truncate_chars(text, METRICS_CHARS),
        fields
    )
}

pub fn summarize_text(text: &str, context: &str) -> String {
    format!(
        "Summarize the following {} in a concise and structured format.\n\
         Highlight the key insights, trends, and important points.\n\n\
         Text:\n{}",
        context,
        truncate_chars(text, SUMMARY_CHARS)
    )
}

pub fn summarize_metrics(table: &str) -> String {
    format!(
        "Given the following key financial metrics, provide a very concise summary (within 3-5 sentences).\n\
         Highlight revenue trends, profitability, cash flow performance and other significant insights briefly.\n\n\
         Financial Data:\n{}",
        table
    )
}

pub fn compare(main_table: &str, competitor_table: &str) -> String {
    format!(
        "Compare the financial performance of the main company with its competitor(s) based on the given metrics.\n\
         Identify strengths, weaknesses, and competitive advantages.\n\n\
         Main Company Metrics:\n{}\n\n\
         Competitor Metrics:\n{}",
        main_table, competitor_table
    )
}

/// Sentence-level sentiment counts in a fixed three-line reply format.
pub fn sentiment_counts(text: &str) -> String {
    format!(
        "Analyze the sentiment of the following text and return the counts for positive, \
         neutral, and negative sentiments.\n\n\
         Text: {}\n\n\
         Format your response as:\nPositive: X\nNeutral: Y\nNegative: Z",
        truncate_chars(text, SENTIMENT_CHARS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_company_name_prompt_is_truncated() {
        let text = "#".repeat(5000);
        let prompt = company_name(&text);
        assert_eq!(prompt.matches('#').count(), COMPANY_NAME_CHARS);
    }

    #[test]
    fn test_key_metrics_lists_reported_metrics() {
        let prompt = key_metrics("Revenue was 10m");
        assert!(prompt.contains("\"financials\""));
        assert!(prompt.contains("\"Net Profit\": number"));
        assert!(prompt.contains("\"Financing Cash Flow\": number"));
        assert!(!prompt.contains("Margins"));
    }

    #[test]
    fn test_summary_prompt_carries_context() {
        let prompt = summarize_text("Q3 went well", "earnings call transcript");
        assert!(prompt.contains("Summarize the following earnings call transcript"));
        assert!(prompt.ends_with("Q3 went well"));
    }
}
