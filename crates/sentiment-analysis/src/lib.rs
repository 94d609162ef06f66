use finsight_core::{CompletionService, ReportResult};
use llm_client::prompts;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod lexicon;
pub use lexicon::{LexiconScorer, Polarity};

/// Positive / neutral / negative counts as reported by the LLM
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

impl SentimentCounts {
    /// Parse `Positive: X` / `Neutral: Y` / `Negative: Z` lines.
    ///
    /// Markdown emphasis is ignored; lines that do not carry a count are skipped,
    /// so an unusable reply yields all zeros.
    pub fn parse(reply: &str) -> Self {
        let mut counts = SentimentCounts::default();
        for line in reply.lines() {
            let cleaned: String = line
                .chars()
                .filter(|c| !matches!(c, '*' | '_' | '#' | '-'))
                .collect::<String>()
                .trim()
                .to_lowercase();

            let Some((label, rest)) = cleaned.split_once(':') else {
                continue;
            };
            let Some(count) = leading_integer(rest) else {
                continue;
            };

            match label.trim() {
                "positive" => counts.positive = count,
                "neutral" => counts.neutral = count,
                "negative" => counts.negative = count,
                _ => {}
            }
        }
        counts
    }

    fn fractions(&self) -> [f64; 3] {
        let total = self.positive as f64 + self.neutral as f64 + self.negative as f64;
        // an all-zero reply contributes nothing rather than dividing by zero
        let total = if total == 0.0 { 1.0 } else { total };
        [
            self.positive as f64 / total,
            self.neutral as f64 / total,
            self.negative as f64 / total,
        ]
    }
}

fn leading_integer(text: &str) -> Option<u32> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Ensemble sentiment in percent, each rounded to two decimals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl SentimentBreakdown {
    /// Average the normalized LLM counts with the one-hot lexicon label.
    pub fn ensemble(llm: SentimentCounts, lexicon: Polarity) -> Self {
        let llm = llm.fractions();
        let lex = match lexicon {
            Polarity::Positive => [1.0, 0.0, 0.0],
            Polarity::Neutral => [0.0, 1.0, 0.0],
            Polarity::Negative => [0.0, 0.0, 1.0],
        };
        let pct = |i: usize| round2((llm[i] + lex[i]) / 2.0 * 100.0);
        Self {
            positive: pct(0),
            neutral: pct(1),
            negative: pct(2),
        }
    }

    pub fn dominant(&self) -> Polarity {
        if self.positive >= self.neutral && self.positive >= self.negative {
            Polarity::Positive
        } else if self.negative >= self.neutral {
            Polarity::Negative
        } else {
            Polarity::Neutral
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSentiment {
    pub llm_counts: SentimentCounts,
    pub lexicon_polarity: f64,
    pub lexicon_label: Polarity,
    pub ensemble: SentimentBreakdown,
}

/// Ensemble sentiment over earnings-call transcripts
pub struct TranscriptSentimentAnalyzer {
    llm: Arc<dyn CompletionService>,
    lexicon: LexiconScorer,
}

impl TranscriptSentimentAnalyzer {
    pub fn new(llm: Arc<dyn CompletionService>) -> Self {
        Self {
            llm,
            lexicon: LexiconScorer::new(),
        }
    }

    pub async fn analyze(&self, text: &str) -> ReportResult<TranscriptSentiment> {
        let reply = self.llm.complete(&prompts::sentiment_counts(text)).await?;
        let llm_counts = SentimentCounts::parse(&reply);
        if llm_counts == SentimentCounts::default() {
            tracing::warn!("LLM sentiment reply carried no counts; using lexicon only");
        }

        let lexicon_polarity = self.lexicon.polarity(text);
        let lexicon_label = Polarity::from_score(lexicon_polarity);
        let ensemble = SentimentBreakdown::ensemble(llm_counts, lexicon_label);

        tracing::info!(
            "Transcript sentiment: {:.2}% positive, {:.2}% neutral, {:.2}% negative",
            ensemble.positive,
            ensemble.neutral,
            ensemble.negative
        );

        Ok(TranscriptSentiment {
            llm_counts,
            lexicon_polarity,
            lexicon_label,
            ensemble,
        })
    }
}
