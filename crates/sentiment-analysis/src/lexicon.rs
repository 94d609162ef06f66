use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without",
];

const NEGATION_WINDOW: usize = 3;

const POSITIVE_WORDS: &[&str] = &[
    "growth", "grew", "gain", "gains", "profit", "profitable", "beat", "strong",
    "stronger", "positive", "rise", "increase", "increased", "improve", "improved",
    "improvement", "record", "success", "successful", "exceed", "exceeded", "momentum",
    "optimistic", "confident", "pleased", "robust", "resilient", "expansion",
    "accelerating", "upside", "tailwind", "tailwinds", "outperform", "outperformed",
    "dividend", "buyback", "repurchase", "recovery", "rebound", "healthy", "excellent",
    "opportunity", "opportunities", "raised", "efficient", "innovation",
];

const NEGATIVE_WORDS: &[&str] = &[
    "decline", "declined", "loss", "losses", "fall", "fell", "drop", "dropped",
    "decrease", "decreased", "weak", "weaker", "weakness", "negative", "miss",
    "missed", "concern", "concerns", "risk", "risks", "challenging", "challenges",
    "difficult", "disappoint", "disappointing", "slowdown", "slump", "pressure",
    "pressures", "headwind", "headwinds", "uncertainty", "volatile", "impairment",
    "writedown", "lawsuit", "litigation", "investigation", "default", "restructuring",
    "layoff", "layoffs", "downside", "lowered", "suspended", "shortfall",
];

/// Three-way sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Positive,
    Neutral,
    Negative,
}

impl Polarity {
    pub fn from_score(score: f64) -> Self {
        if score > 0.0 {
            Polarity::Positive
        } else if score < 0.0 {
            Polarity::Negative
        } else {
            Polarity::Neutral
        }
    }
}

/// Word-list polarity scorer with a short negation window
pub struct LexiconScorer {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    negation: HashSet<&'static str>,
}

impl LexiconScorer {
    pub fn new() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            negation: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    /// Polarity in `[-1, 1]`: net sentiment hits over total hits, 0 when nothing matches.
    pub fn polarity(&self, text: &str) -> f64 {
        let text_lower = text.to_lowercase();
        let words: Vec<&str> = text_lower
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | '!' | '?' | ':' | '(' | ')' | '"'))
            .filter(|w| !w.is_empty())
            .collect();

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| self.negation.contains(*w))
            .map(|(i, _)| i)
            .collect();

        let mut score: i64 = 0;
        let mut hits: i64 = 0;

        for (i, word) in words.iter().enumerate() {
            let is_positive = self.positive.contains(*word);
            let is_negative = self.negative.contains(*word);
            if !is_positive && !is_negative {
                continue;
            }

            let negated = negation_positions
                .iter()
                .any(|&neg_pos| neg_pos < i && (i - neg_pos) <= NEGATION_WINDOW);

            let sign = if is_positive { 1 } else { -1 };
            score += if negated { -sign } else { sign };
            hits += 1;
        }

        if hits == 0 {
            0.0
        } else {
            score as f64 / hits as f64
        }
    }

    pub fn classify(&self, text: &str) -> Polarity {
        Polarity::from_score(self.polarity(text))
    }
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}
