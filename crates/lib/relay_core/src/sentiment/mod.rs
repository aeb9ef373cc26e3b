//! Sentiment analysis — per-message scoring and polarity buckets.
//!
//! # Public API
//!
//! - [`SentimentAnalyzer`] — the seam handlers depend on
//! - [`Polarity::from_score`] — fixed-threshold classification
//! - [`summary`] — bounded batch analysis and percentage summary
//! - [`language::NaturalLanguageClient`] — Cloud Natural Language implementation

pub mod language;
pub mod summary;

use async_trait::async_trait;
use thiserror::Error;

use crate::credentials::CredentialError;

/// Scores strictly above this are positive.
pub const POSITIVE_THRESHOLD: f64 = 0.1;

/// Scores strictly below this are negative.
pub const NEGATIVE_THRESHOLD: f64 = -0.1;

/// Errors that can occur while scoring a message.
#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("Sentiment request failed: {0}")]
    Request(String),

    #[error("Sentiment API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Sentiment response parse error: {0}")]
    Parse(String),
}

/// One of three mutually exclusive sentiment buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Positive,
    Negative,
    Neutral,
}

impl Polarity {
    pub fn from_score(score: f64) -> Self {
        if score > POSITIVE_THRESHOLD {
            Polarity::Positive
        } else if score < NEGATIVE_THRESHOLD {
            Polarity::Negative
        } else {
            Polarity::Neutral
        }
    }
}

/// Scores a plain-text document in `[-1.0, 1.0]`.
#[async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    async fn score(&self, text: &str) -> Result<f64, SentimentError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_scores_classify_by_sign() {
        assert_eq!(Polarity::from_score(0.8), Polarity::Positive);
        assert_eq!(Polarity::from_score(-0.7), Polarity::Negative);
        assert_eq!(Polarity::from_score(1.0), Polarity::Positive);
        assert_eq!(Polarity::from_score(-1.0), Polarity::Negative);
    }

    #[test]
    fn thresholds_are_strict() {
        assert_eq!(Polarity::from_score(0.1), Polarity::Neutral);
        assert_eq!(Polarity::from_score(-0.1), Polarity::Neutral);
        assert_eq!(Polarity::from_score(0.0), Polarity::Neutral);
    }

    #[test]
    fn just_past_thresholds() {
        assert_eq!(Polarity::from_score(0.100_001), Polarity::Positive);
        assert_eq!(Polarity::from_score(-0.100_001), Polarity::Negative);
    }
}
