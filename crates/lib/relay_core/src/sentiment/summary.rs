//! Batch analysis and percentage summary.
//!
//! Messages are scored with at most `concurrency` requests in flight; results
//! are consumed in input order.

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::warn;

use super::{Polarity, SentimentAnalyzer, SentimentError};

/// Bucket counts for a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentTally {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentTally {
    pub fn record(&mut self, polarity: Polarity) {
        match polarity {
            Polarity::Positive => self.positive += 1,
            Polarity::Negative => self.negative += 1,
            Polarity::Neutral => self.neutral += 1,
        }
    }

    /// Number of classified messages.
    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }

    pub fn positive_percentage(&self) -> String {
        format_percentage(self.positive, self.total())
    }

    pub fn negative_percentage(&self) -> String {
        format_percentage(self.negative, self.total())
    }

    pub fn neutral_percentage(&self) -> String {
        format_percentage(self.neutral, self.total())
    }
}

impl FromIterator<Polarity> for SentimentTally {
    fn from_iter<I: IntoIterator<Item = Polarity>>(iter: I) -> Self {
        let mut tally = Self::default();
        for polarity in iter {
            tally.record(polarity);
        }
        tally
    }
}

/// `count / total * 100` with two decimals; `"0.00"` when `total` is zero.
pub fn format_percentage(count: usize, total: usize) -> String {
    if total == 0 {
        return "0.00".to_string();
    }
    format!("{:.2}", count as f64 / total as f64 * 100.0)
}

/// A message that could not be scored.
#[derive(Debug)]
pub struct MessageFailure {
    /// Position in the input batch.
    pub index: usize,
    pub error: SentimentError,
}

/// Outcome of a batch analysed with per-message error capture.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub tally: SentimentTally,
    pub failures: Vec<MessageFailure>,
}

impl BatchOutcome {
    pub fn analyzed(&self) -> usize {
        self.tally.total()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

// The futures are built up front: a `.map` closure over borrowed messages
// makes the stream's future higher-ranked, which axum handlers cannot hold.
fn score_all<'a>(
    analyzer: &'a dyn SentimentAnalyzer,
    messages: &'a [String],
) -> Vec<BoxFuture<'a, Result<f64, SentimentError>>> {
    messages.iter().map(|text| analyzer.score(text)).collect()
}

/// Score every message, recording failures instead of aborting.
pub async fn analyze_batch(
    analyzer: &dyn SentimentAnalyzer,
    messages: &[String],
    concurrency: usize,
) -> BatchOutcome {
    let results: Vec<Result<f64, SentimentError>> = stream::iter(score_all(analyzer, messages))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut outcome = BatchOutcome::default();
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(score) => outcome.tally.record(Polarity::from_score(score)),
            Err(error) => {
                warn!(index, error = %error, "sentiment analysis failed for message");
                outcome.failures.push(MessageFailure { index, error });
            }
        }
    }
    outcome
}

/// Score every message; the first failure aborts the whole batch.
pub async fn analyze_batch_strict(
    analyzer: &dyn SentimentAnalyzer,
    messages: &[String],
    concurrency: usize,
) -> Result<SentimentTally, SentimentError> {
    let polarities: Vec<Polarity> = stream::iter(score_all(analyzer, messages))
        .buffered(concurrency.max(1))
        .map_ok(Polarity::from_score)
        .try_collect()
        .await?;

    Ok(polarities.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// Returns canned scores; texts without a score fail.
    struct CannedAnalyzer {
        scores: HashMap<String, f64>,
        calls: AtomicUsize,
    }

    impl CannedAnalyzer {
        fn new(pairs: &[(&str, f64)]) -> Self {
            Self {
                scores: pairs.iter().map(|(t, s)| (t.to_string(), *s)).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SentimentAnalyzer for CannedAnalyzer {
        async fn score(&self, text: &str) -> Result<f64, SentimentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.scores
                .get(text)
                .copied()
                .ok_or_else(|| SentimentError::Status {
                    status: 400,
                    body: format!("no score for {text}"),
                })
        }
    }

    fn owned(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn thirds_round_to_two_decimals() {
        let tally = SentimentTally {
            positive: 1,
            negative: 1,
            neutral: 1,
        };
        assert_eq!(tally.positive_percentage(), "33.33");
        assert_eq!(tally.negative_percentage(), "33.33");
        assert_eq!(tally.neutral_percentage(), "33.33");
    }

    #[test]
    fn trailing_zeros_preserved() {
        assert_eq!(format_percentage(1, 2), "50.00");
        assert_eq!(format_percentage(2, 2), "100.00");
        assert_eq!(format_percentage(0, 5), "0.00");
    }

    #[test]
    fn two_thirds_rounds_up() {
        assert_eq!(format_percentage(2, 3), "66.67");
    }

    #[test]
    fn empty_tally_is_all_zero() {
        let tally = SentimentTally::default();
        assert_eq!(tally.positive_percentage(), "0.00");
        assert_eq!(tally.negative_percentage(), "0.00");
        assert_eq!(tally.neutral_percentage(), "0.00");
    }

    #[test]
    fn percentages_sum_to_hundred() {
        let tally: SentimentTally = [
            Polarity::Positive,
            Polarity::Positive,
            Polarity::Negative,
            Polarity::Neutral,
            Polarity::Neutral,
            Polarity::Neutral,
            Polarity::Positive,
        ]
        .into_iter()
        .collect();
        let sum: f64 = [
            tally.positive_percentage(),
            tally.negative_percentage(),
            tally.neutral_percentage(),
        ]
        .iter()
        .map(|p| p.parse::<f64>().unwrap())
        .sum();
        assert!((sum - 100.0).abs() <= 0.02, "sum was {sum}");
        assert_eq!(tally.total(), 7);
    }

    #[tokio::test]
    async fn batch_classifies_each_message() {
        let analyzer = CannedAnalyzer::new(&[
            ("I love this", 0.8),
            ("I hate this", -0.7),
            ("It is a table", 0.0),
        ]);
        let messages = owned(&["I love this", "I hate this", "It is a table"]);

        let outcome = analyze_batch(&analyzer, &messages, 2).await;

        assert_eq!(
            outcome.tally,
            SentimentTally {
                positive: 1,
                negative: 1,
                neutral: 1
            }
        );
        assert!(outcome.failures.is_empty());
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn batch_captures_failures_with_index() {
        let analyzer = CannedAnalyzer::new(&[("good", 0.9), ("bad", -0.9)]);
        let messages = owned(&["good", "unknown", "bad"]);

        let outcome = analyze_batch(&analyzer, &messages, 4).await;

        assert_eq!(outcome.analyzed(), 2);
        assert_eq!(outcome.failed(), 1);
        assert_eq!(outcome.failures[0].index, 1);
    }

    #[tokio::test]
    async fn zero_concurrency_still_makes_progress() {
        let analyzer = CannedAnalyzer::new(&[("a", 0.5)]);
        let outcome = analyze_batch(&analyzer, &owned(&["a", "a"]), 0).await;
        assert_eq!(outcome.tally.positive, 2);
    }

    #[tokio::test]
    async fn strict_batch_aborts_on_failure() {
        let analyzer = CannedAnalyzer::new(&[("good", 0.9)]);
        let result = analyze_batch_strict(&analyzer, &owned(&["good", "unknown"]), 1).await;
        assert!(matches!(result, Err(SentimentError::Status { status: 400, .. })));
    }

    #[tokio::test]
    async fn batch_runs_on_a_spawned_task() {
        // Handlers need a `Send + 'static` future over a shared analyzer.
        let analyzer: Arc<dyn SentimentAnalyzer> =
            Arc::new(CannedAnalyzer::new(&[("good", 0.9), ("bad", -0.9)]));
        let messages = owned(&["good", "bad", "good"]);

        let shared = Arc::clone(&analyzer);
        let batch = owned(&["good", "bad"]);
        let strict =
            tokio::spawn(async move { analyze_batch_strict(shared.as_ref(), &batch, 2).await });
        let partial =
            tokio::spawn(async move { analyze_batch(analyzer.as_ref(), &messages, 2).await });

        let tally = strict.await.unwrap().unwrap();
        assert_eq!(tally.positive, 1);
        assert_eq!(tally.negative, 1);
        let outcome = partial.await.unwrap();
        assert_eq!(outcome.tally.positive, 2);
        assert_eq!(outcome.failed(), 0);
    }

    #[tokio::test]
    async fn strict_batch_on_empty_input() {
        let analyzer = CannedAnalyzer::new(&[]);
        let tally = analyze_batch_strict(&analyzer, &[], 4).await.unwrap();
        assert_eq!(tally, SentimentTally::default());
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
    }
}
