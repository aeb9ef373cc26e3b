//! Sentiment summarizer — classifies a batch of messages and reports bucket percentages.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use relay_core::sentiment::summary::{self, SentimentTally};
use serde_json::Value;
use tracing::debug;

use crate::AppState;
use crate::error::{AppError, AppResult, MESSAGES_REQUIRED_MESSAGE};
use crate::models::{MessageError, SentimentSummaryResponse};

/// Extract `messages` as a list of strings.
///
/// The body is taken as raw JSON so every shape problem maps to the same
/// validation error.
fn parse_messages(body: &Value) -> AppResult<Vec<String>> {
    body.get("messages")
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| AppError::Validation(MESSAGES_REQUIRED_MESSAGE.into()))
}

fn summary_response(
    tally: &SentimentTally,
    total_messages: usize,
    errors: Vec<MessageError>,
) -> SentimentSummaryResponse {
    SentimentSummaryResponse {
        positive_percentage: tally.positive_percentage(),
        negative_percentage: tally.negative_percentage(),
        neutral_percentage: tally.neutral_percentage(),
        total_messages,
        analyzed_messages: tally.total(),
        failed_messages: errors.len(),
        errors,
    }
}

/// `POST /analyze-sentiment` — summarize the sentiment of `messages`.
pub async fn analyze_sentiment_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<SentimentSummaryResponse>> {
    let Json(body) = body.map_err(|_| AppError::Validation(MESSAGES_REQUIRED_MESSAGE.into()))?;
    let messages = parse_messages(&body)?;
    let concurrency = state.config.sentiment_concurrency;

    debug!(
        count = messages.len(),
        concurrency,
        fail_fast = state.config.sentiment_fail_fast,
        "analyzing sentiment batch"
    );

    if state.config.sentiment_fail_fast {
        let tally =
            summary::analyze_batch_strict(state.sentiment.as_ref(), &messages, concurrency).await?;
        return Ok(Json(summary_response(&tally, messages.len(), Vec::new())));
    }

    let outcome = summary::analyze_batch(state.sentiment.as_ref(), &messages, concurrency).await;

    if !messages.is_empty() && outcome.analyzed() == 0 {
        let first = outcome
            .failures
            .first()
            .map(|f| f.error.to_string())
            .unwrap_or_default();
        return Err(AppError::Sentiment(format!(
            "all {} messages failed; first error: {first}",
            messages.len()
        )));
    }

    let errors = outcome
        .failures
        .iter()
        .map(|f| MessageError {
            index: f.index,
            error: f.error.to_string(),
        })
        .collect();

    Ok(Json(summary_response(&outcome.tally, messages.len(), errors)))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn messages_array_of_strings_parses() {
        let parsed = parse_messages(&json!({"messages": ["a", "b"]})).unwrap();
        assert_eq!(parsed, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn empty_array_parses() {
        assert!(parse_messages(&json!({"messages": []})).unwrap().is_empty());
    }

    #[test]
    fn missing_messages_rejected() {
        assert!(matches!(
            parse_messages(&json!({})),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn non_array_rejected() {
        assert!(parse_messages(&json!({"messages": "not an array"})).is_err());
        assert!(parse_messages(&json!({"messages": null})).is_err());
    }

    #[test]
    fn non_string_element_rejected() {
        assert!(parse_messages(&json!({"messages": ["ok", 3]})).is_err());
    }
}
