//! Request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body: `{ "error": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `POST /webhook` request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub message: Option<String>,
    /// Used when the `X-Session-Id` header is absent.
    pub session_id: Option<String>,
}

/// `POST /webhook` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub fulfillment_text: String,
    pub response_messages: Vec<Value>,
}

/// A message the analyzer could not score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageError {
    pub index: usize,
    pub error: String,
}

/// `POST /analyze-sentiment` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSummaryResponse {
    pub positive_percentage: String,
    pub negative_percentage: String,
    pub neutral_percentage: String,
    pub total_messages: usize,
    pub analyzed_messages: usize,
    pub failed_messages: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<MessageError>,
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
