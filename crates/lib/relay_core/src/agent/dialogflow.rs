//! Dialogflow CX agent client.
//!
//! Calls `POST /v3/{session}:detectIntent` on the regional endpoint for the
//! configured location. No retries; a failed call is reported as-is.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{AgentConfig, AgentError, AgentReply, ConversationAgent, DEFAULT_LOCATION, SessionAddress};
use crate::credentials::GoogleCredentials;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentRequest<'a> {
    query_input: QueryInput<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryInput<'a> {
    text: TextInput<'a>,
    language_code: &'a str,
}

#[derive(Serialize)]
struct TextInput<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentResponse {
    #[serde(default)]
    query_result: Option<QueryResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    #[serde(default)]
    response_messages: Vec<Value>,
}

/// Base URL of the Dialogflow API for `location_id`.
pub fn default_endpoint(location_id: &str) -> String {
    if location_id == DEFAULT_LOCATION {
        "https://dialogflow.googleapis.com".to_string()
    } else {
        format!("https://{location_id}-dialogflow.googleapis.com")
    }
}

/// [`ConversationAgent`] backed by the Dialogflow CX REST API.
pub struct DialogflowClient {
    http: Client,
    credentials: Arc<GoogleCredentials>,
    config: AgentConfig,
    endpoint: String,
}

impl DialogflowClient {
    pub fn new(http: Client, credentials: Arc<GoogleCredentials>, config: AgentConfig) -> Self {
        let endpoint = default_endpoint(&config.location_id);
        Self {
            http,
            credentials,
            config,
            endpoint,
        }
    }

    /// Override the API base URL (e.g. a private endpoint or a test server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ConversationAgent for DialogflowClient {
    async fn detect_intent(&self, session_id: &str, text: &str) -> Result<AgentReply, AgentError> {
        let session = SessionAddress::new(&self.config, session_id)?;
        let url = format!("{}/v3/{}:detectIntent", self.endpoint, session);
        let token = self.credentials.access_token().await?;

        debug!(session = %session, "detectIntent");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&DetectIntentRequest {
                query_input: QueryInput {
                    text: TextInput { text },
                    language_code: &self.config.language_code,
                },
            })
            .send()
            .await
            .map_err(|e| AgentError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(AgentError::Status { status, body });
        }

        let data: DetectIntentResponse = resp
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        let messages = data
            .query_result
            .map(|r| r.response_messages)
            .unwrap_or_default();

        Ok(AgentReply::from_messages(messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_location_uses_global_endpoint() {
        assert_eq!(default_endpoint("global"), "https://dialogflow.googleapis.com");
    }

    #[test]
    fn regional_location_uses_regional_endpoint() {
        assert_eq!(
            default_endpoint("us-central1"),
            "https://us-central1-dialogflow.googleapis.com"
        );
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(DetectIntentRequest {
            query_input: QueryInput {
                text: TextInput { text: "hola" },
                language_code: "es",
            },
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"queryInput": {"text": {"text": "hola"}, "languageCode": "es"}})
        );
    }

    #[test]
    fn endpoint_override_strips_trailing_slash() {
        let client = DialogflowClient::new(
            Client::new(),
            Arc::new(GoogleCredentials::from_static("t")),
            AgentConfig::new("p", "a"),
        )
        .with_endpoint("http://127.0.0.1:9000/");
        assert_eq!(client.endpoint(), "http://127.0.0.1:9000");
    }
}
