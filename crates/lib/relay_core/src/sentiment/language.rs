//! Cloud Natural Language sentiment client.
//!
//! Calls `POST /v1/documents:analyzeSentiment` and reads the document-level
//! score. Authenticates with an API key when one is configured, otherwise
//! with a bearer token.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{SentimentAnalyzer, SentimentError};
use crate::credentials::GoogleCredentials;

/// Public Natural Language API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://language.googleapis.com";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeSentimentRequest<'a> {
    document: Document<'a>,
    encoding_type: &'static str,
}

#[derive(Serialize)]
struct Document<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeSentimentResponse {
    document_sentiment: Option<DocumentSentiment>,
}

#[derive(Deserialize)]
struct DocumentSentiment {
    #[serde(default)]
    score: f64,
}

enum Auth {
    ApiKey(String),
    Bearer(Arc<GoogleCredentials>),
}

/// [`SentimentAnalyzer`] backed by the Natural Language REST API.
pub struct NaturalLanguageClient {
    http: Client,
    auth: Auth,
    endpoint: String,
}

impl NaturalLanguageClient {
    /// Authenticate with bearer tokens from `credentials`.
    pub fn new(http: Client, credentials: Arc<GoogleCredentials>) -> Self {
        Self {
            http,
            auth: Auth::Bearer(credentials),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Authenticate with an API key passed as `?key=`.
    pub fn with_api_key(http: Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            auth: Auth::ApiKey(api_key.into()),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }

    /// Override the API base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SentimentAnalyzer for NaturalLanguageClient {
    async fn score(&self, text: &str) -> Result<f64, SentimentError> {
        let url = format!("{}/v1/documents:analyzeSentiment", self.endpoint);

        let mut req = self.http.post(&url).json(&AnalyzeSentimentRequest {
            document: Document {
                kind: "PLAIN_TEXT",
                content: text,
            },
            encoding_type: "UTF8",
        });
        req = match &self.auth {
            Auth::ApiKey(key) => req.query(&[("key", key.as_str())]),
            Auth::Bearer(credentials) => req.bearer_auth(credentials.access_token().await?),
        };

        let resp = req
            .send()
            .await
            .map_err(|e| SentimentError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(SentimentError::Status { status, body });
        }

        let data: AnalyzeSentimentResponse = resp
            .json()
            .await
            .map_err(|e| SentimentError::Parse(e.to_string()))?;

        data.document_sentiment
            .map(|s| s.score)
            .ok_or_else(|| SentimentError::Parse("response has no documentSentiment".to_string()))
    }
}
