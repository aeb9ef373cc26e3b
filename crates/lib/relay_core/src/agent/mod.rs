//! Conversational agent — session addressing and intent detection.
//!
//! # Public API
//!
//! - [`ConversationAgent`] — the seam handlers depend on
//! - [`SessionAddress`] — `projects/{p}/locations/{l}/agents/{a}/sessions/{s}`
//! - [`fulfillment_text`] — first text segment of the first response message
//! - [`dialogflow::DialogflowClient`] — Dialogflow CX REST implementation

pub mod dialogflow;

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::credentials::CredentialError;

/// Location used when none is configured.
pub const DEFAULT_LOCATION: &str = "global";

/// Language tag sent with every query unless overridden.
pub const DEFAULT_LANGUAGE_CODE: &str = "es";

/// Dialogflow accepts session ids of at most 36 characters.
pub const MAX_SESSION_ID_LEN: usize = 36;

/// Errors that can occur while talking to the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Invalid session id: {0}")]
    InvalidSession(String),

    #[error("Credential error: {0}")]
    Credentials(#[from] CredentialError),

    #[error("Agent request failed: {0}")]
    Request(String),

    #[error("Agent returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Agent response parse error: {0}")]
    Parse(String),
}

/// Static part of every session address plus the query language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub project_id: String,
    pub location_id: String,
    pub agent_id: String,
    pub language_code: String,
}

impl AgentConfig {
    /// Config with the default location and language.
    pub fn new(project_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            location_id: DEFAULT_LOCATION.to_string(),
            agent_id: agent_id.into(),
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
        }
    }
}

/// Fully qualified conversation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAddress {
    project_id: String,
    location_id: String,
    agent_id: String,
    session_id: String,
}

impl SessionAddress {
    /// Combine the configured agent with a caller-supplied session id.
    pub fn new(config: &AgentConfig, session_id: &str) -> Result<Self, AgentError> {
        validate_session_id(session_id)?;
        Ok(Self {
            project_id: config.project_id.clone(),
            location_id: config.location_id.clone(),
            agent_id: config.agent_id.clone(),
            session_id: session_id.to_string(),
        })
    }
}

impl fmt::Display for SessionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/locations/{}/agents/{}/sessions/{}",
            self.project_id, self.location_id, self.agent_id, self.session_id
        )
    }
}

/// Session ids must be 1..=36 characters of `[A-Za-z0-9_-]`.
pub fn validate_session_id(session_id: &str) -> Result<(), AgentError> {
    if session_id.is_empty() {
        return Err(AgentError::InvalidSession("session id is empty".into()));
    }
    if session_id.len() > MAX_SESSION_ID_LEN {
        return Err(AgentError::InvalidSession(format!(
            "session id exceeds {MAX_SESSION_ID_LEN} characters"
        )));
    }
    if !session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AgentError::InvalidSession(format!(
            "session id contains invalid characters: {session_id}"
        )));
    }
    Ok(())
}

/// Reply from a single intent detection.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    /// First text segment of the first response message, or empty.
    pub fulfillment_text: String,
    /// Raw response messages, passed through untouched.
    pub response_messages: Vec<Value>,
}

impl AgentReply {
    pub fn from_messages(response_messages: Vec<Value>) -> Self {
        Self {
            fulfillment_text: fulfillment_text(&response_messages),
            response_messages,
        }
    }
}

/// `responseMessages[0].text.text[0]`, or `""` when any step is missing.
pub fn fulfillment_text(response_messages: &[Value]) -> String {
    response_messages
        .first()
        .and_then(|m| m.get("text"))
        .and_then(|t| t.get("text"))
        .and_then(|segments| segments.get(0))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// A conversational agent that answers free text within a session.
#[async_trait]
pub trait ConversationAgent: Send + Sync {
    /// Submit `text` to the conversation identified by `session_id`.
    async fn detect_intent(&self, session_id: &str, text: &str) -> Result<AgentReply, AgentError>;
}
