//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::models::ErrorResponse;

/// Plain-text body returned when the agent call fails.
pub const AGENT_FAILURE_BODY: &str = "Error en el servidor";

/// Error message returned when sentiment analysis fails.
pub const SENTIMENT_FAILURE_MESSAGE: &str = "Error al analizar los mensajes.";

/// Error message returned when `messages` is missing or malformed.
pub const MESSAGES_REQUIRED_MESSAGE: &str = "Se requiere un arreglo de \"messages\".";

/// Error message returned when a JSON request body cannot be parsed.
pub const INVALID_BODY_MESSAGE: &str = "El cuerpo de la solicitud no es JSON válido.";

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
///
/// Upstream variants carry the detail for the server log only; callers get a
/// fixed message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Agent failure: {0}")]
    Agent(String),

    #[error("Sentiment failure: {0}")]
    Sentiment(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse { error: message }),
            )
                .into_response(),
            AppError::Agent(detail) => {
                error!(%detail, "webhook upstream failure");
                (StatusCode::INTERNAL_SERVER_ERROR, AGENT_FAILURE_BODY).into_response()
            }
            AppError::Sentiment(detail) => {
                error!(%detail, "sentiment analysis failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: SENTIMENT_FAILURE_MESSAGE.to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl From<relay_core::agent::AgentError> for AppError {
    fn from(e: relay_core::agent::AgentError) -> Self {
        match e {
            relay_core::agent::AgentError::InvalidSession(msg) => AppError::Validation(msg),
            other => AppError::Agent(other.to_string()),
        }
    }
}

impl From<relay_core::sentiment::SentimentError> for AppError {
    fn from(e: relay_core::sentiment::SentimentError) -> Self {
        AppError::Sentiment(e.to_string())
    }
}
