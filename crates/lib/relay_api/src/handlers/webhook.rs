//! Intent router — forwards a user message to the conversational agent.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use tracing::debug;

use crate::AppState;
use crate::error::{AppError, AppResult, INVALID_BODY_MESSAGE};
use crate::models::{WebhookRequest, WebhookResponse};

/// Header carrying the caller's conversation session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Session id from the `X-Session-Id` header, falling back to the body field.
fn resolve_session_id(headers: &HeaderMap, body: &WebhookRequest) -> AppResult<String> {
    let from_header = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    from_header
        .or_else(|| {
            body.session_id
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_owned)
        .ok_or_else(|| {
            AppError::Validation(
                "A session id is required (X-Session-Id header or \"sessionId\").".into(),
            )
        })
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// A body that is empty or not declared as JSON carries no fields; malformed
/// JSON is a validation error.
fn parse_body(headers: &HeaderMap, bytes: &[u8]) -> AppResult<WebhookRequest> {
    if !is_json_content_type(headers) || bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(WebhookRequest::default());
    }
    serde_json::from_slice(bytes).map_err(|e| {
        debug!(error = %e, "rejecting webhook body");
        AppError::Validation(INVALID_BODY_MESSAGE.into())
    })
}

/// `POST /webhook` — detect intent for `message` within the caller's session.
pub async fn webhook_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    bytes: Bytes,
) -> AppResult<Json<WebhookResponse>> {
    let body = parse_body(&headers, &bytes)?;

    // Nothing to forward; the agent would reject an empty query input.
    let message = body
        .message
        .as_deref()
        .ok_or_else(|| AppError::Agent("request has no \"message\" field".into()))?;

    let session_id = resolve_session_id(&headers, &body)?;
    debug!(session_id = %session_id, "forwarding message to agent");

    let reply = state.agent.detect_intent(&session_id, message).await?;

    Ok(Json(WebhookResponse {
        fulfillment_text: reply.fulfillment_text,
        response_messages: reply.response_messages,
    }))
}
