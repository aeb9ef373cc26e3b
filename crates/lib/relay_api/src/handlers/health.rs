//! Liveness endpoint.

use axum::Json;

use crate::models::HealthResponse;

/// `GET /health` — process is up; does not touch upstream services.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: relay_core::version().to_string(),
    })
}
