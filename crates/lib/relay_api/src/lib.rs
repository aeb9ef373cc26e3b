//! # relay_api
//!
//! HTTP API library for the chat relay.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use relay_core::agent::ConversationAgent;
use relay_core::sentiment::SentimentAnalyzer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{health, sentiment, webhook};

/// Route paths.
pub mod routes {
    pub const GET_HEALTH: &str = "/health";
    pub const POST_WEBHOOK: &str = "/webhook";
    pub const POST_ANALYZE_SENTIMENT: &str = "/analyze-sentiment";
}

/// Shared application state passed to all handlers.
///
/// The upstream clients are built once at startup and only read afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Conversational agent used by `/webhook`.
    pub agent: Arc<dyn ConversationAgent>,
    /// Sentiment analyzer used by `/analyze-sentiment`.
    pub sentiment: Arc<dyn SentimentAnalyzer>,
    /// API configuration.
    pub config: ApiConfig,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(routes::GET_HEALTH, get(health::health_handler))
        .route(routes::POST_WEBHOOK, post(webhook::webhook_handler))
        .route(
            routes::POST_ANALYZE_SENTIMENT,
            post(sentiment::analyze_sentiment_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
