//! Chat relay server binary.
//!
//! Builds the Dialogflow and Natural Language clients once, hands them to the
//! router, and serves until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser};
use relay_api::config::ApiConfig;
use relay_core::agent::AgentConfig;
use relay_core::agent::dialogflow::DialogflowClient;
use relay_core::credentials::GoogleCredentials;
use relay_core::sentiment::language::NaturalLanguageClient;
use tracing::{error, info};

/// CLI arguments; every flag can also be set from the environment.
#[derive(Parser, Debug)]
#[command(name = "relay_server", about = "Chat relay for Dialogflow CX and Natural Language")]
struct Args {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Google Cloud project that owns the agent.
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT_ID")]
    project_id: String,

    /// Agent location.
    #[arg(long, env = "GOOGLE_CLOUD_LOCATION_ID", default_value = relay_core::agent::DEFAULT_LOCATION)]
    location_id: String,

    /// Dialogflow CX agent id.
    #[arg(long, env = "GOOGLE_CLOUD_AGENT_ID")]
    agent_id: String,

    /// Language tag sent with every query.
    #[arg(long, env = "AGENT_LANGUAGE_CODE", default_value = relay_core::agent::DEFAULT_LANGUAGE_CODE)]
    language_code: String,

    /// Maximum concurrent sentiment calls per request.
    #[arg(long, env = "SENTIMENT_CONCURRENCY", default_value_t = relay_api::config::DEFAULT_SENTIMENT_CONCURRENCY)]
    sentiment_concurrency: usize,

    /// Abort a sentiment batch on the first failed message; `false` reports
    /// failures per message instead.
    #[arg(long, env = "SENTIMENT_FAIL_FAST", default_value_t = true, action = ArgAction::Set)]
    sentiment_fail_fast: bool,

    /// Timeout for each outbound request, in seconds.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    upstream_timeout_secs: u64,

    /// Override the Dialogflow API base URL.
    #[arg(long, env = "DIALOGFLOW_ENDPOINT")]
    dialogflow_endpoint: Option<String>,

    /// Override the Natural Language API base URL.
    #[arg(long, env = "LANGUAGE_ENDPOINT")]
    language_endpoint: Option<String>,

    /// API key for the Natural Language API (bearer token used otherwise).
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,relay_api=debug,relay_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    info!(
        project_id = %args.project_id,
        location_id = %args.location_id,
        agent_id = %args.agent_id,
        "starting relay_server"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.upstream_timeout_secs))
        .build()?;
    let credentials = Arc::new(GoogleCredentials::from_env(http.clone())?);

    let agent_config = AgentConfig {
        project_id: args.project_id,
        location_id: args.location_id,
        agent_id: args.agent_id,
        language_code: args.language_code,
    };
    let mut agent = DialogflowClient::new(http.clone(), credentials.clone(), agent_config);
    if let Some(endpoint) = args.dialogflow_endpoint {
        agent = agent.with_endpoint(endpoint);
    }
    info!(endpoint = agent.endpoint(), "dialogflow client ready");

    let mut sentiment = match args.api_key.filter(|k| !k.is_empty()) {
        Some(key) => NaturalLanguageClient::with_api_key(http.clone(), key),
        None => NaturalLanguageClient::new(http.clone(), credentials),
    };
    if let Some(endpoint) = args.language_endpoint {
        sentiment = sentiment.with_endpoint(endpoint);
    }
    info!(endpoint = sentiment.endpoint(), "natural language client ready");

    let config = ApiConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        sentiment_concurrency: args.sentiment_concurrency.max(1),
        sentiment_fail_fast: args.sentiment_fail_fast,
    };

    let state = relay_api::AppState {
        agent: Arc::new(agent),
        sentiment: Arc::new(sentiment),
        config: config.clone(),
    };

    let app = relay_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    info!(addr = %local_addr, "listening on http://localhost:{}", local_addr.port());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c()))
        .await?;

    Ok(())
}

/// Resolves when `signal` fires. A signal that cannot be installed never
/// resolves, so the server keeps running.
async fn shutdown_on(signal: impl Future<Output = std::io::Result<()>>) {
    match signal.await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!(error = %e, "failed to install Ctrl-C handler; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
