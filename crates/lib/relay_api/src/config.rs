//! API server configuration.

/// Default number of sentiment requests in flight per batch.
pub const DEFAULT_SENTIMENT_CONCURRENCY: usize = 4;

/// Configuration for the HTTP layer.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:8080").
    pub bind_addr: String,
    /// Maximum concurrent sentiment calls per `/analyze-sentiment` request.
    pub sentiment_concurrency: usize,
    /// Abort the whole batch on the first failed message. When off, failures
    /// are reported per message alongside the analysed ones.
    pub sentiment_fail_fast: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            sentiment_concurrency: DEFAULT_SENTIMENT_CONCURRENCY,
            sentiment_fail_fast: true,
        }
    }
}
