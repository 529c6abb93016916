pub mod analysis;
pub mod domain;
pub mod export;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub anthropic_api_key: Option<String>,
        pub gemini_api_key: Option<String>,
        pub alpha_vantage_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub market_timeout_secs: Option<u64>,
        pub market_req_delay_ms: Option<u64>,
        pub ticker_timeout_secs: Option<u64>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
                gemini_api_key: non_empty_var("GEMINI_API_KEY"),
                alpha_vantage_api_key: non_empty_var("ALPHA_VANTAGE_API_KEY"),
                sentry_dsn: non_empty_var("SENTRY_DSN"),
                market_timeout_secs: parsed_var("MARKET_TIMEOUT_SECS"),
                market_req_delay_ms: parsed_var("MARKET_REQ_DELAY_MS"),
                ticker_timeout_secs: parsed_var("TICKER_TIMEOUT_SECS"),
            })
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }

        pub fn require_alpha_vantage_api_key(&self) -> anyhow::Result<&str> {
            self.alpha_vantage_api_key
                .as_deref()
                .context("ALPHA_VANTAGE_API_KEY is required")
        }

        /// Per-request HTTP timeout for market data providers.
        pub fn market_timeout(&self) -> Duration {
            Duration::from_secs(self.market_timeout_secs.unwrap_or(15))
        }

        /// Upper bound on all calls made for one ticker.
        pub fn ticker_timeout(&self) -> Duration {
            Duration::from_secs(self.ticker_timeout_secs.unwrap_or(45))
        }
    }

    fn non_empty_var(key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
        std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
    }

}
