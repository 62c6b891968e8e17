use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::retry::RetryPolicy;

/// Default configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "Voting.toml";

/// Prefix for environment overrides, e.g. `VOTING_API_BASE_URL`.
pub const ENV_PREFIX: &str = "VOTING_";

/// How the vote-cast operation reaches the ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastRoute {
    /// Backend call carrying the voter's signer context.
    Backend,
    /// Transaction signed and sent by the wallet provider.
    Wallet,
}

/// Client configuration, derived from `Voting.toml` and `VOTING_*`
/// environment variables on top of built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    // endpoints
    api_base_url: String,
    // timing
    request_timeout_ms: u64,
    results_handshake_timeout_ms: u64,
    results_poll_interval_ms: u64,
    // read retries
    read_retry_attempts: u32,
    read_retry_base_delay_ms: u64,
    // submission
    cast_route: CastRoute,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            request_timeout_ms: 10_000,
            results_handshake_timeout_ms: 3_000,
            results_poll_interval_ms: 30_000,
            read_retry_attempts: 3,
            read_retry_base_delay_ms: 200,
            cast_route: CastRoute::Backend,
        }
    }
}

impl Config {
    /// Load from the default file and environment.
    pub fn load() -> Result<Self> {
        Self::figment(CONFIG_FILE).extract().map_err(Into::into)
    }

    /// The provider stack: defaults, then the TOML file, then the environment.
    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Base URL of the authoritative REST backend, without trailing slash.
    pub fn api_base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    /// Bound on every HTTP request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// How long to wait for the live results channel to open before
    /// relying on polling alone.
    pub fn results_handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.results_handshake_timeout_ms)
    }

    /// Interval of the periodic results re-fetch. Never zero.
    pub fn results_poll_interval(&self) -> Duration {
        Duration::from_millis(self.results_poll_interval_ms.max(1))
    }

    /// Retry policy for idempotent reads.
    pub fn read_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.read_retry_attempts,
            Duration::from_millis(self.read_retry_base_delay_ms),
        )
    }

    pub fn cast_route(&self) -> CastRoute {
        self.cast_route
    }

    /// Override the backend URL, e.g. from a command-line flag.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_cast_route(mut self, route: CastRoute) -> Self {
        self.cast_route = route;
        self
    }

    pub fn with_read_retry(mut self, attempts: u32, base_delay: Duration) -> Self {
        self.read_retry_attempts = attempts;
        self.read_retry_base_delay_ms = u64::try_from(base_delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_results_timing(mut self, handshake_timeout: Duration, poll_interval: Duration) -> Self {
        self.results_handshake_timeout_ms =
            u64::try_from(handshake_timeout.as_millis()).unwrap_or(u64::MAX);
        self.results_poll_interval_ms = u64::try_from(poll_interval.as_millis()).unwrap_or(u64::MAX);
        self
    }
}
