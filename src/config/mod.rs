use std::env;
use std::time::Duration;

use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: SecretString,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub upstream_base_url: String,
    pub upstream_timeout_secs: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: usize,
    pub rate_limit_sweep_secs: u64,
    pub daily_budget: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Numeric values that fail
    /// to parse fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("ANTHROPIC_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("ANTHROPIC_API_KEY"))?;

        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Ok(Config {
            anthropic_api_key: SecretString::from(api_key),
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            server_port: lookup("SERVER_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            api_base_uri: lookup("API_BASE_URI").unwrap_or_else(|| "/api".into()),
            upstream_base_url: lookup("UPSTREAM_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://api.anthropic.com".into()),
            upstream_timeout_secs: parsed("UPSTREAM_TIMEOUT_SECS").unwrap_or(30),
            rate_limit_window_secs: parsed("RATE_LIMIT_WINDOW").unwrap_or(3600),
            rate_limit_requests: parsed("RATE_LIMIT_REQUESTS").unwrap_or(20) as usize,
            rate_limit_sweep_secs: parsed("RATE_LIMIT_SWEEP_SECS").unwrap_or(300),
            daily_budget: lookup("DAILY_BUDGET")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|budget| budget.is_finite() && *budget >= 0.0)
                .unwrap_or(3.0),
        })
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn rate_limit_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit_sweep_secs.max(1))
    }
}
