//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub assistant_webhook_url: String,
    pub request_timeout: Duration,
    pub summary_threshold: u64,
    pub summary_recency_window: usize,
    pub summary_top_words: usize,
    pub cors_allow_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Assistant Webhook Settings ---
        let assistant_webhook_url = std::env::var("ASSISTANT_WEBHOOK_URL")
            .map_err(|_| ConfigError::MissingVar("ASSISTANT_WEBHOOK_URL".to_string()))?;

        let request_timeout_secs = parse_var::<u64>("REQUEST_TIMEOUT_SECS", 30)?;
        let request_timeout = Duration::from_secs(request_timeout_secs);

        // --- Load Summary Policy Settings ---
        let summary_threshold = parse_var::<u64>("SUMMARY_THRESHOLD", 10)?;
        if summary_threshold == 0 {
            return Err(ConfigError::InvalidValue(
                "SUMMARY_THRESHOLD".to_string(),
                "must be a positive integer".to_string(),
            ));
        }
        let summary_recency_window = parse_var::<usize>("SUMMARY_RECENCY_WINDOW", 12)?;
        let summary_top_words = parse_var::<usize>("SUMMARY_TOP_WORDS", 5)?;

        let cors_allow_origin = std::env::var("CORS_ALLOW_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            assistant_webhook_url,
            request_timeout,
            summary_threshold,
            summary_recency_window,
            summary_top_words,
            cors_allow_origin,
        })
    }
}

/// Reads an optional numeric variable, falling back to a default when unset.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(name.to_string(), format!("'{}' is not a valid number", raw))
        }),
        Err(_) => Ok(default),
    }
}
