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
    pub openai_api_key: Option<String>,
    pub course_model: String,
    pub answer_model: String,
    pub allowed_origin: String,
    /// How long an unidentified request waits before it is turned away.
    pub auth_redirect_delay: Duration,
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
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Load Server and Database Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load API Keys (as optional) ---
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty());

        // --- Load Adapter-specific Settings ---
        let course_model = var_or("COURSE_MODEL", "gpt-4o-mini");
        let answer_model = var_or("ANSWER_MODEL", "gpt-4o-mini");

        // --- Load Web Settings ---
        let allowed_origin = var_or("ALLOWED_ORIGIN", "http://localhost:3000");
        let delay_str = var_or("AUTH_REDIRECT_DELAY_MS", "500");
        let auth_redirect_delay = delay_str
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidValue("AUTH_REDIRECT_DELAY_MS".to_string(), e.to_string()))?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            course_model,
            answer_model,
            allowed_origin,
            auth_redirect_delay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_database_is_set() {
        let config = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/courses")]))
            .unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.course_model, "gpt-4o-mini");
        assert_eq!(config.allowed_origin, "http://localhost:3000");
        assert_eq!(config.auth_redirect_delay, Duration::from_millis(500));
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn missing_database_url_is_reported() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/courses"),
            ("RUST_LOG", "chatty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "RUST_LOG"));

        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/courses"),
            ("AUTH_REDIRECT_DELAY_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "AUTH_REDIRECT_DELAY_MS"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/courses"),
            ("OPENAI_API_KEY", "  "),
            ("ANSWER_MODEL", "gpt-4o"),
        ]))
        .unwrap();
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.answer_model, "gpt-4o");
    }
}
