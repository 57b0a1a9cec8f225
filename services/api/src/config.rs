//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use scripture_core::ContentPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
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
    pub grpc_bind_address: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    /// `None` disables the cache layer entirely.
    pub redis_url: Option<String>,
    pub log_level: Level,
    pub cache_ttl: Duration,
    pub store_timeout: Duration,
    pub search_limit: usize,
    pub seed_path: PathBuf,
    pub cors_origin: String,
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
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address = parse_or(&lookup, "BIND_ADDRESS", "0.0.0.0:8080")?;
        let grpc_bind_address = parse_or(&lookup, "GRPC_BIND_ADDRESS", "0.0.0.0:50051")?;
        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Store and Cache Settings ---
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", "10")?;
        let redis_url = lookup("REDIS_URL").filter(|v| !v.trim().is_empty());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Read Path Tunables ---
        let cache_ttl = Duration::from_secs(parse_or(&lookup, "CACHE_TTL_SECS", "86400")?);
        let store_timeout = Duration::from_millis(parse_or(&lookup, "STORE_TIMEOUT_MS", "2000")?);
        let search_limit: usize = parse_or(&lookup, "SEARCH_RESULT_LIMIT", "20")?;
        if search_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "SEARCH_RESULT_LIMIT".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let seed_path = lookup("SEED_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./seeds/data"));

        Ok(Self {
            bind_address,
            grpc_bind_address,
            database_url,
            db_max_connections,
            redis_url,
            log_level,
            cache_ttl,
            store_timeout,
            search_limit,
            seed_path,
            cors_origin,
        })
    }

    pub fn content_policy(&self) -> ContentPolicy {
        ContentPolicy {
            cache_ttl: self.cache_ttl,
            store_timeout: self.store_timeout,
            search_limit: self.search_limit,
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(name).unwrap_or_else(|| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_database_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/content")]).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.grpc_bind_address, "0.0.0.0:50051".parse().unwrap());
        assert_eq!(config.redis_url, None);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.content_policy(), ContentPolicy::default());
        assert_eq!(config.seed_path, PathBuf::from("./seeds/data"));
    }

    #[test]
    fn database_url_is_required() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "DATABASE_URL"));
    }

    #[test]
    fn blank_redis_url_disables_the_cache() {
        let config = load(&[("DATABASE_URL", "postgres://db"), ("REDIS_URL", "  ")]).unwrap();
        assert_eq!(config.redis_url, None);
    }

    #[test]
    fn tunables_are_parsed() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db"),
            ("REDIS_URL", "redis://cache:6379"),
            ("CACHE_TTL_SECS", "60"),
            ("STORE_TIMEOUT_MS", "250"),
            ("SEARCH_RESULT_LIMIT", "5"),
        ])
        .unwrap();

        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        let policy = config.content_policy();
        assert_eq!(policy.cache_ttl, Duration::from_secs(60));
        assert_eq!(policy.store_timeout, Duration::from_millis(250));
        assert_eq!(policy.search_limit, 5);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let err = load(&[("DATABASE_URL", "postgres://db"), ("BIND_ADDRESS", "nowhere")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v, _) if v == "BIND_ADDRESS"));

        let err = load(&[("DATABASE_URL", "postgres://db"), ("SEARCH_RESULT_LIMIT", "0")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref v, _) if v == "SEARCH_RESULT_LIMIT"));
    }
}
