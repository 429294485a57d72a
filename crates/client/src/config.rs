//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `DUKA_API_BASE_URL` - REST API root (default: `http://localhost:8082/api`)
//! - `DUKA_API_TIMEOUT_SECS` - Per-request timeout in seconds (default: 10)
//! - `DUKA_STATE_PATH` - File backing the persistent key-value store (default: `.duka/state.json`)
//! - `DUKA_LOG_FORMAT` - `pretty` or `json` (default: `pretty`)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8082/api";
const DEFAULT_TIMEOUT_SECS: &str = "10";
const DEFAULT_STATE_PATH: &str = ".duka/state.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// REST gateway settings
    pub api: ApiConfig,
    /// File backing the persistent key-value store
    pub state_path: PathBuf,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// REST gateway configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API root; endpoint paths are appended to it
    pub base_url: Url,
    /// Timeout applied to every request
    pub timeout: Duration,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig::parse(
            &get_env_or_default("DUKA_API_BASE_URL", DEFAULT_API_BASE_URL),
            &get_env_or_default("DUKA_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
        )?;
        let state_path = PathBuf::from(get_env_or_default("DUKA_STATE_PATH", DEFAULT_STATE_PATH));
        let log_format = LogFormat::parse(&get_env_or_default("DUKA_LOG_FORMAT", "pretty"))?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            api,
            state_path,
            log_format,
            sentry_dsn,
        })
    }
}

impl ApiConfig {
    /// Build gateway settings from raw string values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL is not an absolute
    /// http(s) URL or the timeout is not a positive integer.
    pub fn parse(base_url: &str, timeout_secs: &str) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("DUKA_API_BASE_URL".to_string(), e.to_string())
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "DUKA_API_BASE_URL".to_string(),
                format!("unsupported scheme '{}'", base_url.scheme()),
            ));
        }

        let secs = timeout_secs.trim().parse::<u64>().map_err(|e| {
            ConfigError::InvalidEnvVar("DUKA_API_TIMEOUT_SECS".to_string(), e.to_string())
        })?;
        if secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "DUKA_API_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(secs),
        })
    }
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidEnvVar(
                "DUKA_LOG_FORMAT".to_string(),
                format!("expected 'pretty' or 'json', got '{other}'"),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_defaults() {
        let config = ApiConfig::parse(DEFAULT_API_BASE_URL, DEFAULT_TIMEOUT_SECS).unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8082/api");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_api_config_parse() {
        let config = ApiConfig::parse("https://shop.example.com/api/", "30").unwrap();
        assert_eq!(config.base_url.host_str(), Some("shop.example.com"));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_api_config_rejects_bad_url() {
        let err = ApiConfig::parse("not a url", "10").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref var, _) if var == "DUKA_API_BASE_URL"));

        let err = ApiConfig::parse("ftp://example.com", "10").unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_api_config_rejects_bad_timeout() {
        assert!(ApiConfig::parse(DEFAULT_API_BASE_URL, "soon").is_err());
        assert!(ApiConfig::parse(DEFAULT_API_BASE_URL, "0").is_err());
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty").unwrap(), LogFormat::Pretty);
        assert!(LogFormat::parse("xml").is_err());
    }
}
