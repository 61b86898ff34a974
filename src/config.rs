use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Environment variable parsed but violates a pipeline constraint.
    #[error("{variable} must be positive, got {value}")]
    NonPositive {
        /// Variable that carried the offending value.
        variable: String,
        /// Value as supplied by the environment.
        value: String,
    },
}

/// Runtime configuration for the Factline server and CLI.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Target duration of a transcript window in seconds.
    pub chunk_span_seconds: f64,
    /// Maximum number of concurrent extraction tasks.
    pub extract_concurrency: usize,
    /// Maximum number of concurrent verification tasks.
    pub verify_concurrency: usize,
    /// Optional wall-clock budget applied to each extraction/verification task.
    pub task_timeout_seconds: Option<u64>,
    /// Default source identifier stamped on claims when the caller omits one.
    pub default_source_id: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Built-in chunk span used when `CHUNK_SPAN_SECONDS` is unset.
pub const DEFAULT_CHUNK_SPAN_SECONDS: f64 = 30.0;
/// Built-in extraction concurrency used when `EXTRACT_CONCURRENCY` is unset.
pub const DEFAULT_EXTRACT_CONCURRENCY: usize = 3;
/// Built-in verification concurrency used when `VERIFY_CONCURRENCY` is unset.
pub const DEFAULT_VERIFY_CONCURRENCY: usize = 8;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let chunk_span_seconds = load_env_optional("CHUNK_SPAN_SECONDS")
            .map(|value| parse_positive_f64("CHUNK_SPAN_SECONDS", &value))
            .transpose()?
            .unwrap_or(DEFAULT_CHUNK_SPAN_SECONDS);
        let extract_concurrency = load_env_optional("EXTRACT_CONCURRENCY")
            .map(|value| parse_positive_usize("EXTRACT_CONCURRENCY", &value))
            .transpose()?
            .unwrap_or(DEFAULT_EXTRACT_CONCURRENCY);
        let verify_concurrency = load_env_optional("VERIFY_CONCURRENCY")
            .map(|value| parse_positive_usize("VERIFY_CONCURRENCY", &value))
            .transpose()?
            .unwrap_or(DEFAULT_VERIFY_CONCURRENCY);
        let task_timeout_seconds = load_env_optional("TASK_TIMEOUT_SECONDS")
            .map(|value| {
                value
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidValue("TASK_TIMEOUT_SECONDS".to_string()))
            })
            .transpose()?;
        let server_port = load_env_optional("SERVER_PORT")
            .map(|value| {
                value
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
            })
            .transpose()?;

        Ok(Self {
            chunk_span_seconds,
            extract_concurrency,
            verify_concurrency,
            task_timeout_seconds,
            default_source_id: load_env_optional("SOURCE_ID")
                .unwrap_or_else(|| "unknown".to_string()),
            server_port,
        })
    }
}

fn parse_positive_f64(variable: &str, value: &str) -> Result<f64, ConfigError> {
    let parsed: f64 = value
        .parse()
        .map_err(|_| ConfigError::InvalidValue(variable.to_string()))?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(ConfigError::NonPositive {
            variable: variable.to_string(),
            value: value.to_string(),
        });
    }
    Ok(parsed)
}

fn parse_positive_usize(variable: &str, value: &str) -> Result<usize, ConfigError> {
    let parsed: usize = value
        .parse()
        .map_err(|_| ConfigError::InvalidValue(variable.to_string()))?;
    if parsed == 0 {
        return Err(ConfigError::NonPositive {
            variable: variable.to_string(),
            value: value.to_string(),
        });
    }
    Ok(parsed)
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        chunk_span_seconds = config.chunk_span_seconds,
        extract_concurrency = config.extract_concurrency,
        verify_concurrency = config.verify_concurrency,
        task_timeout_seconds = ?config.task_timeout_seconds,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_concurrency() {
        let error = parse_positive_usize("EXTRACT_CONCURRENCY", "0").unwrap_err();
        assert!(matches!(error, ConfigError::NonPositive { .. }));
    }

    #[test]
    fn rejects_non_positive_span() {
        assert!(parse_positive_f64("CHUNK_SPAN_SECONDS", "-3.0").is_err());
        assert!(parse_positive_f64("CHUNK_SPAN_SECONDS", "0").is_err());
        assert!(parse_positive_f64("CHUNK_SPAN_SECONDS", "NaN").is_err());
    }

    #[test]
    fn accepts_positive_values() {
        assert_eq!(
            parse_positive_f64("CHUNK_SPAN_SECONDS", "45.5").unwrap(),
            45.5
        );
        assert_eq!(parse_positive_usize("VERIFY_CONCURRENCY", "10").unwrap(), 10);
    }
}
