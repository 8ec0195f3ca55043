//! Configuration loading.
//!
//! Sources, later wins: built-in defaults, an optional TOML file, then the
//! process environment (which `main` may have seeded from a `.env` file).

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::{AppConfig, LogFormat};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {expected} value for {key}: {value}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, overlay the environment, and validate.
pub fn load_config(file: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = read_config(file)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and overlay the process environment without validating.
pub fn read_config(file: Option<&Path>) -> Result<AppConfig, ConfigError> {
    read_config_with(file, |key| std::env::var(key).ok())
}

pub fn read_config_with<F>(file: Option<&Path>, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let base = match file {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };
    apply_env(base, lookup)
}

/// Overlay variables from `lookup` onto `config`. Empty values count as unset.
pub fn apply_env<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup };

    env.parse("PORT", "integer", &mut config.port)?;

    env.string("DB_PATH", &mut config.database.path);
    env.parse_bool("DB_WAL_MODE", &mut config.database.wal_mode)?;
    env.parse("DB_TIMEOUT", "integer", &mut config.database.timeout_secs)?;
    env.parse("DB_MAX_OPEN_CONNS", "integer", &mut config.database.max_open_conns)?;
    env.parse("DB_MAX_IDLE_CONNS", "integer", &mut config.database.max_idle_conns)?;

    env.string("API_KEY", &mut config.api.key);

    if let Some(origins) = env.get("ALLOWED_ORIGINS") {
        config.server.allowed_origins = origins
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
    }
    env.parse("CONNECTIONS_LIMIT", "integer", &mut config.server.connections_limit)?;
    env.parse("RATE_LIMIT", "integer", &mut config.server.rate_limit.per_ip_limit)?;
    env.parse(
        "RATE_LIMIT_CLEAR_INTERVAL_SECS",
        "integer",
        &mut config.server.rate_limit.clear_interval_secs,
    )?;

    env.string("LOG_LEVEL", &mut config.observability.log_level);
    if let Some(format) = env.get("LOG_FORMAT") {
        config.observability.log_format = match format.to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "LOG_FORMAT",
                    value: format,
                    expected: "log format",
                })
            }
        };
    }
    env.parse_bool("METRICS_ENABLED", &mut config.observability.metrics_enabled)?;
    env.string("METRICS_ADDRESS", &mut config.observability.metrics_address);

    Ok(config)
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.is_empty())
    }

    fn string(&self, key: &str, slot: &mut String) {
        if let Some(value) = self.get(key) {
            *slot = value;
        }
    }

    fn parse<T: FromStr>(&self, key: &'static str, expected: &'static str, slot: &mut T) -> Result<(), ConfigError> {
        if let Some(value) = self.get(key) {
            *slot = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key,
                value: value.clone(),
                expected,
            })?;
        }
        Ok(())
    }

    /// Accepts the usual spellings: 1/0, t/f, true/false in any case.
    fn parse_bool(&self, key: &'static str, slot: &mut bool) -> Result<(), ConfigError> {
        if let Some(value) = self.get(key) {
            *slot = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "t" | "true" => true,
                "0" | "f" | "false" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key,
                        value,
                        expected: "boolean",
                    })
                }
            };
        }
        Ok(())
    }
}
