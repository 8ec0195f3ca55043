//! Configuration validation.
//!
//! # Responsibilities
//! - Required settings are present
//! - Limits and timeouts are non-zero
//! - Pool sizes are consistent
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: &AppConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required environment variable {0} is not set")]
    MissingRequired(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("DB_MAX_IDLE_CONNS ({idle}) exceeds DB_MAX_OPEN_CONNS ({open})")]
    IdleExceedsOpen { idle: u32, open: u32 },

    #[error("invalid METRICS_ADDRESS {0:?}")]
    MetricsAddress(String),
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.database.path.trim().is_empty() {
        errors.push(ValidationError::MissingRequired("DB_PATH"));
    }
    if config.api.key.is_empty() {
        errors.push(ValidationError::MissingRequired("API_KEY"));
    }

    let non_zero = [
        ("DB_MAX_OPEN_CONNS", config.database.max_open_conns as u64),
        ("CONNECTIONS_LIMIT", config.server.connections_limit as u64),
        ("RATE_LIMIT", config.server.rate_limit.per_ip_limit as u64),
        (
            "RATE_LIMIT_CLEAR_INTERVAL_SECS",
            config.server.rate_limit.clear_interval_secs,
        ),
        ("request_size_limit", config.server.request_size_limit as u64),
        ("handler_timeout_secs", config.server.handler_timeout_secs),
    ];
    for (name, value) in non_zero {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }

    if config.database.max_idle_conns > config.database.max_open_conns {
        errors.push(ValidationError::IdleExceedsOpen {
            idle: config.database.max_idle_conns,
            open: config.database.max_open_conns,
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
