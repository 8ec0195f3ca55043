//! Configuration schema definitions.
//!
//! All types derive `Deserialize` so a TOML file can seed them; every
//! section has defaults, and environment variables are layered on top by
//! the loader.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

/// Root configuration for the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// TCP port the HTTP server listens on.
    pub port: u16,

    pub database: DatabaseConfig,

    pub api: ApiConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Listening address on all interfaces.
    pub fn bind_address(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

/// SQLite settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file path. Required.
    pub path: String,

    /// Enable write-ahead logging and the pragmas that go with it.
    pub wal_mode: bool,

    /// Busy timeout, idle timeout and connection lifetime, in seconds.
    pub timeout_secs: u64,

    pub max_open_conns: u32,

    /// Connections kept open while idle. Extra connections close after
    /// `timeout_secs` without use.
    pub max_idle_conns: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            wal_mode: true,
            timeout_secs: 30,
            max_open_conns: 5,
            max_idle_conns: 2,
        }
    }
}

/// Shared-secret API settings.
#[derive(Clone, Deserialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Bearer key expected by authenticated routes. Required.
    pub key: String,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("key", &if self.key.is_empty() { "<unset>" } else { "<redacted>" })
            .finish()
    }
}

/// Per-IP request rate limit.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per client IP in one window.
    pub per_ip_limit: u32,

    /// Window length in seconds.
    pub clear_interval_secs: u64,
}

impl RateLimitConfig {
    pub fn clear_interval(&self) -> Duration {
        Duration::from_secs(self.clear_interval_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_ip_limit: 10,
            clear_interval_secs: 60,
        }
    }
}

/// HTTP server limits and timeouts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// CORS origins; `*` allows any.
    pub allowed_origins: Vec<String>,

    /// Maximum requests processed at once.
    pub connections_limit: usize,

    pub rate_limit: RateLimitConfig,

    /// Request body ceiling in bytes.
    pub request_size_limit: usize,

    pub read_timeout_secs: u64,

    pub write_timeout_secs: u64,

    /// Upper bound on a single handler run.
    pub handler_timeout_secs: u64,
}

impl ServerConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs)
    }

    /// How long in-flight requests may drain after a shutdown signal.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs.max(self.write_timeout_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            connections_limit: 100,
            rate_limit: RateLimitConfig::default(),
            request_size_limit: 10 * 1024, // 10 KB
            read_timeout_secs: 10,
            write_timeout_secs: 20,
            handler_timeout_secs: 25,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    pub metrics_address: String,
}

impl ObservabilityConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub fn default_filter(&self) -> String {
        format!("api_backend={0},tower_http={0}", self.log_level)
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database: DatabaseConfig::default(),
            api: ApiConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
