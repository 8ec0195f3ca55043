//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs)
//!     → .env + process environment (loader.rs)
//!     → validation.rs (semantic checks, all errors collected)
//!     → AppConfig (validated, immutable)
//!     → shared via Arc with the HTTP state
//! ```
//!
//! # Design Decisions
//! - Fail fast: any configuration error aborts startup before routes exist
//! - Config is immutable once loaded; changes require a restart
//! - Validation separates parsing errors from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    ApiConfig, AppConfig, DatabaseConfig, LogFormat, ObservabilityConfig, RateLimitConfig, ServerConfig,
};
pub use validation::{validate_config, ValidationError};
