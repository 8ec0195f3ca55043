//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (throttle in-flight requests)
//!     → rate_limit.rs (fixed window per client IP)
//!     → headers.rs (CORS, nosniff, frame deny)
//!     → auth.rs (per-route bearer key, opt-in via interceptor)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: every rejection is a JSON envelope with a fixed message
//! - API key comparison is constant time

pub mod auth;
pub mod headers;
pub mod limits;
pub mod rate_limit;

pub use auth::{require_api_key, ApiKey, AuthFailure};
pub use limits::InFlightLimit;
pub use rate_limit::{Decision, RateLimiter};
