//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, global middleware)
//!     → request.rs (request ID, JSON decoding)
//!     → [materialized route tree dispatches to a handler]
//!     → response.rs (JSON envelope, error mapping)
//!     → Send to client
//! ```

pub mod health;
pub mod request;
pub mod response;
pub mod server;

pub use request::{decode_json, StrictJson, X_REQUEST_ID};
pub use response::{ok, respond_with_json, ApiError, ApiResponse};
pub use server::{AppState, HttpServer};
