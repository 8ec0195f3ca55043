//! Versioned JSON API backend assembled from a declarative route tree.
//!
//! # Architecture Overview
//!
//! ```text
//!   feature modules ──▶ RouteTree ──▶ printer (listing)
//!   (RouteProvider)        │
//!                          ▼
//!                     materializer ──▶ axum Router ──▶ global middleware ──▶ serve
//!
//!   Cross-cutting: config, database, observability, security, lifecycle
//! ```

pub mod admin;
pub mod config;
pub mod database;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::AppConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::{RouteProvider, RoutingContext};
