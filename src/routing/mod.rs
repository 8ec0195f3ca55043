//! Route composition subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     RouteProvider[] (feature modules)
//!     → tree.rs (declarative RouteNode tree under /api/v1)
//!     → printer.rs (METHOD /full/path listing for the log)
//!     → materializer.rs (one depth-first pass onto the axum Router)
//!     → tree dropped
//!
//! Runtime:
//!     axum Router only; the tree is never consulted
//! ```
//!
//! # Design Decisions
//! - Single-threaded build on the startup path, no locking
//! - Printer and materializer share placement rules, not state
//! - Insertion order is registration order

pub mod materializer;
pub mod printer;
pub mod provider;
pub mod tree;

pub use materializer::{materialize, Dispatcher, MaterializeError};
pub use printer::{collect_routes, format_routes, write_routes, RouteEntry};
pub use provider::{RouteProvider, RoutingContext};
pub use tree::{Interceptor, Method, NodeKind, RouteNode, RouteTree};
