//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Providers → Build tree → Print listing → Materialize → Discard tree
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain requests → Close database
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config, database, routes, then listener
//! - Shutdown has a deadline: forced exit after the grace period

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{drain, Shutdown};
pub use signals::shutdown_signal;
pub use startup::{build_dispatcher, BuiltRoutes, MaterializedRoutes, StartupError, API_ROOT};
