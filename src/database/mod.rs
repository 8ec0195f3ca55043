//! Storage subsystem.
//!
//! # Data Flow
//! ```text
//! DatabaseConfig
//!     → sqlite.rs (connect options + pragmas → pool → ping → schema)
//!     → SqliteDb (cheap to clone, shared through the HTTP state)
//! ```
//!
//! # Design Decisions
//! - Bootstrap failures are fatal: the server never starts without storage
//! - Schema creation is idempotent and runs on every start

pub mod sqlite;

pub use sqlite::{DatabaseError, SqliteDb};
