//! # TeamTask Shared Library
//!
//! Domain types, business rules and persistence used by the TeamTask API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their CRUD operations
//! - `auth`: Password hashing, JWT tokens, request identity and permission checks
//! - `db`: Connection pool and migrations
//! - `module_key`: Month/week/user/subject grouping labels for tasks
//! - `stats`: Per-user and team task statistics
//! - `schedule`: Time-slot schedule view model and its HTML rendering

pub mod auth;
pub mod db;
pub mod models;
pub mod module_key;
pub mod schedule;
pub mod stats;

/// Current version of the TeamTask shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
