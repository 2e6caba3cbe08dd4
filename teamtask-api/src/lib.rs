//! # TeamTask API Server Library
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from environment variables
//! - `error`: `ApiError` and the failure envelope
//! - `response`: The success envelope
//! - `extract`: Validating JSON/query/path extractors
//! - `middleware`: Security headers
//! - `routes`: Route handlers per resource
//! - `telemetry`: Tracing subscriber setup

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod telemetry;
