//! Library target for the `lhls-faker` package.
//!
//! The primary deliverable is the `lhls-faker` binary (`src/main.rs`); the
//! modules live here so the router can be exercised in-process by tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod server;

pub use error::{ApiError, AppError, Result};
