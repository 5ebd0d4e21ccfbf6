//! Structured logging for Portico servers.
//!
//! This crate wires the tracing-subscriber ecosystem into Portico with
//! environment-appropriate defaults: pretty output with span events in
//! development, JSON lines in production.
//!
//! # Example
//!
//! ```rust,ignore
//! use portico_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::for_environment("production"))?;
//! ```

#![warn(missing_docs)]

mod error;
mod logging;

pub use error::TelemetryError;
pub use logging::{fields, init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
