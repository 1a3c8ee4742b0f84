//! Structured logging for latent-ratings binaries and tests
//!
//! Training emits `tracing` events (fit lifecycle, per-sweep diagnostics).
//! This module installs the subscriber that renders them, either as
//! human-readable lines or as JSON.
//!
//! # Example
//!
//! ```rust,no_run
//! use latent_ratings_core::telemetry::{init_tracing, LogFormat, TracingConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TracingConfig {
//!         service_name: "mf-train".to_string(),
//!         log_level: "debug".to_string(),
//!         format: LogFormat::Json,
//!     };
//!
//!     init_tracing(config)?;
//!     Ok(())
//! }
//! ```

pub mod tracing;

pub use self::tracing::{init_tracing, training_span, LogFormat, TelemetryError, TracingConfig};
