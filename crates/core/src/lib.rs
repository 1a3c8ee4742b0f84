//! # Latent Ratings Core
//!
//! Shared building blocks for the latent-ratings workspace.
//!
//! ## Modules
//!
//! - `error`: Error type shared by the engine, loaders and evaluators
//! - `config`: Environment-based configuration loading and validation
//! - `telemetry`: Structured logging setup

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{env_flag, load_dotenv, parse_env_var, ConfigLoader};
pub use error::RatingsError;
pub use telemetry::{init_tracing, training_span, LogFormat, TelemetryError, TracingConfig};

/// Result type alias for latent-ratings operations
pub type Result<T> = std::result::Result<T, RatingsError>;
