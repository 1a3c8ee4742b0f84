//! Tracing subscriber configuration and initialization

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Telemetry configuration errors
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Invalid log level: {0} (must be one of trace, debug, info, warn, error)")]
    InvalidLogLevel(String),

    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Configuration for the tracing subscriber
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name recorded on the startup event
    pub service_name: String,

    /// Default level when `RUST_LOG` is not set
    pub log_level: String,

    /// Human-readable or JSON output
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "latent-ratings".to_string(),
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl TracingConfig {
    /// Create config from environment variables
    ///
    /// - SERVICE_NAME: Service identifier
    /// - LATENT_RATINGS_LOG_LEVEL: default level (overridden by RUST_LOG)
    /// - LATENT_RATINGS_LOG_FORMAT: "json" for JSON lines, anything else for pretty
    pub fn from_env() -> Self {
        let service_name =
            std::env::var("SERVICE_NAME").unwrap_or_else(|_| "latent-ratings".to_string());

        let log_level =
            std::env::var("LATENT_RATINGS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let format = match std::env::var("LATENT_RATINGS_LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Self {
            service_name,
            log_level,
            format,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), TelemetryError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(TelemetryError::InvalidLogLevel(self.log_level.clone()));
        }
        Ok(())
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `config.log_level`. Must be called at
/// most once per process.
///
/// # Errors
///
/// Returns error if the configuration is invalid or a global subscriber is
/// already installed.
pub fn init_tracing(config: TracingConfig) -> Result<(), TelemetryError> {
    config.validate()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Json => subscriber
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()
            .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?,
        LogFormat::Pretty => subscriber
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true),
            )
            .try_init()
            .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))?,
    }

    tracing::info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        "Logging initialized"
    );

    Ok(())
}

/// Create the span that wraps one `fit` call
///
/// # Example
///
/// ```rust
/// use latent_ratings_core::telemetry::training_span;
///
/// let span = training_span(3, 15, 10);
/// let _guard = span.enter();
/// ```
pub fn training_span(num_observations: usize, latent_dim: usize, num_iterations: usize) -> Span {
    tracing::info_span!(
        "mf.fit",
        observations = num_observations,
        latent_dim = latent_dim,
        iterations = num_iterations
    )
}
