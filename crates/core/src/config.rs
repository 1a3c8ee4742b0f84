//! Shared configuration loader for latent-ratings components
//!
//! Configuration values are read from environment variables, optionally
//! seeded from a `.env` file. Every loader validates its values before they
//! reach the engine so that degenerate settings fail early with a clear
//! message and the offending key.
//!
//! # Example
//!
//! ```no_run
//! use latent_ratings_core::config::{load_dotenv, parse_env_var};
//!
//! load_dotenv();
//! let latent_dim: usize = parse_env_var("LATENT_RATINGS_LATENT_DIM", 15).unwrap();
//! assert!(latent_dim > 0);
//! ```

use crate::error::RatingsError;

/// Configuration loader trait
///
/// Provides standardized methods for loading and validating configuration from
/// environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything not set.
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if a variable is set but cannot be parsed.
    fn from_env() -> Result<Self, RatingsError>;

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error naming the first invalid field.
    fn validate(&self) -> Result<(), RatingsError>;
}

/// Parse an environment variable, returning `default` when it is not set
///
/// # Errors
///
/// Returns a `Configuration` error if the value is present but cannot be parsed
pub fn parse_env_var<T>(key: &str, default: T) -> Result<T, RatingsError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| RatingsError::Configuration {
                    message: format!("Failed to parse {}: {}", key, e),
                    key: Some(key.to_string()),
                })
        })
        .unwrap_or(Ok(default))
}

/// Parse a boolean flag from the environment (`1`, `true`, `yes`, `on`)
pub fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// Load .env file if present
///
/// A missing `.env` file is not an error; any other failure is reported on
/// stderr because logging may not be initialized yet.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }
}
