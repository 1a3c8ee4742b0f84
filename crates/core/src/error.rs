//! Error types shared across the latent-ratings workspace

use thiserror::Error;

/// Errors raised by the factorization engine and its collaborators
#[derive(Debug, Error)]
pub enum RatingsError {
    /// A configuration value is missing, unparseable, or outside its valid range
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        /// The configuration key or field that failed, when known
        key: Option<String>,
    },

    #[error("User index {user} is out of range (num_users = {num_users})")]
    UserOutOfRange { user: usize, num_users: usize },

    #[error("Item index {item} is out of range (num_items = {num_items})")]
    ItemOutOfRange { item: usize, num_items: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed record at line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("Cannot evaluate over an empty set of observations")]
    EmptyEvaluationSet,
}

impl RatingsError {
    /// Create a configuration error tied to a specific key
    pub fn configuration(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// The configuration key associated with this error, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Configuration { key, .. } => key.as_deref(),
            _ => None,
        }
    }
}
