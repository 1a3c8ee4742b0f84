//! # Latent Ratings Engine
//!
//! Learns low-rank user and item factors from sparse ratings by per-observation
//! gradient descent, and predicts unobserved ratings as inner products.
//!
//! ## Modules
//!
//! - `ratings`: sparse rating container and CSV loader
//! - `adjacency`: user -> items / item -> users index used by training
//! - `matrix_factorization`: the factorization engine
//! - `split`: train/test partitioning
//! - `evaluation`: MAE, baseline MAE and classification accuracy
//!
//! ## Example
//!
//! ```
//! use latent_ratings_engine::{FactorizationConfig, MatrixFactorization, Ratings};
//!
//! let ratings: Ratings = vec![((0, 0), 5.0), ((0, 1), 1.0), ((1, 0), 1.0)]
//!     .into_iter()
//!     .collect();
//! let config = FactorizationConfig {
//!     latent_dim: 2,
//!     num_users: 2,
//!     num_items: 2,
//!     ..FactorizationConfig::default()
//! };
//!
//! let mut model = MatrixFactorization::with_seed(ratings, config, 42).unwrap();
//! let report = model.fit();
//! assert_eq!(report.sweeps.len(), 15);
//! assert!(model.predict(1, 1).unwrap().is_finite());
//! ```

pub mod adjacency;
pub mod evaluation;
pub mod matrix_factorization;
pub mod ratings;
pub mod split;

/// Row index into the user factor table
pub type UserId = usize;
/// Row index into the item factor table
pub type ItemId = usize;

pub use adjacency::AdjacencyIndex;
pub use evaluation::{
    classification_accuracy, constant_baseline_mae, mean_absolute_error, ClipRange,
    RatingPredictor,
};
pub use matrix_factorization::{
    FactorizationConfig, FitReport, MatrixFactorization, SweepStats, UpdateMode,
};
pub use ratings::{load_ratings, LoadOptions, RatingTransform, Ratings};
pub use split::train_test_split;

pub use latent_ratings_core::{RatingsError, Result};
