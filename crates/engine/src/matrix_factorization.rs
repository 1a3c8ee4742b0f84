//! Matrix Factorization using per-observation gradient descent
//!
//! Decomposes a sparse user-item rating matrix into user factors `U` and item
//! factors `V` so that `dot(U[user], V[item])` approximates the observed
//! rating. Each sweep decays the learning rate, then updates every observed
//! user row against its rated items, then every observed item row against its
//! rating users.

use latent_ratings_core::config::{env_flag, parse_env_var, ConfigLoader};
use latent_ratings_core::telemetry::training_span;
use latent_ratings_core::{RatingsError, Result};
use ndarray::{Array1, Array2, ArrayView1, Zip};
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::adjacency::{AdjacencyIndex, Neighbours};
use crate::evaluation::RatingPredictor;
use crate::ratings::Ratings;
use crate::{ItemId, UserId};

/// How factor rows are updated within a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Sequential, in ascending index order, each observation applied
    /// immediately to the row it updates
    #[default]
    InPlace,
    /// Every row's step for a pass is computed from the row's value at the
    /// start of that pass and applied once; rows update in parallel.
    /// Produces different numbers than `InPlace`.
    Snapshot,
}

impl FromStr for UpdateMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in_place" | "inplace" | "in-place" => Ok(Self::InPlace),
            "snapshot" => Ok(Self::Snapshot),
            other => Err(format!(
                "unknown update mode '{}' (expected in_place or snapshot)",
                other
            )),
        }
    }
}

/// Hyperparameters for one factorization engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorizationConfig {
    /// Length of every factor row
    pub latent_dim: usize,
    /// L2 regularization strength
    pub lambda: f64,
    /// Initial learning rate
    pub eta: f64,
    /// Multiplicative learning-rate decay applied at the start of every sweep
    pub decay: f64,
    /// Number of sweeps `fit` performs
    pub num_iterations: usize,
    /// Upper bound on user indices; `U` has this many rows
    pub num_users: usize,
    /// Upper bound on item indices; `V` has this many rows
    pub num_items: usize,
    /// Log every sweep at info level instead of debug
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub update_mode: UpdateMode,
}

impl Default for FactorizationConfig {
    fn default() -> Self {
        Self {
            latent_dim: 15,
            lambda: 1e-3,
            eta: 1e-4,
            decay: 0.9,
            num_iterations: 15,
            num_users: 10_000,
            num_items: 300_000,
            verbose: false,
            update_mode: UpdateMode::InPlace,
        }
    }
}

impl FactorizationConfig {
    /// Effective learning rate during sweep `sweep` (0-based): `eta * decay^(sweep + 1)`
    pub fn learning_rate_at(&self, sweep: usize) -> f64 {
        self.eta * self.decay.powf((sweep + 1) as f64)
    }
}

impl ConfigLoader for FactorizationConfig {
    fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let update_mode = match std::env::var("LATENT_RATINGS_UPDATE_MODE") {
            Ok(raw) => raw.parse::<UpdateMode>().map_err(|message| {
                RatingsError::configuration(message, "LATENT_RATINGS_UPDATE_MODE")
            })?,
            Err(_) => defaults.update_mode,
        };

        Ok(Self {
            latent_dim: parse_env_var("LATENT_RATINGS_LATENT_DIM", defaults.latent_dim)?,
            lambda: parse_env_var("LATENT_RATINGS_LAMBDA", defaults.lambda)?,
            eta: parse_env_var("LATENT_RATINGS_ETA", defaults.eta)?,
            decay: parse_env_var("LATENT_RATINGS_DECAY", defaults.decay)?,
            num_iterations: parse_env_var(
                "LATENT_RATINGS_NUM_ITERATIONS",
                defaults.num_iterations,
            )?,
            num_users: parse_env_var("LATENT_RATINGS_NUM_USERS", defaults.num_users)?,
            num_items: parse_env_var("LATENT_RATINGS_NUM_ITEMS", defaults.num_items)?,
            verbose: env_flag("LATENT_RATINGS_VERBOSE", defaults.verbose),
            update_mode,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.latent_dim == 0 {
            return Err(RatingsError::configuration(
                "latent_dim must be greater than 0",
                "latent_dim",
            ));
        }

        if self.num_iterations == 0 {
            return Err(RatingsError::configuration(
                "num_iterations must be greater than 0",
                "num_iterations",
            ));
        }

        if !(self.eta.is_finite() && self.eta > 0.0) {
            return Err(RatingsError::configuration(
                format!("eta must be a positive finite number, got {}", self.eta),
                "eta",
            ));
        }

        if !(self.lambda.is_finite() && self.lambda >= 0.0) {
            return Err(RatingsError::configuration(
                format!(
                    "lambda must be a non-negative finite number, got {}",
                    self.lambda
                ),
                "lambda",
            ));
        }

        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(RatingsError::configuration(
                format!("decay must be within (0, 1], got {}", self.decay),
                "decay",
            ));
        }

        Ok(())
    }
}

/// Diagnostics for one completed sweep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepStats {
    pub iteration: usize,
    /// Learning rate used during this sweep
    pub learning_rate: f64,
    /// Mean squared error over the training observations after the sweep
    pub train_mse: f64,
}

/// Summary returned by [`MatrixFactorization::fit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub observations: usize,
    pub users_observed: usize,
    pub items_observed: usize,
    pub sweeps: Vec<SweepStats>,
}

impl FitReport {
    pub fn final_train_mse(&self) -> Option<f64> {
        self.sweeps.last().map(|s| s.train_mse)
    }
}

/// Gradient-descent matrix factorization over a fixed training set
///
/// The random source used for initialization is injected at construction.
/// Factor tables start at zero and are randomized at the start of every
/// `fit`; calling `fit` again therefore discards previous training and
/// retrains from fresh draws with the learning rate reset to `eta`.
pub struct MatrixFactorization<R: Rng = StdRng> {
    config: FactorizationConfig,
    ratings: Ratings,
    rng: R,
    /// User latent factors: [num_users x latent_dim]
    user_factors: Array2<f64>,
    /// Item latent factors: [num_items x latent_dim]
    item_factors: Array2<f64>,
    learning_rate: f64,
    fitted: bool,
}

impl MatrixFactorization<StdRng> {
    /// Construct with a `StdRng` seeded from `seed`
    pub fn with_seed(ratings: Ratings, config: FactorizationConfig, seed: u64) -> Result<Self> {
        Self::new(ratings, config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> MatrixFactorization<R> {
    /// Validate `config` and `ratings` and allocate zeroed factor tables
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error for invalid hyperparameters and
    /// `UserOutOfRange` / `ItemOutOfRange` for a rating outside the bounds.
    pub fn new(ratings: Ratings, config: FactorizationConfig, rng: R) -> Result<Self> {
        config.validate()?;

        for (user, item) in ratings.keys() {
            check_user(user, config.num_users)?;
            check_item(item, config.num_items)?;
        }

        let user_factors = Array2::<f64>::zeros((config.num_users, config.latent_dim));
        let item_factors = Array2::<f64>::zeros((config.num_items, config.latent_dim));
        let learning_rate = config.eta;

        Ok(Self {
            config,
            ratings,
            rng,
            user_factors,
            item_factors,
            learning_rate,
            fitted: false,
        })
    }

    /// Train the model on the ratings given at construction
    ///
    /// Always runs exactly `num_iterations` sweeps. Rows for users or items
    /// without ratings keep their random initial values.
    pub fn fit(&mut self) -> FitReport {
        let span = training_span(
            self.ratings.len(),
            self.config.latent_dim,
            self.config.num_iterations,
        );
        let _guard = span.enter();

        let index = AdjacencyIndex::build(&self.ratings);

        if self.ratings.is_empty() {
            warn!("Fitting on an empty rating set; factors will stay at their random initial values");
        }

        info!(
            observations = self.ratings.len(),
            users = index.num_users(),
            items = index.num_items(),
            update_mode = ?self.config.update_mode,
            "Fitting the model"
        );

        self.initialize_factors();
        self.learning_rate = self.config.eta;

        let lambda = self.config.lambda;
        let mut sweeps = Vec::with_capacity(self.config.num_iterations);

        for iteration in 0..self.config.num_iterations {
            self.learning_rate *= self.config.decay;
            let eta = self.learning_rate;

            match self.config.update_mode {
                UpdateMode::InPlace => {
                    update_rows_in_place(
                        &mut self.user_factors,
                        &self.item_factors,
                        index.by_user(),
                        eta,
                        lambda,
                    );
                    update_rows_in_place(
                        &mut self.item_factors,
                        &self.user_factors,
                        index.by_item(),
                        eta,
                        lambda,
                    );
                }
                UpdateMode::Snapshot => {
                    update_rows_snapshot(
                        &mut self.user_factors,
                        &self.item_factors,
                        index.by_user(),
                        eta,
                        lambda,
                    );
                    update_rows_snapshot(
                        &mut self.item_factors,
                        &self.user_factors,
                        index.by_item(),
                        eta,
                        lambda,
                    );
                }
            }

            let train_mse = self.training_mse();
            if self.config.verbose {
                info!(iteration, learning_rate = eta, train_mse, "Sweep complete");
            } else {
                debug!(iteration, learning_rate = eta, train_mse, "Sweep complete");
            }

            sweeps.push(SweepStats {
                iteration,
                learning_rate: eta,
                train_mse,
            });
        }

        self.fitted = true;

        FitReport {
            observations: self.ratings.len(),
            users_observed: index.num_users(),
            items_observed: index.num_items(),
            sweeps,
        }
    }

    /// Predicted rating for a user-item pair: `dot(U[user], V[item])`
    ///
    /// No clipping is applied. Before `fit` the tables are zero, so every
    /// prediction is 0.0.
    pub fn predict(&self, user: UserId, item: ItemId) -> Result<f64> {
        Ok(self.user_row(user)?.dot(&self.item_row(item)?))
    }

    /// Copy of the user factor table
    pub fn user_factors(&self) -> Array2<f64> {
        self.user_factors.clone()
    }

    /// Copy of the item factor table
    pub fn item_factors(&self) -> Array2<f64> {
        self.item_factors.clone()
    }

    pub fn user_embedding(&self, user: UserId) -> Result<Vec<f64>> {
        Ok(self.user_row(user)?.to_vec())
    }

    pub fn item_embedding(&self, item: ItemId) -> Result<Vec<f64>> {
        Ok(self.item_row(item)?.to_vec())
    }

    pub fn config(&self) -> &FactorizationConfig {
        &self.config
    }

    pub fn ratings(&self) -> &Ratings {
        &self.ratings
    }

    /// Learning rate after the most recent sweep (`eta` before any `fit`)
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    /// Mean squared error of the current factors over the training ratings
    pub fn training_mse(&self) -> f64 {
        if self.ratings.is_empty() {
            return 0.0;
        }

        let total: f64 = self
            .ratings
            .iter()
            .map(|((user, item), rating)| {
                let prediction = self.user_factors.row(user).dot(&self.item_factors.row(item));
                (prediction - rating).powi(2)
            })
            .sum();

        total / self.ratings.len() as f64
    }

    /// Overwrite `U` then `V`, row-major, with draws from `Uniform[0, 1)`
    fn initialize_factors(&mut self) {
        let uniform = Uniform::new(0.0, 1.0);

        for value in self.user_factors.iter_mut() {
            *value = self.rng.sample(&uniform);
        }
        for value in self.item_factors.iter_mut() {
            *value = self.rng.sample(&uniform);
        }
    }

    fn user_row(&self, user: UserId) -> Result<ArrayView1<'_, f64>> {
        check_user(user, self.config.num_users)?;
        Ok(self.user_factors.row(user))
    }

    fn item_row(&self, item: ItemId) -> Result<ArrayView1<'_, f64>> {
        check_item(item, self.config.num_items)?;
        Ok(self.item_factors.row(item))
    }
}

impl<R: Rng> RatingPredictor for MatrixFactorization<R> {
    fn predict(&self, user: UserId, item: ItemId) -> Result<f64> {
        MatrixFactorization::predict(self, user, item)
    }
}

fn check_user(user: UserId, num_users: usize) -> Result<()> {
    if user >= num_users {
        return Err(RatingsError::UserOutOfRange { user, num_users });
    }
    Ok(())
}

fn check_item(item: ItemId, num_items: usize) -> Result<()> {
    if item >= num_items {
        return Err(RatingsError::ItemOutOfRange { item, num_items });
    }
    Ok(())
}

/// One pass over `rows`, applying each observation's gradient immediately
///
/// `row <- row - eta * (2 * e * other + lambda * row)` with
/// `e = dot(row, other) - rating`, where `row` already reflects the earlier
/// observations of the same pass.
fn update_rows_in_place(
    rows: &mut Array2<f64>,
    others: &Array2<f64>,
    neighbours: &Neighbours,
    eta: f64,
    lambda: f64,
) {
    for (&row_idx, observations) in neighbours {
        let mut row = rows.row_mut(row_idx);

        for &(other_idx, rating) in observations {
            let other = others.row(other_idx);
            let residual = row.dot(&other) - rating;

            Zip::from(&mut row).and(&other).for_each(|value, &o| {
                *value = *value - eta * (2.0 * residual * o + lambda * *value);
            });
        }
    }
}

/// One pass over `rows` where every step is computed from the row's value at
/// the start of the pass, then applied in a single update per row
fn update_rows_snapshot(
    rows: &mut Array2<f64>,
    others: &Array2<f64>,
    neighbours: &Neighbours,
    eta: f64,
    lambda: f64,
) {
    Zip::indexed(rows.rows_mut()).par_for_each(|row_idx, mut row| {
        let Some(observations) = neighbours.get(&row_idx) else {
            return;
        };

        let snapshot = row.to_owned();
        let mut step = Array1::<f64>::zeros(snapshot.len());

        for &(other_idx, rating) in observations {
            let other = others.row(other_idx);
            let residual = snapshot.dot(&other) - rating;

            Zip::from(&mut step)
                .and(&snapshot)
                .and(&other)
                .for_each(|s, &current, &o| {
                    *s += 2.0 * residual * o + lambda * current;
                });
        }

        row.scaled_add(-eta, &step);
    });
}
