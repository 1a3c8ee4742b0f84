//! Held-out evaluation of rating predictors
//!
//! The engine returns raw inner products; how they are clipped or
//! thresholded is decided here, per call site.

use latent_ratings_core::{RatingsError, Result};
use serde::{Deserialize, Serialize};

use crate::ratings::Ratings;
use crate::{ItemId, UserId};

/// Anything that can score a (user, item) pair
pub trait RatingPredictor {
    fn predict(&self, user: UserId, item: ItemId) -> Result<f64>;
}

/// Closed interval predictions are clamped into before scoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipRange {
    pub min: f64,
    pub max: f64,
}

impl Default for ClipRange {
    fn default() -> Self {
        Self { min: 0.5, max: 5.0 }
    }
}

impl ClipRange {
    /// # Errors
    ///
    /// Returns a `Configuration` error unless `min <= max` and both are finite.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite() && self.min <= self.max) {
            return Err(RatingsError::configuration(
                format!("invalid clip range [{}, {}]", self.min, self.max),
                "clip",
            ));
        }
        Ok(())
    }

    pub fn clip(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Mean absolute error of clipped predictions over `test`
///
/// # Errors
///
/// Returns `EmptyEvaluationSet` when `test` is empty, and propagates
/// prediction errors (e.g. out-of-range indices).
pub fn mean_absolute_error<P>(model: &P, test: &Ratings, clip: ClipRange) -> Result<f64>
where
    P: RatingPredictor + ?Sized,
{
    clip.validate()?;
    if test.is_empty() {
        return Err(RatingsError::EmptyEvaluationSet);
    }

    let mut total = 0.0;
    for ((user, item), rating) in test.iter() {
        let prediction = clip.clip(model.predict(user, item)?);
        total += (rating - prediction).abs();
    }

    Ok(total / test.len() as f64)
}

/// Mean absolute error of always predicting `guess`
pub fn constant_baseline_mae(test: &Ratings, guess: f64) -> Result<f64> {
    if test.is_empty() {
        return Err(RatingsError::EmptyEvaluationSet);
    }

    let total: f64 = test.iter().map(|(_, rating)| (guess - rating).abs()).sum();
    Ok(total / test.len() as f64)
}

/// Fraction of like/dislike observations classified correctly
///
/// A pair counts as correct when the prediction is strictly below
/// `threshold` and the label is 0, or strictly above it and the label is 1.
pub fn classification_accuracy<P>(model: &P, test: &Ratings, threshold: f64) -> Result<f64>
where
    P: RatingPredictor + ?Sized,
{
    if test.is_empty() {
        return Err(RatingsError::EmptyEvaluationSet);
    }

    let mut correct = 0usize;
    for ((user, item), label) in test.iter() {
        let prediction = model.predict(user, item)?;
        if (prediction < threshold && label == 0.0) || (prediction > threshold && label == 1.0) {
            correct += 1;
        }
    }

    Ok(correct as f64 / test.len() as f64)
}
