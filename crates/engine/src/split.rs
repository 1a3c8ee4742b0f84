//! Train/test partitioning of a rating set

use latent_ratings_core::{RatingsError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::ratings::Ratings;

/// Shuffle the observations and split them into (train, test)
///
/// The training set receives exactly `floor(len * train_ratio)` observations;
/// the rest go to the test set. Which observations land where depends only
/// on `rng`.
///
/// # Errors
///
/// Returns a `Configuration` error if `train_ratio` is outside [0, 1].
pub fn train_test_split<R>(ratings: &Ratings, train_ratio: f64, rng: &mut R) -> Result<(Ratings, Ratings)>
where
    R: Rng + ?Sized,
{
    if !(0.0..=1.0).contains(&train_ratio) {
        return Err(RatingsError::configuration(
            format!("train_ratio must be within [0, 1], got {}", train_ratio),
            "train_ratio",
        ));
    }

    let mut keys: Vec<_> = ratings.keys().collect();
    keys.shuffle(rng);

    let train_size = (keys.len() as f64 * train_ratio) as usize;
    let mut train = Ratings::new();
    let mut test = Ratings::new();

    for (position, (user, item)) in keys.into_iter().enumerate() {
        let Some(rating) = ratings.get(user, item) else {
            continue;
        };
        if position < train_size {
            train.insert(user, item, rating);
        } else {
            test.insert(user, item, rating);
        }
    }

    debug!(train = train.len(), test = test.len(), "Split ratings");

    Ok((train, test))
}
