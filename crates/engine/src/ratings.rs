//! Sparse rating observations and the delimited-text loader that produces them

use latent_ratings_core::{RatingsError, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::{ItemId, UserId};

/// Sparse (user, item) -> rating mapping
///
/// Keys are unique and iterate in ascending (user, item) order, which keeps
/// training sweeps reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ratings {
    entries: BTreeMap<(UserId, ItemId), f64>,
}

impl Ratings {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert a rating, returning the previous value for the pair if any
    pub fn insert(&mut self, user: UserId, item: ItemId, rating: f64) -> Option<f64> {
        self.entries.insert((user, item), rating)
    }

    pub fn get(&self, user: UserId, item: ItemId) -> Option<f64> {
        self.entries.get(&(user, item)).copied()
    }

    pub fn contains(&self, user: UserId, item: ItemId) -> bool {
        self.entries.contains_key(&(user, item))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate observations in ascending (user, item) order
    pub fn iter(&self) -> impl Iterator<Item = ((UserId, ItemId), f64)> + '_ {
        self.entries.iter().map(|(&key, &rating)| (key, rating))
    }

    pub fn keys(&self) -> impl Iterator<Item = (UserId, ItemId)> + '_ {
        self.entries.keys().copied()
    }

    /// One past the largest user index present (0 when empty)
    pub fn num_users(&self) -> usize {
        self.entries
            .keys()
            .map(|&(user, _)| user + 1)
            .max()
            .unwrap_or(0)
    }

    /// One past the largest item index present (0 when empty)
    pub fn num_items(&self) -> usize {
        self.entries
            .keys()
            .map(|&(_, item)| item + 1)
            .max()
            .unwrap_or(0)
    }
}

impl FromIterator<((UserId, ItemId), f64)> for Ratings {
    fn from_iter<I: IntoIterator<Item = ((UserId, ItemId), f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// How raw rating values are mapped while loading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RatingTransform {
    /// Keep ratings as they appear in the file
    #[default]
    Identity,
    /// Map ratings to like (1.0) / dislike (0.0), dropping the ambiguous middle
    Binary {
        /// Ratings strictly below this become 0.0
        dislike_below: f64,
        /// Ratings strictly above this become 1.0
        like_above: f64,
    },
}

impl RatingTransform {
    /// Binary transform used for like/dislike classification
    pub fn like_dislike() -> Self {
        Self::Binary {
            dislike_below: 2.5,
            like_above: 3.5,
        }
    }

    /// Apply the transform; `None` means the observation is dropped
    pub fn apply(&self, rating: f64) -> Option<f64> {
        match *self {
            Self::Identity => Some(rating),
            Self::Binary {
                dislike_below,
                like_above,
            } => {
                if rating < dislike_below {
                    Some(0.0)
                } else if rating > like_above {
                    Some(1.0)
                } else {
                    None
                }
            }
        }
    }
}

/// Options for [`load_ratings`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Probability of keeping each data line, in [0, 1]
    pub sampling_rate: f64,
    #[serde(default)]
    pub transform: RatingTransform,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            sampling_rate: 1.0,
            transform: RatingTransform::Identity,
        }
    }
}

/// Load ratings from a comma-separated file with a header row
///
/// Columns are `user, item, rating`; anything after the third column (such
/// as a timestamp) is ignored. Each data line is kept with probability
/// `options.sampling_rate`, decided before the line is parsed. When a pair
/// occurs more than once, the first kept occurrence wins.
///
/// # Errors
///
/// Returns `Io` if the file cannot be opened or read, `Parse` for a kept line
/// with a missing or malformed field, and `Configuration` for a sampling rate
/// outside [0, 1].
pub fn load_ratings<P, R>(path: P, options: &LoadOptions, rng: &mut R) -> Result<Ratings>
where
    P: AsRef<Path>,
    R: Rng + ?Sized,
{
    if !(0.0..=1.0).contains(&options.sampling_rate) {
        return Err(RatingsError::configuration(
            format!(
                "sampling_rate must be within [0, 1], got {}",
                options.sampling_rate
            ),
            "sampling_rate",
        ));
    }

    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_error)?;

    let mut ratings = Ratings::new();
    let mut lines_read = 0usize;
    let mut dropped = 0usize;

    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        lines_read += 1;

        if !rng.gen_bool(options.sampling_rate) {
            continue;
        }

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let user: UserId = parse_field(&record, 0, "user", line)?;
        let item: ItemId = parse_field(&record, 1, "item", line)?;
        let raw: f64 = parse_field(&record, 2, "rating", line)?;

        if !raw.is_finite() {
            return Err(RatingsError::Parse {
                line,
                message: format!("rating '{}' is not a finite number", raw),
            });
        }

        let Some(rating) = options.transform.apply(raw) else {
            dropped += 1;
            continue;
        };

        if ratings.contains(user, item) {
            debug!(user, item, line, "Ignoring duplicate rating");
            continue;
        }
        ratings.insert(user, item, rating);
    }

    info!(
        path = %path.display(),
        lines = lines_read,
        kept = ratings.len(),
        dropped_by_transform = dropped,
        "Loaded ratings"
    );

    Ok(ratings)
}

fn parse_field<T>(record: &csv::StringRecord, index: usize, name: &str, line: u64) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = record.get(index).ok_or_else(|| RatingsError::Parse {
        line,
        message: format!("missing {} column", name),
    })?;

    raw.parse::<T>().map_err(|e| RatingsError::Parse {
        line,
        message: format!("invalid {} '{}': {}", name, raw, e),
    })
}

fn csv_error(err: csv::Error) -> RatingsError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    match err.into_kind() {
        csv::ErrorKind::Io(io) => RatingsError::Io(io),
        kind => RatingsError::Parse {
            line,
            message: format!("{:?}", kind),
        },
    }
}
