use anyhow::{Context, Result};
use latent_ratings_engine::{
    ClipRange, FactorizationConfig, LoadOptions, RatingTransform, UpdateMode,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for both experiments
///
/// Read from an optional TOML file, then overlaid with `MF_`-prefixed
/// environment variables using `__` as the section separator, e.g.
/// `MF_REGRESS__LATENT_DIM=20` or `MF_CLASSIFY__UPDATE_MODE=snapshot`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExperimentConfig {
    /// Rating file used when `--data` is not given
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    #[serde(default)]
    pub regress: RegressionConfig,

    #[serde(default)]
    pub classify: ClassificationConfig,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data/ratings.csv")
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            regress: RegressionConfig::default(),
            classify: ClassificationConfig::default(),
        }
    }
}

/// Rating regression scored by clipped MAE against a constant guess
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegressionConfig {
    pub latent_dim: usize,
    pub lambda: f64,
    pub eta: f64,
    pub decay: f64,
    pub num_iterations: usize,
    pub num_users: usize,
    pub num_items: usize,
    pub update_mode: UpdateMode,
    pub verbose: bool,
    pub sampling_rate: f64,
    pub train_ratio: f64,
    pub clip_min: f64,
    pub clip_max: f64,
    /// Constant prediction the model is compared against
    pub baseline_guess: f64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            latent_dim: 15,
            lambda: 1e-3,
            eta: 1e-4,
            decay: 0.9,
            num_iterations: 15,
            num_users: 10_000,
            num_items: 300_000,
            update_mode: UpdateMode::InPlace,
            verbose: true,
            sampling_rate: 1.0,
            train_ratio: 0.8,
            clip_min: 1.0,
            clip_max: 5.0,
            baseline_guess: 3.0,
        }
    }
}

impl RegressionConfig {
    pub fn engine(&self) -> FactorizationConfig {
        FactorizationConfig {
            latent_dim: self.latent_dim,
            lambda: self.lambda,
            eta: self.eta,
            decay: self.decay,
            num_iterations: self.num_iterations,
            num_users: self.num_users,
            num_items: self.num_items,
            verbose: self.verbose,
            update_mode: self.update_mode,
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            sampling_rate: self.sampling_rate,
            transform: RatingTransform::Identity,
        }
    }

    pub fn clip(&self) -> Result<ClipRange> {
        ClipRange::new(self.clip_min, self.clip_max).context("Invalid regress.clip_min/clip_max")
    }
}

/// Like/dislike classification scored by thresholded accuracy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassificationConfig {
    pub latent_dim: usize,
    pub lambda: f64,
    pub eta: f64,
    pub decay: f64,
    pub num_iterations: usize,
    pub num_users: usize,
    pub num_items: usize,
    pub update_mode: UpdateMode,
    pub verbose: bool,
    pub sampling_rate: f64,
    pub train_ratio: f64,
    /// Ratings strictly below this are dislikes
    pub dislike_below: f64,
    /// Ratings strictly above this are likes
    pub like_above: f64,
    /// Predictions are compared against this to decide like vs dislike
    pub threshold: f64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            latent_dim: 15,
            lambda: 1e-2,
            eta: 1e-5,
            decay: 0.9,
            num_iterations: 15,
            num_users: 165_000,
            num_items: 250_000,
            update_mode: UpdateMode::InPlace,
            verbose: true,
            sampling_rate: 0.5,
            train_ratio: 0.8,
            dislike_below: 2.5,
            like_above: 3.5,
            threshold: 0.5,
        }
    }
}

impl ClassificationConfig {
    pub fn engine(&self) -> FactorizationConfig {
        FactorizationConfig {
            latent_dim: self.latent_dim,
            lambda: self.lambda,
            eta: self.eta,
            decay: self.decay,
            num_iterations: self.num_iterations,
            num_users: self.num_users,
            num_items: self.num_items,
            verbose: self.verbose,
            update_mode: self.update_mode,
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            sampling_rate: self.sampling_rate,
            transform: RatingTransform::Binary {
                dislike_below: self.dislike_below,
                like_above: self.like_above,
            },
        }
    }
}

impl ExperimentConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// With `path` the file must exist; without it `config/mf-train.toml`
    /// is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("config/mf-train").required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("MF")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read experiment configuration")?;

        settings
            .try_deserialize()
            .context("Invalid experiment configuration")
    }
}
