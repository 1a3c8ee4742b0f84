use anyhow::{Context, Result};
use colored::Colorize;
use latent_ratings_engine::{
    classification_accuracy, constant_baseline_mae, load_ratings, mean_absolute_error,
    train_test_split, FitReport, LoadOptions, MatrixFactorization, Ratings,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{ClassificationConfig, RegressionConfig};

#[derive(Debug, Serialize)]
pub struct RegressionReport {
    pub data: PathBuf,
    pub seed: u64,
    pub train_size: usize,
    pub test_size: usize,
    pub fit: FitReport,
    pub mae: f64,
    pub baseline_mae: f64,
}

#[derive(Debug, Serialize)]
pub struct ClassificationReport {
    pub data: PathBuf,
    pub seed: u64,
    pub train_size: usize,
    pub test_size: usize,
    pub fit: FitReport,
    pub accuracy: f64,
}

pub fn regress(settings: &RegressionConfig, data: &Path, seed: u64) -> Result<RegressionReport> {
    let clip = settings.clip()?;
    let mut rng = StdRng::seed_from_u64(seed);

    let (train, test) = load_and_split(data, &settings.load_options(), settings.train_ratio, &mut rng)?;
    let (train_size, test_size) = (train.len(), test.len());

    let mut model = MatrixFactorization::new(train, settings.engine(), rng)
        .context("Failed to build the factorization model")?;
    let fit = model.fit();

    let mae = mean_absolute_error(&model, &test, clip).context("Failed to score the test set")?;
    let baseline_mae = constant_baseline_mae(&test, settings.baseline_guess)
        .context("Failed to score the constant baseline")?;

    info!(mae, baseline_mae, "Regression finished");

    Ok(RegressionReport {
        data: data.to_path_buf(),
        seed,
        train_size,
        test_size,
        fit,
        mae,
        baseline_mae,
    })
}

pub fn classify(
    settings: &ClassificationConfig,
    data: &Path,
    seed: u64,
) -> Result<ClassificationReport> {
    let mut rng = StdRng::seed_from_u64(seed);

    let (train, test) = load_and_split(data, &settings.load_options(), settings.train_ratio, &mut rng)?;
    let (train_size, test_size) = (train.len(), test.len());

    let mut model = MatrixFactorization::new(train, settings.engine(), rng)
        .context("Failed to build the factorization model")?;
    let fit = model.fit();

    let accuracy = classification_accuracy(&model, &test, settings.threshold)
        .context("Failed to score the test set")?;

    info!(accuracy, "Classification finished");

    Ok(ClassificationReport {
        data: data.to_path_buf(),
        seed,
        train_size,
        test_size,
        fit,
        accuracy,
    })
}

/// Load, then split with the same generator so one seed fixes the whole run
fn load_and_split(
    data: &Path,
    options: &LoadOptions,
    train_ratio: f64,
    rng: &mut StdRng,
) -> Result<(Ratings, Ratings)> {
    let ratings = load_ratings(data, options, rng)
        .with_context(|| format!("Failed to load ratings from {}", data.display()))?;

    train_test_split(&ratings, train_ratio, rng).context("Failed to split ratings")
}

pub fn print_regression(report: &RegressionReport) {
    println!("{}\n", "Rating regression".cyan().bold());
    print_common(&report.data, report.seed, report.train_size, report.test_size, &report.fit);

    let verdict = if report.mae < report.baseline_mae {
        "better than baseline".green()
    } else {
        "not better than baseline".yellow()
    };

    println!();
    println!("  {:<16} {:.4}", "MAE".bold(), report.mae);
    println!("  {:<16} {:.4}", "Baseline MAE".bold(), report.baseline_mae);
    println!("  {:<16} {}", "Result".bold(), verdict);
}

pub fn print_classification(report: &ClassificationReport) {
    println!("{}\n", "Like/dislike classification".cyan().bold());
    print_common(&report.data, report.seed, report.train_size, report.test_size, &report.fit);

    println!();
    println!(
        "  {:<16} {}",
        "Accuracy".bold(),
        format!("{:.2}%", report.accuracy * 100.0).green()
    );
}

fn print_common(data: &Path, seed: u64, train_size: usize, test_size: usize, fit: &FitReport) {
    println!("  {:<16} {}", "Data".bold(), data.display());
    println!("  {:<16} {}", "Seed".bold(), seed);
    println!(
        "  {:<16} {} train, {} test",
        "Observations".bold(),
        train_size,
        test_size
    );

    println!("\n  {:<8} {:<14} {}", "Sweep".bold(), "Rate".bold(), "Train MSE".bold());
    println!("  {}", "─".repeat(36).dimmed());
    for sweep in &fit.sweeps {
        println!(
            "  {:<8} {:<14.3e} {:.6}",
            sweep.iteration, sweep.learning_rate, sweep.train_mse
        );
    }
}

pub fn print_json<T: Serialize>(report: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}
