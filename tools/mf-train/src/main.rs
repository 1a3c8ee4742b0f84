use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use latent_ratings_core::{init_tracing, load_dotenv, TracingConfig};
use rand::Rng;
use std::path::PathBuf;
use tracing::info;

mod commands;
mod config;

use crate::config::ExperimentConfig;

#[derive(Parser)]
#[command(name = "mf-train")]
#[command(about = "Train and evaluate latent-factor rating models", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(
        long,
        global = true,
        env = "MF_CONFIG",
        help = "Experiment configuration file (TOML)"
    )]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Rating file, overriding data_path")]
    data: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Seed for sampling, splitting and initialization (random when omitted)"
    )]
    seed: Option<u64>,

    #[arg(long, global = true, help = "Print the report as JSON")]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Predict ratings and report MAE against a constant baseline")]
    Regress,

    #[command(about = "Classify likes and dislikes and report accuracy")]
    Classify,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    load_dotenv();

    let cli = Cli::parse();

    init_tracing(TracingConfig {
        service_name: "mf-train".to_string(),
        ..TracingConfig::from_env()
    })
    .context("Failed to initialize logging")?;

    let experiment = ExperimentConfig::load(cli.config.as_deref())?;
    let data = cli.data.unwrap_or_else(|| experiment.data_path.clone());
    let seed = cli.seed.unwrap_or_else(|| rand::thread_rng().gen());

    info!(data = %data.display(), seed, "Starting experiment");

    match cli.command {
        Commands::Regress => {
            let report = commands::regress(&experiment.regress, &data, seed)?;
            if cli.json {
                commands::print_json(&report)?;
            } else {
                commands::print_regression(&report);
            }
        }
        Commands::Classify => {
            let report = commands::classify(&experiment.classify, &data, seed)?;
            if cli.json {
                commands::print_json(&report)?;
            } else {
                commands::print_classification(&report);
            }
        }
    }

    Ok(())
}
