//! Command-line parsing for `hcg`.
//!
//! Argument parsing and command dispatch stay separate from the modeling code;
//! `app` maps these structs onto library configuration.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::{BinningPolicy, DEFAULT_ALPHA, DEFAULT_BINS};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "hcg", version, about = "Hybrid conditional-Gaussian models: fit, simulate, discretize")]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit an instantiated model from a model description and a CSV dataset.
    Fit(FitArgs),
    /// Randomize a model from its description and sample synthetic rows.
    Simulate(SimulateArgs),
    /// Print computed cutpoints for one CSV column.
    Cutpoints(CutpointArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Model description (JSON).
    #[arg(short, long)]
    pub model: PathBuf,

    /// Dataset (CSV with a header row naming the variables).
    #[arg(short, long)]
    pub data: PathBuf,

    /// Dirichlet pseudocount for CPT smoothing.
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    pub alpha: f64,

    /// Pool residual variance across all strata of each continuous node.
    #[arg(long)]
    pub share_variance: bool,

    /// How to compute cutpoints the model file does not supply.
    #[arg(long, value_enum, default_value_t = BinningPolicy::EqualFrequency)]
    pub binning: BinningPolicy,

    /// Number of bins per discretized parent.
    #[arg(long, default_value_t = DEFAULT_BINS)]
    pub bins: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Model description (JSON).
    #[arg(short, long)]
    pub model: PathBuf,

    /// Number of rows to sample.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub rows: usize,

    /// Seed for parameter randomization and sampling.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Bins per parent when seeding default cutpoints.
    #[arg(long, default_value_t = DEFAULT_BINS)]
    pub bins: usize,

    /// Sample rows in parallel (independently seeded chunks).
    #[arg(long)]
    pub parallel: bool,

    /// Write the sample as CSV.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct CutpointArgs {
    /// Dataset (CSV with a header row).
    #[arg(short, long)]
    pub data: PathBuf,

    /// Column to discretize.
    #[arg(short, long)]
    pub column: String,

    #[arg(long, value_enum, default_value_t = BinningPolicy::EqualFrequency)]
    pub binning: BinningPolicy,

    #[arg(long, default_value_t = DEFAULT_BINS)]
    pub bins: usize,
}
