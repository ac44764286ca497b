//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - installs the log subscriber
//! - runs the fit / simulation / cutpoint workflows
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::{Command, CutpointArgs, FitArgs, SimulateArgs};
use crate::domain::EstimatorConfig;
use crate::error::ModelError;

pub mod pipeline;

/// Entry point for the `hcg` binary.
pub fn run() -> Result<(), ModelError> {
    let cli = crate::cli::Cli::parse_from(std::env::args());
    setup_logging(cli.verbose);

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Cutpoints(args) => handle_cutpoints(args),
    }
}

/// Compact logs on stderr so stdout carries only reports.
fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    // Already installed when embedded in a host that set its own subscriber.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn handle_fit(args: FitArgs) -> Result<(), ModelError> {
    let config = estimator_config_from_args(&args);
    let run = pipeline::run_fit(&args.model, &args.data, &config)?;

    println!(
        "{}",
        crate::report::format_fit_summary(run.started_at, &run.data, &run.im, &config)
    );
    println!("{}", run.im);
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), ModelError> {
    let run = pipeline::run_simulation(
        &args.model,
        pipeline::SimulationConfig {
            rows: args.rows,
            seed: args.seed,
            bins: args.bins,
            parallel: args.parallel,
        },
    )?;

    println!(
        "{}",
        crate::report::format_sample_summary(run.started_at, run.seed, &run.data, run.im.pm())
    );

    if let Some(path) = &args.output {
        crate::io::write_dataset_csv(path, &run.data, run.im.pm())?;
        println!("Wrote {} rows to {}", args.rows, path.display());
    }
    Ok(())
}

fn handle_cutpoints(args: CutpointArgs) -> Result<(), ModelError> {
    let values = crate::io::read_numeric_column(&args.data, &args.column)?;
    let cuts = crate::math::compute_cutpoints(&values, args.binning, args.bins)?;
    print!(
        "{}",
        crate::report::format_cutpoints(&args.column, &values, args.binning, args.bins, cuts.as_deref())
    );
    Ok(())
}

pub fn estimator_config_from_args(args: &FitArgs) -> EstimatorConfig {
    EstimatorConfig {
        alpha: args.alpha,
        share_variance_across_rows: args.share_variance,
        binning: args.binning,
        bins: args.bins,
    }
}
