//! Shared fit and simulation workflows.
//!
//! fit: model file -> dataset -> cutpoints -> PM -> estimate
//! simulate: model file -> default cutpoints -> random IM -> sample
//!
//! The CLI handlers only print and export what these return.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::data::MixedDataSet;
use crate::domain::{BinningPolicy, EstimatorConfig};
use crate::error::ModelError;
use crate::fit::MlEstimator;
use crate::io::{read_dataset, read_model_file};
use crate::models::HybridIm;

/// Outputs of one `hcg fit` run.
#[derive(Debug, Clone)]
pub struct FitRun {
    pub started_at: DateTime<Utc>,
    pub data: MixedDataSet,
    pub im: HybridIm,
}

/// Outputs of one `hcg simulate` run.
#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub started_at: DateTime<Utc>,
    pub seed: u64,
    pub im: HybridIm,
    pub data: MixedDataSet,
}

/// Options for `run_simulation`.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    pub rows: usize,
    pub seed: u64,
    pub bins: usize,
    pub parallel: bool,
}

pub fn run_fit(model_path: &Path, data_path: &Path, config: &EstimatorConfig) -> Result<FitRun, ModelError> {
    let started_at = Utc::now();
    let estimator = MlEstimator::from_config(config)?;

    let mut builder = read_model_file(model_path)?.builder()?;
    let data = read_dataset(data_path, builder.pm())?;

    if config.binning != BinningPolicy::None {
        let missing = builder.missing();
        if !missing.is_empty() {
            info!(
                children = %missing.join(", "),
                policy = config.binning.display_name(),
                bins = config.bins,
                "computing cutpoints from data"
            );
        }
        builder = builder.auto_cutpoints(&data, config.binning, config.bins)?;
    }
    let pm = Arc::new(builder.build()?);

    let im = estimator.estimate(pm, &data)?;
    Ok(FitRun { started_at, data, im })
}

pub fn run_simulation(model_path: &Path, config: SimulationConfig) -> Result<SimulationRun, ModelError> {
    let started_at = Utc::now();
    let pm = read_model_file(model_path)?
        .builder()?
        .default_cutpoints(config.bins)?
        .build()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut im = HybridIm::new(Arc::new(pm))?;
    im.randomize(&mut rng);

    info!(rows = config.rows, seed = config.seed, parallel = config.parallel, "sampling");
    let sample = if config.parallel {
        im.sample_parallel(config.rows, config.seed.wrapping_add(1))?
    } else {
        im.sample(config.rows, &mut rng)?
    };
    let data = im.to_dataset_in_pm_order(&sample)?;

    Ok(SimulationRun {
        started_at,
        seed: config.seed,
        im,
        data,
    })
}
