//! Shared domain types.
//!
//! These are kept small and serializable so the same values can come from the
//! CLI, from a model description file, or be built directly in code.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Default Dirichlet pseudocount for CPT smoothing.
pub const DEFAULT_ALPHA: f64 = 1.0;

/// Default number of bins per continuous parent when cutpoints are computed.
pub const DEFAULT_BINS: usize = 3;

/// Declared kind of a variable.
///
/// Discrete variables carry their ordered category labels; the cardinality is
/// the number of labels and category codes index into this list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum VarKind {
    Discrete { categories: Vec<String> },
    Continuous,
}

impl VarKind {
    /// Discrete kind with categories `"0"`, `"1"`, ... `"k-1"`.
    pub fn discrete(cardinality: usize) -> Self {
        VarKind::Discrete {
            categories: (0..cardinality).map(|k| k.to_string()).collect(),
        }
    }

    pub fn discrete_with<S: AsRef<str>>(labels: &[S]) -> Self {
        VarKind::Discrete {
            categories: labels.iter().map(|s| s.as_ref().to_string()).collect(),
        }
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, VarKind::Discrete { .. })
    }

    pub fn cardinality(&self) -> Option<usize> {
        match self {
            VarKind::Discrete { categories } => Some(categories.len()),
            VarKind::Continuous => None,
        }
    }
}

/// How cutpoints are computed for a continuous parent of a discrete child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BinningPolicy {
    /// `bins` equal-width segments over `[min, max]`.
    EqualInterval,
    /// `bins - 1` empirical quantiles.
    EqualFrequency,
    /// Never compute; cutpoints must be supplied.
    None,
}

impl BinningPolicy {
    pub fn display_name(self) -> &'static str {
        match self {
            BinningPolicy::EqualInterval => "equal-interval",
            BinningPolicy::EqualFrequency => "equal-frequency",
            BinningPolicy::None => "none",
        }
    }
}

/// Estimator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Dirichlet pseudocount added to every CPT cell.
    pub alpha: f64,
    /// Pool residual variance over all strata of a continuous node.
    pub share_variance_across_rows: bool,
    /// Policy for cutpoints that were not supplied up front.
    pub binning: BinningPolicy,
    /// Bins per continuous parent when `binning` computes cutpoints.
    pub bins: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            share_variance_across_rows: false,
            binning: BinningPolicy::EqualFrequency,
            bins: DEFAULT_BINS,
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(ModelError::config(format!(
                "alpha must be finite and > 0 (got {})",
                self.alpha
            )));
        }
        if self.bins < 2 {
            return Err(ModelError::config(format!("bins must be >= 2 (got {})", self.bins)));
        }
        Ok(())
    }
}
