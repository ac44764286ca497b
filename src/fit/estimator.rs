//! Maximum-likelihood estimation of an IM from fully observed data.
//!
//! Given a PM with its cutpoints installed and a dataset whose column names
//! match PM node names:
//!
//! - discrete child: count categories per CPT row (discrete-parent states plus
//!   continuous-parent bins), then smooth with a symmetric Dirichlet(α):
//!   `p[row][k] = (count + α) / Σ_k (count + α)`
//! - continuous child: group rows by discrete-parent states and regress the
//!   child on `[1, continuous parents...]` per group by pseudo-inverse;
//!   `variance = RSS / max(1, n - (m + 1))`
//!
//! With `share_variance_across_rows`, residual sums of squares and degrees of
//! freedom are pooled over all strata of a node and every row receives the
//! pooled variance.
//!
//! Regression strata with no observations keep the IM defaults (zero
//! coefficients, NaN variance unless pooling overwrites it). They are
//! reported with `warn!` and can be listed afterwards via
//! `HybridIm::dead_rows`, which does not look at the variance.

use std::collections::BTreeMap;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, warn};

use crate::data::DataTable;
use crate::domain::{DEFAULT_ALPHA, EstimatorConfig};
use crate::error::ModelError;
use crate::math::solve_least_squares;
use crate::models::{HybridIm, HybridPm};

/// Maximum-likelihood estimator with Dirichlet smoothing for CPTs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MlEstimator {
    alpha: f64,
    share_variance_across_rows: bool,
}

impl Default for MlEstimator {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            share_variance_across_rows: false,
        }
    }
}

impl MlEstimator {
    pub fn new(alpha: f64, share_variance_across_rows: bool) -> Result<Self, ModelError> {
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(ModelError::config(format!("alpha must be a positive number (got {alpha})")));
        }
        Ok(Self {
            alpha,
            share_variance_across_rows,
        })
    }

    pub fn from_config(cfg: &EstimatorConfig) -> Result<Self, ModelError> {
        cfg.validate()?;
        Self::new(cfg.alpha, cfg.share_variance_across_rows)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn shares_variance(&self) -> bool {
        self.share_variance_across_rows
    }

    /// Fit every node table of a fresh IM over `pm`.
    ///
    /// All-or-nothing: any structural failure aborts and no IM is returned.
    pub fn estimate<D: DataTable + ?Sized>(&self, pm: Arc<HybridPm>, data: &D) -> Result<HybridIm, ModelError> {
        let mut im = HybridIm::new(Arc::clone(&pm))?;
        let columns = resolve_columns(&pm, data)?;
        validate_codes(&pm, data, &columns)?;

        info!(
            nodes = pm.num_nodes(),
            rows = data.num_rows(),
            alpha = self.alpha,
            share_variance = self.share_variance_across_rows,
            "estimating hybrid model"
        );

        for y in 0..pm.num_nodes() {
            if pm.is_discrete(y) {
                self.fit_discrete(&pm, &mut im, data, &columns, y)?;
            } else {
                self.fit_continuous(&pm, &mut im, data, &columns, y)?;
            }
        }
        Ok(im)
    }

    fn fit_discrete<D: DataTable + ?Sized>(
        &self,
        pm: &HybridPm,
        im: &mut HybridIm,
        data: &D,
        columns: &[usize],
        y: usize,
    ) -> Result<(), ModelError> {
        let rows = pm.num_rows(y)?;
        let k = pm.cardinality(y)?;
        let dps = pm.discrete_parents(y);
        let cps = pm.continuous_parents(y);

        let mut counts = DMatrix::<f64>::zeros(rows, k);
        let mut states = Vec::with_capacity(dps.len());
        let mut values = Vec::with_capacity(cps.len());
        for r in 0..data.num_rows() {
            states.clear();
            states.extend(dps.iter().map(|&p| data.get_int(r, columns[p])));
            values.clear();
            values.extend(cps.iter().map(|&p| data.get_f64(r, columns[p])));

            let row = pm.row_index_for_case(y, &states, &values)?;
            counts[(row, data.get_int(r, columns[y]))] += 1.0;
        }

        let mut unobserved = 0usize;
        for row in 0..rows {
            let total: f64 = counts.row(row).sum();
            if total == 0.0 {
                unobserved += 1;
            }
            let denom = total + self.alpha * k as f64;
            for c in 0..k {
                im.set_probability(y, row, c, (counts[(row, c)] + self.alpha) / denom)?;
            }
        }

        debug!(node = pm.name(y), rows, unobserved, "fitted CPT");
        Ok(())
    }

    fn fit_continuous<D: DataTable + ?Sized>(
        &self,
        pm: &HybridPm,
        im: &mut HybridIm,
        data: &D,
        columns: &[usize],
        y: usize,
    ) -> Result<(), ModelError> {
        let rows = pm.num_rows(y)?;
        let dps = pm.discrete_parents(y);
        let cps = pm.continuous_parents(y);
        let m = cps.len();

        let mut groups: BTreeMap<Vec<usize>, Vec<usize>> = BTreeMap::new();
        for r in 0..data.num_rows() {
            let key: Vec<usize> = dps.iter().map(|&p| data.get_int(r, columns[p])).collect();
            groups.entry(key).or_default().push(r);
        }

        let mut pooled_rss = 0.0;
        let mut pooled_df = 0usize;
        for (key, cases) in &groups {
            let row = pm.row_index(y, key, &[])?;
            let n = cases.len();

            let x = DMatrix::from_fn(n, m + 1, |i, j| {
                if j == 0 {
                    1.0
                } else {
                    data.get_f64(cases[i], columns[cps[j - 1]])
                }
            });
            let resp = DVector::from_fn(n, |i, _| data.get_f64(cases[i], columns[y]));

            let fit = solve_least_squares(&x, &resp).ok_or_else(|| {
                ModelError::data(format!(
                    "non-finite values in regression stratum {key:?} of {}",
                    pm.name(y)
                ))
            })?;
            if fit.rank < n.min(m + 1) {
                warn!(node = pm.name(y), stratum = ?key, rank = fit.rank, params = m + 1, "rank-deficient design; using minimum-norm solution");
            } else if n <= m + 1 {
                debug!(node = pm.name(y), stratum = ?key, n, params = m + 1, "thin stratum");
            }

            im.set_intercept(y, row, fit.beta[0])?;
            for t in 0..m {
                im.set_coefficient(y, row, t, fit.beta[1 + t])?;
            }
            let df = n.saturating_sub(m + 1).max(1);
            im.set_variance(y, row, fit.rss / df as f64)?;

            pooled_rss += fit.rss;
            pooled_df += df;
        }

        if self.share_variance_across_rows {
            let s2 = if pooled_df > 0 { pooled_rss / pooled_df as f64 } else { 1.0 };
            for row in 0..rows {
                im.set_variance(y, row, s2)?;
            }
        }

        let dead = rows - groups.len();
        if dead > 0 {
            warn!(node = pm.name(y), dead, rows, "regression strata without observations left unfit");
        }
        debug!(node = pm.name(y), rows, strata = groups.len(), "fitted regressions");
        Ok(())
    }
}

/// Dataset column position of every PM node, by name.
///
/// Discrete nodes must map to discrete columns; real values are never coerced
/// into category codes.
fn resolve_columns<D: DataTable + ?Sized>(pm: &HybridPm, data: &D) -> Result<Vec<usize>, ModelError> {
    pm.nodes()
        .iter()
        .map(|spec| {
            let col = data
                .column_index(&spec.name)
                .ok_or_else(|| ModelError::data(format!("dataset is missing variable required by PM: {}", spec.name)))?;
            if spec.kind.is_discrete() && !data.is_discrete_column(col) {
                return Err(ModelError::data(format!(
                    "discrete variable {} is stored as a continuous column",
                    spec.name
                )));
            }
            Ok(col)
        })
        .collect()
}

/// Every discrete cell must be a valid category code of its node.
fn validate_codes<D: DataTable + ?Sized>(pm: &HybridPm, data: &D, columns: &[usize]) -> Result<(), ModelError> {
    for y in (0..pm.num_nodes()).filter(|&y| pm.is_discrete(y)) {
        let k = pm.cardinality(y)?;
        for r in 0..data.num_rows() {
            let code = data.get_int(r, columns[y]);
            if code >= k {
                return Err(ModelError::data(format!(
                    "row {r}: category code {code} out of range for {} (cardinality {k})",
                    pm.name(y)
                )));
            }
        }
    }
    Ok(())
}
