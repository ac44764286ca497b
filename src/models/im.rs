//! Instantiated model (IM): numeric tables sized by a complete PM.
//!
//! Per node, exactly one table:
//!
//! - discrete node: a CPT with `rows × cardinality` cells, each row a
//!   distribution over the node's categories
//! - continuous node: a regression table with `rows × (m + 2)` cells laid out
//!   as `[intercept, coef_1..coef_m, variance]`, coefficients in
//!   continuous-parent order
//!
//! Row counts are read from the PM once, at construction. The IM shares the
//! PM immutably, so the schema cannot change under a built IM.
//!
//! Fresh tables hold zero probabilities and zero coefficients with NaN
//! variance. A regression row counts as fitted once its intercept or a
//! coefficient is assigned; setting only the variance (as pooling does) leaves
//! it unfitted.

use std::sync::Arc;

use nalgebra::DMatrix;
use rand::Rng;

use crate::error::ModelError;
use crate::models::HybridPm;

/// Range of random regression coefficient magnitudes in `randomize`.
const COEF_RANGE: (f64, f64) = (0.5, 1.5);

/// Range of random error variances in `randomize`.
const VARIANCE_RANGE: (f64, f64) = (1.0, 3.0);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeTable {
    /// `rows × cardinality`.
    Cpt(DMatrix<f64>),
    /// `rows × (m + 2)`: intercept, `m` coefficients, variance.
    Regression(DMatrix<f64>),
}

impl NodeTable {
    pub fn nrows(&self) -> usize {
        match self {
            NodeTable::Cpt(m) | NodeTable::Regression(m) => m.nrows(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HybridIm {
    pm: Arc<HybridPm>,
    tables: Vec<NodeTable>,
    /// Per node, which regression rows have been fitted; empty for CPTs.
    fitted: Vec<Vec<bool>>,
}

impl HybridIm {
    /// Allocate tables for every node of `pm`.
    ///
    /// Fails if any discrete child with continuous parents lacks cutpoints.
    pub fn new(pm: Arc<HybridPm>) -> Result<Self, ModelError> {
        pm.ensure_complete()?;

        let mut tables = Vec::with_capacity(pm.num_nodes());
        let mut fitted = Vec::with_capacity(pm.num_nodes());
        for y in 0..pm.num_nodes() {
            let rows = pm.num_rows(y)?;
            if pm.is_discrete(y) {
                tables.push(NodeTable::Cpt(DMatrix::zeros(rows, pm.cardinality(y)?)));
                fitted.push(Vec::new());
            } else {
                let m = pm.continuous_parents(y).len();
                let mut params = DMatrix::zeros(rows, m + 2);
                params.column_mut(m + 1).fill(f64::NAN);
                tables.push(NodeTable::Regression(params));
                fitted.push(vec![false; rows]);
            }
        }

        Ok(Self { pm, tables, fitted })
    }

    pub fn pm(&self) -> &HybridPm {
        &self.pm
    }

    pub fn shared_pm(&self) -> Arc<HybridPm> {
        Arc::clone(&self.pm)
    }

    pub fn table(&self, node: usize) -> &NodeTable {
        &self.tables[node]
    }

    pub fn num_rows(&self, node: usize) -> usize {
        self.tables[node].nrows()
    }

    // --- CPT accessors ---

    pub fn probability(&self, node: usize, row: usize, category: usize) -> Result<f64, ModelError> {
        let cpt = self.cpt(node)?;
        check_cell(&self.pm, node, cpt, row, category)?;
        Ok(cpt[(row, category)])
    }

    pub fn set_probability(
        &mut self,
        node: usize,
        row: usize,
        category: usize,
        p: f64,
    ) -> Result<(), ModelError> {
        let pm = Arc::clone(&self.pm);
        let cpt = self.cpt_mut(node)?;
        check_cell(&pm, node, cpt, row, category)?;
        cpt[(row, category)] = p;
        Ok(())
    }

    /// A copy of one CPT row.
    pub fn cpt_row(&self, node: usize, row: usize) -> Result<Vec<f64>, ModelError> {
        let cpt = self.cpt(node)?;
        check_cell(&self.pm, node, cpt, row, 0)?;
        Ok(cpt.row(row).iter().copied().collect())
    }

    /// Rescale a CPT row to sum to one; a row with non-positive sum becomes
    /// uniform.
    pub fn normalize_row(&mut self, node: usize, row: usize) -> Result<(), ModelError> {
        let pm = Arc::clone(&self.pm);
        let cpt = self.cpt_mut(node)?;
        check_cell(&pm, node, cpt, row, 0)?;

        let k = cpt.ncols();
        let sum: f64 = cpt.row(row).sum();
        let mut r = cpt.row_mut(row);
        if sum <= 0.0 || !sum.is_finite() {
            r.fill(1.0 / k as f64);
        } else {
            r /= sum;
        }
        Ok(())
    }

    // --- regression accessors ---

    /// Number of regression coefficients (continuous parents) of `node`.
    pub fn num_coefficients(&self, node: usize) -> Result<usize, ModelError> {
        Ok(self.regression(node)?.ncols() - 2)
    }

    pub fn intercept(&self, node: usize, row: usize) -> Result<f64, ModelError> {
        self.regression_cell(node, row, 0)
    }

    pub fn set_intercept(&mut self, node: usize, row: usize, value: f64) -> Result<(), ModelError> {
        self.set_regression_cell(node, row, 0, value)?;
        self.fitted[node][row] = true;
        Ok(())
    }

    /// Coefficient of the `t`-th continuous parent (continuous-parent order,
    /// not node index).
    pub fn coefficient(&self, node: usize, row: usize, t: usize) -> Result<f64, ModelError> {
        let m = self.num_coefficients(node)?;
        check_coefficient(&self.pm, node, t, m)?;
        self.regression_cell(node, row, 1 + t)
    }

    pub fn set_coefficient(&mut self, node: usize, row: usize, t: usize, value: f64) -> Result<(), ModelError> {
        let m = self.num_coefficients(node)?;
        check_coefficient(&self.pm, node, t, m)?;
        self.set_regression_cell(node, row, 1 + t, value)?;
        self.fitted[node][row] = true;
        Ok(())
    }

    pub fn variance(&self, node: usize, row: usize) -> Result<f64, ModelError> {
        let m = self.num_coefficients(node)?;
        self.regression_cell(node, row, 1 + m)
    }

    pub fn set_variance(&mut self, node: usize, row: usize, value: f64) -> Result<(), ModelError> {
        let m = self.num_coefficients(node)?;
        self.set_regression_cell(node, row, 1 + m, value)
    }

    /// Rows of continuous `node` whose intercept and coefficients were never
    /// assigned. A pooled variance written into such a row does not count.
    pub fn dead_rows(&self, node: usize) -> Result<Vec<usize>, ModelError> {
        self.regression(node)?;
        Ok(self.fitted[node]
            .iter()
            .enumerate()
            .filter(|&(_, &done)| !done)
            .map(|(r, _)| r)
            .collect())
    }

    /// Fill every table with random parameters.
    ///
    /// CPT rows are uniform draws normalized to one. Regressions get a zero
    /// intercept, coefficients of random sign with magnitude in
    /// `[0.5, 1.5)` and variance in `[1, 3)`.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for table in &mut self.tables {
            match table {
                NodeTable::Cpt(cpt) => {
                    for r in 0..cpt.nrows() {
                        let mut row = cpt.row_mut(r);
                        for cell in row.iter_mut() {
                            *cell = rng.gen_range(0.0..1.0);
                        }
                        let sum: f64 = row.sum();
                        if sum > 0.0 {
                            row /= sum;
                        } else {
                            row.fill(1.0 / row.len() as f64);
                        }
                    }
                }
                NodeTable::Regression(params) => {
                    let var_col = params.ncols() - 1;
                    for r in 0..params.nrows() {
                        params[(r, 0)] = 0.0;
                        for c in 1..var_col {
                            let magnitude = rng.gen_range(COEF_RANGE.0..COEF_RANGE.1);
                            params[(r, c)] = if rng.gen_bool(0.5) { magnitude } else { -magnitude };
                        }
                        params[(r, var_col)] = rng.gen_range(VARIANCE_RANGE.0..VARIANCE_RANGE.1);
                    }
                }
            }
        }
        for rows in &mut self.fitted {
            rows.fill(true);
        }
    }

    fn cpt(&self, node: usize) -> Result<&DMatrix<f64>, ModelError> {
        match self.tables.get(node) {
            Some(NodeTable::Cpt(m)) => Ok(m),
            Some(NodeTable::Regression(_)) => Err(ModelError::schema(format!(
                "not a discrete node: {}",
                self.pm.name(node)
            ))),
            None => Err(ModelError::schema(format!("node index out of range: {node}"))),
        }
    }

    fn cpt_mut(&mut self, node: usize) -> Result<&mut DMatrix<f64>, ModelError> {
        match self.tables.get_mut(node) {
            Some(NodeTable::Cpt(m)) => Ok(m),
            Some(NodeTable::Regression(_)) => Err(ModelError::schema(format!(
                "not a discrete node: {}",
                self.pm.name(node)
            ))),
            None => Err(ModelError::schema(format!("node index out of range: {node}"))),
        }
    }

    fn regression(&self, node: usize) -> Result<&DMatrix<f64>, ModelError> {
        match self.tables.get(node) {
            Some(NodeTable::Regression(m)) => Ok(m),
            Some(NodeTable::Cpt(_)) => Err(ModelError::schema(format!(
                "not a continuous node: {}",
                self.pm.name(node)
            ))),
            None => Err(ModelError::schema(format!("node index out of range: {node}"))),
        }
    }

    fn regression_cell(&self, node: usize, row: usize, col: usize) -> Result<f64, ModelError> {
        let params = self.regression(node)?;
        check_cell(&self.pm, node, params, row, col)?;
        Ok(params[(row, col)])
    }

    fn set_regression_cell(&mut self, node: usize, row: usize, col: usize, value: f64) -> Result<(), ModelError> {
        let pm = Arc::clone(&self.pm);
        let params = match self.tables.get_mut(node) {
            Some(NodeTable::Regression(m)) => m,
            Some(NodeTable::Cpt(_)) => {
                return Err(ModelError::schema(format!("not a continuous node: {}", pm.name(node))));
            }
            None => return Err(ModelError::schema(format!("node index out of range: {node}"))),
        };
        check_cell(&pm, node, params, row, col)?;
        params[(row, col)] = value;
        Ok(())
    }
}

fn check_cell(pm: &HybridPm, node: usize, m: &DMatrix<f64>, row: usize, col: usize) -> Result<(), ModelError> {
    if row >= m.nrows() || col >= m.ncols() {
        return Err(ModelError::schema(format!(
            "cell ({row}, {col}) out of range for {} table of shape {}x{}",
            pm.name(node),
            m.nrows(),
            m.ncols()
        )));
    }
    Ok(())
}

fn check_coefficient(pm: &HybridPm, node: usize, t: usize, m: usize) -> Result<(), ModelError> {
    if t >= m {
        return Err(ModelError::schema(format!(
            "{} has {m} continuous parent(s); coefficient {t} does not exist",
            pm.name(node)
        )));
    }
    Ok(())
}
