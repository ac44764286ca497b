//! Ancestral sampling from an instantiated model.
//!
//! Nodes are visited parents-before-children (Kahn's indegree queue over the
//! PM's graph). Within a row each node reads values its parents produced
//! earlier in that same row; rows are independent of one another, which is
//! what `sample_parallel` exploits.
//!
//! - discrete node: the CPT row is picked from discrete-parent states and the
//!   bins of continuous-parent values (same `bin_for` rule as fitting); one
//!   uniform draw walks the running sum of that row
//! - continuous node: the regression row is picked from discrete-parent
//!   states only; the value is `mean + sqrt(max(var, 0)) · z`
//!
//! Randomness always comes from a caller-supplied generator.

use std::collections::VecDeque;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use tracing::debug;

use crate::data::{Column, MixedDataSet};
use crate::error::ModelError;
use crate::math::bin_for;
use crate::models::{HybridIm, HybridPm, NodeTable};

/// Rows per independently seeded chunk in `sample_parallel`.
///
/// Fixed (not derived from the thread count) so output depends only on
/// `(seed, n)`.
const PARALLEL_CHUNK_ROWS: usize = 1024;

/// Multiplier used to spread chunk indices over the seed space.
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

#[derive(Debug, Clone, PartialEq)]
pub enum SampleColumn {
    Discrete(Vec<usize>),
    Continuous(Vec<f64>),
}

impl SampleColumn {
    fn with_capacity(discrete: bool, n: usize) -> Self {
        if discrete {
            SampleColumn::Discrete(Vec::with_capacity(n))
        } else {
            SampleColumn::Continuous(Vec::with_capacity(n))
        }
    }

    fn extend_from(&mut self, other: SampleColumn) {
        match (self, other) {
            (SampleColumn::Discrete(a), SampleColumn::Discrete(b)) => a.extend(b),
            (SampleColumn::Continuous(a), SampleColumn::Continuous(b)) => a.extend(b),
            _ => {}
        }
    }
}

/// Columnar draws, one column per PM node (indexed by PM position).
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    columns: Vec<SampleColumn>,
    rows: usize,
}

impl Sample {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, node: usize) -> &SampleColumn {
        &self.columns[node]
    }

    pub fn discrete(&self, node: usize) -> Option<&[usize]> {
        match &self.columns[node] {
            SampleColumn::Discrete(v) => Some(v),
            SampleColumn::Continuous(_) => None,
        }
    }

    pub fn continuous(&self, node: usize) -> Option<&[f64]> {
        match &self.columns[node] {
            SampleColumn::Continuous(v) => Some(v),
            SampleColumn::Discrete(_) => None,
        }
    }
}

/// Parents-before-children order over the PM's graph, as PM indices.
pub fn topological_order(pm: &HybridPm) -> Result<Vec<usize>, ModelError> {
    let n = pm.num_nodes();
    if pm.dag().num_nodes() != n {
        return Err(ModelError::cycle(format!(
            "graph has {} nodes but the PM has {n}",
            pm.dag().num_nodes()
        )));
    }

    let mut indegree = vec![0usize; n];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, spec) in pm.nodes().iter().enumerate() {
        indegree[i] = pm.dag().parents(&spec.name)?.len();
        for c in pm.dag().children(&spec.name)? {
            children[i].push(pm.require_index(c)?);
        }
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(u) = queue.pop_front() {
        order.push(u);
        for &v in &children[u] {
            indegree[v] -= 1;
            if indegree[v] == 0 {
                queue.push_back(v);
            }
        }
    }

    if order.len() != n {
        let stuck: Vec<&str> = (0..n).filter(|&i| indegree[i] > 0).map(|i| pm.name(i)).collect();
        return Err(ModelError::cycle(format!(
            "graph has a cycle through: {}",
            stuck.join(", ")
        )));
    }
    Ok(order)
}

/// Draw a category from the distribution in `probs`.
///
/// The last category absorbs any mass lost to rounding.
fn sample_categorical<R: Rng + ?Sized>(probs: &[f64], rng: &mut R) -> usize {
    let u: f64 = rng.gen_range(0.0..1.0);
    let mut acc = 0.0;
    for (k, &p) in probs.iter().enumerate() {
        acc += p;
        if u < acc {
            return k;
        }
    }
    probs.len().saturating_sub(1)
}

impl HybridIm {
    /// Draw `n` rows by ancestral sampling.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Sample, ModelError> {
        let order = topological_order(self.pm())?;
        self.sample_with_order(&order, n, rng)
    }

    /// Draw `n` rows in parallel.
    ///
    /// Rows are split into fixed-size chunks; chunk `i` uses its own `StdRng`
    /// seeded from `(seed, i)`, so the result is reproducible regardless of
    /// how many threads run.
    pub fn sample_parallel(&self, n: usize, seed: u64) -> Result<Sample, ModelError> {
        let order = topological_order(self.pm())?;
        let chunks = n.div_ceil(PARALLEL_CHUNK_ROWS);
        debug!(rows = n, chunks, "parallel ancestral sampling");

        let parts: Vec<Sample> = (0..chunks)
            .into_par_iter()
            .map(|i| {
                let rows = PARALLEL_CHUNK_ROWS.min(n - i * PARALLEL_CHUNK_ROWS);
                let mut rng = StdRng::seed_from_u64(seed ^ (i as u64).wrapping_mul(SEED_STRIDE));
                self.sample_with_order(&order, rows, &mut rng)
            })
            .collect::<Result<_, _>>()?;

        let pm = self.pm();
        let mut columns: Vec<SampleColumn> = (0..pm.num_nodes())
            .map(|y| SampleColumn::with_capacity(pm.is_discrete(y), n))
            .collect();
        for part in parts {
            for (dst, src) in columns.iter_mut().zip(part.columns) {
                dst.extend_from(src);
            }
        }
        Ok(Sample { columns, rows: n })
    }

    fn sample_with_order<R: Rng + ?Sized>(
        &self,
        order: &[usize],
        n: usize,
        rng: &mut R,
    ) -> Result<Sample, ModelError> {
        let pm = self.pm();
        let p = pm.num_nodes();

        let mut disc: Vec<Vec<usize>> = vec![Vec::new(); p];
        let mut cont: Vec<Vec<f64>> = vec![Vec::new(); p];
        for y in 0..p {
            if pm.is_discrete(y) {
                disc[y] = vec![0; n];
            } else {
                cont[y] = vec![0.0; n];
            }
        }

        let mut disc_vals = Vec::new();
        let mut bins = Vec::new();
        let mut probs = Vec::new();
        for r in 0..n {
            for &y in order {
                let dps = pm.discrete_parents(y);
                let cps = pm.continuous_parents(y);
                disc_vals.clear();
                disc_vals.extend(dps.iter().map(|&d| disc[d][r]));

                match self.table(y) {
                    NodeTable::Cpt(cpt) => {
                        bins.clear();
                        if !cps.is_empty() {
                            let cuts = pm.cutpoints(y).ok_or_else(|| {
                                ModelError::schema(format!("cutpoints not set for child {}", pm.name(y)))
                            })?;
                            bins.extend(cuts.iter().zip(cps).map(|(c, &q)| bin_for(c, cont[q][r])));
                        }
                        let row = pm.row_index(y, &disc_vals, &bins)?;
                        probs.clear();
                        probs.extend(cpt.row(row).iter().copied());
                        disc[y][r] = sample_categorical(&probs, rng);
                    }
                    NodeTable::Regression(params) => {
                        let row = pm.row_index(y, &disc_vals, &[])?;
                        let m = cps.len();
                        let mut mean = params[(row, 0)];
                        for (t, &q) in cps.iter().enumerate() {
                            mean += params[(row, 1 + t)] * cont[q][r];
                        }
                        let var = params[(row, m + 1)];
                        let sd = if var > 0.0 { var.sqrt() } else { 0.0 };
                        let z: f64 = rng.sample(StandardNormal);
                        cont[y][r] = mean + sd * z;
                    }
                }
            }
        }

        let columns = disc
            .into_iter()
            .zip(cont)
            .enumerate()
            .map(|(y, (d, c))| {
                if pm.is_discrete(y) {
                    SampleColumn::Discrete(d)
                } else {
                    SampleColumn::Continuous(c)
                }
            })
            .collect();
        Ok(Sample { columns, rows: n })
    }

    /// Materialize a sample as a dataset with columns in `order`.
    ///
    /// `order` must be a permutation of the PM's node names.
    pub fn to_dataset<S: AsRef<str>>(&self, sample: &Sample, order: &[S]) -> Result<MixedDataSet, ModelError> {
        let pm = self.pm();
        if sample.num_columns() != pm.num_nodes() {
            return Err(ModelError::schema(format!(
                "sample has {} columns but the PM has {} nodes",
                sample.num_columns(),
                pm.num_nodes()
            )));
        }
        if order.len() != pm.num_nodes() {
            return Err(ModelError::schema(format!(
                "column order has {} entries but the PM has {} nodes",
                order.len(),
                pm.num_nodes()
            )));
        }

        let mut seen = vec![false; pm.num_nodes()];
        let mut columns = Vec::with_capacity(order.len());
        for name in order {
            let name = name.as_ref();
            let y = pm.require_index(name)?;
            if std::mem::replace(&mut seen[y], true) {
                return Err(ModelError::schema(format!("node listed twice in column order: {name}")));
            }
            let col = match sample.column(y) {
                SampleColumn::Discrete(v) => Column::Discrete(v.clone()),
                SampleColumn::Continuous(v) => Column::Continuous(v.clone()),
            };
            columns.push((name.to_string(), col));
        }
        MixedDataSet::new(columns)
    }

    /// Materialize a sample with columns in PM order.
    pub fn to_dataset_in_pm_order(&self, sample: &Sample) -> Result<MixedDataSet, ModelError> {
        let names: Vec<&str> = self.pm().nodes().iter().map(|s| s.name.as_str()).collect();
        self.to_dataset(sample, &names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::data::DataTable;
    use crate::domain::{Dag, VarKind};
    use crate::models::fixtures;

    #[test]
    fn topological_order_puts_parents_first() {
        let pm = fixtures::complete_mixed_pm();
        let order = topological_order(&pm).unwrap();
        let pos = |name: &str| order.iter().position(|&i| i == pm.require_index(name).unwrap()).unwrap();
        assert!(pos("A") < pos("Y"));
        assert!(pos("X") < pos("Y"));
        assert!(pos("W") < pos("Z"));
        assert!(pos("A") < pos("Z"));
        assert!(pos("X") < pos("Z"));
    }

    #[test]
    fn cyclic_graph_is_reported() {
        let dag = Dag::from_edges(&["A", "B"], &[("A", "B"), ("B", "A")]).unwrap();
        let kinds = HashMap::from([
            ("A".to_string(), VarKind::Continuous),
            ("B".to_string(), VarKind::Continuous),
        ]);
        let pm = HybridPm::new(dag, &["A", "B"], &kinds).unwrap();
        assert!(matches!(topological_order(&pm), Err(ModelError::Cycle(_))));

        let im = HybridIm::new(Arc::new(pm)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(im.sample(10, &mut rng), Err(ModelError::Cycle(_))));
    }

    #[test]
    fn categorical_draw_guards_rounding() {
        let mut rng = StdRng::seed_from_u64(3);
        // Row sums to slightly less than one: the last category absorbs the gap.
        for _ in 0..100 {
            let k = sample_categorical(&[0.0, 0.0, 0.0], &mut rng);
            assert_eq!(k, 2);
        }
        for _ in 0..100 {
            let k = sample_categorical(&[0.0, 1.0, 0.0], &mut rng);
            assert_eq!(k, 1);
        }
    }

    #[test]
    fn sample_is_reproducible_for_a_seed() {
        let im = fixtures::round_trip_im();
        let a = im.sample(200, &mut StdRng::seed_from_u64(11)).unwrap();
        let b = im.sample(200, &mut StdRng::seed_from_u64(11)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.rows(), 200);
    }

    #[test]
    fn discrete_child_follows_parent_bins() {
        // Deterministic CPT: Y = bin of X.
        let pm = Arc::new(fixtures::binary_threshold_pm());
        let x = pm.require_index("X").unwrap();
        let y = pm.require_index("Y").unwrap();
        let mut im = HybridIm::new(Arc::clone(&pm)).unwrap();
        im.set_variance(x, 0, 1.0).unwrap();
        im.set_intercept(x, 0, 0.0).unwrap();
        im.set_probability(y, 0, 0, 1.0).unwrap();
        im.set_probability(y, 1, 1, 1.0).unwrap();

        let s = im.sample(500, &mut StdRng::seed_from_u64(5)).unwrap();
        let xs = s.continuous(x).unwrap();
        let ys = s.discrete(y).unwrap();
        for (xv, yv) in xs.iter().zip(ys) {
            assert_eq!(*yv, usize::from(*xv > 0.0));
        }
    }

    #[test]
    fn zero_or_nan_variance_gives_the_mean() {
        let pm = fixtures::round_trip_pm();
        let x = pm.require_index("X").unwrap();
        let mut im = HybridIm::new(pm).unwrap();
        im.set_intercept(x, 0, 4.0).unwrap();
        // Variance left at NaN.
        let s = im.sample(20, &mut StdRng::seed_from_u64(9)).unwrap();
        assert!(s.continuous(x).unwrap().iter().all(|&v| v == 4.0));
    }

    #[test]
    fn parallel_sampling_is_deterministic_and_complete() {
        let im = fixtures::round_trip_im();
        let n = 2 * PARALLEL_CHUNK_ROWS + 17;
        let a = im.sample_parallel(n, 42).unwrap();
        let b = im.sample_parallel(n, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.rows(), n);
        for y in 0..im.pm().num_nodes() {
            let len = match a.column(y) {
                SampleColumn::Discrete(v) => v.len(),
                SampleColumn::Continuous(v) => v.len(),
            };
            assert_eq!(len, n);
        }
        let c = im.sample_parallel(n, 43).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn to_dataset_respects_requested_column_order() {
        let im = fixtures::round_trip_im();
        let s = im.sample(50, &mut StdRng::seed_from_u64(2)).unwrap();
        let ds = im.to_dataset(&s, &["V", "X", "Y"]).unwrap();

        assert_eq!(ds.names(), &["V".to_string(), "X".to_string(), "Y".to_string()]);
        assert_eq!(ds.num_rows(), 50);
        let y = im.pm().require_index("Y").unwrap();
        let col = ds.column_index("Y").unwrap();
        for r in 0..50 {
            assert_eq!(ds.get_int(r, col), s.discrete(y).unwrap()[r]);
        }
        assert!(ds.column(0).to_f64_vec().iter().all(|v| v.is_finite()));

        assert!(im.to_dataset(&s, &["V", "X"]).is_err());
        assert!(im.to_dataset(&s, &["V", "X", "X"]).is_err());
        assert!(im.to_dataset(&s, &["V", "X", "Q"]).is_err());
    }
}
