//! Parametric model (PM): the structural schema of a hybrid network.
//!
//! A PM fixes:
//!
//! - a node order (all tables are indexed by position in it)
//! - each node's kind (discrete with categories, or continuous)
//! - each node's parents, split into discrete and continuous index lists in
//!   the order the graph reports them
//! - for discrete children with continuous parents, the cutpoints that turn
//!   each continuous parent into bins
//!
//! Row layout contract: a node's table row is a mixed-radix number over
//! `[discrete-parent states..., continuous-parent bins...]`, most significant
//! digit first. The continuous-bin digits exist only when the node itself is
//! discrete; a continuous node regresses on its continuous parents directly.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::data::DataTable;
use crate::domain::{BinningPolicy, Dag, VarKind};
use crate::error::ModelError;
use crate::math::{bin_for, compute_cutpoints, is_strictly_increasing};

/// Lower/upper edge of the default cutpoint range used when nothing better is
/// known about a continuous parent.
const DEFAULT_SEED_RANGE: (f64, f64) = (-0.5, 0.5);

/// One node of the PM with its parents already partitioned by kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub name: String,
    pub kind: VarKind,
    /// Indices into the PM node order.
    pub discrete_parents: Vec<usize>,
    /// Indices into the PM node order.
    pub continuous_parents: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct HybridPm {
    dag: Dag,
    nodes: Vec<NodeSpec>,
    index: HashMap<String, usize>,
    /// `cutpoints[child][t]` are the edges for the `t`-th continuous parent.
    cutpoints: Vec<Option<Vec<Vec<f64>>>>,
}

impl HybridPm {
    /// Build a PM from a graph, a total node order and a kind per node.
    ///
    /// `order` must list every graph node exactly once.
    pub fn new<S: AsRef<str>>(
        dag: Dag,
        order: &[S],
        kinds: &HashMap<String, VarKind>,
    ) -> Result<Self, ModelError> {
        if order.len() != dag.num_nodes() {
            return Err(ModelError::schema(format!(
                "node order has {} entries but the graph has {} nodes",
                order.len(),
                dag.num_nodes()
            )));
        }

        let mut index = HashMap::with_capacity(order.len());
        let mut resolved_kinds = Vec::with_capacity(order.len());
        for (i, name) in order.iter().enumerate() {
            let name = name.as_ref();
            if !dag.contains(name) {
                return Err(ModelError::schema(format!("node not in graph: {name}")));
            }
            if index.insert(name.to_string(), i).is_some() {
                return Err(ModelError::schema(format!("node listed twice in order: {name}")));
            }
            let kind = kinds
                .get(name)
                .cloned()
                .ok_or_else(|| ModelError::schema(format!("no kind declared for node: {name}")))?;
            if let VarKind::Discrete { categories } = &kind {
                if categories.is_empty() {
                    return Err(ModelError::schema(format!("discrete node has no categories: {name}")));
                }
            }
            resolved_kinds.push((name.to_string(), kind));
        }

        let mut nodes = Vec::with_capacity(order.len());
        for (name, kind) in resolved_kinds.iter() {
            let parents = dag.parents(name)?;
            let (discrete_parents, continuous_parents) =
                partition_parents(&parents, &index, &resolved_kinds)?;
            nodes.push(NodeSpec {
                name: name.clone(),
                kind: kind.clone(),
                discrete_parents,
                continuous_parents,
            });
        }

        let n = nodes.len();
        Ok(Self {
            dag,
            nodes,
            index,
            cutpoints: vec![None; n],
        })
    }

    /// Start a builder that only yields a PM once every required cutpoint is
    /// installed.
    pub fn builder<S: AsRef<str>>(
        dag: Dag,
        order: &[S],
        kinds: &HashMap<String, VarKind>,
    ) -> Result<HybridPmBuilder, ModelError> {
        Ok(HybridPmBuilder {
            pm: HybridPm::new(dag, order, kinds)?,
        })
    }

    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, node: usize) -> Option<&NodeSpec> {
        self.nodes.get(node)
    }

    /// Schema error unless `node` indexes a PM node.
    ///
    /// The plain accessors (`name`, `is_discrete`, `row_dims`, ...) index
    /// like slices and expect indices obtained from `require_index`; every
    /// fallible operation checks here first.
    pub fn check_node(&self, node: usize) -> Result<(), ModelError> {
        if node < self.nodes.len() {
            Ok(())
        } else {
            Err(ModelError::schema(format!(
                "node index out of range: {node} (PM has {} nodes)",
                self.nodes.len()
            )))
        }
    }

    pub fn name(&self, node: usize) -> &str {
        &self.nodes[node].name
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn require_index(&self, name: &str) -> Result<usize, ModelError> {
        self.index_of(name)
            .ok_or_else(|| ModelError::schema(format!("node not in PM: {name}")))
    }

    pub fn is_discrete(&self, node: usize) -> bool {
        self.nodes[node].kind.is_discrete()
    }

    pub fn kind(&self, node: usize) -> &VarKind {
        &self.nodes[node].kind
    }

    /// Category labels of a discrete node; `None` for continuous nodes.
    pub fn categories(&self, node: usize) -> Option<&[String]> {
        match &self.nodes[node].kind {
            VarKind::Discrete { categories } => Some(categories),
            VarKind::Continuous => None,
        }
    }

    pub fn cardinality(&self, node: usize) -> Result<usize, ModelError> {
        self.check_node(node)?;
        self.nodes[node]
            .kind
            .cardinality()
            .ok_or_else(|| ModelError::schema(format!("not a discrete node: {}", self.name(node))))
    }

    pub fn discrete_parents(&self, node: usize) -> &[usize] {
        &self.nodes[node].discrete_parents
    }

    pub fn continuous_parents(&self, node: usize) -> &[usize] {
        &self.nodes[node].continuous_parents
    }

    /// All parents, in the order the graph reports them.
    pub fn parents(&self, node: usize) -> Result<Vec<usize>, ModelError> {
        self.check_node(node)?;
        self.dag
            .parents(self.name(node))?
            .into_iter()
            .map(|p| self.require_index(p))
            .collect()
    }

    /// Whether `node` needs cutpoints (discrete with ≥1 continuous parent).
    pub fn requires_cutpoints(&self, node: usize) -> bool {
        self.is_discrete(node) && !self.nodes[node].continuous_parents.is_empty()
    }

    pub fn has_cutpoints(&self, node: usize) -> bool {
        self.cutpoints[node].is_some()
    }

    /// Nodes that need cutpoints but have none installed yet.
    pub fn missing_cutpoints(&self) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&y| self.requires_cutpoints(y) && !self.has_cutpoints(y))
            .collect()
    }

    /// Fail unless every node that needs cutpoints has them.
    pub fn ensure_complete(&self) -> Result<(), ModelError> {
        let missing = self.missing_cutpoints();
        if missing.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = missing.iter().map(|&y| self.name(y)).collect();
        Err(ModelError::schema(format!(
            "cutpoints not set for discrete child(ren) with continuous parents: {}",
            names.join(", ")
        )))
    }

    /// Installed cutpoints for a discrete child, one array per continuous
    /// parent in continuous-parent order.
    pub fn cutpoints(&self, node: usize) -> Option<&[Vec<f64>]> {
        self.cutpoints[node].as_deref()
    }

    /// Install cutpoints for every continuous parent of the discrete `child`.
    ///
    /// Each array is copied and must be strictly increasing. Extra entries
    /// for nodes that are not continuous parents of `child` are rejected.
    pub fn set_cutpoints(
        &mut self,
        child: &str,
        by_parent: &HashMap<String, Vec<f64>>,
    ) -> Result<(), ModelError> {
        let y = self.require_index(child)?;
        if !self.is_discrete(y) {
            return Err(ModelError::schema(format!("child is not discrete: {child}")));
        }

        let cps = &self.nodes[y].continuous_parents;
        let mut cuts = Vec::with_capacity(cps.len());
        for &p in cps {
            let parent = &self.nodes[p].name;
            let edges = by_parent.get(parent).ok_or_else(|| {
                ModelError::schema(format!("missing cutpoints for parent {parent} of {child}"))
            })?;
            if !is_strictly_increasing(edges) {
                return Err(ModelError::schema(format!(
                    "cutpoints not strictly increasing for parent {parent} of {child}"
                )));
            }
            cuts.push(edges.clone());
        }
        if by_parent.len() != cps.len() {
            let extra: Vec<&str> = by_parent
                .keys()
                .filter(|k| !cps.iter().any(|&p| &self.nodes[p].name == *k))
                .map(String::as_str)
                .collect();
            return Err(ModelError::schema(format!(
                "cutpoints supplied for non-continuous-parent(s) of {child}: {}",
                extra.join(", ")
            )));
        }

        debug!(child, parents = cps.len(), "installed cutpoints");
        self.cutpoints[y] = Some(cuts);
        Ok(())
    }

    /// Compute and install cutpoints for every continuous parent of `child`
    /// from the data, using `policy` with `bins` bins per parent.
    ///
    /// `BinningPolicy::None` leaves the PM untouched.
    pub fn auto_cutpoints<D: DataTable + ?Sized>(
        &mut self,
        child: &str,
        data: &D,
        policy: BinningPolicy,
        bins: usize,
    ) -> Result<(), ModelError> {
        let y = self.require_index(child)?;
        if !self.is_discrete(y) {
            return Err(ModelError::schema(format!("child is not discrete: {child}")));
        }
        if policy == BinningPolicy::None {
            return Ok(());
        }

        let mut map = HashMap::new();
        for &p in &self.nodes[y].continuous_parents {
            let parent = &self.nodes[p].name;
            let col = data
                .column_index(parent)
                .ok_or_else(|| ModelError::data(format!("dataset is missing column for parent: {parent}")))?;
            let values: Vec<f64> = (0..data.num_rows()).map(|r| data.get_f64(r, col)).collect();
            let Some(cuts) = compute_cutpoints(&values, policy, bins)? else {
                continue;
            };
            if cuts.is_empty() {
                warn!(
                    child,
                    parent = parent.as_str(),
                    "degenerate parent column; using a single bin"
                );
            }
            map.insert(parent.clone(), cuts);
        }
        self.set_cutpoints(child, &map)
    }

    /// Install `bins - 1` evenly spaced edges over `[-0.5, 0.5]` for every
    /// discrete child whose cutpoints are still missing.
    pub fn seed_default_cutpoints(&mut self, bins: usize) -> Result<(), ModelError> {
        let b = bins.max(2);
        let (lo, hi) = DEFAULT_SEED_RANGE;
        let step = (hi - lo) / b as f64;
        let edges: Vec<f64> = (1..b).map(|i| lo + step * i as f64).collect();

        for y in self.missing_cutpoints() {
            let map: HashMap<String, Vec<f64>> = self.nodes[y]
                .continuous_parents
                .iter()
                .map(|&p| (self.nodes[p].name.clone(), edges.clone()))
                .collect();
            let child = self.nodes[y].name.clone();
            self.set_cutpoints(&child, &map)?;
        }
        Ok(())
    }

    /// Radices of the row index, discrete parents first.
    ///
    /// A continuous-parent radix is `0` while that child's cutpoints are
    /// missing.
    pub fn row_dims(&self, node: usize) -> Vec<usize> {
        let spec = &self.nodes[node];
        let mut dims: Vec<usize> = spec
            .discrete_parents
            .iter()
            .map(|&p| self.nodes[p].kind.cardinality().unwrap_or(0))
            .collect();
        if spec.kind.is_discrete() {
            match &self.cutpoints[node] {
                Some(cuts) => dims.extend(cuts.iter().map(|c| c.len() + 1)),
                None => dims.extend(std::iter::repeat_n(0, spec.continuous_parents.len())),
            }
        }
        dims
    }

    /// Number of table rows for `node`.
    pub fn num_rows(&self, node: usize) -> Result<usize, ModelError> {
        self.check_node(node)?;
        if self.requires_cutpoints(node) && !self.has_cutpoints(node) {
            return Err(ModelError::schema(format!(
                "cutpoints not set for discrete child with continuous parents: {}",
                self.name(node)
            )));
        }
        Ok(self.row_dims(node).iter().product())
    }

    /// Compose a row index from discrete-parent states and (for discrete
    /// nodes) continuous-parent bins.
    ///
    /// `continuous_bins` is ignored for continuous nodes.
    pub fn row_index(
        &self,
        node: usize,
        discrete_values: &[usize],
        continuous_bins: &[usize],
    ) -> Result<usize, ModelError> {
        self.check_node(node)?;
        let spec = &self.nodes[node];
        if discrete_values.len() != spec.discrete_parents.len() {
            return Err(ModelError::schema(format!(
                "discrete values length mismatch for {}: expected {}, got {}",
                spec.name,
                spec.discrete_parents.len(),
                discrete_values.len()
            )));
        }
        let bins: &[usize] = if spec.kind.is_discrete() {
            if continuous_bins.len() != spec.continuous_parents.len() {
                return Err(ModelError::schema(format!(
                    "continuous bins length mismatch for {}: expected {}, got {}",
                    spec.name,
                    spec.continuous_parents.len(),
                    continuous_bins.len()
                )));
            }
            if !spec.continuous_parents.is_empty() && !self.has_cutpoints(node) {
                return Err(ModelError::schema(format!(
                    "cutpoints not set for child {}",
                    spec.name
                )));
            }
            continuous_bins
        } else {
            &[]
        };

        let dims = self.row_dims(node);
        let mut row = 0usize;
        for (k, &digit) in discrete_values.iter().chain(bins.iter()).enumerate() {
            if digit >= dims[k] {
                return Err(ModelError::schema(format!(
                    "row digit {k} of {} out of range: {digit} >= {}",
                    spec.name, dims[k]
                )));
            }
            row = row * dims[k] + digit;
        }
        Ok(row)
    }

    /// Bin index of `value` for continuous parent `parent` of discrete `child`.
    pub fn discretize_for(&self, child: &str, parent: &str, value: f64) -> Result<usize, ModelError> {
        let y = self.require_index(child)?;
        let p = self.require_index(parent)?;
        let t = self.nodes[y]
            .continuous_parents
            .iter()
            .position(|&q| q == p)
            .ok_or_else(|| ModelError::schema(format!("{parent} is not a continuous parent of {child}")))?;
        let cuts = self
            .cutpoints(y)
            .ok_or_else(|| ModelError::schema(format!("cutpoints not set for child: {child}")))?;
        Ok(bin_for(&cuts[t], value))
    }

    /// Bins of the continuous-parent values of discrete `node`, in
    /// continuous-parent order.
    pub fn bins_for_values(&self, node: usize, continuous_values: &[f64]) -> Result<Vec<usize>, ModelError> {
        self.check_node(node)?;
        let cps = &self.nodes[node].continuous_parents;
        if cps.is_empty() {
            return Ok(Vec::new());
        }
        if continuous_values.len() != cps.len() {
            return Err(ModelError::schema(format!(
                "continuous values length mismatch for {}: expected {}, got {}",
                self.name(node),
                cps.len(),
                continuous_values.len()
            )));
        }
        let cuts = self.cutpoints(node).ok_or_else(|| {
            ModelError::schema(format!("cutpoints not set for child {}", self.name(node)))
        })?;
        Ok(cuts
            .iter()
            .zip(continuous_values)
            .map(|(c, &v)| bin_for(c, v))
            .collect())
    }

    /// Row index for one observed case: discrete-parent states plus raw
    /// continuous-parent values (binned here when `node` is discrete).
    pub fn row_index_for_case(
        &self,
        node: usize,
        discrete_states: &[usize],
        continuous_values: &[f64],
    ) -> Result<usize, ModelError> {
        self.check_node(node)?;
        let bins = if self.is_discrete(node) {
            self.bins_for_values(node, continuous_values)?
        } else {
            Vec::new()
        };
        self.row_index(node, discrete_states, &bins)
    }

    /// Row index for data row `row`, resolving parent columns by name.
    pub fn row_index_for_data_row<D: DataTable + ?Sized>(
        &self,
        node: usize,
        data: &D,
        row: usize,
    ) -> Result<usize, ModelError> {
        self.check_node(node)?;
        let spec = &self.nodes[node];
        let column = |p: usize| {
            data.column_index(&self.nodes[p].name).ok_or_else(|| {
                ModelError::data(format!("dataset missing parent: {}", self.nodes[p].name))
            })
        };

        let mut states = Vec::with_capacity(spec.discrete_parents.len());
        for &p in &spec.discrete_parents {
            let col = column(p)?;
            if !data.is_discrete_column(col) {
                return Err(ModelError::data(format!(
                    "discrete parent {} is stored as a continuous column",
                    self.nodes[p].name
                )));
            }
            states.push(data.get_int(row, col));
        }
        let mut values = Vec::new();
        if spec.kind.is_discrete() {
            for &p in &spec.continuous_parents {
                values.push(data.get_f64(row, column(p)?));
            }
        }
        self.row_index_for_case(node, &states, &values)
    }
}

/// Split `parents` into discrete and continuous index lists, preserving order.
fn partition_parents(
    parents: &[&str],
    index: &HashMap<String, usize>,
    kinds: &[(String, VarKind)],
) -> Result<(Vec<usize>, Vec<usize>), ModelError> {
    let mut discrete = Vec::new();
    let mut continuous = Vec::new();
    for p in parents {
        let j = *index
            .get(*p)
            .ok_or_else(|| ModelError::schema(format!("parent not in node order: {p}")))?;
        match kinds[j].1 {
            VarKind::Discrete { .. } => discrete.push(j),
            VarKind::Continuous => continuous.push(j),
        }
    }
    Ok((discrete, continuous))
}

/// Builder that folds cutpoint installation into PM construction.
///
/// `build` fails if any discrete child with continuous parents still lacks
/// cutpoints, so a finished `HybridPm` is always safe to size tables from.
#[derive(Debug, Clone)]
pub struct HybridPmBuilder {
    pm: HybridPm,
}

impl HybridPmBuilder {
    pub fn cutpoints(mut self, child: &str, by_parent: &HashMap<String, Vec<f64>>) -> Result<Self, ModelError> {
        self.pm.set_cutpoints(child, by_parent)?;
        Ok(self)
    }

    /// Compute cutpoints from data for every child still missing them.
    pub fn auto_cutpoints<D: DataTable + ?Sized>(
        mut self,
        data: &D,
        policy: BinningPolicy,
        bins: usize,
    ) -> Result<Self, ModelError> {
        for y in self.pm.missing_cutpoints() {
            let child = self.pm.name(y).to_string();
            self.pm.auto_cutpoints(&child, data, policy, bins)?;
        }
        Ok(self)
    }

    /// Seed default cutpoints for every child still missing them.
    pub fn default_cutpoints(mut self, bins: usize) -> Result<Self, ModelError> {
        self.pm.seed_default_cutpoints(bins)?;
        Ok(self)
    }

    /// The PM under construction; cutpoints may still be incomplete.
    pub fn pm(&self) -> &HybridPm {
        &self.pm
    }

    /// Nodes still missing cutpoints.
    pub fn missing(&self) -> Vec<String> {
        self.pm
            .missing_cutpoints()
            .into_iter()
            .map(|y| self.pm.name(y).to_string())
            .collect()
    }

    pub fn build(self) -> Result<HybridPm, ModelError> {
        self.pm.ensure_complete()?;
        Ok(self.pm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Column, MixedDataSet};
    use crate::models::fixtures;
    use proptest::prelude::*;

    #[test]
    fn parents_are_partitioned_in_graph_order() {
        let pm = fixtures::mixed_pm();
        let z = pm.require_index("Z").unwrap();
        let a = pm.require_index("A").unwrap();
        let x = pm.require_index("X").unwrap();
        let w = pm.require_index("W").unwrap();

        // Z <- W, A, X in edge order
        assert_eq!(pm.discrete_parents(z), &[a]);
        assert_eq!(pm.continuous_parents(z), &[w, x]);
        assert_eq!(pm.parents(z).unwrap(), vec![w, a, x]);
    }

    #[test]
    fn num_rows_requires_cutpoints_for_discrete_child_of_continuous_parent() {
        let mut pm = fixtures::mixed_pm();
        let z = pm.require_index("Z").unwrap();
        let y = pm.require_index("Y").unwrap();

        assert!(matches!(pm.num_rows(z), Err(ModelError::Schema(_))));
        // Continuous child with a discrete parent: only discrete parents count.
        assert_eq!(pm.num_rows(y).unwrap(), 2);

        let cuts = HashMap::from([
            ("W".to_string(), vec![0.0]),
            ("X".to_string(), vec![-1.0, 1.0]),
        ]);
        pm.set_cutpoints("Z", &cuts).unwrap();
        // |A| * bins(W) * bins(X) = 2 * 2 * 3
        assert_eq!(pm.num_rows(z).unwrap(), 12);
        assert_eq!(pm.row_dims(z), vec![2, 2, 3]);
    }

    #[test]
    fn set_cutpoints_validates_input() {
        let mut pm = fixtures::mixed_pm();

        let err = pm
            .set_cutpoints("Y", &HashMap::from([("X".to_string(), vec![0.0])]))
            .unwrap_err();
        assert!(matches!(err, ModelError::Schema(_)));

        let missing = HashMap::from([("W".to_string(), vec![0.0])]);
        assert!(pm.set_cutpoints("Z", &missing).is_err());

        let not_increasing = HashMap::from([
            ("W".to_string(), vec![0.0]),
            ("X".to_string(), vec![1.0, 1.0]),
        ]);
        assert!(pm.set_cutpoints("Z", &not_increasing).is_err());

        let extra = HashMap::from([
            ("W".to_string(), vec![0.0]),
            ("X".to_string(), vec![1.0]),
            ("A".to_string(), vec![1.0]),
        ]);
        assert!(pm.set_cutpoints("Z", &extra).is_err());
        assert!(!pm.has_cutpoints(pm.require_index("Z").unwrap()));
    }

    #[test]
    fn set_cutpoints_copies_caller_arrays() {
        let mut pm = fixtures::mixed_pm();
        let mut cuts = HashMap::from([
            ("W".to_string(), vec![0.0]),
            ("X".to_string(), vec![-1.0, 1.0]),
        ]);
        pm.set_cutpoints("Z", &cuts).unwrap();
        cuts.get_mut("X").unwrap()[0] = 100.0;

        let z = pm.require_index("Z").unwrap();
        assert_eq!(pm.cutpoints(z).unwrap()[1], vec![-1.0, 1.0]);
    }

    #[test]
    fn row_index_is_mixed_radix() {
        let pm = fixtures::complete_mixed_pm();
        let z = pm.require_index("Z").unwrap();
        // dims [2, 2, 3]
        assert_eq!(pm.row_index(z, &[0], &[0, 0]).unwrap(), 0);
        assert_eq!(pm.row_index(z, &[0], &[0, 2]).unwrap(), 2);
        assert_eq!(pm.row_index(z, &[0], &[1, 0]).unwrap(), 3);
        assert_eq!(pm.row_index(z, &[1], &[1, 2]).unwrap(), 11);

        assert!(matches!(pm.row_index(z, &[], &[0, 0]), Err(ModelError::Schema(_))));
        assert!(matches!(pm.row_index(z, &[0], &[0]), Err(ModelError::Schema(_))));
        assert!(matches!(pm.row_index(z, &[0], &[0, 3]), Err(ModelError::Schema(_))));

        // Continuous node: bins are not part of the layout.
        let y = pm.require_index("Y").unwrap();
        assert_eq!(pm.row_index(y, &[1], &[]).unwrap(), 1);
    }

    #[test]
    fn discretize_for_keeps_ties_in_lower_bin() {
        let pm = fixtures::binary_threshold_pm();
        assert_eq!(pm.discretize_for("Y", "X", -2.0).unwrap(), 0);
        assert_eq!(pm.discretize_for("Y", "X", 0.0).unwrap(), 0);
        assert_eq!(pm.discretize_for("Y", "X", 0.1).unwrap(), 1);
        assert!(pm.discretize_for("X", "Y", 0.1).is_err());
    }

    #[test]
    fn row_index_for_case_bins_continuous_values() {
        let pm = fixtures::complete_mixed_pm();
        let z = pm.require_index("Z").unwrap();
        // W cut at 0.0, X cut at [-1, 1]
        assert_eq!(pm.row_index_for_case(z, &[1], &[0.0, 1.0]).unwrap(), 2 * 3 + 1);
        assert_eq!(pm.row_index_for_case(z, &[1], &[0.5, 1.5]).unwrap(), 6 + 3 + 2);
        assert!(pm.row_index_for_case(z, &[1], &[0.5]).is_err());
    }

    #[test]
    fn row_index_for_data_row_resolves_columns_by_name() {
        let pm = fixtures::complete_mixed_pm();
        let z = pm.require_index("Z").unwrap();
        let data = MixedDataSet::new(vec![
            ("X".to_string(), Column::Continuous(vec![1.5, -3.0])),
            ("A".to_string(), Column::Discrete(vec![1, 0])),
            ("W".to_string(), Column::Continuous(vec![0.5, 0.0])),
        ])
        .unwrap();
        assert_eq!(pm.row_index_for_data_row(z, &data, 0).unwrap(), 11);
        assert_eq!(pm.row_index_for_data_row(z, &data, 1).unwrap(), 0);

        let y = pm.require_index("Y").unwrap();
        let no_a = MixedDataSet::new(vec![("X".to_string(), Column::Continuous(vec![0.0]))]).unwrap();
        assert!(matches!(
            pm.row_index_for_data_row(y, &no_a, 0),
            Err(ModelError::Data(_))
        ));

        let real_a = MixedDataSet::new(vec![
            ("A".to_string(), Column::Continuous(vec![-7.3])),
            ("X".to_string(), Column::Continuous(vec![0.0])),
        ])
        .unwrap();
        assert!(matches!(
            pm.row_index_for_data_row(y, &real_a, 0),
            Err(ModelError::Data(_))
        ));
    }

    #[test]
    fn builder_refuses_incomplete_schema() {
        let (dag, order, kinds) = fixtures::mixed_parts();
        let builder = HybridPm::builder(dag, &order, &kinds).unwrap();
        assert_eq!(builder.missing(), vec!["Z".to_string()]);
        assert!(matches!(builder.clone().build(), Err(ModelError::Schema(_))));

        let pm = builder.default_cutpoints(3).unwrap().build().unwrap();
        let z = pm.require_index("Z").unwrap();
        let cuts = pm.cutpoints(z).unwrap();
        assert_eq!(cuts.len(), 2);
        assert!((cuts[0][0] + 1.0 / 6.0).abs() < 1e-12);
        assert!((cuts[0][1] - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn auto_cutpoints_from_data() {
        let (dag, order, kinds) = fixtures::mixed_parts();
        let w: Vec<f64> = (0..=9).map(|i| i as f64).collect();
        let data = MixedDataSet::new(vec![
            ("W".to_string(), Column::Continuous(w)),
            ("X".to_string(), Column::Continuous(vec![5.0; 10])),
        ])
        .unwrap();

        let pm = HybridPm::builder(dag, &order, &kinds)
            .unwrap()
            .auto_cutpoints(&data, BinningPolicy::EqualFrequency, 3)
            .unwrap()
            .build()
            .unwrap();
        let z = pm.require_index("Z").unwrap();
        let cuts = pm.cutpoints(z).unwrap();
        assert_eq!(cuts[0], vec![3.0, 6.0]);
        // Constant column: single bin, not an error.
        assert!(cuts[1].is_empty());
        assert_eq!(pm.num_rows(z).unwrap(), 2 * 3);
    }

    #[test]
    fn construction_rejects_inconsistent_inputs() {
        let (dag, order, mut kinds) = fixtures::mixed_parts();
        assert!(HybridPm::new(dag.clone(), &order[..2], &kinds).is_err());
        kinds.remove("A");
        assert!(matches!(HybridPm::new(dag, &order, &kinds), Err(ModelError::Schema(_))));
    }

    #[test]
    fn out_of_range_node_is_a_schema_error() {
        let pm = fixtures::complete_mixed_pm();
        let bad = pm.num_nodes();
        assert!(pm.node(bad).is_none());
        assert!(matches!(pm.check_node(bad), Err(ModelError::Schema(_))));
        assert!(matches!(pm.cardinality(bad), Err(ModelError::Schema(_))));
        assert!(matches!(pm.parents(bad), Err(ModelError::Schema(_))));
        assert!(matches!(pm.num_rows(bad), Err(ModelError::Schema(_))));
        assert!(matches!(pm.row_index(bad, &[], &[]), Err(ModelError::Schema(_))));
        assert!(matches!(pm.bins_for_values(bad, &[0.0]), Err(ModelError::Schema(_))));
        assert!(matches!(pm.row_index_for_case(bad, &[], &[]), Err(ModelError::Schema(_))));

        let data = MixedDataSet::new(vec![("W".to_string(), Column::Continuous(vec![0.0]))]).unwrap();
        assert!(matches!(pm.row_index_for_data_row(bad, &data, 0), Err(ModelError::Schema(_))));
    }

    proptest! {
        #[test]
        fn num_rows_matches_product_of_radices(
            card_a in 1usize..5,
            card_b in 1usize..5,
            cuts_x in 0usize..4,
        ) {
            let dag = Dag::from_edges(
                &["A", "B", "X", "C", "Y"],
                &[("A", "C"), ("B", "C"), ("X", "C"), ("A", "Y"), ("X", "Y")],
            ).unwrap();
            let kinds = HashMap::from([
                ("A".to_string(), VarKind::discrete(card_a)),
                ("B".to_string(), VarKind::discrete(card_b)),
                ("X".to_string(), VarKind::Continuous),
                ("C".to_string(), VarKind::discrete(2)),
                ("Y".to_string(), VarKind::Continuous),
            ]);
            let edges: Vec<f64> = (0..cuts_x).map(|i| i as f64).collect();
            let pm = HybridPm::builder(dag, &["A", "B", "X", "C", "Y"], &kinds)
                .unwrap()
                .cutpoints("C", &HashMap::from([("X".to_string(), edges)]))
                .unwrap()
                .build()
                .unwrap();

            let c = pm.require_index("C").unwrap();
            let y = pm.require_index("Y").unwrap();
            prop_assert_eq!(pm.num_rows(c).unwrap(), card_a * card_b * (cuts_x + 1));
            prop_assert_eq!(pm.num_rows(y).unwrap(), card_a);
        }
    }
}
