//! JSON model description: variables, edges and optional cutpoints.
//!
//! ```json
//! {
//!   "variables": [
//!     { "name": "X", "kind": "continuous" },
//!     { "name": "Y", "kind": "discrete", "categories": ["lo", "mid", "hi"] }
//!   ],
//!   "edges": [["X", "Y"]],
//!   "cutpoints": { "Y": { "X": [-0.5, 0.5] } }
//! }
//! ```
//!
//! Variable order in the file is the PM node order. This is a structural
//! description only; fitted parameters are never stored here.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Dag, VarKind};
use crate::error::ModelError;
use crate::models::{HybridPm, HybridPmBuilder};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    #[serde(flatten)]
    pub kind: VarKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub variables: Vec<VariableDecl>,
    #[serde(default)]
    pub edges: Vec<(String, String)>,
    /// `child -> parent -> cutpoints`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cutpoints: BTreeMap<String, BTreeMap<String, Vec<f64>>>,
}

impl ModelFile {
    pub fn order(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn dag(&self) -> Result<Dag, ModelError> {
        let edges: Vec<(&str, &str)> = self
            .edges
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        Dag::from_edges(&self.order(), &edges)
    }

    /// A PM builder with every cutpoint listed in the file installed.
    pub fn builder(&self) -> Result<HybridPmBuilder, ModelError> {
        let kinds: HashMap<String, VarKind> = self
            .variables
            .iter()
            .map(|v| (v.name.clone(), v.kind.clone()))
            .collect();
        if kinds.len() != self.variables.len() {
            return Err(ModelError::schema("variable declared more than once"));
        }

        let mut builder = HybridPm::builder(self.dag()?, &self.order(), &kinds)?;
        for (child, by_parent) in &self.cutpoints {
            let by_parent: HashMap<String, Vec<f64>> =
                by_parent.iter().map(|(p, c)| (p.clone(), c.clone())).collect();
            builder = builder.cutpoints(child, &by_parent)?;
        }
        Ok(builder)
    }

    /// Describe an existing PM, including any installed cutpoints.
    pub fn from_pm(pm: &HybridPm) -> Self {
        let variables = pm
            .nodes()
            .iter()
            .map(|spec| VariableDecl {
                name: spec.name.clone(),
                kind: spec.kind.clone(),
            })
            .collect();

        let mut edges = Vec::new();
        for spec in pm.nodes() {
            for p in spec.discrete_parents.iter().chain(&spec.continuous_parents) {
                edges.push((pm.name(*p).to_string(), spec.name.clone()));
            }
        }

        let mut cutpoints = BTreeMap::new();
        for y in 0..pm.num_nodes() {
            if let Some(cuts) = pm.cutpoints(y) {
                let by_parent = pm
                    .continuous_parents(y)
                    .iter()
                    .zip(cuts)
                    .map(|(&p, c)| (pm.name(p).to_string(), c.clone()))
                    .collect();
                cutpoints.insert(pm.name(y).to_string(), by_parent);
            }
        }

        Self {
            variables,
            edges,
            cutpoints,
        }
    }
}

/// Read a model description file.
pub fn read_model_file(path: &Path) -> Result<ModelFile, ModelError> {
    let file = File::open(path)
        .map_err(|e| ModelError::io(format!("failed to open model file '{}'", path.display()), e))?;
    serde_json::from_reader(file).map_err(|e| ModelError::Parse(format!("invalid model file '{}': {e}", path.display())))
}

/// Write a model description file.
pub fn write_model_file(path: &Path, model: &ModelFile) -> Result<(), ModelError> {
    let file = File::create(path)
        .map_err(|e| ModelError::io(format!("failed to create model file '{}'", path.display()), e))?;
    serde_json::to_writer_pretty(file, model).map_err(|e| ModelError::Parse(format!("failed to write model file: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::models::fixtures;

    const DESCRIPTION: &str = r#"{
        "variables": [
            { "name": "X", "kind": "continuous" },
            { "name": "Y", "kind": "discrete", "categories": ["lo", "mid", "hi"] },
            { "name": "V", "kind": "continuous" }
        ],
        "edges": [["X", "Y"], ["X", "V"], ["Y", "V"]],
        "cutpoints": { "Y": { "X": [-0.5, 0.5] } }
    }"#;

    #[test]
    fn parses_description_into_complete_pm() {
        let model: ModelFile = serde_json::from_str(DESCRIPTION).unwrap();
        assert_eq!(model.order(), vec!["X", "Y", "V"]);

        let pm = model.builder().unwrap().build().unwrap();
        let y = pm.require_index("Y").unwrap();
        assert_eq!(pm.categories(y).unwrap(), &["lo", "mid", "hi"]);
        assert_eq!(pm.cutpoints(y).unwrap(), &[vec![-0.5, 0.5]]);
        assert_eq!(pm.num_rows(pm.require_index("V").unwrap()).unwrap(), 3);
    }

    #[test]
    fn missing_cutpoints_stay_missing_in_builder() {
        let model: ModelFile = serde_json::from_str(
            r#"{
                "variables": [
                    { "name": "X", "kind": "continuous" },
                    { "name": "Y", "kind": "discrete", "categories": ["a", "b"] }
                ],
                "edges": [["X", "Y"]]
            }"#,
        )
        .unwrap();
        let builder = model.builder().unwrap();
        assert_eq!(builder.missing(), vec!["Y".to_string()]);
        assert!(matches!(builder.build(), Err(ModelError::Schema(_))));
    }

    #[test]
    fn duplicate_variable_is_rejected() {
        let model: ModelFile = serde_json::from_str(
            r#"{ "variables": [
                { "name": "X", "kind": "continuous" },
                { "name": "X", "kind": "continuous" }
            ] }"#,
        )
        .unwrap();
        assert!(model.builder().is_err());
    }

    #[test]
    fn file_round_trip_preserves_structure() {
        let pm = fixtures::round_trip_pm();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        write_model_file(&path, &ModelFile::from_pm(&pm)).unwrap();
        let back = read_model_file(&path).unwrap().builder().unwrap().build().unwrap();

        assert_eq!(back.num_nodes(), pm.num_nodes());
        for y in 0..pm.num_nodes() {
            assert_eq!(back.name(y), pm.name(y));
            assert_eq!(back.kind(y), pm.kind(y));
            assert_eq!(back.row_dims(y), pm.row_dims(y));
            assert_eq!(back.cutpoints(y), pm.cutpoints(y));
        }
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ \"variables\": [ }}").unwrap();
        assert!(matches!(read_model_file(file.path()), Err(ModelError::Parse(_))));
        assert!(matches!(
            read_model_file(Path::new("/nonexistent/model.json")),
            Err(ModelError::Io { .. })
        ));
    }
}
