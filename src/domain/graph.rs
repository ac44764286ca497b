//! Minimal directed graph used as the structure input to a PM.
//!
//! The PM only ever asks "who are the parents of `v`", once, at construction
//! time. Sampling additionally needs children lists for the topological sort.
//! Parent order is the insertion order of edges and is preserved, because the
//! PM's parent partitioning (and therefore row layout) follows it.

use std::collections::HashMap;

use crate::error::ModelError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dag {
    nodes: Vec<String>,
    index: HashMap<String, usize>,
    parents: Vec<Vec<usize>>,
    children: Vec<Vec<usize>>,
}

impl Dag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from node names and `(parent, child)` edges.
    pub fn from_edges<S: AsRef<str>>(nodes: &[S], edges: &[(S, S)]) -> Result<Self, ModelError> {
        let mut dag = Dag::new();
        for n in nodes {
            dag.add_node(n.as_ref())?;
        }
        for (from, to) in edges {
            dag.add_edge(from.as_ref(), to.as_ref())?;
        }
        Ok(dag)
    }

    pub fn add_node(&mut self, name: &str) -> Result<usize, ModelError> {
        if self.index.contains_key(name) {
            return Err(ModelError::schema(format!("duplicate node: {name}")));
        }
        let i = self.nodes.len();
        self.nodes.push(name.to_string());
        self.index.insert(name.to_string(), i);
        self.parents.push(Vec::new());
        self.children.push(Vec::new());
        Ok(i)
    }

    /// Add a directed edge `from -> to`.
    ///
    /// Acyclicity is not checked here; a cyclic graph is reported when a
    /// topological order is requested.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), ModelError> {
        let f = self.require(from)?;
        let t = self.require(to)?;
        if f == t {
            return Err(ModelError::cycle(format!("self loop on {from}")));
        }
        if self.parents[t].contains(&f) {
            return Err(ModelError::schema(format!("duplicate edge {from} -> {to}")));
        }
        self.parents[t].push(f);
        self.children[f].push(t);
        Ok(())
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Parents of `name` in edge-insertion order.
    pub fn parents(&self, name: &str) -> Result<Vec<&str>, ModelError> {
        let i = self.require(name)?;
        Ok(self.parents[i].iter().map(|&p| self.nodes[p].as_str()).collect())
    }

    pub fn children(&self, name: &str) -> Result<Vec<&str>, ModelError> {
        let i = self.require(name)?;
        Ok(self.children[i].iter().map(|&c| self.nodes[c].as_str()).collect())
    }

    fn require(&self, name: &str) -> Result<usize, ModelError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ModelError::schema(format!("node not in graph: {name}")))
    }
}
