//! Tabular dataset interface and an in-memory mixed implementation.
//!
//! The estimator only needs column lookup by variable name and per-cell reads
//! as either a category code or a real value. `DataTable` captures exactly
//! that, so any columnar store can be fitted against.

use std::collections::HashMap;

use crate::error::ModelError;

/// Read access to a rectangular dataset.
pub trait DataTable {
    fn num_rows(&self) -> usize;

    fn num_columns(&self) -> usize;

    /// Column position for a variable name, if present.
    fn column_index(&self, name: &str) -> Option<usize>;

    /// Whether `col` holds category codes rather than real values.
    fn is_discrete_column(&self, col: usize) -> bool;

    /// Category code at `(row, col)`. Only meaningful for discrete columns.
    fn get_int(&self, row: usize, col: usize) -> usize;

    /// Real value at `(row, col)`. Discrete cells read as their code.
    fn get_f64(&self, row: usize, col: usize) -> f64;
}

/// One dataset column.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Discrete(Vec<usize>),
    Continuous(Vec<f64>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Discrete(v) => v.len(),
            Column::Continuous(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, Column::Discrete(_))
    }

    /// Values as reals (discrete codes are widened).
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            Column::Discrete(v) => v.iter().map(|&c| c as f64).collect(),
            Column::Continuous(v) => v.clone(),
        }
    }
}

/// Named columns of equal length, each discrete or continuous.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MixedDataSet {
    names: Vec<String>,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    rows: usize,
}

impl MixedDataSet {
    pub fn new(columns: Vec<(String, Column)>) -> Result<Self, ModelError> {
        let mut out = MixedDataSet::default();
        for (i, (name, col)) in columns.into_iter().enumerate() {
            if i == 0 {
                out.rows = col.len();
            } else if col.len() != out.rows {
                return Err(ModelError::data(format!(
                    "column '{name}' has {} rows, expected {}",
                    col.len(),
                    out.rows
                )));
            }
            if out.index.insert(name.clone(), i).is_some() {
                return Err(ModelError::data(format!("duplicate column: {name}")));
            }
            out.names.push(name);
            out.columns.push(col);
        }
        Ok(out)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, col: usize) -> &Column {
        &self.columns[col]
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }
}

impl DataTable for MixedDataSet {
    fn num_rows(&self) -> usize {
        self.rows
    }

    fn num_columns(&self) -> usize {
        self.columns.len()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn is_discrete_column(&self, col: usize) -> bool {
        self.columns[col].is_discrete()
    }

    fn get_int(&self, row: usize, col: usize) -> usize {
        match &self.columns[col] {
            Column::Discrete(v) => v[row],
            Column::Continuous(v) => v[row].round().max(0.0) as usize,
        }
    }

    fn get_f64(&self, row: usize, col: usize) -> f64 {
        match &self.columns[col] {
            Column::Discrete(v) => v[row] as f64,
            Column::Continuous(v) => v[row],
        }
    }
}
