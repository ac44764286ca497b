//! CSV ingest.
//!
//! Columns are matched to PM nodes by header name; extra columns are ignored.
//! Data must be fully observed, so any unparseable cell fails the whole load
//! with its line number.
//!
//! - discrete cells: a category label of the node, or else an integer code
//!   in `0..cardinality`
//! - continuous cells: a finite real

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use tracing::debug;

use crate::data::{Column, DataTable, MixedDataSet};
use crate::error::ModelError;
use crate::models::HybridPm;

/// Load a CSV dataset typed by the node kinds of `pm`.
pub fn read_dataset(path: &Path, pm: &HybridPm) -> Result<MixedDataSet, ModelError> {
    let (mut reader, header_map) = open_csv(path)?;

    let mut positions = Vec::with_capacity(pm.num_nodes());
    for spec in pm.nodes() {
        let pos = header_map
            .get(spec.name.as_str())
            .ok_or_else(|| ModelError::data(format!("CSV is missing column for variable: {}", spec.name)))?;
        positions.push(*pos);
    }

    let mut columns: Vec<Column> = (0..pm.num_nodes())
        .map(|y| {
            if pm.is_discrete(y) {
                Column::Discrete(Vec::new())
            } else {
                Column::Continuous(Vec::new())
            }
        })
        .collect();

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| ModelError::Parse(format!("line {line}: {e}")))?;
        for (y, column) in columns.iter_mut().enumerate() {
            let cell = required_cell(&record, positions[y], line, pm.name(y))?;
            match column {
                Column::Discrete(v) => {
                    let labels = pm.categories(y).unwrap_or_default();
                    v.push(parse_category(cell, labels).ok_or_else(|| {
                        ModelError::data(format!(
                            "line {line}: '{cell}' is not a category of {} ({})",
                            pm.name(y),
                            labels.join(", ")
                        ))
                    })?);
                }
                Column::Continuous(v) => {
                    let value = cell
                        .parse::<f64>()
                        .ok()
                        .filter(|x| x.is_finite())
                        .ok_or_else(|| {
                            ModelError::data(format!("line {line}: invalid value '{cell}' for {}", pm.name(y)))
                        })?;
                    v.push(value);
                }
            }
        }
    }

    let names = pm.nodes().iter().map(|s| s.name.clone());
    let ds = MixedDataSet::new(names.zip(columns).collect())?;
    if ds.num_rows() == 0 {
        return Err(ModelError::data(format!("no data rows in '{}'", path.display())));
    }
    debug!(path = %path.display(), rows = ds.num_rows(), "loaded dataset");
    Ok(ds)
}

/// Read one column of a CSV as reals. Empty cells and `NaN` read as NaN.
pub fn read_numeric_column(path: &Path, column: &str) -> Result<Vec<f64>, ModelError> {
    let (mut reader, header_map) = open_csv(path)?;
    let pos = *header_map
        .get(column)
        .ok_or_else(|| ModelError::data(format!("CSV has no column named '{column}'")))?;

    let mut values = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| ModelError::Parse(format!("line {line}: {e}")))?;
        let raw = record.get(pos).unwrap_or("");
        if raw.is_empty() {
            values.push(f64::NAN);
            continue;
        }
        let v = raw
            .parse::<f64>()
            .map_err(|_| ModelError::data(format!("line {line}: invalid number '{raw}' in column {column}")))?;
        values.push(v);
    }
    Ok(values)
}

fn open_csv(path: &Path) -> Result<(csv::Reader<File>, HashMap<String, usize>), ModelError> {
    let file = File::open(path).map_err(|e| ModelError::io(format!("failed to open CSV '{}'", path.display()), e))?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    let headers = reader
        .headers()
        .map_err(|e| ModelError::Parse(format!("failed to read CSV headers: {e}")))?
        .clone();
    Ok((reader, build_header_map(&headers)))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.trim().trim_start_matches('\u{feff}').to_string(), idx))
        .collect()
}

fn required_cell<'a>(record: &'a StringRecord, pos: usize, line: usize, name: &str) -> Result<&'a str, ModelError> {
    record
        .get(pos)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ModelError::data(format!("line {line}: missing value for {name}")))
}

/// Label match first, then an in-range integer code.
fn parse_category(cell: &str, labels: &[String]) -> Option<usize> {
    if let Some(k) = labels.iter().position(|l| l == cell) {
        return Some(k);
    }
    cell.parse::<usize>().ok().filter(|&k| k < labels.len())
}
