//! Export a dataset (typically a materialized sample) to CSV.
//!
//! Discrete cells are written as category labels of the matching PM node so
//! the file reads back through `read_dataset` unchanged.

use std::path::Path;

use crate::data::{Column, DataTable, MixedDataSet};
use crate::error::ModelError;
use crate::models::HybridPm;

pub fn write_dataset_csv(path: &Path, data: &MixedDataSet, pm: &HybridPm) -> Result<(), ModelError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_error(path, e))?;

    writer.write_record(data.names()).map_err(|e| csv_error(path, e))?;

    let labels: Vec<Option<&[String]>> = data
        .names()
        .iter()
        .map(|name| pm.index_of(name).and_then(|y| pm.categories(y)))
        .collect();

    let rows = data.num_rows();
    let mut record = Vec::with_capacity(data.names().len());
    for r in 0..rows {
        record.clear();
        for (c, labels) in labels.iter().enumerate() {
            let cell = match data.column(c) {
                Column::Discrete(v) => match labels.and_then(|l| l.get(v[r])) {
                    Some(label) => label.clone(),
                    None => v[r].to_string(),
                },
                Column::Continuous(v) => v[r].to_string(),
            };
            record.push(cell);
        }
        writer.write_record(&record).map_err(|e| csv_error(path, e))?;
    }

    writer
        .flush()
        .map_err(|e| ModelError::io(format!("failed to flush CSV '{}'", path.display()), e))
}

fn csv_error(path: &Path, e: csv::Error) -> ModelError {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => ModelError::io(format!("failed to write CSV '{}'", path.display()), io),
        other => ModelError::Parse(format!("failed to write CSV '{}': {other:?}", path.display())),
    }
}
