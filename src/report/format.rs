//! Formatted terminal output for models, fits, samples and cutpoints.
//!
//! Formatting lives here so the estimation and sampling code stays free of
//! presentation concerns.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::data::{Column, DataTable, MixedDataSet};
use crate::domain::{BinningPolicy, EstimatorConfig};
use crate::models::{HybridIm, HybridPm, NodeTable};

/// Table rows shown per node before eliding the rest.
const MAX_ROWS_SHOWN: usize = 6;

impl fmt::Display for HybridIm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pm = self.pm();
        writeln!(f, "Hybrid CG model ({} nodes)", pm.num_nodes())?;
        for y in 0..pm.num_nodes() {
            writeln!(f)?;
            write_node(f, self, pm, y)?;
        }
        Ok(())
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, im: &HybridIm, pm: &HybridPm, y: usize) -> fmt::Result {
    let names = |idx: &[usize]| -> String {
        if idx.is_empty() {
            "-".to_string()
        } else {
            idx.iter().map(|&p| pm.name(p)).collect::<Vec<_>>().join(", ")
        }
    };

    let kind = match pm.categories(y) {
        Some(labels) => format!("discrete {{{}}}", labels.join(", ")),
        None => "continuous".to_string(),
    };
    writeln!(f, "[{}] {kind}", pm.name(y))?;
    writeln!(
        f,
        "  discrete parents: {} | continuous parents: {}",
        names(pm.discrete_parents(y)),
        names(pm.continuous_parents(y))
    )?;
    writeln!(f, "  radices: {:?} | rows: {}", pm.row_dims(y), im.num_rows(y))?;

    if let Some(cuts) = pm.cutpoints(y) {
        for (&p, c) in pm.continuous_parents(y).iter().zip(cuts) {
            writeln!(f, "  cutpoints[{}]: {}", pm.name(p), fmt_vec(c))?;
        }
    }

    let table = match im.table(y) {
        NodeTable::Cpt(m) => m,
        NodeTable::Regression(m) => {
            let mut header = vec!["intercept".to_string()];
            header.extend(pm.continuous_parents(y).iter().map(|&p| pm.name(p).to_string()));
            header.push("variance".to_string());
            writeln!(f, "  columns: {}", header.join(", "))?;
            m
        }
    };

    let shown = table.nrows().min(MAX_ROWS_SHOWN);
    for r in 0..shown {
        let cells: Vec<f64> = table.row(r).iter().copied().collect();
        writeln!(f, "  row {r:>3}: {}", fmt_vec(&cells))?;
    }
    if table.nrows() > shown {
        writeln!(f, "  ... ({} more rows)", table.nrows() - shown)?;
    }
    Ok(())
}

/// Header block for `hcg fit`.
pub fn format_fit_summary(
    started_at: DateTime<Utc>,
    data: &MixedDataSet,
    im: &HybridIm,
    config: &EstimatorConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== hcg - Hybrid CG fit ===\n");
    out.push_str(&format!("Run: {}\n", started_at.format("%Y-%m-%d %H:%M:%S UTC")));
    out.push_str(&format!("Data: n={} | columns={}\n", data.num_rows(), data.num_columns()));
    out.push_str(&format!(
        "Estimator: alpha={} | share-variance={} | binning={} (bins={})\n",
        config.alpha,
        config.share_variance_across_rows,
        config.binning.display_name(),
        config.bins
    ));

    let pm = im.pm();
    let mut dead = Vec::new();
    for y in (0..pm.num_nodes()).filter(|&y| !pm.is_discrete(y)) {
        if let Ok(rows) = im.dead_rows(y) {
            if !rows.is_empty() {
                dead.push(format!("{} {:?}", pm.name(y), rows));
            }
        }
    }
    if dead.is_empty() {
        out.push_str("Unfit strata: none\n");
    } else {
        out.push_str(&format!("Unfit strata: {}\n", dead.join("; ")));
    }
    out.push('\n');

    out
}

/// Per-column summary of a materialized sample.
pub fn format_sample_summary(started_at: DateTime<Utc>, seed: u64, data: &MixedDataSet, pm: &HybridPm) -> String {
    let mut out = String::new();

    out.push_str("=== hcg - Hybrid CG simulation ===\n");
    out.push_str(&format!("Run: {}\n", started_at.format("%Y-%m-%d %H:%M:%S UTC")));
    out.push_str(&format!("Rows: {} | seed={seed}\n\n", data.num_rows()));

    out.push_str(&format!("{:<16} {:<10} {}\n", "variable", "kind", "summary"));
    out.push_str(&format!("{:-<16} {:-<10} {:-<40}\n", "", "", ""));
    for (c, name) in data.names().iter().enumerate() {
        let line = match data.column(c) {
            Column::Discrete(codes) => {
                let labels = pm.index_of(name).and_then(|y| pm.categories(y)).unwrap_or_default();
                let k = labels.len().max(codes.iter().map(|&v| v + 1).max().unwrap_or(0));
                let mut counts = vec![0usize; k];
                for &v in codes {
                    counts[v] += 1;
                }
                let parts: Vec<String> = counts
                    .iter()
                    .enumerate()
                    .map(|(i, n)| {
                        let label = labels.get(i).map(String::as_str).unwrap_or("?");
                        format!("{label}={:.3}", *n as f64 / codes.len().max(1) as f64)
                    })
                    .collect();
                format!("{:<16} {:<10} {}", truncate(name, 16), "discrete", parts.join(" "))
            }
            Column::Continuous(values) => {
                let (mean, sd, min, max) = moments(values);
                format!(
                    "{:<16} {:<10} mean={mean:.4} sd={sd:.4} min={min:.4} max={max:.4}",
                    truncate(name, 16),
                    "continuous"
                )
            }
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Output of `hcg cutpoints`.
pub fn format_cutpoints(column: &str, values: &[f64], policy: BinningPolicy, bins: usize, cuts: Option<&[f64]>) -> String {
    let finite = values.iter().filter(|v| v.is_finite()).count();
    let mut out = String::new();
    out.push_str(&format!(
        "Column: {column} | values={} (finite={finite}) | policy={} | bins={bins}\n",
        values.len(),
        policy.display_name()
    ));
    match cuts {
        None => out.push_str("Cutpoints: not computed (policy none)\n"),
        Some([]) => out.push_str("Cutpoints: none (degenerate column, single bin)\n"),
        Some(c) => {
            out.push_str(&format!("Cutpoints: {}\n", fmt_vec(c)));
            out.push_str(&format!("Bins: {}\n", c.len() + 1));
        }
    }
    out
}

fn moments(values: &[f64]) -> (f64, f64, f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN, f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0).max(1.0);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (mean, var.sqrt(), min, max)
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('~');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::domain::{Dag, VarKind};
    use crate::models::fixtures;

    #[test]
    fn display_lists_every_node_with_layout() {
        let im = fixtures::round_trip_im();
        let text = im.to_string();

        assert!(text.starts_with("Hybrid CG model (3 nodes)"));
        assert!(text.contains("[Y] discrete {0, 1, 2}"));
        assert!(text.contains("cutpoints[X]: [-0.5000, 0.5000]"));
        assert!(text.contains("columns: intercept, X, variance"));
        assert!(text.contains("row   0: [0.7000, 0.2000, 0.1000]"));
        assert!(!text.contains("more rows"));
    }

    #[test]
    fn display_elides_long_tables() {
        // Z has 3 * 3 = 9 CPT rows from two discretized parents.
        let dag = Dag::from_edges(&["X", "W", "Z"], &[("X", "Z"), ("W", "Z")]).unwrap();
        let kinds = HashMap::from([
            ("X".to_string(), VarKind::Continuous),
            ("W".to_string(), VarKind::Continuous),
            ("Z".to_string(), VarKind::discrete(2)),
        ]);
        let pm = HybridPm::builder(dag, &["X", "W", "Z"], &kinds)
            .unwrap()
            .default_cutpoints(3)
            .unwrap()
            .build()
            .unwrap();
        let im = HybridIm::new(Arc::new(pm)).unwrap();
        let text = im.to_string();
        assert!(text.contains("radices: [3, 3] | rows: 9"));
        assert!(text.contains("  ... (3 more rows)"));
    }

    #[test]
    fn sample_summary_reports_frequencies_and_moments() {
        let im = fixtures::round_trip_im();
        let sample = im.sample(300, &mut StdRng::seed_from_u64(4)).unwrap();
        let ds = im.to_dataset_in_pm_order(&sample).unwrap();
        let text = format_sample_summary(Utc::now(), 4, &ds, im.pm());

        assert!(text.contains("Rows: 300 | seed=4"));
        assert!(text.contains("discrete"));
        assert!(text.contains("0="));
        assert!(text.contains("mean="));
    }

    #[test]
    fn cutpoint_report_distinguishes_cases() {
        let values = [1.0, 2.0, 3.0];
        let none = format_cutpoints("X", &values, BinningPolicy::None, 3, None);
        assert!(none.contains("not computed"));
        let flat = format_cutpoints("X", &values, BinningPolicy::EqualInterval, 3, Some(&[]));
        assert!(flat.contains("degenerate"));
        let some = format_cutpoints("X", &values, BinningPolicy::EqualInterval, 3, Some(&[1.5, 2.5]));
        assert!(some.contains("[1.5000, 2.5000]"));
        assert!(some.contains("Bins: 3"));
    }
}
