//! Cutpoint computation for discretizing continuous parents.
//!
//! A discrete child with a continuous parent sees that parent through bins.
//! Cutpoints are strictly increasing thresholds; `k` cutpoints make `k + 1`
//! bins. A value advances past cutpoint `c` only when `value > c`, so a value
//! equal to a cutpoint stays in the lower bin. `bin_for` is the single
//! implementation of that rule and is shared by the PM, the estimator and the
//! sampler.
//!
//! Degenerate inputs never fail:
//! - non-finite values are dropped before anything else
//! - a constant (or empty) column yields no cutpoints (one bin)
//! - if no candidate edge survives strictness checks, the median is used

use tracing::debug;

use crate::domain::BinningPolicy;
use crate::error::ModelError;

/// Relative tolerance (scaled by the column span) for merging near-equal edges.
const MERGE_EPS: f64 = 1e-9;

/// Bin index of `value` under `cuts`, in `0..=cuts.len()`.
pub fn bin_for(cuts: &[f64], value: f64) -> usize {
    let mut b = 0;
    while b < cuts.len() && value > cuts[b] {
        b += 1;
    }
    b
}

pub fn is_strictly_increasing(cuts: &[f64]) -> bool {
    cuts.iter().all(|c| c.is_finite()) && cuts.windows(2).all(|w| w[1] > w[0])
}

/// Compute cutpoints for `values` under `policy`.
///
/// Returns `Ok(None)` for `BinningPolicy::None` (nothing is computed).
pub fn compute_cutpoints(
    values: &[f64],
    policy: BinningPolicy,
    bins: usize,
) -> Result<Option<Vec<f64>>, ModelError> {
    if policy != BinningPolicy::None && bins < 2 {
        return Err(ModelError::config(format!("bins must be >= 2 (got {bins})")));
    }
    let cuts = match policy {
        BinningPolicy::EqualInterval => equal_interval_cutpoints(values, bins),
        BinningPolicy::EqualFrequency => equal_frequency_cutpoints(values, bins),
        BinningPolicy::None => return Ok(None),
    };
    Ok(Some(cuts))
}

/// `bins - 1` interior edges of `bins` equal-width segments over `[min, max]`.
pub fn equal_interval_cutpoints(values: &[f64], bins: usize) -> Vec<f64> {
    let sorted = finite_sorted(values);
    let Some((min, max)) = extrema(&sorted) else {
        return Vec::new();
    };
    if max <= min || bins < 2 {
        return Vec::new();
    }

    let width = (max - min) / bins as f64;
    let candidates: Vec<f64> = (1..bins).map(|k| min + width * k as f64).collect();
    enforce_strict(candidates, &sorted)
}

/// `bins - 1` empirical quantiles at `1/bins, 2/bins, ...`.
///
/// With fewer finite values than bins, midpoints between consecutive unique
/// values are used instead (at most `bins - 1` of them, evenly strided).
pub fn equal_frequency_cutpoints(values: &[f64], bins: usize) -> Vec<f64> {
    let sorted = finite_sorted(values);
    let Some((min, max)) = extrema(&sorted) else {
        return Vec::new();
    };
    if max <= min || bins < 2 {
        return Vec::new();
    }

    let n = sorted.len();
    let candidates: Vec<f64> = if n < bins {
        let mut unique = sorted.clone();
        unique.dedup();
        let m = (unique.len() - 1).min(bins - 1);
        let step = (unique.len() - 1) / m;
        (1..=m)
            .map(|k| {
                let i = k * step;
                0.5 * (unique[i - 1] + unique[i])
            })
            .collect()
    } else {
        (1..bins)
            .map(|k| {
                let q = k as f64 / bins as f64;
                let idx = (q * (n - 1) as f64).round() as usize;
                sorted[idx.min(n - 1)]
            })
            .collect()
    };
    enforce_strict(candidates, &sorted)
}

fn finite_sorted(values: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    out
}

fn extrema(sorted: &[f64]) -> Option<(f64, f64)> {
    Some((*sorted.first()?, *sorted.last()?))
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        0.5 * (sorted[mid - 1] + sorted[mid])
    }
}

/// Sort, merge near-duplicates, keep edges strictly inside `(min, max)`.
///
/// `sorted` is the finite, sorted, non-constant column.
fn enforce_strict(mut candidates: Vec<f64>, sorted: &[f64]) -> Vec<f64> {
    let min = sorted[0];
    let max = sorted[sorted.len() - 1];
    let eps = MERGE_EPS * (max - min).max(1.0);

    candidates.retain(|c| c.is_finite());
    candidates.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut out: Vec<f64> = Vec::with_capacity(candidates.len());
    for c in candidates {
        if !(c > min && c < max) {
            continue;
        }
        match out.last() {
            Some(&prev) if c - prev <= eps => {}
            _ => out.push(c),
        }
    }

    if out.is_empty() {
        let m = median(sorted);
        debug!(median = m, "no interior cutpoint survived; falling back to median");
        out.push(m);
    }
    out
}
