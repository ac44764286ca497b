//! Hybrid conditional-Gaussian models.
//!
//! - `pm`: structure, node kinds, parent partitions, cutpoints, row indexing
//! - `im`: per-node parameter tables over a shared PM

pub mod im;
pub mod pm;

#[cfg(test)]
pub(crate) mod fixtures;

pub use im::*;
pub use pm::*;
