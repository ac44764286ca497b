//! Parameter estimation.
//!
//! - `estimator`: maximum likelihood with Dirichlet-smoothed CPTs and
//!   per-stratum pseudo-inverse regressions

pub mod estimator;

pub use estimator::*;
