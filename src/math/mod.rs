//! Numerical building blocks: pseudo-inverse least squares and cutpoints.

pub mod binning;
pub mod ols;

pub use binning::*;
pub use ols::*;
