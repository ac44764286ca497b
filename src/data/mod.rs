//! Tabular data and draws from instantiated models.

pub mod dataset;
pub mod sample;

pub use dataset::*;
pub use sample::*;
