//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - the graph structure input (`Dag`)
//! - variable kinds (`VarKind`) and binning policy (`BinningPolicy`)
//! - estimator configuration (`EstimatorConfig`)

pub mod graph;
pub mod types;

pub use graph::*;
pub use types::*;
