//! Input/output helpers.
//!
//! - JSON model description (`model_spec`)
//! - CSV ingest typed by a PM (`ingest`)
//! - CSV export of datasets and samples (`export`)

pub mod export;
pub mod ingest;
pub mod model_spec;

pub use export::*;
pub use ingest::*;
pub use model_spec::*;
