//! Reporting utilities: model rendering and run summaries.

pub mod format;

pub use format::*;
