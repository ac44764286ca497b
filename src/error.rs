//! Crate-wide error type.
//!
//! Structural failures are fatal and surface immediately:
//!
//! - `Schema`: PM/IM contract misuse (wrong node kind, missing or
//!   non-increasing cutpoints, row-index length mismatch)
//! - `Data`: the dataset does not line up with the PM
//! - `Cycle`: the graph cannot be ordered topologically
//!
//! Numeric degeneracies (constant columns, empty strata, rank-deficient
//! designs) are absorbed where they occur and never show up here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Cycle error: {0}")]
    Cycle(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ModelError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }

    pub fn cycle(message: impl Into<String>) -> Self {
        Self::Cycle(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit code used by the `hcg` binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            ModelError::Config(_) | ModelError::Parse(_) | ModelError::Io { .. } => 2,
            ModelError::Data(_) => 3,
            ModelError::Schema(_) | ModelError::Cycle(_) => 4,
        }
    }
}
