//! Error types for max-kernel search

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FastMksError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Tree construction failed: {0}")]
    ConstructionError(String),

    #[error("Numerical error: {0}")]
    NumericalError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl FastMksError {
    /// Shorthand for the dimension mismatch flavour of `InvalidArgument`
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::InvalidArgument(format!(
            "Dimension mismatch: expected {expected}, got {actual}"
        ))
    }
}

pub type Result<T> = std::result::Result<T, FastMksError>;
