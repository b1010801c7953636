//! Error types for LPM training

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LPMError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid label: expected -1 or +1, got {0}")]
    InvalidLabel(f64),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Example count mismatch: {features} feature vectors but {labels} labels")]
    ExampleCountMismatch { features: usize, labels: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Failed to allocate {buffer} buffer of {len} elements")]
    AllocationFailed { buffer: &'static str, len: usize },

    #[error("Boundary QP solver failed: {0}")]
    SolverFailure(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Report serialization failed: {0}")]
    Report(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LPMError>;
