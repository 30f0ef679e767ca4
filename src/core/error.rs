//! Error types for the SMO workbench

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SVMError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No class attribute set")]
    ClassNotSet,

    #[error("Class attribute must be nominal, got numeric attribute '{0}'")]
    NumericClass(String),

    #[error("String attributes are not supported")]
    StringAttributes,

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Kernel cache key overflows for {0} instances")]
    CacheKeyOverflow(usize),

    #[error("Kernel evaluation limit of {0} exceeded")]
    EvaluationLimit(u64),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, SVMError>;
