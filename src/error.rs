//! Error types for mask_eval

use thiserror::Error;

use crate::core_modules::mask::ClassId;

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("No dataset bound to the analyzer")]
    MissingDataset,

    #[error("Detector error: {0}")]
    Detector(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Mask dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        found: (u32, u32),
    },

    #[error("Detection field length mismatch: {0}")]
    LengthMismatch(String),

    #[error("Invalid detection: {0}")]
    InvalidDetection(String),

    #[error("Class count mismatch: expected {expected}, found {found}")]
    ClassCountMismatch { expected: usize, found: usize },

    #[error("Unknown class id {0}")]
    UnknownClass(ClassId),

    #[error("Graph node {node} out of range (graph has {len} nodes)")]
    NodeOutOfRange { node: usize, len: usize },

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Class registry error: {0}")]
    InvalidRegistry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::UnknownClass(9);
        assert!(err.to_string().contains("Unknown class id 9"));

        let err = EvalError::DimensionMismatch {
            expected: (4, 4),
            found: (4, 5),
        };
        assert!(err.to_string().contains("(4, 5)"));
    }

    #[test]
    fn test_eval_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: EvalError = io_err.into();
        match err {
            EvalError::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }
}
