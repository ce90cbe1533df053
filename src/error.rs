//! Error types for foldwise

use thiserror::Error;

/// Result type alias for foldwise operations
pub type Result<T> = std::result::Result<T, FoldwiseError>;

/// Main error type
#[derive(Error, Debug)]
pub enum FoldwiseError {
    /// Malformed input: bad fold count, shape mismatch, non-binary labels,
    /// out-of-range hyperparameters
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FoldwiseError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        FoldwiseError::InvalidArgument(msg.into())
    }
}

impl From<polars::error::PolarsError> for FoldwiseError {
    fn from(err: polars::error::PolarsError) -> Self {
        FoldwiseError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for FoldwiseError {
    fn from(err: serde_json::Error) -> Self {
        FoldwiseError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FoldwiseError::InvalidArgument("k must be at least 2".to_string());
        assert_eq!(err.to_string(), "Invalid argument: k must be at least 2");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FoldwiseError = io_err.into();
        assert!(matches!(err, FoldwiseError::IoError(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: FoldwiseError = json_err.into();
        assert!(matches!(err, FoldwiseError::SerializationError(_)));
    }
}
