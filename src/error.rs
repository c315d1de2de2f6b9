//! Error types for the HAR pipeline

use thiserror::Error;

/// Result type alias for HAR operations
pub type Result<T> = std::result::Result<T, HarError>;

/// Main error type shared by preprocessing, training, export, and inference
#[derive(Error, Debug)]
pub enum HarError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Model load failure: {0}")]
    ModelLoadFailure(String),

    #[error("Inference failure: {0}")]
    InferenceFailure(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl HarError {
    /// Shape mismatch helper used by the tensor code paths.
    pub fn shape(expected: impl std::fmt::Debug, actual: impl std::fmt::Debug) -> Self {
        HarError::ShapeError {
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }
}

impl From<serde_json::Error> for HarError {
    fn from(err: serde_json::Error) -> Self {
        HarError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for HarError {
    fn from(err: bincode::Error) -> Self {
        HarError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for HarError {
    fn from(err: ndarray::ShapeError) -> Self {
        HarError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
