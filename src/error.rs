//! Error types for tabfit

use thiserror::Error;

/// Result type alias for tabfit operations
pub type Result<T> = std::result::Result<T, TabfitError>;

/// Main error type for the training pipeline
#[derive(Error, Debug)]
pub enum TabfitError {
    #[error("Target column '{0}' not found")]
    TargetNotFound(String),

    #[error("Target column required for {0}")]
    TargetRequired(String),

    #[error(
        "Target column must be numeric for regression. Found non-numeric values like ['{sample}']. \
         Choose a classification algorithm or provide numeric targets."
    )]
    NonNumericTarget { sample: String },

    #[error("Unrecognized algorithm: '{name}'. Expected one of: {expected}")]
    UnrecognizedAlgorithm { name: String, expected: String },

    #[error("Invalid parameters for {algorithm}: {reason}")]
    Construction { algorithm: String, reason: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Unhandled error: {0}")]
    Unhandled(String),
}

/// Coarse classification of failures as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    /// The named target column is absent or required but missing.
    Schema,
    /// Non-numeric target values where a numeric target is required.
    TargetType,
    /// Hyperparameters could not configure the model.
    Construction,
    UnrecognizedAlgorithm,
    /// The dataset could not be read or turned into a matrix.
    Data,
    Unhandled,
}

impl TabfitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TabfitError::TargetNotFound(_) | TabfitError::TargetRequired(_) => ErrorKind::Schema,
            TabfitError::NonNumericTarget { .. } => ErrorKind::TargetType,
            TabfitError::Construction { .. } | TabfitError::InvalidParameter { .. } => {
                ErrorKind::Construction
            }
            TabfitError::UnrecognizedAlgorithm { .. } => ErrorKind::UnrecognizedAlgorithm,
            TabfitError::DataError(_)
            | TabfitError::IoError(_)
            | TabfitError::ConfigError(_)
            | TabfitError::SerializationError(_) => ErrorKind::Data,
            TabfitError::TrainingError(_)
            | TabfitError::ComputationError(_)
            | TabfitError::ShapeError { .. }
            | TabfitError::ModelNotFitted
            | TabfitError::Unhandled(_) => ErrorKind::Unhandled,
        }
    }

    pub(crate) fn invalid_param(
        name: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        TabfitError::InvalidParameter {
            name: name.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<polars::error::PolarsError> for TabfitError {
    fn from(err: polars::error::PolarsError) -> Self {
        TabfitError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for TabfitError {
    fn from(err: serde_json::Error) -> Self {
        TabfitError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TabfitError {
    fn from(err: ndarray::ShapeError) -> Self {
        TabfitError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
