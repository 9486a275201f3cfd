//! Error types for the load_forecast crate

use thiserror::Error;

/// Custom error types for the load_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The input series is malformed: irregular spacing, duplicates, out of order
    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    /// The series is too short to build the requested features or training set
    #[error("Insufficient history: {0}")]
    InsufficientHistory(String),

    /// Error related to data validation or processing
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The feature names at prediction time do not match those seen at training time
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A feature, label or reading is NaN or infinite
    #[error("Non-finite value: {0}")]
    NonFiniteValue(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error computing an accuracy metric
    #[error("Metric error: {0}")]
    MetricError(String),

    /// The backtest configuration produced no cutoffs to evaluate
    #[error("No eligible backtest cutoffs; check warmup and stride against the feature table")]
    NoEligibleCutoffs,

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from model artifact (de)serialization
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A persisted model artifact was written by an incompatible crate version
    #[error("Incompatible model artifact: expected version {expected}, found {found}")]
    IncompatibleArtifact { expected: u32, found: u32 },
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
