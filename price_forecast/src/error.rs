//! Error types for the price_forecast crate

use polars::prelude::PolarsError;
use price_math::MathError;
use thiserror::Error;

/// Custom error types for the price_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Raw input lacks a required column
    #[error("Schema error: missing required column(s): {}", .0.join(", "))]
    Schema(Vec<String>),

    /// Series too short for the requested operation
    #[error("Insufficient data: need {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// A covariate has no usable observations
    #[error("Missing exogenous data for {0}")]
    MissingExogenousData(String),

    /// No persisted model for the segment
    #[error("No trained model for segment {0}")]
    ModelNotFound(String),

    /// Forecast horizon must be at least one day
    #[error("Forecast horizon must be positive, got {0}")]
    InsufficientHorizon(i64),

    /// A batch run is already in progress
    #[error("A batch run is already in progress")]
    BatchAlreadyRunning,

    /// No persisted series for the segment
    #[error("Unknown segment {0}")]
    SegmentNotFound(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from mathematical operations
    #[error("Math error: {0}")]
    MathError(MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error reading or writing CSV files
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error reading or writing JSON documents
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error parsing the configuration file
    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<MathError> for ForecastError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::InsufficientData { needed, got } => {
                ForecastError::InsufficientData { needed, got }
            }
            other => ForecastError::MathError(other),
        }
    }
}
