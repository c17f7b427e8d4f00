//! # Price Math
//!
//! Statistical calculations behind the price forecasting pipeline.
//! This crate provides the unit-root tests used to pick a differencing
//! order, the differencing/reintegration transforms, least squares and
//! simplex optimisation helpers, and a seasonal ARIMA estimator with
//! exogenous regressors.

use thiserror::Error;

pub mod correlation;
pub mod differencing;
pub mod ols;
pub mod optimizer;
pub mod sarimax;
pub mod stationarity;

/// Errors that can occur in statistical calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: need {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for statistical operations
pub type Result<T> = std::result::Result<T, MathError>;

pub use differencing::{difference, reintegrate, reintegrate_levels};
pub use sarimax::{ArimaOrder, Sarimax, SarimaxFit, SarimaxForecast, SarimaxSpec, SeasonalOrder};
pub use stationarity::{adf_test, kpss_test, UnitRootTest};
