//! Forecasting models and their persisted state

use crate::data::{PriceSeries, SegmentKey};
use crate::error::{ForecastError, Result};
use crate::exogenous::Covariate;
use crate::metrics::ErrorMetrics;
use chrono::{DateTime, NaiveDate, Utc};
use price_math::differencing::difference_anchors;
use price_math::{reintegrate_levels, SarimaxFit};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod sarimax;

pub use sarimax::{SarimaxTrainer, TrainedSarimax};

/// Model variants trained per segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// SARIMAX with exchange rate, oil price and holiday regressors
    Sarimax,
    /// SARIMAX without regressors
    SarimaxSinExo,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 2] = [ModelVariant::Sarimax, ModelVariant::SarimaxSinExo];

    pub fn name(&self) -> &'static str {
        match self {
            ModelVariant::Sarimax => "sarimax",
            ModelVariant::SarimaxSinExo => "sarimax_sin_exo",
        }
    }

    pub fn uses_exogenous(&self) -> bool {
        matches!(self, ModelVariant::Sarimax)
    }

    pub fn model_file(&self) -> &'static str {
        match self {
            ModelVariant::Sarimax => "model.json",
            ModelVariant::SarimaxSinExo => "model_sin_exo.json",
        }
    }

    pub fn prediction_file(&self) -> &'static str {
        match self {
            ModelVariant::Sarimax => "prediction.csv",
            ModelVariant::SarimaxSinExo => "prediction_sin_exo.csv",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelVariant {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        ModelVariant::ALL
            .into_iter()
            .find(|v| v.name() == s.trim())
            .ok_or_else(|| ForecastError::InvalidParameter(format!("Unknown model variant: {}", s)))
    }
}

/// What is needed to bring differenced forecasts back to the price scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reintegration {
    pub differencing_order: usize,
    /// Last value of the original series at each differencing level
    pub anchors: Vec<f64>,
    /// Last historical date
    pub last_date: NaiveDate,
}

impl Reintegration {
    pub fn from_original(original: &PriceSeries, differencing_order: usize) -> Result<Self> {
        let last_date = original
            .last_date()
            .ok_or_else(|| ForecastError::InsufficientData { needed: 1, got: 0 })?;
        Ok(Self {
            differencing_order,
            anchors: difference_anchors(original.values(), differencing_order)?,
            last_date,
        })
    }

    /// Last real price
    pub fn last_value(&self) -> Option<f64> {
        self.anchors.first().copied()
    }

    /// Cumulative sum once per differencing level; identity for d = 0
    pub fn apply(&self, deltas: &[f64]) -> Vec<f64> {
        reintegrate_levels(deltas, &self.anchors)
    }
}

/// Persisted model of one segment and variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentModel {
    pub segment: SegmentKey,
    pub variant: ModelVariant,
    /// Regressor columns, in fit order
    pub covariates: Vec<Covariate>,
    pub reintegration: Reintegration,
    pub fit: SarimaxFit,
    pub trained_at: DateTime<Utc>,
}

/// Information criteria and convergence of a fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub aic: f64,
    pub bic: f64,
    pub log_likelihood: f64,
    pub converged: bool,
    pub iterations: usize,
}

impl FitDiagnostics {
    pub fn from_fit(fit: &SarimaxFit) -> Self {
        Self {
            aic: fit.aic,
            bic: fit.bic,
            log_likelihood: fit.log_likelihood,
            converged: fit.converged,
            iterations: fit.iterations,
        }
    }

    pub fn convergence_warning(&self) -> Option<FitConvergenceWarning> {
        (!self.converged).then_some(FitConvergenceWarning {
            iterations: self.iterations,
        })
    }
}

/// The optimiser stopped before converging; the fit is still usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitConvergenceWarning {
    pub iterations: usize,
}

impl fmt::Display for FitConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fit did not converge after {} iterations", self.iterations)
    }
}

/// Held-out evaluation of a freshly trained model
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub variant: ModelVariant,
    pub metrics: ErrorMetrics,
    pub diagnostics: FitDiagnostics,
    pub warning: Option<FitConvergenceWarning>,
}

/// One forecast date on the price scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Result of a forecast operation
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    pub segment: SegmentKey,
    pub variant: ModelVariant,
    pub points: Vec<ForecastPoint>,
    pub diagnostics: FitDiagnostics,
}

impl ForecastResult {
    pub fn horizons(&self) -> usize {
        self.points.len()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_variant_names_round_trip() {
        for variant in ModelVariant::ALL {
            assert_eq!(variant.name().parse::<ModelVariant>().unwrap(), variant);
        }
        assert!("lstm".parse::<ModelVariant>().is_err());
    }

    #[test]
    fn test_reintegration_from_original() {
        let dates = vec![
            "2024-01-01".parse().unwrap(),
            "2024-01-02".parse().unwrap(),
            "2024-01-03".parse().unwrap(),
        ];
        let original = PriceSeries::new(dates, vec![1.60, 1.61, 1.63]).unwrap();

        let first = Reintegration::from_original(&original, 1).unwrap();
        assert_eq!(first.last_value(), Some(1.63));
        let values = first.apply(&[0.01, -0.01, 0.02]);
        assert_relative_eq!(values[0], 1.64, epsilon = 1e-12);
        assert_relative_eq!(values[2], 1.65, epsilon = 1e-12);

        let identity = Reintegration::from_original(&original, 0).unwrap();
        assert_eq!(identity.apply(&[1.7, 1.8]), vec![1.7, 1.8]);
    }
}
