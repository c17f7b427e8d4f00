//! SARIMAX training with a chronological hold-out

use crate::config::ModelConfig;
use crate::data::PriceSeries;
use crate::error::{ForecastError, Result};
use crate::exogenous::ExogenousFrame;
use crate::metrics::{evaluate_forecast, ErrorMetrics};
use crate::models::FitDiagnostics;
use crate::segment_store::PredictionRow;
use crate::utils::train_test_split;
use price_math::{Sarimax, SarimaxFit, SarimaxSpec};
use tracing::{debug, warn};

/// Fits SARIMAX on the first part of a series and scores it on the rest
#[derive(Debug, Clone)]
pub struct SarimaxTrainer {
    spec: SarimaxSpec,
    train_ratio: f64,
    confidence: f64,
    max_iterations: usize,
}

/// Outcome of [`SarimaxTrainer::train`]
#[derive(Debug, Clone)]
pub struct TrainedSarimax {
    /// Fit extended with the held-out observations, ready to forecast past the series
    pub fit: SarimaxFit,
    pub metrics: ErrorMetrics,
    pub diagnostics: FitDiagnostics,
    pub holdout: Vec<PredictionRow>,
}

impl SarimaxTrainer {
    pub fn new(spec: SarimaxSpec) -> Self {
        let defaults = ModelConfig::default();
        Self {
            spec,
            train_ratio: defaults.train_ratio,
            confidence: defaults.confidence,
            max_iterations: defaults.max_iterations,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            spec: config.spec(),
            train_ratio: config.train_ratio,
            confidence: config.confidence,
            max_iterations: config.max_iterations,
        }
    }

    pub fn with_spec(mut self, spec: SarimaxSpec) -> Self {
        self.spec = spec;
        self
    }

    pub fn spec(&self) -> SarimaxSpec {
        self.spec
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Train on the first `train_ratio` of `series`, forecast the rest and score it.
    ///
    /// `exog`, when given, must be aligned on the dates of `series`.
    pub fn train(&self, series: &PriceSeries, exog: Option<&ExogenousFrame>) -> Result<TrainedSarimax> {
        if let Some(frame) = exog {
            if frame.dates() != series.dates() {
                return Err(ForecastError::InvalidParameter(
                    "Exogenous frame is not aligned with the series".to_string(),
                ));
            }
        }

        let (train, test) = train_test_split(series.values(), self.train_ratio)?;
        if train.is_empty() || test.is_empty() {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: series.len(),
            });
        }
        let train_size = train.len();

        let rows = exog.map(|frame| frame.rows());
        let (exog_train, exog_test) = match &rows {
            Some(rows) => {
                let (a, b) = rows.split_at(train_size);
                (Some(a), Some(b))
            }
            None => (None, None),
        };

        let fit = Sarimax::new(self.spec)
            .with_max_iterations(self.max_iterations)
            .fit(&train, exog_train)?;
        let diagnostics = FitDiagnostics::from_fit(&fit);
        if let Some(warning) = diagnostics.convergence_warning() {
            warn!("{}: {}", self.spec, warning);
        }

        let forecast = fit.forecast(test.len(), exog_test, self.confidence)?;
        let metrics = evaluate_forecast(&forecast.mean, &test)?;
        debug!(
            "{} trained on {} points, held out {}: {}",
            self.spec,
            train.len(),
            test.len(),
            metrics
        );

        let holdout = series.dates()[train_size..]
            .iter()
            .zip(&test)
            .enumerate()
            .map(|(i, (date, actual))| PredictionRow {
                date: *date,
                actual: *actual,
                predicted: forecast.mean[i],
                lower: forecast.lower[i],
                upper: forecast.upper[i],
            })
            .collect();

        Ok(TrainedSarimax {
            fit: fit.extend(&test, exog_test)?,
            metrics,
            diagnostics,
            holdout,
        })
    }
}
