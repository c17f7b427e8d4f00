//! Training and forecasting of segment models

use crate::config::Config;
use crate::data::{PriceSeries, SegmentKey};
use crate::error::{ForecastError, Result};
use crate::exogenous::{ExogenousAligner, ExogenousFrame, ExogenousProviders};
use crate::models::{
    Evaluation, FitDiagnostics, ForecastPoint, ForecastResult, ModelVariant, Reintegration,
    SarimaxTrainer, SegmentModel,
};
use crate::segment_store::SegmentStore;
use crate::utils::future_dates;
use chrono::Utc;
use price_math::SarimaxSpec;
use tracing::info;

/// Trains, persists and forecasts SARIMAX models per segment
#[derive(Clone)]
pub struct ForecastEngine {
    store: SegmentStore,
    aligner: ExogenousAligner,
    providers: ExogenousProviders,
    trainer: SarimaxTrainer,
}

impl ForecastEngine {
    pub fn new(
        store: SegmentStore,
        aligner: ExogenousAligner,
        providers: ExogenousProviders,
        trainer: SarimaxTrainer,
    ) -> Self {
        Self {
            store,
            aligner,
            providers,
            trainer,
        }
    }

    pub fn from_config(config: &Config, providers: ExogenousProviders) -> Self {
        Self::new(
            SegmentStore::from_config(config),
            ExogenousAligner::from_config(config),
            providers,
            SarimaxTrainer::from_config(&config.model),
        )
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    /// Covariates of `key` aligned on `dates`
    pub fn exogenous_frame(&self, key: &SegmentKey, dates: &[chrono::NaiveDate]) -> Result<ExogenousFrame> {
        self.aligner
            .align(dates, &self.providers.sources_for(&key.province))
    }

    /// Train one variant of an analyzed segment with the configured orders and persist it
    pub fn train_segment(&self, key: &SegmentKey, variant: ModelVariant) -> Result<Evaluation> {
        let metadata = self.store.load_metadata(key)?.ok_or_else(|| {
            ForecastError::DataError(format!("Segment {} has not been analyzed", key))
        })?;
        let original = self.store.load(key)?;
        let stationary = self.store.load_stationary(key)?;
        if stationary.last_date() != original.last_date() {
            return Err(ForecastError::DataError(format!(
                "Segment {} changed since it was analyzed; analyze it again before training",
                key
            )));
        }
        let reintegration = Reintegration::from_original(&original, metadata.differencing_order)?;

        let frame = if variant.uses_exogenous() {
            Some(self.exogenous_frame(key, stationary.dates())?)
        } else {
            None
        };

        let (model, evaluation) = self.train(
            key,
            variant,
            &stationary,
            frame.as_ref(),
            self.trainer.spec(),
            reintegration,
        )?;
        self.store.save_model(key, variant, &model)?;
        Ok(evaluation)
    }

    /// Fit `series` (already differenced) with the given orders and score it on the hold-out.
    ///
    /// Held-out predictions are persisted with the segment; the model itself is returned.
    pub fn train(
        &self,
        key: &SegmentKey,
        variant: ModelVariant,
        series: &PriceSeries,
        exog: Option<&ExogenousFrame>,
        spec: SarimaxSpec,
        reintegration: Reintegration,
    ) -> Result<(SegmentModel, Evaluation)> {
        let trained = self.trainer.clone().with_spec(spec).train(series, exog)?;
        self.store.save_predictions(key, variant, &trained.holdout)?;

        info!("Trained {} for {}: {}", variant, key, trained.metrics);

        let model = SegmentModel {
            segment: key.clone(),
            variant,
            covariates: exog.map(|frame| frame.covariates()).unwrap_or_default(),
            reintegration,
            fit: trained.fit,
            trained_at: Utc::now(),
        };
        let evaluation = Evaluation {
            variant,
            metrics: trained.metrics,
            diagnostics: trained.diagnostics,
            warning: trained.diagnostics.convergence_warning(),
        };
        Ok((model, evaluation))
    }

    /// Forecast `horizon_days` days past the last historical date with the default variant
    pub fn forecast(&self, key: &SegmentKey, horizon_days: i64) -> Result<ForecastResult> {
        self.forecast_variant(key, ModelVariant::Sarimax, horizon_days)
    }

    /// Forecast on the price scale with a persisted model
    pub fn forecast_variant(
        &self,
        key: &SegmentKey,
        variant: ModelVariant,
        horizon_days: i64,
    ) -> Result<ForecastResult> {
        if horizon_days <= 0 {
            return Err(ForecastError::InsufficientHorizon(horizon_days));
        }
        let model: SegmentModel = self
            .store
            .load_model(key, variant)?
            .ok_or_else(|| ForecastError::ModelNotFound(format!("{} ({})", key, variant)))?;

        let horizon = horizon_days as usize;
        let dates = future_dates(model.reintegration.last_date, horizon);

        let rows = if model.covariates.is_empty() {
            None
        } else {
            let frame = self
                .aligner
                .clone()
                .with_covariates(model.covariates.clone())
                .align(&dates, &self.providers.sources_for(&key.province))?;
            Some(frame.rows())
        };

        let forecast = model
            .fit
            .forecast(horizon, rows.as_deref(), self.trainer.confidence())?;

        let reintegration = &model.reintegration;
        let points = dates
            .into_iter()
            .zip(reintegration.apply(&forecast.mean))
            .zip(reintegration.apply(&forecast.lower))
            .zip(reintegration.apply(&forecast.upper))
            .map(|(((date, mean), lower), upper)| ForecastPoint {
                date,
                mean,
                lower,
                upper,
            })
            .collect();

        Ok(ForecastResult {
            segment: key.clone(),
            variant,
            points,
            diagnostics: FitDiagnostics::from_fit(&model.fit),
        })
    }
}
