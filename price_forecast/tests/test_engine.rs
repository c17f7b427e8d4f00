mod common;

use approx::assert_relative_eq;
use chrono::Duration;
use common::{daily_prices, day, pipeline, providers, records, ScriptedTest};
use pretty_assertions::assert_eq;
use price_forecast::models::{Reintegration, SegmentModel};
use price_forecast::{ForecastError, ModelVariant, Pipeline, PriceSeries, SegmentKey};
use rstest::rstest;
use std::sync::Arc;
use tempfile::{tempdir, TempDir};

const DAYS: usize = 120;

/// Pipeline with one ingested segment of synthetic daily prices
fn seeded_pipeline(stationary_length: usize) -> (TempDir, Pipeline, SegmentKey) {
    let dir = tempdir().unwrap();
    let start = day("2024-01-01");
    let end = start + Duration::days(DAYS as i64 - 1);
    let pipeline = pipeline(dir.path(), providers(start - Duration::days(45), end))
        .with_stationarity_test(Arc::new(ScriptedTest {
            stationary_lengths: vec![stationary_length],
        }));
    let key = SegmentKey::new("Madrid", "Gasóleo A");
    pipeline
        .store()
        .ingest(&records(&key, &daily_prices(start, DAYS, 7)))
        .unwrap();
    (dir, pipeline, key)
}

#[rstest]
#[case(ModelVariant::Sarimax)]
#[case(ModelVariant::SarimaxSinExo)]
fn test_train_then_forecast(#[case] variant: ModelVariant) {
    let (_dir, pipeline, key) = seeded_pipeline(DAYS - 1);
    let metadata = pipeline.analyze(&key).unwrap();
    assert_eq!(metadata.differencing_order, 1);

    let evaluation = pipeline.train(&key, variant).unwrap();
    assert!(evaluation.metrics.mae.is_finite());
    assert!(evaluation.metrics.rmse >= evaluation.metrics.mae);

    let holdout = pipeline.store().load_predictions(&key, variant).unwrap();
    assert_eq!(holdout.len(), (DAYS - 1) - ((DAYS - 1) as f64 * 0.8) as usize);
    assert!(holdout
        .iter()
        .all(|row| row.lower <= row.predicted && row.predicted <= row.upper));

    let forecast = pipeline.forecast(&key, variant, 14).unwrap();
    assert_eq!(forecast.horizons(), 14);
    assert_eq!(forecast.variant, variant);

    let last = pipeline.store().load(&key).unwrap().last_date().unwrap();
    let expected: Vec<_> = (1..=14).map(|i| last + Duration::days(i)).collect();
    assert_eq!(forecast.dates(), expected);

    let mut previous_width = 0.0;
    for point in &forecast.points {
        assert!(point.mean.is_finite());
        assert!(point.lower <= point.mean && point.mean <= point.upper);
        let width = point.upper - point.lower;
        assert!(width >= previous_width - 1e-12);
        previous_width = width;
    }
    // Prices stay in a plausible band around the last observation
    assert!(forecast.values().iter().all(|v| (v - 1.6).abs() < 0.5));
}

#[test]
fn test_forecast_is_deterministic_for_a_stored_model() {
    let (_dir, pipeline, key) = seeded_pipeline(DAYS - 1);
    pipeline.analyze(&key).unwrap();
    pipeline.train(&key, ModelVariant::SarimaxSinExo).unwrap();

    let first = pipeline.forecast(&key, ModelVariant::SarimaxSinExo, 7).unwrap();
    let second = pipeline
        .engine()
        .forecast_variant(&key, ModelVariant::SarimaxSinExo, 7)
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_model_keeps_reintegration_state() {
    let (_dir, pipeline, key) = seeded_pipeline(DAYS - 1);
    pipeline.analyze(&key).unwrap();
    pipeline.train(&key, ModelVariant::Sarimax).unwrap();

    let model: SegmentModel = pipeline
        .store()
        .load_model(&key, ModelVariant::Sarimax)
        .unwrap()
        .unwrap();
    let original = pipeline.store().load(&key).unwrap();

    assert_eq!(model.reintegration.differencing_order, 1);
    assert_eq!(model.reintegration.last_date, original.last_date().unwrap());
    assert_eq!(model.reintegration.last_value(), original.last_value());
    assert_eq!(model.covariates.len(), 3);
    // The stored fit includes the held-out observations
    assert_eq!(model.fit.endog().len(), DAYS - 1);
}

#[test]
fn test_undifferenced_segment_forecasts_directly() {
    let (_dir, pipeline, key) = seeded_pipeline(DAYS);
    let metadata = pipeline.analyze(&key).unwrap();
    assert_eq!(metadata.differencing_order, 0);

    pipeline.train(&key, ModelVariant::SarimaxSinExo).unwrap();
    let forecast = pipeline.forecast(&key, ModelVariant::SarimaxSinExo, 3).unwrap();
    assert_eq!(forecast.horizons(), 3);
}

#[rstest]
#[case(0)]
#[case(-3)]
fn test_non_positive_horizon(#[case] days: i64) {
    let (_dir, pipeline, key) = seeded_pipeline(DAYS - 1);
    let result = pipeline.forecast(&key, ModelVariant::Sarimax, days);
    assert!(matches!(result, Err(ForecastError::InsufficientHorizon(d)) if d == days));
}

#[test]
fn test_forecast_without_model() {
    let (_dir, pipeline, key) = seeded_pipeline(DAYS - 1);
    pipeline.analyze(&key).unwrap();
    let result = pipeline.forecast(&key, ModelVariant::Sarimax, 5);
    assert!(matches!(result, Err(ForecastError::ModelNotFound(_))));
}

#[test]
fn test_training_requires_analysis() {
    let (_dir, pipeline, key) = seeded_pipeline(DAYS - 1);
    let result = pipeline.train(&key, ModelVariant::SarimaxSinExo);
    assert!(matches!(result, Err(ForecastError::DataError(_))));
}

#[test]
fn test_training_after_new_data_requires_reanalysis() {
    let (_dir, pipeline, key) = seeded_pipeline(DAYS - 1);
    pipeline.analyze(&key).unwrap();

    let next = day("2024-01-01") + Duration::days(DAYS as i64);
    pipeline
        .store()
        .ingest(&records(&key, &[(next, 1.62)]))
        .unwrap();

    let result = pipeline.train(&key, ModelVariant::SarimaxSinExo);
    assert!(matches!(result, Err(ForecastError::DataError(_))));

    // Analyzing again picks up the new day
    pipeline.analyze(&key).unwrap();
    pipeline.train(&key, ModelVariant::SarimaxSinExo).unwrap();
    let forecast = pipeline.forecast(&key, ModelVariant::SarimaxSinExo, 2).unwrap();
    assert_eq!(forecast.dates()[0], next + Duration::days(1));
}

#[test]
fn test_missing_covariates_fail_training() {
    let dir = tempdir().unwrap();
    // Covariates only exist a year after the prices
    let pipeline = pipeline(
        dir.path(),
        providers(day("2025-01-01"), day("2025-06-30")),
    )
    .with_stationarity_test(Arc::new(ScriptedTest {
        stationary_lengths: vec![DAYS - 1],
    }));
    let key = SegmentKey::new("Madrid", "Gasóleo A");
    pipeline
        .store()
        .ingest(&records(&key, &daily_prices(day("2024-01-01"), DAYS, 3)))
        .unwrap();
    pipeline.analyze(&key).unwrap();

    let result = pipeline.train(&key, ModelVariant::Sarimax);
    assert!(matches!(result, Err(ForecastError::MissingExogenousData(_))));
    // The variant without covariates is unaffected
    assert!(pipeline.train(&key, ModelVariant::SarimaxSinExo).is_ok());
}

fn reintegration(values: &[f64], d: usize) -> Reintegration {
    let series = PriceSeries::from_points(
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (day("2024-01-01") + Duration::days(i as i64), *v)),
    );
    Reintegration::from_original(&series, d).unwrap()
}

#[rstest]
#[case(1)]
#[case(2)]
fn test_zero_deltas_continue_the_last_level(#[case] d: usize) {
    // Flat at d=1, the last slope carried on at d=2
    let history = [1.40, 1.45, 1.50, 1.55, 1.60];
    let values = reintegration(&history, d).apply(&[0.0; 4]);
    let expected: Vec<f64> = match d {
        1 => vec![1.60; 4],
        _ => vec![1.65, 1.70, 1.75, 1.80],
    };
    for (got, want) in values.iter().zip(expected) {
        assert_relative_eq!(*got, want, epsilon = 1e-12);
    }
}

#[test]
fn test_positive_deltas_increase_prices() {
    let values = reintegration(&[1.50, 1.52, 1.55, 1.60], 1).apply(&[0.01, 0.02, 0.005]);
    assert!(values[0] > 1.60);
    assert!(values.windows(2).all(|w| w[1] > w[0]));
    assert_relative_eq!(values[2], 1.635, epsilon = 1e-12);
}

#[test]
fn test_no_differencing_is_identity() {
    let deltas = [1.61, 1.62, 1.59];
    assert_eq!(reintegration(&[1.50, 1.60], 0).apply(&deltas), deltas.to_vec());
}
