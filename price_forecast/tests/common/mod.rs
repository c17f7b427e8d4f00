#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use price_forecast::analysis::{StationarityTest, TestOutcome};
use price_forecast::data::PriceRecord;
use price_forecast::exogenous::{Covariate, ExogenousProviders, StaticSource};
use price_forecast::{Config, Pipeline, SegmentKey};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub fn day(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Deterministic noise in [-0.5, 0.5)
pub fn noise(n: usize, seed: u64) -> Vec<f64> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5
        })
        .collect()
}

/// Daily prices with a slow trend, a weekly pattern and noise
pub fn daily_prices(start: NaiveDate, n: usize, seed: u64) -> Vec<(NaiveDate, f64)> {
    let shocks = noise(n, seed);
    let mut level = 1.55;
    (0..n)
        .map(|i| {
            level += 0.0004 + 0.004 * shocks[i];
            let weekly = 0.006 * ((i % 7) as f64 - 3.0) / 3.0;
            (start + Duration::days(i as i64), level + weekly)
        })
        .collect()
}

pub fn records(key: &SegmentKey, points: &[(NaiveDate, f64)]) -> Vec<PriceRecord> {
    points
        .iter()
        .map(|(date, price)| PriceRecord {
            date: *date,
            key: key.clone(),
            price: *price,
        })
        .collect()
}

/// Business-day series for a covariate between two dates
pub fn weekday_values(start: NaiveDate, end: NaiveDate, base: f64, step: f64) -> BTreeMap<NaiveDate, f64> {
    use chrono::Datelike;
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .enumerate()
        .filter(|(_, d)| d.weekday().number_from_monday() <= 5)
        .map(|(i, d)| (d, base + step * ((i % 11) as f64 - 5.0)))
        .collect()
}

/// Exchange-rate and oil sources covering `[start, end]`
pub fn providers(start: NaiveDate, end: NaiveDate) -> ExogenousProviders {
    ExogenousProviders::new(
        Arc::new(StaticSource::new(
            Covariate::ExchangeRate,
            weekday_values(start, end, 1.09, 0.002),
        )),
        Arc::new(StaticSource::new(
            Covariate::OilPrice,
            weekday_values(start, end, 82.0, 0.6),
        )),
    )
}

pub fn pipeline(data_dir: &Path, providers: ExogenousProviders) -> Pipeline {
    Pipeline::with_providers(Config::with_data_dir(data_dir), providers)
}

/// Test pair returning fixed outcomes: stationary only for series of the given lengths
pub struct ScriptedTest {
    pub stationary_lengths: Vec<usize>,
}

impl StationarityTest for ScriptedTest {
    fn adf(&self, values: &[f64]) -> price_forecast::Result<TestOutcome> {
        let p_value = if self.stationary_lengths.contains(&values.len()) {
            0.01
        } else {
            0.60
        };
        Ok(TestOutcome {
            statistic: -1.0,
            p_value,
        })
    }

    fn kpss(&self, _values: &[f64]) -> price_forecast::Result<TestOutcome> {
        Ok(TestOutcome {
            statistic: 0.2,
            p_value: 0.10,
        })
    }
}

/// Delegates to `inner` after sleeping, to keep a batch run busy
pub struct SlowTest<T> {
    pub inner: T,
    pub delay: std::time::Duration,
}

impl<T: StationarityTest> StationarityTest for SlowTest<T> {
    fn adf(&self, values: &[f64]) -> price_forecast::Result<TestOutcome> {
        std::thread::sleep(self.delay);
        self.inner.adf(values)
    }

    fn kpss(&self, values: &[f64]) -> price_forecast::Result<TestOutcome> {
        self.inner.kpss(values)
    }
}
