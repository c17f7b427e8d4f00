//! Exogenous covariates
//!
//! Every covariate comes from an [`ExogenousSource`] returning date-indexed
//! values; the [`ExogenousAligner`] turns a set of sources into a gap-free
//! [`ExogenousFrame`] over a price series' date index.

use crate::config::Config;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub mod aligner;
pub mod benchmark;
pub mod currency;
pub mod holidays;

pub use aligner::ExogenousAligner;
pub use benchmark::BenchmarkPriceSource;
pub use currency::CurrencyRateSource;
pub use holidays::HolidayCalendar;

/// Covariates used by the models, in column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Covariate {
    ExchangeRate,
    OilPrice,
    IsHoliday,
}

impl Covariate {
    pub const ALL: [Covariate; 3] = [
        Covariate::ExchangeRate,
        Covariate::OilPrice,
        Covariate::IsHoliday,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Covariate::ExchangeRate => "exchange_rate",
            Covariate::OilPrice => "oil_price",
            Covariate::IsHoliday => "is_holiday",
        }
    }
}

impl fmt::Display for Covariate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a sparse source is turned into a dense column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillPolicy {
    /// Left join, then forward fill, then backward fill
    ForwardBackward,
    /// 1 when the source lists the date, 0 otherwise
    Membership,
}

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A provider of one covariate
pub trait ExogenousSource: Send + Sync {
    fn covariate(&self) -> Covariate;

    fn fill_policy(&self) -> FillPolicy {
        FillPolicy::ForwardBackward
    }

    /// Observations within `range`. Membership sources return the member dates with value 1.
    fn fetch(&self, range: DateRange) -> Result<BTreeMap<NaiveDate, f64>>;
}

/// Covariate table aligned to a date index
#[derive(Debug, Clone, PartialEq)]
pub struct ExogenousFrame {
    dates: Vec<NaiveDate>,
    columns: Vec<(Covariate, Vec<f64>)>,
}

impl ExogenousFrame {
    pub(crate) fn new(dates: Vec<NaiveDate>, columns: Vec<(Covariate, Vec<f64>)>) -> Self {
        Self { dates, columns }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn covariates(&self) -> Vec<Covariate> {
        self.columns.iter().map(|(c, _)| *c).collect()
    }

    pub fn column(&self, covariate: Covariate) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(c, _)| *c == covariate)
            .map(|(_, values)| values.as_slice())
    }

    /// One row per date, columns in frame order
    pub fn rows(&self) -> Vec<Vec<f64>> {
        (0..self.dates.len())
            .map(|i| self.columns.iter().map(|(_, values)| values[i]).collect())
            .collect()
    }

    pub fn has_missing(&self) -> bool {
        self.columns
            .iter()
            .any(|(_, values)| values.iter().any(|v| !v.is_finite()))
    }
}

/// Shared sources, built once per process and reused across segments
#[derive(Clone)]
pub struct ExogenousProviders {
    currency: Arc<dyn ExogenousSource>,
    benchmark: Arc<dyn ExogenousSource>,
}

impl ExogenousProviders {
    pub fn new(currency: Arc<dyn ExogenousSource>, benchmark: Arc<dyn ExogenousSource>) -> Self {
        Self {
            currency,
            benchmark,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(CurrencyRateSource::new(&config.exogenous.exchange_rate_file)),
            Arc::new(BenchmarkPriceSource::new(&config.exogenous.benchmark_dir)),
        )
    }

    /// Sources for one province: shared market covariates plus its holiday calendar
    pub fn sources_for(&self, province: &str) -> Vec<Arc<dyn ExogenousSource>> {
        vec![
            Arc::clone(&self.currency),
            Arc::clone(&self.benchmark),
            Arc::new(HolidayCalendar::for_province(province)),
        ]
    }
}

/// Source backed by an in-memory map, useful for fixtures and precomputed data
#[derive(Debug, Clone)]
pub struct StaticSource {
    covariate: Covariate,
    policy: FillPolicy,
    values: BTreeMap<NaiveDate, f64>,
}

impl StaticSource {
    pub fn new(covariate: Covariate, values: BTreeMap<NaiveDate, f64>) -> Self {
        Self {
            covariate,
            policy: FillPolicy::ForwardBackward,
            values,
        }
    }

    pub fn with_policy(mut self, policy: FillPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl ExogenousSource for StaticSource {
    fn covariate(&self) -> Covariate {
        self.covariate
    }

    fn fill_policy(&self) -> FillPolicy {
        self.policy
    }

    fn fetch(&self, range: DateRange) -> Result<BTreeMap<NaiveDate, f64>> {
        Ok(self
            .values
            .range(range.start..=range.end)
            .map(|(d, v)| (*d, *v))
            .collect())
    }
}

pub(crate) fn missing(covariate: Covariate) -> ForecastError {
    ForecastError::MissingExogenousData(covariate.name().to_string())
}
