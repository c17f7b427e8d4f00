//! Exploratory profile of a segment: descriptive statistics, covariate
//! correlations, a SARIMA order suggestion and the holiday effect.

use crate::analysis::{StationarityResult, StationarityTest};
use crate::data::{PriceSeries, SegmentKey};
use crate::exogenous::{Covariate, ExogenousFrame};
use chrono::NaiveDate;
use price_math::correlation::{acf, mean, median, pacf, pearson, std_dev, t_test_independent, TTest};
use price_math::differencing::{difference, seasonal_difference};
use serde::{Deserialize, Serialize};

/// Seasonal period of daily fuel prices
pub const SEASONAL_PERIOD: usize = 7;
/// Shortest series for which orders are suggested
pub const MIN_SUGGESTION_LENGTH: usize = 50;

const MAX_ARMA_ORDER: usize = 5;
const MAX_SEASONAL_ORDER: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl DescriptiveStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        Some(Self {
            count: values.len(),
            mean: mean(values)?,
            std: std_dev(values).unwrap_or(0.0),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            median: median(values)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
}

impl CorrelationStrength {
    pub fn classify(coefficient: f64) -> Self {
        let magnitude = coefficient.abs();
        if magnitude > 0.7 {
            CorrelationStrength::Strong
        } else if magnitude > 0.4 {
            CorrelationStrength::Moderate
        } else {
            CorrelationStrength::Weak
        }
    }
}

/// Pearson correlation of price with one covariate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CovariateCorrelation {
    pub covariate: Covariate,
    pub coefficient: f64,
    pub strength: CorrelationStrength,
    pub positive: bool,
}

/// SARIMA orders read off the (seasonal) ACF and PACF
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSuggestion {
    pub order: [usize; 3],
    pub seasonal_order: [usize; 4],
    /// Autocorrelations of the differenced series, lags 0..=10
    pub acf: Vec<f64>,
    pub pacf: Vec<f64>,
}

impl std::fmt::Display for OrderSuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [p, d, q] = self.order;
        let [sp, sd, sq, s] = self.seasonal_order;
        write!(f, "SARIMAX({},{},{})({},{},{},{})", p, d, q, sp, sd, sq, s)
    }
}

/// Mean price on holidays versus other days
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HolidayEffect {
    pub holidays: usize,
    pub other_days: usize,
    pub holiday_mean: f64,
    pub other_mean: f64,
    pub test: TTest,
    pub significant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentProfile {
    pub segment: SegmentKey,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub price: Option<DescriptiveStats>,
    pub oil_price: Option<DescriptiveStats>,
    /// Share of days that are holidays, in percent
    pub holiday_share: f64,
    pub correlations: Vec<CovariateCorrelation>,
    pub suggestion: Option<OrderSuggestion>,
    pub holiday_effect: Option<HolidayEffect>,
}

/// Profile `series` against covariates aligned on its dates
pub fn profile_segment(
    key: &SegmentKey,
    series: &PriceSeries,
    frame: &ExogenousFrame,
    test: &dyn StationarityTest,
) -> SegmentProfile {
    let prices = series.values();

    let correlations = frame
        .covariates()
        .into_iter()
        .filter_map(|covariate| {
            let coefficient = pearson(prices, frame.column(covariate)?)?;
            Some(CovariateCorrelation {
                covariate,
                coefficient,
                strength: CorrelationStrength::classify(coefficient),
                positive: coefficient > 0.0,
            })
        })
        .collect();

    let holidays = frame.column(Covariate::IsHoliday);
    let holiday_share = holidays
        .and_then(mean)
        .map(|share| share * 100.0)
        .unwrap_or(0.0);

    SegmentProfile {
        segment: key.clone(),
        start: series.first_date(),
        end: series.last_date(),
        price: DescriptiveStats::from_values(prices),
        oil_price: frame
            .column(Covariate::OilPrice)
            .and_then(DescriptiveStats::from_values),
        holiday_share,
        correlations,
        suggestion: suggest_orders(prices, test),
        holiday_effect: holidays.and_then(|flags| holiday_effect(prices, flags)),
    }
}

/// Suggest SARIMA orders, `None` when the series is too short or flat.
///
/// `d` and `D` come from the stationarity test pair; `p` and `q` are the
/// last significant PACF and ACF lags (capped at 5, at least 1); `P` and
/// `Q` count significant seasonal lags s, 2s and 3s (capped at 2).
pub fn suggest_orders(values: &[f64], test: &dyn StationarityTest) -> Option<OrderSuggestion> {
    if values.len() < MIN_SUGGESTION_LENGTH {
        return None;
    }

    let passes = |series: &[f64]| -> bool {
        match (test.adf(series), test.kpss(series)) {
            (Ok(adf), Ok(kpss)) => StationarityResult::passes(&adf, &kpss),
            _ => false,
        }
    };

    let d = usize::from(!passes(values));
    let differenced = difference(values, d);

    let nlags = 20.min(differenced.len() / 3);
    let (Ok(acf_values), Ok(pacf_values)) = (acf(&differenced, nlags), pacf(&differenced, nlags))
    else {
        return None;
    };
    let threshold = 1.96 / (differenced.len() as f64).sqrt();

    let last_significant = |values: &[f64]| {
        values
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, v)| v.abs() > threshold)
            .map(|(lag, _)| lag)
            .last()
            .map(|lag| lag.min(MAX_ARMA_ORDER))
            .unwrap_or(1)
    };
    let p = last_significant(&pacf_values);
    let q = last_significant(&acf_values);

    let seasonal = seasonal_difference(values, 1, SEASONAL_PERIOD);
    let seasonal_d = usize::from(!passes(&seasonal));

    let (seasonal_acf, seasonal_pacf) = match (
        acf(&seasonal, SEASONAL_PERIOD * 3),
        pacf(&seasonal, SEASONAL_PERIOD * 3),
    ) {
        (Ok(seasonal_acf), Ok(seasonal_pacf)) => (seasonal_acf, seasonal_pacf),
        _ => (acf_values.clone(), pacf_values.clone()),
    };
    let seasonal_count = |values: &[f64]| {
        (1..=3)
            .map(|k| k * SEASONAL_PERIOD)
            .filter(|&lag| values.get(lag).is_some_and(|v| v.abs() > threshold))
            .count()
            .min(MAX_SEASONAL_ORDER)
    };

    Some(OrderSuggestion {
        order: [p, d, q],
        seasonal_order: [
            seasonal_count(&seasonal_pacf),
            seasonal_d,
            seasonal_count(&seasonal_acf),
            SEASONAL_PERIOD,
        ],
        acf: acf_values.iter().take(11).copied().collect(),
        pacf: pacf_values.iter().take(11).copied().collect(),
    })
}

fn holiday_effect(prices: &[f64], flags: &[f64]) -> Option<HolidayEffect> {
    let (holiday, other): (Vec<(f64, f64)>, Vec<(f64, f64)>) = prices
        .iter()
        .copied()
        .zip(flags.iter().copied())
        .partition(|(_, flag)| *flag > 0.5);
    let holiday: Vec<f64> = holiday.into_iter().map(|(p, _)| p).collect();
    let other: Vec<f64> = other.into_iter().map(|(p, _)| p).collect();

    let test = t_test_independent(&holiday, &other).ok()?;
    Some(HolidayEffect {
        holidays: holiday.len(),
        other_days: other.len(),
        holiday_mean: mean(&holiday)?,
        other_mean: mean(&other)?,
        test,
        significant: test.p_value < 0.05,
    })
}
