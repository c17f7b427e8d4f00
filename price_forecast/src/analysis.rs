//! Stationarity analysis and differencing order selection

use crate::data::{PriceSeries, SegmentKey};
use crate::error::{ForecastError, Result};
use crate::segment_store::{SegmentMetadata, SegmentStore};
use price_math::differencing::difference;
use price_math::stationarity::ADF_MIN_OBSERVATIONS;
use price_math::{adf_test, kpss_test};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Highest differencing order tried
pub const MAX_DIFFERENCING_ORDER: usize = 2;

/// Shortest series for which a differencing decision is made
pub const MIN_SERIES_LENGTH: usize = ADF_MIN_OBSERVATIONS + MAX_DIFFERENCING_ORDER;

/// Significance level shared by both tests
pub const SIGNIFICANCE: f64 = 0.05;

/// Statistic and p-value of one test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    #[serde(with = "nullable_f64")]
    pub statistic: f64,
    #[serde(with = "nullable_f64")]
    pub p_value: f64,
}

/// Result of the stationarity analysis at the chosen differencing order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationarityResult {
    pub is_stationary: bool,
    pub differencing_order: usize,
    pub adf: TestOutcome,
    pub kpss: TestOutcome,
}

impl StationarityResult {
    /// ADF rejects a unit root and KPSS does not reject stationarity
    pub fn passes(adf: &TestOutcome, kpss: &TestOutcome) -> bool {
        adf.p_value < SIGNIFICANCE && kpss.p_value > SIGNIFICANCE
    }
}

/// The unit-root / stationarity test pair
pub trait StationarityTest: Send + Sync {
    fn adf(&self, values: &[f64]) -> Result<TestOutcome>;
    fn kpss(&self, values: &[f64]) -> Result<TestOutcome>;
}

/// ADF with AIC lag selection and KPSS with automatic bandwidth
#[derive(Debug, Clone, Copy, Default)]
pub struct AdfKpssTest;

impl StationarityTest for AdfKpssTest {
    fn adf(&self, values: &[f64]) -> Result<TestOutcome> {
        let test = adf_test(values, None)?;
        Ok(TestOutcome {
            statistic: test.statistic,
            p_value: test.p_value,
        })
    }

    fn kpss(&self, values: &[f64]) -> Result<TestOutcome> {
        let test = kpss_test(values, None)?;
        Ok(TestOutcome {
            statistic: test.statistic,
            p_value: test.p_value,
        })
    }
}

/// Picks the smallest differencing order at which a series looks stationary
#[derive(Clone)]
pub struct StationarityAnalyzer {
    test: Arc<dyn StationarityTest>,
}

impl Default for StationarityAnalyzer {
    fn default() -> Self {
        Self::new(Arc::new(AdfKpssTest))
    }
}

impl StationarityAnalyzer {
    pub fn new(test: Arc<dyn StationarityTest>) -> Self {
        Self { test }
    }

    /// Analyze raw values and return the result with the differenced values.
    ///
    /// Orders 0, 1 and 2 are tried in turn; order 2 is accepted even when
    /// it does not pass.
    pub fn analyze_values(&self, values: &[f64]) -> Result<(StationarityResult, Vec<f64>)> {
        if values.len() < MIN_SERIES_LENGTH {
            return Err(ForecastError::InsufficientData {
                needed: MIN_SERIES_LENGTH,
                got: values.len(),
            });
        }

        let mut order = 0;
        loop {
            let transformed = difference(values, order);
            let adf = self.test.adf(&transformed)?;
            let kpss = self.test.kpss(&transformed)?;
            let is_stationary = StationarityResult::passes(&adf, &kpss);
            debug!(
                "d={} ADF p={:.4} KPSS p={:.4} stationary={}",
                order, adf.p_value, kpss.p_value, is_stationary
            );

            if is_stationary || order == MAX_DIFFERENCING_ORDER {
                let result = StationarityResult {
                    is_stationary,
                    differencing_order: order,
                    adf,
                    kpss,
                };
                return Ok((result, transformed));
            }
            order += 1;
        }
    }

    /// Analyze a dated series; the transformed series keeps the dates of its last values
    pub fn analyze(&self, series: &PriceSeries) -> Result<(StationarityResult, PriceSeries)> {
        let (result, values) = self.analyze_values(series.values())?;
        let dates = series.tail(values.len()).dates().to_vec();
        Ok((result, PriceSeries::new(dates, values)?))
    }

    /// Analyze a stored segment and persist its transformed series and metadata
    pub fn analyze_segment(&self, store: &SegmentStore, key: &SegmentKey) -> Result<SegmentMetadata> {
        let series = store.load(key)?;
        let (result, transformed) = self.analyze(&series)?;

        let metadata = SegmentMetadata {
            province: key.province.clone(),
            product: key.product.clone(),
            stationarity: result,
            differencing_order: result.differencing_order,
        };
        store.save_stationary(key, &transformed)?;
        store.save_metadata(key, &metadata)?;

        info!(
            "Segment {}: d={} (stationary: {})",
            key, result.differencing_order, result.is_stationary
        );
        Ok(metadata)
    }
}

/// Non-finite values are written as `null` and read back as NaN
mod nullable_f64 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}
