//! Alignment of covariate sources onto a date index

use super::{missing, Covariate, DateRange, ExogenousFrame, ExogenousSource, FillPolicy};
use crate::config::Config;
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Builds gap-free covariate frames
#[derive(Debug, Clone)]
pub struct ExogenousAligner {
    lookback_days: i64,
    covariates: Vec<Covariate>,
}

impl Default for ExogenousAligner {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            covariates: Covariate::ALL.to_vec(),
        }
    }
}

impl ExogenousAligner {
    pub fn new(lookback_days: i64) -> Self {
        Self {
            lookback_days: lookback_days.max(0),
            ..Self::default()
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.exogenous.lookback_days)
    }

    /// Required covariates, in frame column order
    pub fn with_covariates(mut self, covariates: Vec<Covariate>) -> Self {
        self.covariates = covariates;
        self
    }

    /// Align `sources` onto `dates`.
    ///
    /// Fill sources are queried from `lookback_days` before the first date so
    /// that forward fill is seeded by the last earlier publication. Every
    /// required covariate needs a source with at least one observation.
    pub fn align(
        &self,
        dates: &[NaiveDate],
        sources: &[Arc<dyn ExogenousSource>],
    ) -> Result<ExogenousFrame> {
        let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
            return Err(ForecastError::InvalidParameter(
                "Cannot align covariates onto an empty date index".to_string(),
            ));
        };

        let mut columns = Vec::with_capacity(self.covariates.len());
        for &covariate in &self.covariates {
            let source = sources
                .iter()
                .find(|s| s.covariate() == covariate)
                .ok_or_else(|| missing(covariate))?;

            let values = match source.fill_policy() {
                FillPolicy::Membership => {
                    let members = source.fetch(DateRange::new(first, last))?;
                    dates
                        .iter()
                        .map(|d| if members.contains_key(d) { 1.0 } else { 0.0 })
                        .collect()
                }
                FillPolicy::ForwardBackward => {
                    let range = DateRange::new(first - Duration::days(self.lookback_days), last);
                    let observed = source.fetch(range)?;
                    if observed.is_empty() {
                        return Err(missing(covariate));
                    }
                    fill_forward_backward(dates, &observed)
                }
            };
            debug!("Aligned {} onto {} dates", covariate, dates.len());
            columns.push((covariate, values));
        }

        Ok(ExogenousFrame::new(dates.to_vec(), columns))
    }
}

/// Left join `observed` onto `dates`, forward fill, then backward fill.
///
/// Observations before the first date seed the forward fill. `observed`
/// must not be empty.
fn fill_forward_backward(dates: &[NaiveDate], observed: &BTreeMap<NaiveDate, f64>) -> Vec<f64> {
    let mut values: Vec<Option<f64>> = dates
        .iter()
        .map(|d| observed.range(..=*d).next_back().map(|(_, v)| *v))
        .collect();

    let first_known = values
        .iter()
        .flatten()
        .next()
        .copied()
        .or_else(|| observed.values().next().copied());
    for value in values.iter_mut() {
        if value.is_none() {
            *value = first_known;
        } else {
            break;
        }
    }

    values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exogenous::StaticSource;
    use crate::utils::date_range;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_forward_then_backward_fill() {
        let dates = date_range(day("2024-01-01"), day("2024-01-05"));
        let observed: BTreeMap<NaiveDate, f64> =
            [(day("2024-01-02"), 1.1), (day("2024-01-04"), 1.3)].into_iter().collect();
        assert_eq!(
            fill_forward_backward(&dates, &observed),
            vec![1.1, 1.1, 1.1, 1.3, 1.3]
        );
    }

    #[test]
    fn test_lookback_seeds_forward_fill() {
        let dates = date_range(day("2024-02-10"), day("2024-02-12"));
        let observed: BTreeMap<NaiveDate, f64> = [(day("2024-01-25"), 80.0)].into_iter().collect();
        let sources: Vec<Arc<dyn ExogenousSource>> =
            vec![Arc::new(StaticSource::new(Covariate::OilPrice, observed))];

        let aligner = ExogenousAligner::new(30).with_covariates(vec![Covariate::OilPrice]);
        let frame = aligner.align(&dates, &sources).unwrap();
        assert_eq!(frame.column(Covariate::OilPrice).unwrap(), &[80.0, 80.0, 80.0]);

        let short = ExogenousAligner::new(5).with_covariates(vec![Covariate::OilPrice]);
        assert!(matches!(
            short.align(&dates, &sources),
            Err(ForecastError::MissingExogenousData(_))
        ));
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let dates = date_range(day("2024-01-01"), day("2024-01-03"));
        let result = ExogenousAligner::default().align(&dates, &[]);
        assert!(matches!(result, Err(ForecastError::MissingExogenousData(_))));
    }
}
