//! USD/EUR reference rate from the ECB `csvdata` export

use super::{Covariate, DateRange, ExogenousSource};
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Debug, Deserialize)]
struct EcbRow {
    #[serde(rename = "TIME_PERIOD")]
    period: NaiveDate,
    #[serde(rename = "OBS_VALUE")]
    value: Option<f64>,
}

/// Exchange-rate source, parsed on first use and cached until [`CurrencyRateSource::refresh`]
#[derive(Debug)]
pub struct CurrencyRateSource {
    path: PathBuf,
    cache: Mutex<Option<Arc<BTreeMap<NaiveDate, f64>>>>,
}

impl CurrencyRateSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: Mutex::new(None),
        }
    }

    /// Drop the cached rates; the next fetch re-reads the file
    pub fn refresh(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
    }

    fn rates(&self) -> Result<Arc<BTreeMap<NaiveDate, f64>>> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| ForecastError::DataError("Exchange-rate cache poisoned".to_string()))?;
        if let Some(rates) = cache.as_ref() {
            return Ok(Arc::clone(rates));
        }

        let rates = Arc::new(read_rates(&self.path)?);
        info!(
            "Loaded {} exchange-rate observations from {}",
            rates.len(),
            self.path.display()
        );
        *cache = Some(Arc::clone(&rates));
        Ok(rates)
    }
}

fn read_rates(path: &Path) -> Result<BTreeMap<NaiveDate, f64>> {
    if !path.is_file() {
        return Ok(BTreeMap::new());
    }
    let mut reader = csv::Reader::from_path(path)?;
    let mut rates = BTreeMap::new();
    for row in reader.deserialize::<EcbRow>() {
        let row = row?;
        if let Some(value) = row.value {
            rates.insert(row.period, value);
        }
    }
    Ok(rates)
}

impl ExogenousSource for CurrencyRateSource {
    fn covariate(&self) -> Covariate {
        Covariate::ExchangeRate
    }

    fn fetch(&self, range: DateRange) -> Result<BTreeMap<NaiveDate, f64>> {
        Ok(self
            .rates()?
            .range(range.start..=range.end)
            .map(|(d, v)| (*d, *v))
            .collect())
    }
}
