//! Brent benchmark prices from timestamped `precios_base_*.csv` snapshots

use super::{Covariate, DateRange, ExogenousSource};
use crate::data::{parse_date, parse_price};
use crate::error::{ForecastError, Result};
use crate::utils::{to_csv_bytes, write_atomic};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const SNAPSHOT_PREFIX: &str = "precios_base_";

#[derive(Serialize)]
struct SnapshotRow {
    fecha: NaiveDate,
    precio_brent: f64,
}

/// Oil benchmark source reading the most recent snapshot in a directory
#[derive(Debug, Clone)]
pub struct BenchmarkPriceSource {
    dir: PathBuf,
}

impl BenchmarkPriceSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Most recent snapshot file, by the timestamp in its name
    pub fn latest_snapshot(&self) -> Result<Option<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(None);
        }
        let mut snapshots: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(SNAPSHOT_PREFIX) && n.ends_with(".csv"))
                    .unwrap_or(false)
            })
            .collect();
        snapshots.sort();
        Ok(snapshots.pop())
    }

    /// Write `prices` as a new timestamped snapshot and return its path
    pub fn save_snapshot(&self, prices: &BTreeMap<NaiveDate, f64>) -> Result<PathBuf> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self.dir.join(format!("{}{}.csv", SNAPSHOT_PREFIX, stamp));
        let rows: Vec<SnapshotRow> = prices
            .iter()
            .map(|(date, price)| SnapshotRow {
                fecha: *date,
                precio_brent: *price,
            })
            .collect();
        write_atomic(&path, &to_csv_bytes(&rows)?)?;
        Ok(path)
    }

    fn read_snapshot(path: &Path) -> Result<BTreeMap<NaiveDate, f64>> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let position = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                ForecastError::Schema(vec![format!("{} in {}", name, path.display())])
            })
        };
        let date_idx = position("fecha")?;
        let price_idx = position("precio_brent")?;

        let mut prices = BTreeMap::new();
        for record in reader.records() {
            let record = record?;
            let date = record.get(date_idx).and_then(parse_date);
            let price = record.get(price_idx).and_then(parse_price);
            if let (Some(date), Some(price)) = (date, price) {
                prices.insert(date, price);
            }
        }
        Ok(prices)
    }
}

impl ExogenousSource for BenchmarkPriceSource {
    fn covariate(&self) -> Covariate {
        Covariate::OilPrice
    }

    fn fetch(&self, range: DateRange) -> Result<BTreeMap<NaiveDate, f64>> {
        let Some(path) = self.latest_snapshot()? else {
            return Ok(BTreeMap::new());
        };
        debug!("Reading benchmark snapshot {}", path.display());
        Ok(Self::read_snapshot(&path)?
            .into_iter()
            .filter(|(date, _)| range.contains(*date))
            .collect())
    }
}
