//! Per-segment persistence
//!
//! Layout under the segmented directory:
//!
//! ```text
//! {province}/{product}/original.csv       merged raw series (Fecha,Precio)
//! {province}/{product}/stationary.csv     differenced series
//! {province}/{product}/metadata.json      stationarity outcome
//! {province}/{product}/model.json         SARIMAX with exogenous regressors
//! {province}/{product}/model_sin_exo.json SARIMAX without regressors
//! {province}/{product}/prediction*.csv    held-out predictions
//! ```
//!
//! Every file is replaced atomically.

use crate::analysis::StationarityResult;
use crate::config::Config;
use crate::data::{PricePoint, PriceRecord, PriceSeries, RawPriceLoader, SegmentKey};
use crate::error::{ForecastError, Result};
use crate::models::ModelVariant;
use crate::utils::{
    decode_component, encode_component, read_csv_records, to_csv_bytes, write_atomic,
};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const ORIGINAL_FILE: &str = "original.csv";
const STATIONARY_FILE: &str = "stationary.csv";
const METADATA_FILE: &str = "metadata.json";

/// Stationarity outcome stored next to a segment's transformed series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    pub province: String,
    pub product: String,
    pub stationarity: StationarityResult,
    pub differencing_order: usize,
}

/// Held-out prediction row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    #[serde(rename = "Fecha")]
    pub date: NaiveDate,
    #[serde(rename = "Real")]
    pub actual: f64,
    #[serde(rename = "Prediccion")]
    pub predicted: f64,
    #[serde(rename = "Lower")]
    pub lower: f64,
    #[serde(rename = "Upper")]
    pub upper: f64,
}

/// File-backed store of segment series and their derived artifacts
#[derive(Debug, Clone)]
pub struct SegmentStore {
    root: PathBuf,
}

impl SegmentStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.storage.segmented_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn segment_dir(&self, key: &SegmentKey) -> PathBuf {
        self.root
            .join(encode_component(&key.province))
            .join(encode_component(&key.product))
    }

    /// Load, clean and ingest a raw export. The schema is checked before anything is written.
    pub fn ingest_file<P: AsRef<Path>>(
        &self,
        path: P,
        loader: &RawPriceLoader,
    ) -> Result<Vec<SegmentKey>> {
        let records = loader.from_csv(path)?;
        self.ingest(&records)
    }

    /// Merge cleaned rows into their segments and return the updated keys, sorted.
    ///
    /// Within a segment a row replaces any existing value for its date, and a
    /// later row of `records` replaces an earlier one.
    pub fn ingest(&self, records: &[PriceRecord]) -> Result<Vec<SegmentKey>> {
        let mut groups: BTreeMap<&SegmentKey, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        for record in records {
            groups
                .entry(&record.key)
                .or_default()
                .push((record.date, record.price));
        }

        let mut updated = Vec::with_capacity(groups.len());
        for (key, points) in groups {
            let incoming = PriceSeries::from_points(points);
            let merged = match self.load_if_exists(key)? {
                Some(existing) => existing.merge(&incoming),
                None => incoming,
            };
            self.save(key, &merged)?;
            debug!("Segment {} now has {} observations", key, merged.len());
            updated.push(key.clone());
        }

        info!(
            "Ingested {} rows into {} segments",
            records.len(),
            updated.len()
        );
        Ok(updated)
    }

    /// Persisted series of a segment
    pub fn load(&self, key: &SegmentKey) -> Result<PriceSeries> {
        self.load_if_exists(key)?
            .ok_or_else(|| ForecastError::SegmentNotFound(key.to_string()))
    }

    pub fn load_if_exists(&self, key: &SegmentKey) -> Result<Option<PriceSeries>> {
        read_series(&self.segment_dir(key).join(ORIGINAL_FILE))
    }

    pub fn save(&self, key: &SegmentKey, series: &PriceSeries) -> Result<()> {
        write_series(&self.segment_dir(key).join(ORIGINAL_FILE), series)
    }

    /// All persisted segments, sorted by province then product
    pub fn segments(&self) -> Result<Vec<SegmentKey>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        for province in fs::read_dir(&self.root)? {
            let province = province?;
            if !province.file_type()?.is_dir() {
                continue;
            }
            for product in fs::read_dir(province.path())? {
                let product = product?;
                if !product.path().join(ORIGINAL_FILE).is_file() {
                    continue;
                }
                let names = (
                    decode_component(&province.file_name().to_string_lossy()),
                    decode_component(&product.file_name().to_string_lossy()),
                );
                match names {
                    (Some(province), Some(product)) => keys.push(SegmentKey {
                        province,
                        product,
                    }),
                    _ => warn!("Skipping unrecognised segment directory {}", product.path().display()),
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    pub fn save_stationary(&self, key: &SegmentKey, series: &PriceSeries) -> Result<()> {
        write_series(&self.segment_dir(key).join(STATIONARY_FILE), series)
    }

    /// Transformed series written by the stationarity analysis
    pub fn load_stationary(&self, key: &SegmentKey) -> Result<PriceSeries> {
        read_series(&self.segment_dir(key).join(STATIONARY_FILE))?.ok_or_else(|| {
            ForecastError::DataError(format!("Segment {} has not been analyzed", key))
        })
    }

    pub fn save_metadata(&self, key: &SegmentKey, metadata: &SegmentMetadata) -> Result<()> {
        write_json(&self.segment_dir(key).join(METADATA_FILE), metadata)
    }

    pub fn load_metadata(&self, key: &SegmentKey) -> Result<Option<SegmentMetadata>> {
        read_json(&self.segment_dir(key).join(METADATA_FILE))
    }

    pub fn model_path(&self, key: &SegmentKey, variant: ModelVariant) -> PathBuf {
        self.segment_dir(key).join(variant.model_file())
    }

    pub fn save_model<T: Serialize>(
        &self,
        key: &SegmentKey,
        variant: ModelVariant,
        model: &T,
    ) -> Result<()> {
        write_json(&self.model_path(key, variant), model)
    }

    /// Persisted model state, `None` if the variant was never trained
    pub fn load_model<T: DeserializeOwned>(
        &self,
        key: &SegmentKey,
        variant: ModelVariant,
    ) -> Result<Option<T>> {
        read_json(&self.model_path(key, variant))
    }

    pub fn save_predictions(
        &self,
        key: &SegmentKey,
        variant: ModelVariant,
        rows: &[PredictionRow],
    ) -> Result<()> {
        let path = self.segment_dir(key).join(variant.prediction_file());
        write_atomic(path, &to_csv_bytes(rows)?)
    }

    pub fn load_predictions(
        &self,
        key: &SegmentKey,
        variant: ModelVariant,
    ) -> Result<Vec<PredictionRow>> {
        read_csv_records(self.segment_dir(key).join(variant.prediction_file()))
    }
}

fn read_series(path: &Path) -> Result<Option<PriceSeries>> {
    if !path.is_file() {
        return Ok(None);
    }
    let points: Vec<PricePoint> = read_csv_records(path)?;
    Ok(Some(PriceSeries::from_points(
        points.into_iter().map(|p| (p.date, p.price)),
    )))
}

fn write_series(path: &Path, series: &PriceSeries) -> Result<()> {
    write_atomic(path, &to_csv_bytes(&series.to_records())?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, &serde_json::to_vec_pretty(value)?)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.is_file() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}
