//! Append-only log of model evaluations

use crate::error::{ForecastError, Result};
use crate::utils::read_csv_records;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const HEADER: &str = "province,producto,modelo,mae,rmse,tiempo\n";

/// One evaluated (segment, variant) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResultRow {
    pub province: String,
    #[serde(rename = "producto")]
    pub product: String,
    #[serde(rename = "modelo")]
    pub model: String,
    pub mae: f64,
    pub rmse: f64,
    /// Training time in seconds
    #[serde(rename = "tiempo")]
    pub elapsed: f64,
}

/// CSV results log, appended to under a lock
#[derive(Debug)]
pub struct ResultsLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ResultsLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the log with its header row unless it already exists
    pub fn ensure_header(&self) -> Result<()> {
        let _guard = self.lock()?;
        if self.path.is_file() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, HEADER)?;
        Ok(())
    }

    pub fn append(&self, row: &ModelResultRow) -> Result<()> {
        let _guard = self.lock()?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.serialize(row)?;
        let line = writer
            .into_inner()
            .map_err(|err| ForecastError::IoError(err.into_error()))?;

        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(&line)?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<ModelResultRow>> {
        let _guard = self.lock()?;
        read_csv_records(&self.path)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| ForecastError::DataError("Results log lock poisoned".to_string()))
    }
}
