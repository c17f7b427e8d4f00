//! Pipeline configuration
//!
//! Every field has a default so an empty (or absent) TOML file yields a
//! working setup rooted at `./data`.

use crate::error::Result;
use price_math::{ArimaOrder, SarimaxSpec, SeasonalOrder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file used by the binary
pub const CONFIG_ENV: &str = "FUELCAST_CONFIG";

/// Top level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub exogenous: ExogenousConfig,
    pub model: ModelConfig,
    pub batch: BatchConfig,
}

/// Where the pipeline reads and writes files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root data directory
    pub data_dir: PathBuf,
    /// Progress document of the batch run, relative to `data_dir` unless absolute
    pub progress_file: PathBuf,
    /// Append-only results log, relative to `data_dir` unless absolute
    pub results_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            progress_file: PathBuf::from("progress.json"),
            results_file: PathBuf::from("model_results.csv"),
        }
    }
}

impl StorageConfig {
    /// Directory holding one sub-directory per segment
    pub fn segmented_dir(&self) -> PathBuf {
        self.data_dir.join("segmented")
    }

    pub fn progress_path(&self) -> PathBuf {
        self.resolve(&self.progress_file)
    }

    pub fn results_path(&self) -> PathBuf {
        self.resolve(&self.results_file)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

/// Exogenous covariate sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExogenousConfig {
    /// ECB exchange-rate export (`TIME_PERIOD`, `OBS_VALUE`)
    pub exchange_rate_file: PathBuf,
    /// Directory with `precios_base_*.csv` benchmark snapshots
    pub benchmark_dir: PathBuf,
    /// Days fetched before the first requested date to seed forward fill
    pub lookback_days: i64,
}

impl Default for ExogenousConfig {
    fn default() -> Self {
        Self {
            exchange_rate_file: PathBuf::from("data/exogenous/usd_eur.csv"),
            benchmark_dir: PathBuf::from("data/exogenous"),
            lookback_days: 30,
        }
    }
}

/// Model defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// `(p, d, q)`
    pub order: [usize; 3],
    /// `(P, D, Q, s)`
    pub seasonal_order: [usize; 4],
    /// Share of observations used for training
    pub train_ratio: f64,
    /// Forecast interval coverage
    pub confidence: f64,
    pub max_iterations: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            order: [1, 1, 1],
            seasonal_order: [0, 1, 1, 7],
            train_ratio: 0.8,
            confidence: 0.95,
            max_iterations: 2000,
        }
    }
}

impl ModelConfig {
    pub fn spec(&self) -> SarimaxSpec {
        let [p, d, q] = self.order;
        let [sp, sd, sq, s] = self.seasonal_order;
        SarimaxSpec::new(ArimaOrder::new(p, d, q), SeasonalOrder::new(sp, sd, sq, s))
    }
}

/// Batch run settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Model variants trained for every segment, by name
    pub variants: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            variants: vec!["sarimax".to_string(), "sarimax_sin_exo".to_string()],
        }
    }
}

impl Config {
    /// Read a TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Configuration rooted at `data_dir`, other paths derived from it
    pub fn with_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            exogenous: ExogenousConfig {
                exchange_rate_file: data_dir.join("exogenous").join("usd_eur.csv"),
                benchmark_dir: data_dir.join("exogenous"),
                ..ExogenousConfig::default()
            },
            storage: StorageConfig {
                data_dir,
                ..StorageConfig::default()
            },
            ..Config::default()
        }
    }
}
