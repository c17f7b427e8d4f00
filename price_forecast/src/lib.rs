//! # Price Forecast
//!
//! Daily fuel price forecasting per (province, product) segment.
//!
//! ## Pipeline
//!
//! - [`segment_store::SegmentStore`]: cleans raw exports, splits them into
//!   segments and merges new observations into the persisted series
//! - [`analysis::StationarityAnalyzer`]: picks the differencing order with
//!   the ADF/KPSS test pair
//! - [`exogenous::ExogenousAligner`]: aligns exchange rate, oil benchmark and
//!   holiday covariates onto a series' dates
//! - [`engine::ForecastEngine`]: trains SARIMAX models with a chronological
//!   hold-out and forecasts back on the price scale
//! - [`batch::BatchOrchestrator`]: runs all of the above over every segment
//!   on a background thread, tracking progress and results
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use price_forecast::{Config, ModelVariant, Pipeline, SegmentKey};
//!
//! let pipeline = Pipeline::from_config(Config::with_data_dir("data"));
//! pipeline.ingest_file("precios.csv")?;
//!
//! let key = SegmentKey::new("Madrid", "Gasóleo A");
//! pipeline.analyze(&key)?;
//! let evaluation = pipeline.train(&key, ModelVariant::Sarimax)?;
//! println!("{}", evaluation.metrics);
//!
//! let forecast = pipeline.forecast(&key, ModelVariant::Sarimax, 14)?;
//! for point in &forecast.points {
//!     println!("{} {:.3} [{:.3}, {:.3}]", point.date, point.mean, point.lower, point.upper);
//! }
//! # Ok::<(), price_forecast::ForecastError>(())
//! ```

pub mod analysis;
pub mod batch;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod exogenous;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod profile;
pub mod segment_store;
pub mod utils;

// Re-export commonly used types
pub use crate::analysis::{StationarityAnalyzer, StationarityResult, StationarityTest};
pub use crate::batch::{BatchHandle, BatchOrchestrator, BatchProgress, BatchStatus};
pub use crate::config::Config;
pub use crate::data::{PriceSeries, SegmentKey};
pub use crate::engine::ForecastEngine;
pub use crate::error::{ForecastError, Result};
pub use crate::exogenous::{ExogenousAligner, ExogenousFrame, ExogenousSource};
pub use crate::models::{ForecastResult, ModelVariant};
pub use crate::pipeline::Pipeline;
pub use crate::segment_store::SegmentStore;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
