//! # Fuelcast
//!
//! Daily fuel price forecasting per province and product.
//!
//! The workspace is split in two crates:
//!
//! - [`price_math`]: differencing, unit-root tests and the SARIMAX estimator
//! - [`price_forecast`]: segment storage, covariate alignment, training,
//!   forecasting and batch runs
//!
//! ## Example
//!
//! ```
//! use fuelcast_workspace::price_forecast::{ModelVariant, SegmentKey};
//!
//! let key = SegmentKey::new("Alicante/Alacant", "Gasóleo A");
//! assert_eq!(key.to_string(), "Alicante / Gasóleo A");
//! assert_eq!("sarimax".parse::<ModelVariant>().unwrap(), ModelVariant::Sarimax);
//! ```

pub use price_forecast;
pub use price_math;
