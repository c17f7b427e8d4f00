//! Price series and raw export loading

use crate::error::{ForecastError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Column aliases accepted in the raw export, first name is canonical
pub const DATE_COLUMNS: [&str; 2] = ["Fecha Precio", "Fecha"];
pub const PROVINCE_COLUMNS: [&str; 1] = ["Provincia"];
pub const PRODUCT_COLUMNS: [&str; 1] = ["Producto"];
pub const PRICE_COLUMNS: [&str; 2] = ["Promedio de Pvp Diario CUBO €/litro", "Precio"];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// A (province, product) pair identifying one price series
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentKey {
    pub province: String,
    pub product: String,
}

impl SegmentKey {
    /// Build a key, normalizing bilingual province names (`A/B` becomes `A`)
    pub fn new(province: &str, product: &str) -> Self {
        Self {
            province: normalize_province(province),
            product: product.trim().to_string(),
        }
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.province, self.product)
    }
}

/// Keep the first name of a bilingual province (`Alicante/Alacant`)
pub fn normalize_province(raw: &str) -> String {
    raw.split('/').next().unwrap_or(raw).trim().to_string()
}

/// One cleaned row of the raw export
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub key: SegmentKey,
    pub price: f64,
}

/// Persisted row of a segment series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    #[serde(rename = "Fecha")]
    pub date: NaiveDate,
    #[serde(rename = "Precio")]
    pub price: f64,
}

/// Date-indexed daily price series with unique, ascending dates
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PriceSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl PriceSeries {
    /// Create a series, rejecting unsorted or duplicated dates
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::DataError(format!(
                "{} dates but {} values",
                dates.len(),
                values.len()
            )));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ForecastError::DataError(
                "Dates must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { dates, values })
    }

    /// Build from unordered points; a later point wins over an earlier one with the same date
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let map: BTreeMap<NaiveDate, f64> = points.into_iter().collect();
        let (dates, values) = map.into_iter().unzip();
        Self { dates, values }
    }

    /// Union by date, values from `newer` replacing existing ones
    pub fn merge(&self, newer: &PriceSeries) -> PriceSeries {
        Self::from_points(self.points().chain(newer.points()))
    }

    pub fn points(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn last_value(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Values and dates dropped from the front, e.g. after differencing
    pub fn tail(&self, len: usize) -> PriceSeries {
        let start = self.len().saturating_sub(len);
        Self {
            dates: self.dates[start..].to_vec(),
            values: self.values[start..].to_vec(),
        }
    }

    pub fn to_records(&self) -> Vec<PricePoint> {
        self.points()
            .map(|(date, price)| PricePoint { date, price })
            .collect()
    }
}

/// Loader for the raw `;`-separated price export
#[derive(Debug, Clone)]
pub struct RawPriceLoader {
    delimiter: u8,
}

impl Default for RawPriceLoader {
    fn default() -> Self {
        Self { delimiter: b';' }
    }
}

impl RawPriceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read and clean a raw export file
    pub fn from_csv<P: AsRef<Path>>(&self, path: P) -> Result<Vec<PriceRecord>> {
        let file = File::open(path.as_ref())?;
        let df = CsvReader::new(file)
            .has_header(true)
            .with_delimiter(self.delimiter)
            .with_encoding(CsvEncoding::LossyUtf8)
            .finish()?;

        info!(
            "Read {} raw rows from {}",
            df.height(),
            path.as_ref().display()
        );
        Self::from_dataframe(&df)
    }

    /// Validate the schema then normalize every row; unparseable rows are dropped.
    pub fn from_dataframe(df: &DataFrame) -> Result<Vec<PriceRecord>> {
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let required: [(&str, &[&str]); 4] = [
            (DATE_COLUMNS[0], &DATE_COLUMNS),
            (PROVINCE_COLUMNS[0], &PROVINCE_COLUMNS),
            (PRODUCT_COLUMNS[0], &PRODUCT_COLUMNS),
            (PRICE_COLUMNS[0], &PRICE_COLUMNS),
        ];
        let mut resolved = Vec::with_capacity(required.len());
        let mut missing = Vec::new();
        for (canonical, aliases) in required {
            match find_column(&names, aliases) {
                Some(name) => resolved.push(name),
                None => missing.push(canonical.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(ForecastError::Schema(missing));
        }

        let dates = string_column(df, &resolved[0])?;
        let provinces = string_column(df, &resolved[1])?;
        let products = string_column(df, &resolved[2])?;
        let prices = string_column(df, &resolved[3])?;

        let records: Vec<PriceRecord> = dates
            .iter()
            .zip(&provinces)
            .zip(&products)
            .zip(&prices)
            .filter_map(|(((date, province), product), price)| {
                let date = parse_date(date.as_deref()?)?;
                let province = province.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
                let product = product.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
                let price = parse_price(price.as_deref()?)?;
                Some(PriceRecord {
                    date,
                    key: SegmentKey::new(province, product),
                    price,
                })
            })
            .collect();

        debug!(
            "Kept {} of {} raw rows after cleaning",
            records.len(),
            df.height()
        );
        Ok(records)
    }
}

fn find_column(names: &[String], aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| {
        names
            .iter()
            .find(|name| name.trim_start_matches('\u{feff}').trim() == *alias)
            .cloned()
    })
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::Utf8)?;
    Ok(column
        .utf8()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Parse a date in any of the accepted export formats, with or without a time part
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(raw, format).ok().or_else(|| {
            NaiveDateTime::parse_from_str(raw, &format!("{} %H:%M:%S", format))
                .ok()
                .map(|dt| dt.date())
        })
    })
}

/// Parse a price written with a decimal comma or point
pub fn parse_price(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let normalized = if raw.contains(',') {
        raw.replace('.', "").replace(',', ".")
    } else {
        raw.to_string()
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
