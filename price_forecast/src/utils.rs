//! Utility functions for the price_forecast crate

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Chronological split: the first `train_ratio` share trains, the rest is held out
pub fn train_test_split<T: Clone>(data: &[T], train_ratio: f64) -> Result<(Vec<T>, Vec<T>)> {
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "Train ratio must be in (0, 1), got {}",
            train_ratio
        )));
    }

    let train_size = (data.len() as f64 * train_ratio) as usize;
    Ok((data[..train_size].to_vec(), data[train_size..].to_vec()))
}

/// `horizon` consecutive days starting the day after `last_date`
pub fn future_dates(last_date: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon as i64)
        .map(|offset| last_date + Duration::days(offset))
        .collect()
}

/// Every day from `start` to `end`, both included
pub fn date_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|date| *date <= end)
        .collect()
}

/// Write `contents` to a temporary sibling of `path`, then rename it into place
pub fn write_atomic<P: AsRef<Path>>(path: P, contents: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ForecastError::InvalidParameter(format!("Invalid path {}", path.display())))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));

    let mut file = fs::File::create(&tmp)?;
    file.write_all(contents)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Serialize records into an in-memory CSV document with a header row
pub fn to_csv_bytes<T: serde::Serialize>(records: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|err| ForecastError::IoError(err.into_error()))
}

/// Read every record of a CSV file with a header row
pub fn read_csv_records<T, P>(path: P) -> Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    Ok(records)
}

const RESERVED: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '%'];

/// Encode a name as a single path component.
///
/// Reserved characters become `%XX`, so distinct names never share a
/// directory and [`decode_component`] recovers the name.
pub fn encode_component(raw: &str) -> String {
    if raw.is_empty() {
        return "%".to_string();
    }
    let only_dots = raw.chars().all(|c| c == '.');
    let mut encoded = String::with_capacity(raw.len());
    for c in raw.chars() {
        if RESERVED.contains(&c) || (only_dots && c == '.') {
            encoded.push_str(&format!("%{:02X}", c as u32));
        } else {
            encoded.push(c);
        }
    }
    encoded
}

/// Inverse of [`encode_component`]; `None` if `component` is not a valid encoding
pub fn decode_component(component: &str) -> Option<String> {
    if component == "%" {
        return Some(String::new());
    }
    let mut decoded = String::with_capacity(component.len());
    let mut chars = component.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            decoded.push(c);
            continue;
        }
        let hex: String = chars.by_ref().take(2).collect();
        let code = u32::from_str_radix(&hex, 16).ok().filter(|_| hex.len() == 2)?;
        decoded.push(char::from_u32(code)?);
    }
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_is_chronological() {
        let data: Vec<i32> = (0..10).collect();
        let (train, test) = train_test_split(&data, 0.8).unwrap();
        assert_eq!(train, (0..8).collect::<Vec<_>>());
        assert_eq!(test, vec![8, 9]);
        assert!(train_test_split(&data, 1.0).is_err());
    }

    #[test]
    fn test_future_dates_start_next_day() {
        let last: NaiveDate = "2024-02-28".parse().unwrap();
        let dates = future_dates(last, 3);
        assert_eq!(dates[0], "2024-02-29".parse::<NaiveDate>().unwrap());
        assert_eq!(dates[2], "2024-03-02".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn test_component_encoding() {
        assert_eq!(encode_component("Gasóleo A"), "Gasóleo A");
        assert_eq!(encode_component("a/b"), "a%2Fb");
        assert_eq!(encode_component(".."), "%2E%2E");
        assert_eq!(encode_component("1.5%"), "1.5%25");
        // Names that only differ in reserved characters stay apart
        assert_ne!(encode_component("a?b"), encode_component("a*b"));
        assert_ne!(encode_component("a_b"), encode_component("a/b"));

        for name in ["Gasóleo A", "a?b", "..", "", "50%/50%"] {
            assert_eq!(decode_component(&encode_component(name)).as_deref(), Some(name));
        }
        assert_eq!(decode_component("bad%zz"), None);
    }
}
