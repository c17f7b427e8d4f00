//! Differencing and reintegration transforms
//!
//! A differenced series is one observation shorter per order. Reintegration
//! undoes the transform for values forecast past the end of the series by
//! cumulatively summing them on top of the last known value of each level.

use crate::{MathError, Result};

/// Apply `order` successive first differences to a series.
///
/// Differencing stops early if the series runs out of observations.
pub fn difference(series: &[f64], order: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..order {
        if result.len() <= 1 {
            return Vec::new();
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Apply `order` successive seasonal differences with the given period.
pub fn seasonal_difference(series: &[f64], order: usize, period: usize) -> Vec<f64> {
    if period == 0 {
        return series.to_vec();
    }

    let mut result = series.to_vec();
    for _ in 0..order {
        if result.len() <= period {
            return Vec::new();
        }
        result = result
            .iter()
            .skip(period)
            .zip(result.iter())
            .map(|(current, lagged)| current - lagged)
            .collect();
    }
    result
}

/// Last value of the series at each differencing level `0..order`.
///
/// `anchors[0]` is the last observation of the series itself, `anchors[1]`
/// the last first difference and so on.
pub fn difference_anchors(series: &[f64], order: usize) -> Result<Vec<f64>> {
    if series.len() < order {
        return Err(MathError::InsufficientData {
            needed: order,
            got: series.len(),
        });
    }

    let mut anchors = Vec::with_capacity(order);
    let mut level = series.to_vec();
    for _ in 0..order {
        // Length was checked above, every level keeps at least one value
        anchors.push(level[level.len() - 1]);
        level = difference(&level, 1);
    }
    Ok(anchors)
}

/// Convert first-difference forecasts back to the level scale.
///
/// `reintegrated[i] = deltas[0] + ... + deltas[i] + last_value`
pub fn reintegrate(deltas: &[f64], last_value: f64) -> Vec<f64> {
    deltas
        .iter()
        .scan(last_value, |level, delta| {
            *level += delta;
            Some(*level)
        })
        .collect()
}

/// Undo `anchors.len()` levels of differencing.
///
/// The cumulative sum is applied once per level, from the deepest level
/// (`anchors[len - 1]`) up to the original scale (`anchors[0]`).
pub fn reintegrate_levels(deltas: &[f64], anchors: &[f64]) -> Vec<f64> {
    anchors
        .iter()
        .rev()
        .fold(deltas.to_vec(), |values, anchor| reintegrate(&values, *anchor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_difference_orders() {
        let series = vec![1.0, 4.0, 9.0, 16.0, 25.0];

        assert_eq!(difference(&series, 0), series);
        assert_eq!(difference(&series, 1), vec![3.0, 5.0, 7.0, 9.0]);
        assert_eq!(difference(&series, 2), vec![2.0, 2.0, 2.0]);
        assert!(difference(&[1.0], 1).is_empty());
    }

    #[test]
    fn test_seasonal_difference() {
        let series = vec![1.0, 2.0, 3.0, 2.0, 3.0, 4.0];
        assert_eq!(seasonal_difference(&series, 1, 3), vec![1.0, 1.0, 1.0]);
        assert!(seasonal_difference(&series, 2, 3).is_empty());
    }

    #[test]
    fn test_reintegrate_known_values() {
        let result = reintegrate(&[0.01, -0.01, 0.02], 1.63);
        assert_relative_eq!(result[0], 1.64, epsilon = 1e-12);
        assert_relative_eq!(result[1], 1.63, epsilon = 1e-12);
        assert_relative_eq!(result[2], 1.65, epsilon = 1e-12);
    }

    #[test]
    fn test_reintegrate_zero_deltas_is_identity() {
        let result = reintegrate(&[0.0; 5], 1.48);
        assert!(result.iter().all(|v| *v == 1.48));
    }

    #[test]
    fn test_reintegrate_levels_matches_second_difference() {
        let series = vec![1.0, 4.0, 9.0, 16.0, 25.0];
        let anchors = difference_anchors(&series, 2).unwrap();
        assert_eq!(anchors, vec![25.0, 9.0]);

        // The next second differences of n^2 are all 2
        let restored = reintegrate_levels(&[2.0, 2.0], &anchors);
        assert_eq!(restored, vec![36.0, 49.0]);
    }

    #[test]
    fn test_anchors_need_enough_data() {
        assert!(difference_anchors(&[1.0, 2.0], 3).is_err());
        assert!(difference_anchors(&[], 0).unwrap().is_empty());
    }
}
