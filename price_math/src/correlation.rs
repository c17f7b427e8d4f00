//! Descriptive statistics, correlation and autocorrelation helpers

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1 denominator)
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Median, averaging the two middle values for even lengths
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Pearson correlation coefficient.
///
/// Returns `None` when lengths differ, fewer than two points are given or
/// either side has zero variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }

    if sxx == 0.0 || syy == 0.0 {
        None
    } else {
        Some(sxy / (sxx * syy).sqrt())
    }
}

/// Sample autocorrelation function for lags `0..=nlags`
pub fn acf(values: &[f64], nlags: usize) -> Result<Vec<f64>> {
    let n = values.len();
    if n <= nlags {
        return Err(MathError::InsufficientData {
            needed: nlags + 1,
            got: n,
        });
    }

    let m = values.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = values.iter().map(|v| v - m).collect();
    let c0 = centered.iter().map(|v| v * v).sum::<f64>();
    if c0 == 0.0 {
        return Err(MathError::CalculationError(
            "Autocorrelation of a constant series is undefined".to_string(),
        ));
    }

    Ok((0..=nlags)
        .map(|lag| {
            centered[lag..]
                .iter()
                .zip(&centered)
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / c0
        })
        .collect())
}

/// Partial autocorrelation function for lags `0..=nlags` (Durbin-Levinson
/// recursion on the sample autocorrelations).
pub fn pacf(values: &[f64], nlags: usize) -> Result<Vec<f64>> {
    let rho = acf(values, nlags)?;

    let mut result = vec![1.0];
    let mut phi_prev: Vec<f64> = Vec::new();
    for k in 1..=nlags {
        let num = rho[k]
            - phi_prev
                .iter()
                .enumerate()
                .map(|(j, p)| p * rho[k - 1 - j])
                .sum::<f64>();
        let den = 1.0
            - phi_prev
                .iter()
                .enumerate()
                .map(|(j, p)| p * rho[j + 1])
                .sum::<f64>();
        let phi_kk = if den.abs() < 1e-12 { 0.0 } else { num / den };

        let mut phi = Vec::with_capacity(k);
        for j in 0..k - 1 {
            phi.push(phi_prev[j] - phi_kk * phi_prev[k - 2 - j]);
        }
        phi.push(phi_kk);

        result.push(phi_kk);
        phi_prev = phi;
    }
    Ok(result)
}

/// Two-sample Student t-test result
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTest {
    pub statistic: f64,
    pub p_value: f64,
}

/// Independent two-sample t-test assuming equal variances (two-sided).
pub fn t_test_independent(a: &[f64], b: &[f64]) -> Result<TTest> {
    if a.len() < 2 || b.len() < 2 {
        return Err(MathError::InsufficientData {
            needed: 2,
            got: a.len().min(b.len()),
        });
    }

    let (na, nb) = (a.len() as f64, b.len() as f64);
    let (ma, mb) = (mean(a).unwrap_or(0.0), mean(b).unwrap_or(0.0));
    let va = a.iter().map(|v| (v - ma).powi(2)).sum::<f64>() / (na - 1.0);
    let vb = b.iter().map(|v| (v - mb).powi(2)).sum::<f64>() / (nb - 1.0);

    let df = na + nb - 2.0;
    let pooled = ((na - 1.0) * va + (nb - 1.0) * vb) / df;
    let se = (pooled * (1.0 / na + 1.0 / nb)).sqrt();
    if se == 0.0 {
        return Err(MathError::CalculationError(
            "Both samples have zero variance".to_string(),
        ));
    }

    let statistic = (ma - mb) / se;
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| MathError::CalculationError(e.to_string()))?;
    let p_value = 2.0 * (1.0 - dist.cdf(statistic.abs()));

    Ok(TTest { statistic, p_value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_descriptive() {
        let values = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mean(&values), Some(2.5));
        assert_eq!(median(&values), Some(2.5));
        assert_relative_eq!(std_dev(&values).unwrap(), 1.2909944, epsilon = 1e-6);
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert!(mean(&[]).is_none());
    }

    #[test]
    fn test_pearson() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(pearson(&x, &[2.0, 4.0, 6.0, 8.0]).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(pearson(&x, &[8.0, 6.0, 4.0, 2.0]).unwrap(), -1.0, epsilon = 1e-12);
        assert!(pearson(&x, &[1.0; 4]).is_none());
    }

    #[test]
    fn test_acf_lag_zero_is_one() {
        let values: Vec<f64> = (0..30).map(|i| (i as f64 * 0.7).sin()).collect();
        let result = acf(&values, 5).unwrap();
        assert_eq!(result.len(), 6);
        assert_relative_eq!(result[0], 1.0, epsilon = 1e-12);
        assert!(result.iter().all(|r| r.abs() <= 1.0 + 1e-12));
    }

    #[test]
    fn test_pacf_first_lag_matches_acf() {
        let values: Vec<f64> = (0..40).map(|i| ((i * 7) % 11) as f64).collect();
        let a = acf(&values, 4).unwrap();
        let p = pacf(&values, 4).unwrap();
        assert_relative_eq!(p[1], a[1], epsilon = 1e-12);
        assert_eq!(p.len(), 5);
    }

    #[test]
    fn test_t_test_detects_shift() {
        let a = [10.0, 10.2, 9.9, 10.1, 10.0, 10.3];
        let b = [11.0, 11.1, 10.9, 11.2, 11.0, 10.8];
        let result = t_test_independent(&a, &b).unwrap();
        assert!(result.statistic < 0.0);
        assert!(result.p_value < 0.01);
    }

    #[test]
    fn test_t_test_needs_two_per_group() {
        assert!(t_test_independent(&[1.0], &[1.0, 2.0]).is_err());
    }
}
