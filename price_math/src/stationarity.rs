//! Unit-root and stationarity tests
//!
//! - Augmented Dickey-Fuller (null: unit root), constant term, lag order
//!   chosen by AIC, MacKinnon approximate p-values
//! - KPSS (null: level stationarity) with automatic bandwidth selection
//!
//! Used together: a series is stationary when ADF rejects its null and KPSS
//! does not.

use crate::ols::ols;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

/// Outcome of a single unit-root or stationarity test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitRootTest {
    /// Test statistic
    pub statistic: f64,
    /// Approximate p-value
    pub p_value: f64,
    /// Lags used by the test
    pub lags: usize,
    /// Observations entering the test regression
    pub nobs: usize,
}

/// Minimum series length accepted by [`adf_test`] with automatic lag selection.
pub const ADF_MIN_OBSERVATIONS: usize = 4;

// MacKinnon (1994) response surface for the constant-only case, one variable
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010) critical value surfaces for the constant-only case
const TAU_CRIT: [(f64, [f64; 4]); 3] = [
    (0.01, [-3.43035, -6.5393, -16.786, -79.433]),
    (0.05, [-2.86154, -2.8903, -4.234, -40.040]),
    (0.10, [-2.56677, -1.5384, -2.809, 0.0]),
];

// KPSS level-stationarity critical values (Kwiatkowski et al. 1992, table 1)
const KPSS_CRIT: [f64; 4] = [0.347, 0.463, 0.574, 0.739];
const KPSS_P: [f64; 4] = [0.10, 0.05, 0.025, 0.01];

/// Augmented Dickey-Fuller test with a constant.
///
/// When `max_lag` is `None` the upper bound is `ceil(12 * (n/100)^(1/4))`,
/// always capped at `n/2 - 2` so the regression keeps positive degrees of
/// freedom. The lag order actually used is the AIC minimiser over
/// `0..=max_lag`.
pub fn adf_test(series: &[f64], max_lag: Option<usize>) -> Result<UnitRootTest> {
    let n = series.len();
    let cap = (n / 2) as i64 - 2;
    if n < ADF_MIN_OBSERVATIONS || cap < 0 {
        return Err(MathError::InsufficientData {
            needed: ADF_MIN_OBSERVATIONS,
            got: n,
        });
    }

    let default_lag = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    let max_lag = max_lag.unwrap_or(default_lag).min(cap as usize);

    let diff: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // Every candidate is fitted on the sample trimmed for `max_lag`
    let mut best: Option<(usize, f64)> = None;
    for lag in 0..=max_lag {
        let (y, x) = adf_design(series, &diff, max_lag, lag);
        let aic = match ols(&y, &x) {
            Ok(fit) => fit.aic(),
            Err(MathError::CalculationError(_)) => continue,
            Err(e) => return Err(e),
        };
        if best.map_or(true, |(_, b)| aic < b) {
            best = Some((lag, aic));
        }
    }
    let lag = best.map(|(lag, _)| lag).unwrap_or(0);

    let (y, x) = adf_design(series, &diff, lag, lag);
    let nobs = y.len();
    let statistic = match ols(&y, &x) {
        // Level coefficient sits in column 1, after the constant
        Ok(fit) => fit.t_value(1),
        Err(MathError::CalculationError(_)) => f64::NAN,
        Err(e) => return Err(e),
    };

    Ok(UnitRootTest {
        statistic,
        p_value: mackinnon_p_value(statistic),
        lags: lag,
        nobs,
    })
}

/// ADF regression of `diff[t]` on `[1, series[t], diff[t-1], ..., diff[t-lag]]`
/// for `t` in `trim..diff.len()`.
fn adf_design(series: &[f64], diff: &[f64], trim: usize, lag: usize) -> (Vec<f64>, Vec<Vec<f64>>) {
    let y = diff[trim..].to_vec();
    let x = (trim..diff.len())
        .map(|t| {
            let mut row = Vec::with_capacity(lag + 2);
            row.push(1.0);
            row.push(series[t]);
            row.extend((1..=lag).map(|i| diff[t - i]));
            row
        })
        .collect();
    (y, x)
}

/// MacKinnon approximate p-value for the ADF statistic (constant, no trend).
///
/// Non-finite statistics map to a p-value of 1, i.e. the unit root is never
/// rejected on a degenerate regression.
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic.is_nan() {
        return 1.0;
    }
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }

    let z = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };
    normal_cdf(z)
}

/// MacKinnon (2010) ADF critical value at `level` (0.01, 0.05 or 0.10).
pub fn adf_critical_value(level: f64, nobs: usize) -> Option<f64> {
    TAU_CRIT
        .iter()
        .find(|(l, _)| (l - level).abs() < 1e-9)
        .map(|(_, b)| {
            let n = nobs as f64;
            b[0] + b[1] / n + b[2] / n.powi(2) + b[3] / n.powi(3)
        })
}

/// KPSS test for level stationarity.
///
/// With `lags = None` the Newey-West bandwidth is chosen by the Hobijn,
/// Franses and Ooms (2004) automatic procedure. The p-value is interpolated
/// in the published table and therefore clipped to `[0.01, 0.10]`.
pub fn kpss_test(series: &[f64], lags: Option<usize>) -> Result<UnitRootTest> {
    let n = series.len();
    if n < 2 {
        return Err(MathError::InsufficientData { needed: 2, got: n });
    }

    let mean = series.iter().sum::<f64>() / n as f64;
    let resids: Vec<f64> = series.iter().map(|v| v - mean).collect();

    let lags = lags
        .unwrap_or_else(|| kpss_auto_lag(&resids))
        .min(n - 1);

    let mut partial = 0.0;
    let eta = resids
        .iter()
        .map(|r| {
            partial += r;
            partial * partial
        })
        .sum::<f64>()
        / (n * n) as f64;

    let mut s_hat = resids.iter().map(|r| r * r).sum::<f64>();
    for i in 1..=lags {
        let weight = 1.0 - i as f64 / (lags as f64 + 1.0);
        s_hat += 2.0 * weight * lagged_product(&resids, i);
    }
    s_hat /= n as f64;

    // A constant series has no variation left to explain
    let statistic = if s_hat > 0.0 { eta / s_hat } else { 0.0 };

    Ok(UnitRootTest {
        statistic,
        p_value: kpss_p_value(statistic),
        lags,
        nobs: n,
    })
}

fn kpss_auto_lag(resids: &[f64]) -> usize {
    let n = resids.len();
    let cov_lags = (n as f64).powf(2.0 / 9.0) as usize;

    let mut s0 = resids.iter().map(|r| r * r).sum::<f64>() / n as f64;
    let mut s1 = 0.0;
    for i in 1..=cov_lags.min(n - 1) {
        let product = lagged_product(resids, i) / (n as f64 / 2.0);
        s0 += product;
        s1 += i as f64 * product;
    }
    if s0 == 0.0 {
        return 0;
    }

    let s_hat = s1 / s0;
    let gamma_hat = 1.1447 * (s_hat * s_hat).powf(1.0 / 3.0);
    (gamma_hat * (n as f64).powf(1.0 / 3.0)) as usize
}

fn kpss_p_value(statistic: f64) -> f64 {
    if statistic <= KPSS_CRIT[0] {
        return KPSS_P[0];
    }
    if statistic >= KPSS_CRIT[3] {
        return KPSS_P[3];
    }
    for i in 0..3 {
        let (c0, c1) = (KPSS_CRIT[i], KPSS_CRIT[i + 1]);
        if statistic <= c1 {
            let w = (statistic - c0) / (c1 - c0);
            return KPSS_P[i] + w * (KPSS_P[i + 1] - KPSS_P[i]);
        }
    }
    KPSS_P[3]
}

fn lagged_product(values: &[f64], lag: usize) -> f64 {
    values[lag..]
        .iter()
        .zip(values)
        .map(|(a, b)| a * b)
        .sum()
}

/// Evaluate `c[0] + c[1] x + c[2] x^2 + ...`
fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Standard normal cumulative distribution function
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn noise(n: usize) -> Vec<f64> {
        // Deterministic pseudo-random sequence with zero drift
        let mut state: u64 = 42;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5
            })
            .collect()
    }

    fn random_walk(n: usize) -> Vec<f64> {
        noise(n)
            .into_iter()
            .scan(10.0, |level, step| {
                *level += step + 0.05;
                Some(*level)
            })
            .collect()
    }

    #[test]
    fn test_adf_rejects_unit_root_for_noise() {
        let result = adf_test(&noise(300), None).unwrap();
        assert!(result.statistic < -2.86);
        assert!(result.p_value < 0.05);
    }

    #[test]
    fn test_adf_keeps_unit_root_for_random_walk() {
        let result = adf_test(&random_walk(300), None).unwrap();
        assert!(result.p_value > 0.05);
    }

    #[test]
    fn test_adf_short_series() {
        assert!(matches!(
            adf_test(&[1.0, 2.0, 3.0], None),
            Err(MathError::InsufficientData { .. })
        ));
        assert!(adf_test(&[1.0, 2.5, 1.5, 3.0], None).is_ok());
    }

    #[test]
    fn test_mackinnon_p_value_monotone() {
        assert_eq!(mackinnon_p_value(-25.0), 0.0);
        assert_eq!(mackinnon_p_value(3.0), 1.0);
        assert_eq!(mackinnon_p_value(f64::NAN), 1.0);
        let p1 = mackinnon_p_value(-3.5);
        let p2 = mackinnon_p_value(-2.0);
        let p3 = mackinnon_p_value(0.5);
        assert!(p1 < p2 && p2 < p3);
        // 5% critical value for large samples
        assert_relative_eq!(mackinnon_p_value(-2.8615), 0.05, epsilon = 0.01);
    }

    #[test]
    fn test_adf_critical_values_ordered() {
        let c1 = adf_critical_value(0.01, 200).unwrap();
        let c5 = adf_critical_value(0.05, 200).unwrap();
        let c10 = adf_critical_value(0.10, 200).unwrap();
        assert!(c1 < c5 && c5 < c10);
        assert!(adf_critical_value(0.2, 200).is_none());
    }

    #[test]
    fn test_kpss_stationary_noise() {
        let result = kpss_test(&noise(300), None).unwrap();
        assert!(result.p_value > 0.05);
    }

    #[test]
    fn test_kpss_rejects_trend() {
        let series: Vec<f64> = (0..300).map(|i| i as f64 * 0.5).collect();
        let result = kpss_test(&series, None).unwrap();
        assert_eq!(result.p_value, 0.01);
    }

    #[test]
    fn test_kpss_p_value_interpolation() {
        assert_eq!(kpss_p_value(0.1), 0.10);
        assert_eq!(kpss_p_value(0.463), 0.05);
        assert_eq!(kpss_p_value(2.0), 0.01);
        let mid = kpss_p_value(0.405);
        assert!(mid < 0.10 && mid > 0.05);
    }

    #[test]
    fn test_kpss_constant_series() {
        let result = kpss_test(&[1.5; 20], None).unwrap();
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 0.10);
    }
}
