//! Ordinary least squares
//!
//! Small dense regressions only (unit-root test regressions, initial
//! regression coefficients). Solved through the normal equations with a
//! Gauss-Jordan inverse, which also yields the coefficient covariance.

use crate::{MathError, Result};

/// Fitted least squares regression
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Estimated coefficients, one per regressor column
    pub coefficients: Vec<f64>,
    /// Standard errors of the coefficients
    pub std_errors: Vec<f64>,
    /// Sum of squared residuals
    pub ssr: f64,
    /// Number of observations
    pub nobs: usize,
}

impl OlsFit {
    /// t statistic of the coefficient at `index`
    pub fn t_value(&self, index: usize) -> f64 {
        self.coefficients[index] / self.std_errors[index]
    }

    /// Gaussian log-likelihood of the regression
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -0.5 * n * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    /// Akaike information criterion, counting every regressor column
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.coefficients.len() as f64
    }
}

/// Regress `y` on the rows of `x`.
///
/// Every row of `x` must have the same number of columns. An intercept is
/// only included if the caller adds a column of ones.
pub fn ols(y: &[f64], x: &[Vec<f64>]) -> Result<OlsFit> {
    let n = y.len();
    if n != x.len() {
        return Err(MathError::InvalidInput(format!(
            "Response has {} observations but design has {} rows",
            n,
            x.len()
        )));
    }

    let k = x.first().map(|row| row.len()).unwrap_or(0);
    if k == 0 {
        return Err(MathError::InvalidInput(
            "Design matrix has no columns".to_string(),
        ));
    }
    if n <= k {
        return Err(MathError::InsufficientData {
            needed: k + 1,
            got: n,
        });
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &target) in x.iter().zip(y) {
        if row.len() != k {
            return Err(MathError::InvalidInput(
                "Design matrix rows have different lengths".to_string(),
            ));
        }
        for i in 0..k {
            xty[i] += row[i] * target;
            for j in 0..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }

    let xtx_inv = invert(&xtx)?;
    let coefficients: Vec<f64> = (0..k)
        .map(|i| (0..k).map(|j| xtx_inv[i][j] * xty[j]).sum())
        .collect();

    let ssr: f64 = x
        .iter()
        .zip(y)
        .map(|(row, &target)| {
            let fitted: f64 = row.iter().zip(&coefficients).map(|(a, b)| a * b).sum();
            (target - fitted).powi(2)
        })
        .sum();

    let sigma2 = ssr / (n - k) as f64;
    let std_errors = (0..k).map(|i| (sigma2 * xtx_inv[i][i]).sqrt()).collect();

    Ok(OlsFit {
        coefficients,
        std_errors,
        ssr,
        nobs: n,
    })
}

/// Invert a square matrix with Gauss-Jordan elimination and partial pivoting.
pub fn invert(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    let n = matrix.len();
    let scale = matrix
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(1.0);

    let mut a: Vec<Vec<f64>> = matrix.to_vec();
    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&r1, &r2| {
                a[r1][col]
                    .abs()
                    .partial_cmp(&a[r2][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);

        if a[pivot][col].abs() < 1e-12 * scale {
            return Err(MathError::CalculationError(
                "Matrix is singular".to_string(),
            ));
        }

        a.swap(col, pivot);
        inv.swap(col, pivot);

        let diag = a[col][col];
        for j in 0..n {
            a[col][j] /= diag;
            inv[col][j] /= diag;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }

    Ok(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ols_recovers_line() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![1.0, i as f64]).collect();
        let y: Vec<f64> = (0..10)
            .map(|i| 2.0 + 0.5 * i as f64 + if i % 2 == 0 { 0.01 } else { -0.01 })
            .collect();

        let fit = ols(&y, &x).unwrap();
        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 0.05);
        assert_relative_eq!(fit.coefficients[1], 0.5, epsilon = 0.01);
        assert!(fit.std_errors.iter().all(|s| *s > 0.0));
        assert!(fit.t_value(1) > 10.0);
    }

    #[test]
    fn test_ols_rejects_collinear_design() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, 2.0 * i as f64]).collect();
        let y: Vec<f64> = (0..6).map(|i| i as f64).collect();
        assert!(matches!(ols(&y, &x), Err(MathError::CalculationError(_))));
    }

    #[test]
    fn test_ols_needs_more_rows_than_columns() {
        let x = vec![vec![1.0, 2.0], vec![1.0, 3.0]];
        let y = vec![1.0, 2.0];
        assert!(matches!(ols(&y, &x), Err(MathError::InsufficientData { .. })));
    }

    #[test]
    fn test_invert_identity_product() {
        let m = vec![vec![4.0, 7.0], vec![2.0, 6.0]];
        let inv = invert(&m).unwrap();
        assert_relative_eq!(inv[0][0], 0.6, epsilon = 1e-12);
        assert_relative_eq!(inv[0][1], -0.7, epsilon = 1e-12);
        assert_relative_eq!(inv[1][0], -0.2, epsilon = 1e-12);
        assert_relative_eq!(inv[1][1], 0.4, epsilon = 1e-12);
    }
}
