//! Seasonal ARIMA with exogenous regressors (SARIMAX)
//!
//! The model is a regression with seasonal ARIMA errors:
//!
//! ```text
//! y_t = x_t' beta + u_t
//! phi(B) Phi(B^s) (1 - B)^d (1 - B^s)^D u_t = theta(B) Theta(B^s) e_t
//! ```
//!
//! Parameters are estimated by conditional sum of squares on the
//! differenced data, minimised with the simplex method. Forecast intervals
//! come from the psi-weights of the integrated model.

use crate::ols::ols;
use crate::optimizer::{minimize, SimplexOptions};
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erf_inv;

/// Non-seasonal order `(p, d, q)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

/// Seasonal order `(P, D, Q, s)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeasonalOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
    pub period: usize,
}

impl SeasonalOrder {
    pub fn new(p: usize, d: usize, q: usize, period: usize) -> Self {
        Self { p, d, q, period }
    }

    /// No seasonal component
    pub fn none() -> Self {
        Self::new(0, 0, 0, 0)
    }

    fn is_active(&self) -> bool {
        self.period > 1
    }
}

/// Full SARIMAX specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SarimaxSpec {
    pub order: ArimaOrder,
    pub seasonal: SeasonalOrder,
}

impl SarimaxSpec {
    pub fn new(order: ArimaOrder, seasonal: SeasonalOrder) -> Self {
        Self { order, seasonal }
    }

    /// Number of ARMA coefficients (regression coefficients excluded)
    pub fn arma_params(&self) -> usize {
        let seasonal = if self.seasonal.is_active() {
            self.seasonal.p + self.seasonal.q
        } else {
            0
        };
        self.order.p + self.order.q + seasonal
    }

    /// `phi(B) Phi(B^s)` with the leading 1
    fn ar_polynomial(&self, ar: &[f64], seasonal_ar: &[f64]) -> Vec<f64> {
        let regular = lag_polynomial(ar, 1, -1.0);
        if !self.seasonal.is_active() {
            return regular;
        }
        poly_mul(&regular, &lag_polynomial(seasonal_ar, self.seasonal.period, -1.0))
    }

    /// `theta(B) Theta(B^s)` with the leading 1
    fn ma_polynomial(&self, ma: &[f64], seasonal_ma: &[f64]) -> Vec<f64> {
        let regular = lag_polynomial(ma, 1, 1.0);
        if !self.seasonal.is_active() {
            return regular;
        }
        poly_mul(&regular, &lag_polynomial(seasonal_ma, self.seasonal.period, 1.0))
    }

    /// `(1 - B)^d (1 - B^s)^D`
    fn integration_polynomial(&self) -> Vec<f64> {
        let mut poly = vec![1.0];
        for _ in 0..self.order.d {
            poly = poly_mul(&poly, &[1.0, -1.0]);
        }
        if self.seasonal.is_active() {
            let mut seasonal = vec![0.0; self.seasonal.period + 1];
            seasonal[0] = 1.0;
            seasonal[self.seasonal.period] = -1.0;
            for _ in 0..self.seasonal.d {
                poly = poly_mul(&poly, &seasonal);
            }
        }
        poly
    }
}

impl std::fmt::Display for SarimaxSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SARIMAX({},{},{})({},{},{},{})",
            self.order.p,
            self.order.d,
            self.order.q,
            self.seasonal.p,
            self.seasonal.d,
            self.seasonal.q,
            self.seasonal.period
        )
    }
}

/// SARIMAX estimator
#[derive(Debug, Clone)]
pub struct Sarimax {
    spec: SarimaxSpec,
    options: SimplexOptions,
}

/// Fitted SARIMAX model.
///
/// Carries the observed history so that forecasts continue from the last
/// observation; [`SarimaxFit::extend`] appends new observations without
/// re-estimating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SarimaxFit {
    pub spec: SarimaxSpec,
    pub ar: Vec<f64>,
    pub seasonal_ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub seasonal_ma: Vec<f64>,
    /// Regression coefficients, one per exogenous column
    pub beta: Vec<f64>,
    /// Innovation variance
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    /// Observations contributing to the conditional sum of squares
    pub nobs: usize,
    pub converged: bool,
    pub iterations: usize,
    endog: Vec<f64>,
    exog: Vec<Vec<f64>>,
}

/// Forecast on the scale of the fitted series
#[derive(Debug, Clone, PartialEq)]
pub struct SarimaxForecast {
    pub mean: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub std_errors: Vec<f64>,
}

/// Unpacked parameter vector
struct Params<'a> {
    ar: &'a [f64],
    seasonal_ar: &'a [f64],
    ma: &'a [f64],
    seasonal_ma: &'a [f64],
    beta: &'a [f64],
}

impl Sarimax {
    pub fn new(spec: SarimaxSpec) -> Self {
        Self {
            spec,
            options: SimplexOptions {
                max_iterations: 2000,
                tolerance: 1e-10,
                initial_step: 0.5,
            },
        }
    }

    /// Cap the optimiser iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.options.max_iterations = max_iterations;
        self
    }

    pub fn spec(&self) -> SarimaxSpec {
        self.spec
    }

    /// Minimum number of observations needed by [`Sarimax::fit`] with `k_exog` regressors
    pub fn min_observations(&self, k_exog: usize) -> usize {
        let integration = self.spec.integration_polynomial().len() - 1;
        let ar_lag = self.spec.order.p + self.seasonal_p() * self.spec.seasonal.period;
        integration + ar_lag + self.spec.arma_params() + k_exog + 2
    }

    fn seasonal_p(&self) -> usize {
        if self.spec.seasonal.is_active() {
            self.spec.seasonal.p
        } else {
            0
        }
    }

    fn seasonal_q(&self) -> usize {
        if self.spec.seasonal.is_active() {
            self.spec.seasonal.q
        } else {
            0
        }
    }

    /// Estimate the model on `endog`, with one exogenous row per observation.
    pub fn fit(&self, endog: &[f64], exog: Option<&[Vec<f64>]>) -> Result<SarimaxFit> {
        let exog = exog.map(|rows| rows.to_vec()).unwrap_or_default();
        let k_exog = check_exog(&exog, endog.len())?;

        let needed = self.min_observations(k_exog);
        if endog.len() < needed {
            return Err(MathError::InsufficientData {
                needed,
                got: endog.len(),
            });
        }
        if endog.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Series contains non-finite values".to_string(),
            ));
        }

        let delta = self.spec.integration_polynomial();
        let w = apply_polynomial(&delta, endog);
        let xw: Vec<Vec<f64>> = difference_rows(&delta, &exog);

        // Regressors that vanish after differencing cannot be identified
        let active: Vec<bool> = (0..k_exog)
            .map(|j| xw.iter().map(|row| row[j] * row[j]).sum::<f64>() > 1e-12)
            .collect();
        let active_cols: Vec<usize> = (0..k_exog).filter(|&j| active[j]).collect();

        let beta_init = initial_beta(&w, &xw, &active_cols);

        let (p, sp, q, sq) = (
            self.spec.order.p,
            self.seasonal_p(),
            self.spec.order.q,
            self.seasonal_q(),
        );
        let n_arma = p + sp + q + sq;

        let mut initial = Vec::with_capacity(n_arma + active_cols.len());
        initial.extend(std::iter::repeat(0.1).take(n_arma));
        initial.extend(active_cols.iter().map(|&j| beta_init[j]));

        let mut bounds = vec![(-0.99, 0.99); n_arma];
        bounds.extend(std::iter::repeat((f64::NEG_INFINITY, f64::INFINITY)).take(active_cols.len()));

        let expand_beta = |packed: &[f64]| {
            let mut beta = vec![0.0; k_exog];
            for (value, &j) in packed.iter().zip(&active_cols) {
                beta[j] = *value;
            }
            beta
        };

        let outcome = minimize(
            |theta| {
                let beta = expand_beta(&theta[n_arma..]);
                let params = Params {
                    ar: &theta[..p],
                    seasonal_ar: &theta[p..p + sp],
                    ma: &theta[p + sp..p + sp + q],
                    seasonal_ma: &theta[p + sp + q..n_arma],
                    beta: &beta,
                };
                let (css, _) = self.css(&w, &xw, &params);
                css
            },
            &initial,
            &bounds,
            &self.options,
        );

        let theta = outcome.point;
        let beta = expand_beta(&theta[n_arma..]);
        let params = Params {
            ar: &theta[..p],
            seasonal_ar: &theta[p..p + sp],
            ma: &theta[p + sp..p + sp + q],
            seasonal_ma: &theta[p + sp + q..n_arma],
            beta: &beta,
        };
        let (css, nobs) = self.css(&w, &xw, &params);
        if nobs == 0 || !css.is_finite() {
            return Err(MathError::CalculationError(
                "Conditional sum of squares is undefined for this sample".to_string(),
            ));
        }

        let sigma2 = (css / nobs as f64).max(f64::MIN_POSITIVE);
        let n = nobs as f64;
        let log_likelihood = -0.5 * n * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        let k = (n_arma + active_cols.len() + 1) as f64;

        Ok(SarimaxFit {
            spec: self.spec,
            ar: params.ar.to_vec(),
            seasonal_ar: params.seasonal_ar.to_vec(),
            ma: params.ma.to_vec(),
            seasonal_ma: params.seasonal_ma.to_vec(),
            beta,
            sigma2,
            log_likelihood,
            aic: -2.0 * log_likelihood + 2.0 * k,
            bic: -2.0 * log_likelihood + k * n.ln(),
            nobs,
            converged: outcome.converged,
            iterations: outcome.iterations,
            endog: endog.to_vec(),
            exog,
        })
    }

    /// Conditional sum of squares and the number of terms in it
    fn css(&self, w: &[f64], xw: &[Vec<f64>], params: &Params<'_>) -> (f64, usize) {
        let residuals = arma_residuals(&self.spec, w, xw, params);
        let start = self.spec.ar_polynomial(params.ar, params.seasonal_ar).len() - 1;
        if residuals.len() <= start {
            return (f64::INFINITY, 0);
        }
        let css = residuals[start..].iter().map(|e| e * e).sum();
        (css, residuals.len() - start)
    }
}

impl SarimaxFit {
    /// Number of exogenous regressors the model was fitted with
    pub fn k_exog(&self) -> usize {
        self.beta.len()
    }

    /// Observed series the model currently conditions on
    pub fn endog(&self) -> &[f64] {
        &self.endog
    }

    /// Append observations (and their regressors) without re-estimating.
    pub fn extend(&self, endog: &[f64], exog: Option<&[Vec<f64>]>) -> Result<SarimaxFit> {
        let exog = exog.map(|rows| rows.to_vec()).unwrap_or_default();
        let k = check_exog(&exog, endog.len())?;
        if !endog.is_empty() && k != self.k_exog() {
            return Err(MathError::InvalidInput(format!(
                "Model has {} regressors, got {}",
                self.k_exog(),
                k
            )));
        }

        let mut extended = self.clone();
        extended.endog.extend_from_slice(endog);
        extended.exog.extend(exog);
        Ok(extended)
    }

    /// Forecast `steps` periods past the last observation.
    ///
    /// `exog` must hold one row per step when the model has regressors.
    /// `confidence` is the two-sided interval coverage, e.g. 0.95.
    pub fn forecast(
        &self,
        steps: usize,
        exog: Option<&[Vec<f64>]>,
        confidence: f64,
    ) -> Result<SarimaxForecast> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(MathError::InvalidInput(
                "Confidence level must be between 0 and 1".to_string(),
            ));
        }

        let future_exog = exog.map(|rows| rows.to_vec()).unwrap_or_default();
        if self.k_exog() > 0 {
            let k = check_exog(&future_exog, steps)?;
            if k != self.k_exog() {
                return Err(MathError::InvalidInput(format!(
                    "Forecast needs {} regressors per step, got {}",
                    self.k_exog(),
                    k
                )));
            }
        }

        let delta = self.spec.integration_polynomial();
        let w = apply_polynomial(&delta, &self.endog);
        let xw = difference_rows(&delta, &self.exog);
        let params = self.params();
        let residuals = arma_residuals(&self.spec, &w, &xw, &params);

        let ar_poly = self.spec.ar_polynomial(&self.ar, &self.seasonal_ar);
        let ma_poly = self.spec.ma_polynomial(&self.ma, &self.seasonal_ma);

        let mut u: Vec<f64> = w
            .iter()
            .zip(regression_part(&xw, &self.beta, w.len()))
            .map(|(wv, reg)| wv - reg)
            .collect();
        let mut e = residuals;
        let mut y = self.endog.clone();
        let mut x_hist = self.exog.clone();

        let mut mean = Vec::with_capacity(steps);
        for step in 0..steps {
            let t = u.len();

            let mut u_hat = 0.0;
            for (i, coef) in ar_poly.iter().enumerate().skip(1) {
                if t >= i {
                    u_hat -= coef * u[t - i];
                }
            }
            for (j, coef) in ma_poly.iter().enumerate().skip(1) {
                if t >= j {
                    u_hat += coef * e[t - j];
                }
            }
            u.push(u_hat);
            e.push(0.0);

            let reg = if self.k_exog() > 0 {
                x_hist.push(future_exog[step].clone());
                let row = differenced_row(&delta, &x_hist, x_hist.len() - 1);
                dot(&row, &self.beta)
            } else {
                0.0
            };
            let w_hat = u_hat + reg;

            let ty = y.len();
            let mut y_hat = w_hat;
            for (i, coef) in delta.iter().enumerate().skip(1) {
                y_hat -= coef * y[ty - i];
            }
            y.push(y_hat);
            mean.push(y_hat);
        }

        let psi = psi_weights(&poly_mul(&ar_poly, &delta), &ma_poly, steps);
        let z = std::f64::consts::SQRT_2 * erf_inv(confidence);
        let mut cumulative = 0.0;
        let std_errors: Vec<f64> = psi
            .iter()
            .map(|weight| {
                cumulative += weight * weight;
                (self.sigma2 * cumulative).sqrt()
            })
            .collect();

        let lower = mean.iter().zip(&std_errors).map(|(m, s)| m - z * s).collect();
        let upper = mean.iter().zip(&std_errors).map(|(m, s)| m + z * s).collect();

        Ok(SarimaxForecast {
            mean,
            lower,
            upper,
            std_errors,
        })
    }

    fn params(&self) -> Params<'_> {
        Params {
            ar: &self.ar,
            seasonal_ar: &self.seasonal_ar,
            ma: &self.ma,
            seasonal_ma: &self.seasonal_ma,
            beta: &self.beta,
        }
    }
}

/// One-step residuals of the ARMA error process on the differenced scale.
/// Residuals before the first usable lag are zero.
fn arma_residuals(spec: &SarimaxSpec, w: &[f64], xw: &[Vec<f64>], params: &Params<'_>) -> Vec<f64> {
    let ar_poly = spec.ar_polynomial(params.ar, params.seasonal_ar);
    let ma_poly = spec.ma_polynomial(params.ma, params.seasonal_ma);
    let start = ar_poly.len() - 1;

    let u: Vec<f64> = w
        .iter()
        .zip(regression_part(xw, params.beta, w.len()))
        .map(|(wv, reg)| wv - reg)
        .collect();

    let mut e = vec![0.0; u.len()];
    for t in start..u.len() {
        let mut value = u[t];
        for (i, coef) in ar_poly.iter().enumerate().skip(1) {
            value += coef * u[t - i];
        }
        for (j, coef) in ma_poly.iter().enumerate().skip(1) {
            if t >= j {
                value -= coef * e[t - j];
            }
        }
        e[t] = value;
    }
    e
}

/// `x_t' beta` for every row, zeros when the model has no regressors
fn regression_part(xw: &[Vec<f64>], beta: &[f64], n: usize) -> Vec<f64> {
    if beta.is_empty() {
        return vec![0.0; n];
    }
    xw.iter().map(|row| dot(row, beta)).collect()
}

fn initial_beta(w: &[f64], xw: &[Vec<f64>], active: &[usize]) -> Vec<f64> {
    let k = xw.first().map(|row| row.len()).unwrap_or(0);
    let mut beta = vec![0.0; k];
    if active.is_empty() {
        return beta;
    }

    let design: Vec<Vec<f64>> = xw
        .iter()
        .map(|row| active.iter().map(|&j| row[j]).collect())
        .collect();
    if let Ok(fit) = ols(w, &design) {
        for (value, &j) in fit.coefficients.iter().zip(active) {
            beta[j] = *value;
        }
    }
    beta
}

/// Validate exogenous rows and return the number of columns
fn check_exog(exog: &[Vec<f64>], expected_rows: usize) -> Result<usize> {
    if exog.is_empty() {
        return Ok(0);
    }
    if exog.len() != expected_rows {
        return Err(MathError::InvalidInput(format!(
            "Expected {} exogenous rows, got {}",
            expected_rows,
            exog.len()
        )));
    }
    let k = exog[0].len();
    if exog.iter().any(|row| row.len() != k) {
        return Err(MathError::InvalidInput(
            "Exogenous rows have different lengths".to_string(),
        ));
    }
    if exog.iter().flatten().any(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(
            "Exogenous data contains non-finite values".to_string(),
        ));
    }
    Ok(k)
}

/// `1 + sign * (c_1 B^lag + c_2 B^{2 lag} + ...)`
fn lag_polynomial(coefficients: &[f64], lag: usize, sign: f64) -> Vec<f64> {
    let mut poly = vec![0.0; coefficients.len() * lag + 1];
    poly[0] = 1.0;
    for (i, c) in coefficients.iter().enumerate() {
        poly[(i + 1) * lag] = sign * c;
    }
    poly
}

fn poly_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut result = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            result[i + j] += x * y;
        }
    }
    result
}

/// Filter a series through a lag polynomial, dropping the first `deg` values
fn apply_polynomial(poly: &[f64], series: &[f64]) -> Vec<f64> {
    let deg = poly.len() - 1;
    if series.len() <= deg {
        return Vec::new();
    }
    (deg..series.len())
        .map(|t| poly.iter().enumerate().map(|(i, c)| c * series[t - i]).sum())
        .collect()
}

fn difference_rows(poly: &[f64], rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let deg = poly.len() - 1;
    if rows.len() <= deg {
        return Vec::new();
    }
    (deg..rows.len())
        .map(|t| differenced_row(poly, rows, t))
        .collect()
}

fn differenced_row(poly: &[f64], rows: &[Vec<f64>], t: usize) -> Vec<f64> {
    let k = rows[t].len();
    (0..k)
        .map(|j| poly.iter().enumerate().map(|(i, c)| c * rows[t - i][j]).sum())
        .collect()
}

/// MA(infinity) weights of `ma(B) / ar(B)`, first `steps` of them
fn psi_weights(ar: &[f64], ma: &[f64], steps: usize) -> Vec<f64> {
    let mut psi = Vec::with_capacity(steps);
    for j in 0..steps {
        if j == 0 {
            psi.push(1.0);
            continue;
        }
        let mut value = ma.get(j).copied().unwrap_or(0.0);
        for i in 1..=j.min(ar.len() - 1) {
            value -= ar[i] * psi[j - i];
        }
        psi.push(value);
    }
    psi
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ar1_series(n: usize, phi: f64) -> Vec<f64> {
        let mut state: u64 = 7;
        let mut values = vec![0.0];
        for i in 1..n {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let shock = ((state >> 33) as f64 / (1u64 << 31) as f64) - 0.5;
            values.push(phi * values[i - 1] + shock);
        }
        values
    }

    #[test]
    fn test_integration_polynomial() {
        let spec = SarimaxSpec::new(ArimaOrder::new(0, 1, 0), SeasonalOrder::new(0, 1, 0, 3));
        // (1 - B)(1 - B^3) = 1 - B - B^3 + B^4
        assert_eq!(spec.integration_polynomial(), vec![1.0, -1.0, 0.0, -1.0, 1.0]);
    }

    #[test]
    fn test_fit_recovers_ar_coefficient() {
        let spec = SarimaxSpec::new(ArimaOrder::new(1, 0, 0), SeasonalOrder::none());
        let fit = Sarimax::new(spec).fit(&ar1_series(400, 0.6), None).unwrap();

        assert_relative_eq!(fit.ar[0], 0.6, epsilon = 0.1);
        assert!(fit.sigma2 > 0.0);
        assert!(fit.aic.is_finite() && fit.bic > fit.aic);
    }

    #[test]
    fn test_fit_recovers_regression_coefficient() {
        let noise = ar1_series(200, 0.0);
        let exog: Vec<Vec<f64>> = (0..200).map(|i| vec![(i as f64 * 0.3).sin()]).collect();
        let endog: Vec<f64> = exog
            .iter()
            .zip(&noise)
            .map(|(x, e)| 2.0 * x[0] + 0.1 * e)
            .collect();

        let spec = SarimaxSpec::new(ArimaOrder::new(0, 0, 0), SeasonalOrder::none());
        let fit = Sarimax::new(spec).fit(&endog, Some(&exog)).unwrap();
        assert_relative_eq!(fit.beta[0], 2.0, epsilon = 0.05);
    }

    #[test]
    fn test_random_walk_forecast_is_flat() {
        // Pure integration: forecasts repeat the last value, intervals widen
        let spec = SarimaxSpec::new(ArimaOrder::new(0, 1, 0), SeasonalOrder::none());
        let series = vec![1.0, 1.2, 1.1, 1.3, 1.25, 1.4, 1.35, 1.5];
        let fit = Sarimax::new(spec).fit(&series, None).unwrap();
        let forecast = fit.forecast(3, None, 0.95).unwrap();

        for value in &forecast.mean {
            assert_relative_eq!(*value, 1.5, epsilon = 1e-12);
        }
        assert!(forecast.std_errors[0] < forecast.std_errors[1]);
        assert!(forecast.std_errors[1] < forecast.std_errors[2]);
        for i in 0..3 {
            assert!(forecast.lower[i] < forecast.mean[i] && forecast.mean[i] < forecast.upper[i]);
        }
    }

    #[test]
    fn test_seasonal_model_fits_and_forecasts() {
        let series: Vec<f64> = (0..120)
            .map(|i| 1.5 + 0.001 * i as f64 + 0.02 * ((i % 7) as f64) + 0.001 * ((i * 13 % 5) as f64))
            .collect();
        let exog: Vec<Vec<f64>> = (0..120)
            .map(|i| vec![1.08 + 0.001 * (i % 4) as f64, 80.0 + (i as f64 * 0.2).cos(), if i % 30 == 0 { 1.0 } else { 0.0 }])
            .collect();

        let spec = SarimaxSpec::new(ArimaOrder::new(1, 1, 1), SeasonalOrder::new(0, 1, 1, 7));
        let fit = Sarimax::new(spec).fit(&series[..100], Some(&exog[..100])).unwrap();
        assert_eq!(fit.k_exog(), 3);

        let forecast = fit.forecast(20, Some(&exog[100..]), 0.95).unwrap();
        assert_eq!(forecast.mean.len(), 20);
        assert!(forecast.mean.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_forecast_requires_matching_exog() {
        let exog: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64 % 3.0]).collect();
        let endog: Vec<f64> = (0..60).map(|i| (i as f64 * 0.2).sin() + exog[i][0]).collect();
        let spec = SarimaxSpec::new(ArimaOrder::new(1, 0, 0), SeasonalOrder::none());
        let fit = Sarimax::new(spec).fit(&endog, Some(&exog)).unwrap();

        assert!(fit.forecast(2, None, 0.95).is_err());
        assert!(fit.forecast(2, Some(&exog[..1]), 0.95).is_err());
        assert!(fit.forecast(2, Some(&exog[..2]), 0.95).is_ok());
    }

    #[test]
    fn test_extend_moves_forecast_origin() {
        let spec = SarimaxSpec::new(ArimaOrder::new(0, 1, 0), SeasonalOrder::none());
        let fit = Sarimax::new(spec).fit(&[1.0, 1.1, 1.3, 1.2, 1.4, 1.5], None).unwrap();
        let extended = fit.extend(&[1.7, 1.9], None).unwrap();

        assert_eq!(extended.endog().len(), 8);
        let forecast = extended.forecast(1, None, 0.95).unwrap();
        assert_relative_eq!(forecast.mean[0], 1.9, epsilon = 1e-12);
    }

    #[test]
    fn test_fit_rejects_short_series() {
        let spec = SarimaxSpec::new(ArimaOrder::new(1, 1, 1), SeasonalOrder::new(0, 1, 1, 7));
        assert!(matches!(
            Sarimax::new(spec).fit(&[1.0, 2.0, 3.0], None),
            Err(MathError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_psi_weights_of_random_walk() {
        // 1 / (1 - B) has unit weights
        let psi = psi_weights(&[1.0, -1.0], &[1.0], 4);
        assert_eq!(psi, vec![1.0, 1.0, 1.0, 1.0]);
    }
}
