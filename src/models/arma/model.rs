//! ARMA / ARIMA model estimated by conditional sum of squares.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Forecast;
use crate::error::{AnalysisError, Result};
use crate::models::arma::diff::{difference, integrate};
use crate::models::arma::transform::{constrain_ar, constrain_ma};
use crate::models::Forecaster;
use crate::utils::optimization::{nelder_mead, NelderMeadConfig};
use crate::utils::stats::{mean, quantile_normal, variance};
use crate::validation::pacf;

const MAX_RESTARTS: usize = 2;
const PACF_INIT_LIMIT: f64 = 0.9;

/// Model order (p, d, q).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArmaOrder {
    /// AR order.
    pub p: usize,
    /// Differencing order.
    pub d: usize,
    /// MA order.
    pub q: usize,
}

impl ArmaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Order without differencing.
    pub fn arma(p: usize, q: usize) -> Self {
        Self::new(p, 0, q)
    }

    /// Number of AR and MA coefficients.
    pub fn num_coefficients(&self) -> usize {
        self.p + self.q
    }

    /// Observations needed to fit this order.
    pub fn min_observations(&self) -> usize {
        self.d + self.p.max(self.q) + 3
    }
}

impl fmt::Display for ArmaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

/// ARIMA(p, d, q) model.
///
/// The d-times differenced series `w_t` follows
///
/// ```text
/// w_t - mu = sum_i phi_i (w_{t-i} - mu) + e_t + sum_j theta_j e_{t-j}
/// ```
///
/// Parameters minimise the conditional sum of squares, conditioning on the
/// first `p` differenced values and zero pre-sample shocks. The optimiser
/// works on partial autocorrelations, so every fitted model is stationary
/// and invertible.
#[derive(Debug, Clone)]
pub struct Arma {
    order: ArmaOrder,
    include_mean: bool,
    max_iter: usize,
    ar: Vec<f64>,
    ma: Vec<f64>,
    mean: f64,
    sigma2: Option<f64>,
    log_likelihood: Option<f64>,
    aic: Option<f64>,
    bic: Option<f64>,
    converged: bool,
    original: Option<Vec<f64>>,
    differenced: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl Arma {
    /// Create an unfitted model. A mean term is included when `d = 0`.
    pub fn new(order: ArmaOrder) -> Self {
        Self {
            order,
            include_mean: order.d == 0,
            max_iter: 2000,
            ar: vec![],
            ma: vec![],
            mean: 0.0,
            sigma2: None,
            log_likelihood: None,
            aic: None,
            bic: None,
            converged: false,
            original: None,
            differenced: None,
            fitted: None,
            residuals: None,
        }
    }

    /// Include or drop the mean of the differenced series.
    pub fn with_mean(mut self, include: bool) -> Self {
        self.include_mean = include;
        self
    }

    /// Iteration cap for each optimiser run.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn order(&self) -> ArmaOrder {
        self.order
    }

    pub fn includes_mean(&self) -> bool {
        self.include_mean
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    /// Mean of the differenced series (0 when no mean term is fitted).
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Innovation variance, CSS / n_eff.
    pub fn sigma2(&self) -> Option<f64> {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> Option<f64> {
        self.log_likelihood
    }

    pub fn aic(&self) -> Option<f64> {
        self.aic
    }

    pub fn bic(&self) -> Option<f64> {
        self.bic
    }

    /// Whether the final optimiser run met its tolerance.
    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Estimated parameters: coefficients, optional mean and sigma^2.
    pub fn num_params(&self) -> usize {
        self.order.num_coefficients() + usize::from(self.include_mean) + 1
    }

    fn unpack(&self, params: &[f64]) -> (f64, Vec<f64>, Vec<f64>) {
        let offset = usize::from(self.include_mean);
        let mu = if self.include_mean { params[0] } else { 0.0 };
        let ar = constrain_ar(&params[offset..offset + self.order.p]);
        let ma = constrain_ma(&params[offset + self.order.p..]);
        (mu, ar, ma)
    }

    fn initial_params(&self, z: &[f64]) -> Vec<f64> {
        let mut initial = Vec::with_capacity(self.order.num_coefficients() + 1);
        if self.include_mean {
            initial.push(0.0);
        }
        if self.order.p > 0 {
            let partial = pacf(z, self.order.p);
            initial.extend(
                partial
                    .iter()
                    .skip(1)
                    .map(|r| r.clamp(-PACF_INIT_LIMIT, PACF_INIT_LIMIT).atanh()),
            );
        }
        initial.extend(std::iter::repeat(0.0).take(self.order.q));
        initial
    }

    fn estimate(&mut self, w: &[f64]) -> Result<()> {
        let p = self.order.p;
        let n_eff = w.len() - p;

        let center = mean(w);
        let scale = variance(w).sqrt();
        if !(scale > 1e-12 * center.abs().max(1.0)) {
            return Err(AnalysisError::ComputationError(format!(
                "series is constant after differencing, cannot fit ARIMA{}",
                self.order
            )));
        }

        // Optimise on the standardised series; coefficients are scale free.
        let z: Vec<f64> = w.iter().map(|v| (v - center) / scale).collect();
        let objective = |params: &[f64]| {
            let (mu, ar, ma) = self.unpack(params);
            sum_of_squares(&css_residuals(&z, mu, &ar, &ma), p) / n_eff as f64
        };

        let config = NelderMeadConfig {
            max_iter: self.max_iter,
            tolerance: 1e-10,
            initial_step: 0.1,
            ..Default::default()
        };

        let (point, value, converged) = if self.include_mean || self.order.num_coefficients() > 0 {
            let mut result = nelder_mead(objective, &self.initial_params(&z), None, config.clone());
            for _ in 0..MAX_RESTARTS {
                let restart = nelder_mead(objective, &result.optimal_point, None, config.clone());
                let improved = restart.optimal_value < result.optimal_value - 1e-10;
                result = if restart.optimal_value <= result.optimal_value {
                    restart
                } else {
                    result
                };
                if !improved {
                    break;
                }
            }
            (result.optimal_point, result.optimal_value, result.converged)
        } else {
            (vec![], objective(&[]), true)
        };

        if !value.is_finite() {
            return Err(AnalysisError::ComputationError(format!(
                "conditional sum of squares is not finite for ARIMA{}",
                self.order
            )));
        }

        let (mu_z, ar, ma) = self.unpack(&point);
        self.mean = center + scale * mu_z;
        self.ar = ar;
        self.ma = ma;
        self.converged = converged;

        let residuals = css_residuals(w, self.mean, &self.ar, &self.ma);
        let sigma2 = sum_of_squares(&residuals, p) / n_eff as f64;
        if !(sigma2 > 0.0) || !sigma2.is_finite() {
            return Err(AnalysisError::ComputationError(format!(
                "degenerate innovation variance for ARIMA{}",
                self.order
            )));
        }

        let n = n_eff as f64;
        let k = self.num_params() as f64;
        let ll = -0.5 * n * ((2.0 * std::f64::consts::PI * sigma2).ln() + 1.0);
        self.sigma2 = Some(sigma2);
        self.log_likelihood = Some(ll);
        self.aic = Some(-2.0 * ll + 2.0 * k);
        self.bic = Some(-2.0 * ll + k * n.ln());
        self.residuals = Some(residuals[p..].to_vec());
        Ok(())
    }

    /// Psi weights of the full ARIMA process, `psi_0 = 1`.
    fn psi_weights(&self, horizon: usize) -> Vec<f64> {
        let phi = integrated_ar(&self.ar, self.order.d);
        let mut psi = vec![0.0; horizon];
        if horizon == 0 {
            return psi;
        }
        psi[0] = 1.0;
        for j in 1..horizon {
            let mut value = self.ma.get(j - 1).copied().unwrap_or(0.0);
            for (i, &a) in phi.iter().enumerate().take(j) {
                value += a * psi[j - 1 - i];
            }
            psi[j] = value;
        }
        psi
    }
}

impl Forecaster for Arma {
    fn fit(&mut self, values: &[f64]) -> Result<()> {
        if values.is_empty() {
            return Err(AnalysisError::EmptyData);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::MissingValues);
        }
        let needed = self.order.min_observations();
        if values.len() < needed {
            return Err(AnalysisError::InsufficientData {
                needed,
                got: values.len(),
            });
        }

        let w = difference(values, self.order.d);
        self.estimate(&w)?;

        let skip = self.order.d + self.order.p;
        let fitted = values[skip..]
            .iter()
            .zip(self.residuals.iter().flatten())
            .map(|(x, e)| x - e)
            .collect();
        self.fitted = Some(fitted);
        self.original = Some(values.to_vec());
        self.differenced = Some(w);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let original = self.original.as_ref().ok_or(AnalysisError::FitRequired)?;
        let w = self.differenced.as_ref().ok_or(AnalysisError::FitRequired)?;
        let shocks = self.residuals.as_ref().ok_or(AnalysisError::FitRequired)?;

        if horizon == 0 {
            return Ok(Forecast::new());
        }

        let mut history: Vec<f64> = w.clone();
        // Shocks aligned with `history`; pre-sample and future shocks are zero.
        let mut errors: Vec<f64> = vec![0.0; self.order.p];
        errors.extend_from_slice(shocks);

        for _ in 0..horizon {
            let t = history.len();
            let mut pred = self.mean;
            for (i, phi) in self.ar.iter().enumerate() {
                pred += phi * (history[t - 1 - i] - self.mean);
            }
            for (j, theta) in self.ma.iter().enumerate() {
                if t > j {
                    pred += theta * errors[t - 1 - j];
                }
            }
            history.push(pred);
            errors.push(0.0);
        }

        let point = integrate(&history[w.len()..], original, self.order.d);
        Ok(Forecast::from_values(point))
    }

    fn predict_with_intervals(&self, horizon: usize, level: f64) -> Result<Forecast> {
        if !(level > 0.0 && level < 1.0) {
            return Err(AnalysisError::InvalidParameter(format!(
                "interval level must be in (0, 1), got {level}"
            )));
        }
        let forecast = self.predict(horizon)?;
        let sigma2 = self.sigma2.ok_or(AnalysisError::FitRequired)?;
        if horizon == 0 {
            return Ok(forecast);
        }

        let z = quantile_normal((1.0 + level) / 2.0);
        let psi = self.psi_weights(horizon);
        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (point, weight) in forecast.point().iter().zip(psi.iter()) {
            cumulative += weight * weight;
            let half_width = z * (sigma2 * cumulative).sqrt();
            lower.push(point - half_width);
            upper.push(point + half_width);
        }

        Forecast::from_values_with_intervals(forecast.point().to_vec(), lower, upper)
    }

    /// Fitted values on the input scale, aligned with `values[d + p..]`.
    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> String {
        let ArmaOrder { p, d, q } = self.order;
        if d == 0 {
            format!("ARMA({p},{q})")
        } else {
            format!("ARIMA({p},{d},{q})")
        }
    }
}

/// CSS residuals for the whole series; the first `ar.len()` entries are 0.
fn css_residuals(w: &[f64], mu: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut e = vec![0.0; w.len()];
    for t in p..w.len() {
        let mut pred = mu;
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * (w[t - 1 - i] - mu);
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                pred += theta * e[t - 1 - j];
            }
        }
        e[t] = w[t] - pred;
    }
    e
}

fn sum_of_squares(residuals: &[f64], skip: usize) -> f64 {
    residuals.iter().skip(skip).map(|e| e * e).sum()
}

/// Coefficients `a` with `1 - sum a_i B^i = phi(B) (1 - B)^d`.
fn integrated_ar(ar: &[f64], d: usize) -> Vec<f64> {
    let mut poly: Vec<f64> = std::iter::once(1.0).chain(ar.iter().map(|a| -a)).collect();
    for _ in 0..d {
        let mut next = vec![0.0; poly.len() + 1];
        for (i, c) in poly.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c;
        }
        poly = next;
    }
    poly.iter().skip(1).map(|c| -c).collect()
}
