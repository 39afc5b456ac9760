//! Polynomial trend extrapolation.

use crate::core::Forecast;
use crate::error::{AnalysisError, Result};
use crate::models::Forecaster;
use crate::utils::ols::lstsq;

/// Highest supported polynomial degree.
pub const MAX_DEGREE: usize = 6;

/// Least-squares polynomial in the time index `t = 0..n-1`.
///
/// The fit runs on `s = t / (n - 1)` to keep the normal equations well
/// conditioned; [`coefficients`](Self::coefficients) are reported in the raw
/// `t` scale.
#[derive(Debug, Clone)]
pub struct PolynomialTrend {
    degree: usize,
    /// Coefficients in the scaled time `s`, lowest power first.
    scaled: Option<Vec<f64>>,
    time_scale: f64,
    n: usize,
    r_squared: Option<f64>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl PolynomialTrend {
    pub fn new(degree: usize) -> Self {
        Self {
            degree,
            scaled: None,
            time_scale: 1.0,
            n: 0,
            r_squared: None,
            fitted: None,
            residuals: None,
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Coefficients of `t^0 .. t^degree`.
    pub fn coefficients(&self) -> Option<Vec<f64>> {
        let scaled = self.scaled.as_ref()?;
        Some(
            scaled
                .iter()
                .enumerate()
                .map(|(k, b)| b / self.time_scale.powi(k as i32))
                .collect(),
        )
    }

    /// Share of variance explained by the polynomial.
    pub fn r_squared(&self) -> Option<f64> {
        self.r_squared
    }

    /// Value of the polynomial at time index `t`.
    pub fn evaluate(&self, t: f64) -> Option<f64> {
        let scaled = self.scaled.as_ref()?;
        let s = t / self.time_scale;
        // Horner.
        Some(scaled.iter().rev().fold(0.0, |acc, b| acc * s + b))
    }
}

impl Default for PolynomialTrend {
    fn default() -> Self {
        Self::new(2)
    }
}

impl Forecaster for PolynomialTrend {
    fn fit(&mut self, values: &[f64]) -> Result<()> {
        if self.degree > MAX_DEGREE {
            return Err(AnalysisError::InvalidParameter(format!(
                "polynomial degree {} exceeds {MAX_DEGREE}",
                self.degree
            )));
        }
        if values.is_empty() {
            return Err(AnalysisError::EmptyData);
        }
        if values.len() <= self.degree {
            return Err(AnalysisError::InsufficientData {
                needed: self.degree + 1,
                got: values.len(),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::MissingValues);
        }

        let n = values.len();
        let time_scale = (n - 1).max(1) as f64;
        let design: Vec<Vec<f64>> = (0..n)
            .map(|t| {
                let s = t as f64 / time_scale;
                (0..=self.degree).map(|k| s.powi(k as i32)).collect()
            })
            .collect();
        let fit = lstsq(&design, values)?;

        let center = values.iter().sum::<f64>() / n as f64;
        let tss: f64 = values.iter().map(|v| (v - center).powi(2)).sum();
        self.r_squared = Some(if tss > 0.0 { 1.0 - fit.rss / tss } else { 1.0 });
        self.fitted = Some(values.iter().zip(&fit.residuals).map(|(v, r)| v - r).collect());
        self.residuals = Some(fit.residuals);
        self.scaled = Some(fit.coefficients);
        self.time_scale = time_scale;
        self.n = n;
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        if self.scaled.is_none() {
            return Err(AnalysisError::FitRequired);
        }
        let point = (self.n..self.n + horizon)
            .filter_map(|t| self.evaluate(t as f64))
            .collect();
        Ok(Forecast::from_values(point))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> String {
        format!("Polynomial({})", self.degree)
    }
}
