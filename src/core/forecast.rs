//! Forecast result structure for holding predictions.

use crate::error::{AnalysisError, Result};
use serde::Serialize;

/// A univariate forecast with optional prediction interval bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Forecast {
    point: Vec<f64>,
    lower: Option<Vec<f64>>,
    upper: Option<Vec<f64>>,
}

impl Forecast {
    /// Create an empty forecast.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a forecast from point predictions.
    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            point: values,
            lower: None,
            upper: None,
        }
    }

    /// Create a forecast with prediction intervals.
    pub fn from_values_with_intervals(
        values: Vec<f64>,
        lower: Vec<f64>,
        upper: Vec<f64>,
    ) -> Result<Self> {
        if lower.len() != values.len() {
            return Err(AnalysisError::DimensionMismatch {
                expected: values.len(),
                got: lower.len(),
            });
        }
        if upper.len() != values.len() {
            return Err(AnalysisError::DimensionMismatch {
                expected: values.len(),
                got: upper.len(),
            });
        }
        Ok(Self {
            point: values,
            lower: Some(lower),
            upper: Some(upper),
        })
    }

    /// Number of forecast steps.
    pub fn horizon(&self) -> usize {
        self.point.len()
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_empty()
    }

    pub fn point(&self) -> &[f64] {
        &self.point
    }

    pub fn lower(&self) -> Option<&[f64]> {
        self.lower.as_deref()
    }

    pub fn upper(&self) -> Option<&[f64]> {
        self.upper.as_deref()
    }

    pub fn has_intervals(&self) -> bool {
        self.lower.is_some() && self.upper.is_some()
    }

    /// Add component forecasts element-wise.
    ///
    /// Interval bounds of any component are carried over and shifted by the
    /// point forecasts of every other component. When several components
    /// carry intervals their half-widths are added.
    pub fn sum(components: &[&Forecast]) -> Result<Forecast> {
        let first = components.first().ok_or(AnalysisError::EmptyData)?;
        let h = first.horizon();

        for c in components {
            if c.horizon() != h {
                return Err(AnalysisError::DimensionMismatch {
                    expected: h,
                    got: c.horizon(),
                });
            }
        }

        let mut point = vec![0.0; h];
        for c in components {
            for (acc, v) in point.iter_mut().zip(c.point.iter()) {
                *acc += v;
            }
        }

        if !components.iter().any(|c| c.has_intervals()) {
            return Ok(Forecast::from_values(point));
        }

        let mut below = vec![0.0; h];
        let mut above = vec![0.0; h];
        for c in components.iter().filter(|c| c.has_intervals()) {
            if let (Some(lo), Some(hi)) = (c.lower(), c.upper()) {
                for i in 0..h {
                    below[i] += c.point[i] - lo[i];
                    above[i] += hi[i] - c.point[i];
                }
            }
        }

        let lower = point.iter().zip(below.iter()).map(|(p, b)| p - b).collect();
        let upper = point.iter().zip(above.iter()).map(|(p, a)| p + a).collect();

        Forecast::from_values_with_intervals(point, lower, upper)
    }
}
