//! Repetition of the last seasonal cycle.

use crate::core::Forecast;
use crate::error::{AnalysisError, Result};
use crate::models::Forecaster;

/// Forecasts a seasonal component by repeating its last full cycle.
///
/// Step `h` (0-based) takes the value one or more whole periods back, so
/// each forecast keeps the phase of the observation it copies.
#[derive(Debug, Clone)]
pub struct SeasonalCycle {
    period: usize,
    cycle: Option<Vec<f64>>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl SeasonalCycle {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            cycle: None,
            fitted: None,
            residuals: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// The last `period` values of the fitted component.
    pub fn cycle(&self) -> Option<&[f64]> {
        self.cycle.as_deref()
    }
}

impl Default for SeasonalCycle {
    fn default() -> Self {
        Self::new(12)
    }
}

impl Forecaster for SeasonalCycle {
    fn fit(&mut self, values: &[f64]) -> Result<()> {
        if self.period == 0 {
            return Err(AnalysisError::InvalidParameter(
                "seasonal period must be positive".to_string(),
            ));
        }
        if values.len() < self.period {
            return Err(AnalysisError::InsufficientData {
                needed: self.period,
                got: values.len(),
            });
        }

        let n = values.len();
        // One-cycle-back predictions, aligned with values[period..].
        let fitted: Vec<f64> = values[..n - self.period].to_vec();
        let residuals = values[self.period..]
            .iter()
            .zip(&fitted)
            .map(|(v, f)| v - f)
            .collect();

        self.cycle = Some(values[n - self.period..].to_vec());
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<Forecast> {
        let cycle = self.cycle.as_ref().ok_or(AnalysisError::FitRequired)?;
        let point = (0..horizon).map(|h| cycle[h % self.period]).collect();
        Ok(Forecast::from_values(point))
    }

    fn fitted_values(&self) -> Option<&[f64]> {
        self.fitted.as_deref()
    }

    fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    fn name(&self) -> String {
        format!("SeasonalCycle({})", self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_last_cycle_in_phase() {
        // Three cycles of period 4, the last one differs.
        let values = vec![
            1.0, 2.0, 3.0, 4.0, //
            1.5, 2.5, 3.5, 4.5, //
            -1.0, -2.0, -3.0, -4.0,
        ];
        let mut model = SeasonalCycle::new(4);
        model.fit(&values).unwrap();

        let forecast = model.predict(6).unwrap();
        assert_eq!(forecast.point(), &[-1.0, -2.0, -3.0, -4.0, -1.0, -2.0]);
    }

    #[test]
    fn phase_follows_partial_last_cycle() {
        // 14 monthly values starting in January end in February, so the
        // first forecast is March.
        let values: Vec<f64> = (0..14).map(|t| (t % 12) as f64).collect();
        let mut model = SeasonalCycle::new(12);
        model.fit(&values).unwrap();

        let forecast = model.predict(12).unwrap();
        assert_eq!(forecast.point()[0], 2.0);
        assert_eq!(forecast.point()[9], 11.0);
        assert_eq!(forecast.point()[10], 0.0);
    }

    #[test]
    fn residuals_of_exact_cycle_are_zero() {
        let values: Vec<f64> = (0..24).map(|t| ((t % 6) as f64).sin()).collect();
        let mut model = SeasonalCycle::new(6);
        model.fit(&values).unwrap();

        assert_eq!(model.residuals().unwrap().len(), 18);
        assert!(model.residuals().unwrap().iter().all(|r| *r == 0.0));
        assert_eq!(model.cycle().unwrap().len(), 6);
    }

    #[test]
    fn errors() {
        let mut model = SeasonalCycle::new(12);
        assert!(matches!(model.predict(1), Err(AnalysisError::FitRequired)));
        assert!(matches!(
            model.fit(&[1.0; 5]),
            Err(AnalysisError::InsufficientData { needed: 12, got: 5 })
        ));
        assert!(SeasonalCycle::new(0).fit(&[1.0; 5]).is_err());
    }
}
