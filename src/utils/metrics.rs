//! Accuracy metrics for holdout evaluation.

use crate::error::{AnalysisError, Result};
use serde::Serialize;

/// Accuracy of a forecast against withheld observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error (None if zeros in actual)
    pub mape: Option<f64>,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
    /// Mean Absolute Scaled Error against an in-sample seasonal naive forecast
    pub mase: Option<f64>,
    /// R-squared (coefficient of determination)
    pub r_squared: f64,
}

/// Calculate accuracy metrics between actual and predicted values.
///
/// `training` and `period` scale the MAE for MASE: the denominator is the
/// in-sample MAE of the seasonal naive forecast `y[t] = y[t - period]`.
pub fn calculate_metrics(
    actual: &[f64],
    predicted: &[f64],
    training: Option<(&[f64], usize)>,
) -> Result<AccuracyMetrics> {
    if actual.is_empty() || predicted.is_empty() {
        return Err(AnalysisError::EmptyData);
    }

    if actual.len() != predicted.len() {
        return Err(AnalysisError::DimensionMismatch {
            expected: actual.len(),
            got: predicted.len(),
        });
    }

    let n = actual.len() as f64;
    let errors: Vec<f64> = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| a - p)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
    let rmse = mse.sqrt();

    let mape = if actual.contains(&0.0) {
        None
    } else {
        let sum: f64 = errors
            .iter()
            .zip(actual.iter())
            .map(|(e, a)| (e / a).abs())
            .sum();
        Some(100.0 * sum / n)
    };

    let smape = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| {
            let denom = a.abs() + p.abs();
            if denom == 0.0 {
                0.0
            } else {
                2.0 * (a - p).abs() / denom
            }
        })
        .sum::<f64>()
        * 100.0
        / n;

    let mase = training.and_then(|(history, period)| {
        let scale = seasonal_naive_mae(history, period)?;
        Some(mae / scale)
    });

    let mean_actual = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean_actual).powi(2)).sum();
    let ss_res: f64 = errors.iter().map(|e| e * e).sum();
    let r_squared = if ss_tot == 0.0 {
        1.0
    } else {
        1.0 - ss_res / ss_tot
    };

    Ok(AccuracyMetrics {
        mae,
        mse,
        rmse,
        mape,
        smape,
        mase,
        r_squared,
    })
}

/// In-sample MAE of the seasonal naive forecast.
fn seasonal_naive_mae(history: &[f64], period: usize) -> Option<f64> {
    let period = period.max(1);
    if history.len() <= period {
        return None;
    }

    let mae = history
        .iter()
        .skip(period)
        .zip(history.iter())
        .map(|(curr, prev)| (curr - prev).abs())
        .sum::<f64>()
        / (history.len() - period) as f64;

    (mae > 0.0).then_some(mae)
}
