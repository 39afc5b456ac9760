//! Ordinary least squares on a dense design matrix.
//!
//! Used by the ADF and KPSS regressions and by the polynomial trend model.

use crate::error::{AnalysisError, Result};

/// Fitted OLS regression.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// Coefficients, one per design column.
    pub coefficients: Vec<f64>,
    /// Standard errors of the coefficients.
    pub std_errors: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
    /// Residual variance `rss / (nobs - k)`.
    pub sigma2: f64,
    /// Number of observations.
    pub nobs: usize,
    /// Residuals `y - X b`.
    pub residuals: Vec<f64>,
}

impl OlsFit {
    /// t-statistic of coefficient `i`.
    pub fn t_stat(&self, i: usize) -> f64 {
        match (self.coefficients.get(i), self.std_errors.get(i)) {
            (Some(b), Some(se)) if *se > 0.0 => b / se,
            _ => f64::NAN,
        }
    }

    /// Number of regressors.
    pub fn num_params(&self) -> usize {
        self.coefficients.len()
    }
}

/// Fit `y = X b` by least squares.
///
/// `design` is row-major: one row per observation, one column per
/// regressor. No intercept is added implicitly.
pub fn lstsq(design: &[Vec<f64>], y: &[f64]) -> Result<OlsFit> {
    let n = y.len();
    if n == 0 {
        return Err(AnalysisError::EmptyData);
    }
    if design.len() != n {
        return Err(AnalysisError::DimensionMismatch {
            expected: n,
            got: design.len(),
        });
    }
    let k = design[0].len();
    if k == 0 {
        return Err(AnalysisError::InvalidParameter(
            "design matrix has no columns".into(),
        ));
    }
    if n < k {
        return Err(AnalysisError::InsufficientData { needed: k, got: n });
    }
    if let Some(row) = design.iter().find(|r| r.len() != k) {
        return Err(AnalysisError::DimensionMismatch {
            expected: k,
            got: row.len(),
        });
    }

    // Normal equations X'X b = X'y
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &yi) in design.iter().zip(y.iter()) {
        for i in 0..k {
            xty[i] += row[i] * yi;
            for j in 0..=i {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
    }

    let chol = cholesky(&xtx).or_else(|| {
        // Tiny ridge relative to the diagonal scale for near-singular designs.
        let scale = (0..k).map(|i| xtx[i][i]).fold(0.0, f64::max).max(1.0);
        let mut ridged = xtx.clone();
        for (i, row) in ridged.iter_mut().enumerate() {
            row[i] += 1e-10 * scale;
        }
        cholesky(&ridged)
    });
    let l = chol.ok_or_else(|| {
        AnalysisError::ComputationError("least squares: X'X is not positive definite".into())
    })?;

    let coefficients = cholesky_solve(&l, &xty);

    let residuals: Vec<f64> = design
        .iter()
        .zip(y.iter())
        .map(|(row, yi)| yi - row.iter().zip(coefficients.iter()).map(|(x, b)| x * b).sum::<f64>())
        .collect();
    let rss: f64 = residuals.iter().map(|r| r * r).sum();
    let dof = n.saturating_sub(k);
    let sigma2 = if dof > 0 { rss / dof as f64 } else { f64::NAN };

    // Var(b) = sigma2 * diag((X'X)^-1)
    let std_errors = (0..k)
        .map(|i| {
            let mut e = vec![0.0; k];
            e[i] = 1.0;
            let col = cholesky_solve(&l, &e);
            (sigma2 * col[i]).sqrt()
        })
        .collect();

    Ok(OlsFit {
        coefficients,
        std_errors,
        rss,
        sigma2,
        nobs: n,
        residuals,
    })
}

/// Lower-triangular Cholesky factor of a symmetric positive definite matrix.
fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return None;
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    Some(l)
}

/// Solve `L L' x = b` given the Cholesky factor `L`.
fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();

    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn with_intercept(x: &[f64]) -> Vec<Vec<f64>> {
        x.iter().map(|&xi| vec![1.0, xi]).collect()
    }

    #[test]
    fn lstsq_simple_linear() {
        // y = 2 + 3x
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|xi| 2.0 + 3.0 * xi).collect();

        let fit = lstsq(&with_intercept(&x), &y).unwrap();

        assert_relative_eq!(fit.coefficients[0], 2.0, epsilon = 1e-8);
        assert_relative_eq!(fit.coefficients[1], 3.0, epsilon = 1e-8);
        assert!(fit.rss < 1e-12);
        assert_eq!(fit.nobs, 5);
    }

    #[test]
    fn lstsq_standard_errors_match_closed_form() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.1, 2.9, 5.2, 6.8, 9.1, 11.0];

        let fit = lstsq(&with_intercept(&x), &y).unwrap();

        // se(slope) = sqrt(sigma2 / Sxx)
        let mean_x = 2.5;
        let sxx: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
        assert_relative_eq!(
            fit.std_errors[1],
            (fit.sigma2 / sxx).sqrt(),
            epsilon = 1e-10
        );
        assert!(fit.t_stat(1) > 10.0);
    }

    #[test]
    fn lstsq_residuals_sum_to_zero_with_intercept() {
        let x: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, xi)| 2.5 + 1.7 * xi + (i as f64 * 0.13).sin() * 0.1)
            .collect();

        let fit = lstsq(&with_intercept(&x), &y).unwrap();

        let sum: f64 = fit.residuals.iter().sum();
        assert!(sum.abs() < 1e-8);
        assert_relative_eq!(fit.coefficients[0], 2.5, epsilon = 0.1);
        assert_relative_eq!(fit.coefficients[1], 1.7, epsilon = 0.1);
    }

    #[test]
    fn lstsq_rejects_bad_shapes() {
        let design = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(
            lstsq(&design, &[1.0, 2.0]),
            Err(AnalysisError::DimensionMismatch { .. })
        ));

        let design = vec![vec![1.0, 2.0, 3.0]];
        assert!(matches!(
            lstsq(&design, &[1.0]),
            Err(AnalysisError::InsufficientData { needed: 3, got: 1 })
        ));

        assert_eq!(lstsq(&[], &[]).unwrap_err(), AnalysisError::EmptyData);
    }

    #[test]
    fn lstsq_singular_design_fails_or_regularises() {
        // Two identical columns: X'X is singular.
        let design: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 2.0 * i as f64).collect();

        match lstsq(&design, &y) {
            Ok(fit) => assert!(fit.coefficients.iter().all(|b| b.is_finite())),
            Err(err) => assert!(matches!(err, AnalysisError::ComputationError(_))),
        }
    }
}
