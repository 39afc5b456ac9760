//! Sample autocorrelation and partial autocorrelation.

use serde::Serialize;

/// Sample autocorrelations for lags `0..=nlags` (lag 0 is 1).
///
/// Uses the biased estimator (denominator `n`), so the sequence is positive
/// semi-definite. `nlags` is capped at `n - 1`. A constant series has zero
/// autocorrelation at every positive lag.
pub fn acf(x: &[f64], nlags: usize) -> Vec<f64> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }
    let nlags = nlags.min(n - 1);

    let mean = x.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = x.iter().map(|v| v - mean).collect();
    let c0: f64 = centered.iter().map(|v| v * v).sum();

    let mut result = Vec::with_capacity(nlags + 1);
    result.push(1.0);
    for k in 1..=nlags {
        if c0 == 0.0 {
            result.push(0.0);
            continue;
        }
        let ck: f64 = centered
            .iter()
            .skip(k)
            .zip(centered.iter())
            .map(|(a, b)| a * b)
            .sum();
        result.push(ck / c0);
    }
    result
}

/// Partial autocorrelations for lags `0..=nlags` (Durbin-Levinson).
pub fn pacf(x: &[f64], nlags: usize) -> Vec<f64> {
    let rho = acf(x, nlags);
    if rho.is_empty() {
        return rho;
    }
    let nlags = rho.len() - 1;

    let mut result = vec![1.0];
    let mut phi: Vec<f64> = Vec::new();
    for k in 1..=nlags {
        let num = rho[k] - (0..k - 1).map(|j| phi[j] * rho[k - 1 - j]).sum::<f64>();
        let den = 1.0 - (0..k - 1).map(|j| phi[j] * rho[j + 1]).sum::<f64>();
        let r = if den.abs() > f64::EPSILON { num / den } else { 0.0 };

        let mut next: Vec<f64> = (0..k - 1).map(|j| phi[j] - r * phi[k - 2 - j]).collect();
        next.push(r);
        phi = next;
        result.push(r);
    }
    result
}

/// Approximate 95% band for a white-noise correlogram, `1.96 / sqrt(n)`.
pub fn confidence_band(n: usize) -> f64 {
    if n == 0 {
        return f64::NAN;
    }
    1.96 / (n as f64).sqrt()
}

/// ACF and PACF of one series with the white-noise band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlogram {
    pub acf: Vec<f64>,
    pub pacf: Vec<f64>,
    pub band: f64,
}

impl Correlogram {
    pub fn new(x: &[f64], nlags: usize) -> Self {
        Self {
            acf: acf(x, nlags),
            pacf: pacf(x, nlags),
            band: confidence_band(x.len()),
        }
    }

    /// Positive lags whose autocorrelation falls outside the band.
    pub fn significant_acf_lags(&self) -> Vec<usize> {
        self.acf
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, r)| r.abs() > self.band)
            .map(|(lag, _)| lag)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn ar1(n: usize, phi: f64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(n as u64);
        let mut x = vec![0.0; n];
        for t in 1..n {
            let shock: f64 = rng.gen_range(-1.0..1.0);
            x[t] = phi * x[t - 1] + shock;
        }
        x
    }

    #[test]
    fn acf_known_values() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let r = acf(&x, 2);
        // c0 = 10, c1 = 4, c2 = -1
        assert_relative_eq!(r[0], 1.0);
        assert_relative_eq!(r[1], 0.4, epsilon = 1e-12);
        assert_relative_eq!(r[2], -0.1, epsilon = 1e-12);
    }

    #[test]
    fn acf_caps_lags_and_handles_constant() {
        assert_eq!(acf(&[1.0, 2.0, 3.0], 10).len(), 3);
        assert_eq!(acf(&[2.0; 5], 2), vec![1.0, 0.0, 0.0]);
        assert!(acf(&[], 3).is_empty());
    }

    #[test]
    fn pacf_lag_one_equals_acf() {
        let x = ar1(300, 0.6);
        let r = acf(&x, 5);
        let p = pacf(&x, 5);
        assert_relative_eq!(p[1], r[1], epsilon = 1e-12);
        // AR(1): partial autocorrelation cuts off after lag 1.
        assert!(p[1] > 0.4);
        for lag in 2..=5 {
            assert!(p[lag].abs() < 0.2, "lag {lag}: {}", p[lag]);
        }
    }

    #[test]
    fn pacf_lag_two_formula() {
        let x = ar1(200, 0.3);
        let r = acf(&x, 2);
        let p = pacf(&x, 2);
        let expected = (r[2] - r[1] * r[1]) / (1.0 - r[1] * r[1]);
        assert_relative_eq!(p[2], expected, epsilon = 1e-12);
    }

    #[test]
    fn correlogram_flags_significant_lags() {
        let x = ar1(400, 0.8);
        let correlogram = Correlogram::new(&x, 12);
        assert_relative_eq!(correlogram.band, 1.96 / 20.0, epsilon = 1e-12);
        assert!(correlogram.significant_acf_lags().contains(&1));
    }
}
