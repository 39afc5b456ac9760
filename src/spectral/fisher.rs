//! Fisher's exact g test for a hidden periodicity.

use serde::Serialize;
use statrs::function::factorial::binomial;

use crate::spectral::periodogram::Periodogram;

/// Outcome of Fisher's g test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FisherGResult {
    /// Largest ordinate over the sum of ordinates.
    pub statistic: f64,
    pub p_value: f64,
    /// Ordinates used, `floor((n - 1) / 2)`.
    pub m: usize,
    /// Frequency of the largest ordinate.
    pub frequency: f64,
}

impl FisherGResult {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Fisher's g test on the ordinates `k = 1..=floor((n-1)/2)`.
///
/// The null hypothesis is Gaussian white noise. The exact p-value is
/// `sum_{j=1..floor(1/g)} (-1)^(j-1) C(m, j) (1 - j g)^(m-1)`, clamped to
/// `[0, 1]` against cancellation. `NaN` when fewer than two ordinates are
/// available or all are zero.
pub fn fisher_g_test(periodogram: &Periodogram) -> FisherGResult {
    let m = (periodogram.series_len().saturating_sub(1) / 2).min(periodogram.len());
    let ordinates = &periodogram.powers()[..m];
    let total: f64 = ordinates.iter().sum();

    let undefined = FisherGResult {
        statistic: f64::NAN,
        p_value: f64::NAN,
        m,
        frequency: f64::NAN,
    };
    if m < 2 || !(total > 0.0) {
        return undefined;
    }

    let Some((index, max)) = ordinates
        .iter()
        .copied()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(&b.1))
    else {
        return undefined;
    };

    let g = max / total;
    let upper = ((1.0 / g).floor() as usize).min(m);
    let p_value: f64 = (1..=upper)
        .map(|j| {
            let sign = if j % 2 == 1 { 1.0 } else { -1.0 };
            let base = (1.0 - j as f64 * g).max(0.0);
            sign * binomial(m as u64, j as u64) * base.powi(m as i32 - 1)
        })
        .sum();

    FisherGResult {
        statistic: g,
        p_value: p_value.clamp(0.0, 1.0),
        m,
        frequency: periodogram.frequencies()[index],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectral::periodogram::{periodogram, Detrend};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    #[test]
    fn strong_cycle_is_significant() {
        let mut rng = StdRng::seed_from_u64(9);
        let x: Vec<f64> = (0..120)
            .map(|t| 3.0 * (2.0 * PI * t as f64 / 12.0).cos() + rng.gen_range(-1.0..1.0))
            .collect();
        let result = fisher_g_test(&periodogram(&x, Detrend::Constant));

        assert_eq!(result.m, 59);
        assert_relative_eq!(result.frequency, 1.0 / 12.0, epsilon = 1e-12);
        assert!(result.statistic > 0.5);
        assert!(result.is_significant(0.001));
    }

    #[test]
    fn noise_is_not_significant() {
        let mut rng = StdRng::seed_from_u64(10);
        let x: Vec<f64> = (0..128).map(|_| rng.gen_range(-1.0..1.0)).collect();
        let result = fisher_g_test(&periodogram(&x, Detrend::Constant));
        assert!(result.p_value > 0.01);
        assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn single_term_approximation() {
        // With g above 1/2 only the first term survives.
        let mut powers = vec![1.0; 10];
        powers[3] = 30.0;
        let frequencies = (1..=10).map(|k| k as f64 / 21.0).collect();
        let p = Periodogram::from_parts(21, frequencies, powers);
        let result = fisher_g_test(&p);

        let g = 30.0 / 39.0;
        assert_relative_eq!(result.statistic, g, epsilon = 1e-12);
        assert_relative_eq!(result.p_value, 10.0 * (1.0 - g).powi(9), epsilon = 1e-12);
    }

    #[test]
    fn degenerate_periodograms() {
        assert!(fisher_g_test(&periodogram(&[1.0, 2.0], Detrend::None))
            .statistic
            .is_nan());
        assert!(fisher_g_test(&periodogram(&[4.0; 20], Detrend::Constant))
            .p_value
            .is_nan());
    }
}
