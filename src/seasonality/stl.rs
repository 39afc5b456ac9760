//! STL (Seasonal-Trend decomposition using LOESS).
//!
//! Follows Cleveland, Cleveland, McRae & Terpenning (1990): an inner loop of
//! cycle-subseries smoothing, low-pass filtering and trend smoothing, wrapped
//! in an optional outer loop of bisquare robustness weights.
//!
//! - Trend: the underlying long-term pattern
//! - Seasonal: the repeating within-year pattern
//! - Remainder: what is left after removing trend and seasonal

use crate::utils::stats::{median, variance};

/// Result of STL decomposition.
#[derive(Debug, Clone)]
pub struct STLResult {
    /// Trend component.
    pub trend: Vec<f64>,
    /// Seasonal component.
    pub seasonal: Vec<f64>,
    /// Remainder component.
    pub remainder: Vec<f64>,
    /// Final robustness weights (all ones for a non-robust fit).
    pub weights: Vec<f64>,
}

impl STLResult {
    /// Seasonal strength in [0, 1] (Wang, Smith & Hyndman 2006).
    pub fn seasonal_strength(&self) -> f64 {
        strength(&self.seasonal, &self.remainder)
    }

    /// Trend strength in [0, 1].
    pub fn trend_strength(&self) -> f64 {
        strength(&self.trend, &self.remainder)
    }

    /// The last `period` values of the seasonal component.
    pub fn last_cycle(&self, period: usize) -> &[f64] {
        let n = self.seasonal.len();
        &self.seasonal[n.saturating_sub(period)..]
    }

    pub fn len(&self) -> usize {
        self.trend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trend.is_empty()
    }
}

fn strength(component: &[f64], remainder: &[f64]) -> f64 {
    let var_remainder = variance(remainder);
    let combined: Vec<f64> = component
        .iter()
        .zip(remainder.iter())
        .map(|(c, r)| c + r)
        .collect();
    let var_combined = variance(&combined);

    if !(var_combined > 1e-10) {
        return 0.0;
    }

    (1.0 - var_remainder / var_combined).clamp(0.0, 1.0)
}

/// STL decomposition configuration and algorithm.
#[derive(Debug, Clone)]
pub struct STL {
    /// Seasonal period.
    period: usize,
    /// Seasonal LOESS span (ns).
    seasonal_smoothness: usize,
    /// Trend LOESS span (nt).
    trend_smoothness: usize,
    /// Low-pass LOESS span (nl).
    low_pass_smoothness: usize,
    /// Number of inner iterations.
    inner_iterations: usize,
    /// Number of outer (robustness) iterations.
    outer_iterations: usize,
}

impl STL {
    /// Create a new STL decomposer with the given seasonal period.
    pub fn new(period: usize) -> Self {
        let ns = if period <= 12 { 7 } else { odd_at_least(period) };
        let mut stl = Self {
            period,
            seasonal_smoothness: ns,
            trend_smoothness: 0,
            low_pass_smoothness: odd_at_least(period),
            inner_iterations: 5,
            outer_iterations: 0,
        };
        stl.trend_smoothness = stl.default_trend_span();
        stl
    }

    fn default_trend_span(&self) -> usize {
        let p = self.period as f64;
        let ns = self.seasonal_smoothness as f64;
        odd_at_least((1.5 * p / (1.0 - 1.5 / ns)).ceil() as usize)
    }

    /// Set the seasonal LOESS span (ns). The trend span follows unless set.
    pub fn with_seasonal_smoothness(mut self, ns: usize) -> Self {
        self.seasonal_smoothness = odd_at_least(ns);
        self.trend_smoothness = self.default_trend_span();
        self
    }

    /// Set the trend LOESS span (nt).
    pub fn with_trend_smoothness(mut self, nt: usize) -> Self {
        self.trend_smoothness = odd_at_least(nt);
        self
    }

    /// Set the low-pass LOESS span (nl).
    pub fn with_low_pass_smoothness(mut self, nl: usize) -> Self {
        self.low_pass_smoothness = odd_at_least(nl);
        self
    }

    /// Enable robust fitting: 15 outer iterations of 2 inner passes.
    pub fn robust(mut self) -> Self {
        self.inner_iterations = 2;
        self.outer_iterations = 15;
        self
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Spans `(ns, nt, nl)` in use.
    pub fn spans(&self) -> (usize, usize, usize) {
        (
            self.seasonal_smoothness,
            self.trend_smoothness,
            self.low_pass_smoothness,
        )
    }

    pub fn is_robust(&self) -> bool {
        self.outer_iterations > 0
    }

    /// Decompose the series. Returns `None` for fewer than two full periods.
    pub fn decompose(&self, series: &[f64]) -> Option<STLResult> {
        let n = series.len();
        let period = self.period;
        if period < 2 || n < 2 * period {
            return None;
        }
        if series.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let mut seasonal = vec![0.0; n];
        let mut trend = vec![0.0; n];
        let mut weights = vec![1.0; n];

        for outer in 0..=self.outer_iterations {
            for _ in 0..self.inner_iterations {
                // Step 1: detrending
                let detrended: Vec<f64> =
                    series.iter().zip(trend.iter()).map(|(y, t)| y - t).collect();

                // Step 2: cycle-subseries smoothing, padded one period each side
                let cycle = self.smooth_cycle_subseries(&detrended, &weights);

                // Step 3: low-pass filter of the padded cycle-subseries
                let low_pass = self.low_pass_filter(&cycle);

                // Step 4: detrending of the smoothed cycle-subseries
                for i in 0..n {
                    seasonal[i] = cycle[period + i] - low_pass[i];
                }

                // Step 5: deseasonalizing
                let deseasonalized: Vec<f64> = series
                    .iter()
                    .zip(seasonal.iter())
                    .map(|(y, s)| y - s)
                    .collect();

                // Step 6: trend smoothing
                trend = loess(
                    &deseasonalized,
                    Some(&weights),
                    self.trend_smoothness,
                    (0..n).map(|i| i as f64),
                );
            }

            if outer < self.outer_iterations {
                let remainder: Vec<f64> = (0..n).map(|i| series[i] - seasonal[i] - trend[i]).collect();
                weights = robustness_weights(&remainder);
            }
        }

        let remainder = (0..n).map(|i| series[i] - seasonal[i] - trend[i]).collect();

        Some(STLResult {
            trend,
            seasonal,
            remainder,
            weights,
        })
    }

    /// Smooth every cycle-subseries and extend each by one point at both ends.
    ///
    /// The output has length `n + 2 * period`; index `period + i` lines up
    /// with observation `i`.
    fn smooth_cycle_subseries(&self, detrended: &[f64], weights: &[f64]) -> Vec<f64> {
        let n = detrended.len();
        let period = self.period;
        let mut padded = vec![0.0; n + 2 * period];

        for phase in 0..period {
            let values: Vec<f64> = detrended.iter().skip(phase).step_by(period).copied().collect();
            let sub_weights: Vec<f64> = weights.iter().skip(phase).step_by(period).copied().collect();
            let m = values.len();

            let smoothed = loess(
                &values,
                Some(&sub_weights),
                self.seasonal_smoothness,
                (0..m + 2).map(|k| k as f64 - 1.0),
            );

            for (k, value) in smoothed.into_iter().enumerate() {
                padded[k * period + phase] = value;
            }
        }

        padded
    }

    /// Moving averages of length period, period and 3, then LOESS(nl).
    fn low_pass_filter(&self, padded: &[f64]) -> Vec<f64> {
        let ma = moving_average(padded, self.period);
        let ma = moving_average(&ma, self.period);
        let ma = moving_average(&ma, 3);
        let n = ma.len();
        loess(&ma, None, self.low_pass_smoothness, (0..n).map(|i| i as f64))
    }
}

impl Default for STL {
    fn default() -> Self {
        Self::new(12)
    }
}

/// Smallest odd integer >= max(value, 3).
fn odd_at_least(value: usize) -> usize {
    let v = value.max(3);
    if v % 2 == 0 {
        v + 1
    } else {
        v
    }
}

/// Trailing moving average; output length is `len - window + 1`.
fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || series.len() < window {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(series.len() - window + 1);
    let mut sum: f64 = series[..window].iter().sum();
    out.push(sum / window as f64);
    for i in window..series.len() {
        sum += series[i] - series[i - window];
        out.push(sum / window as f64);
    }
    out
}

/// Local-linear LOESS of `y` (at positions 0..n) evaluated at `at`.
///
/// `at` may lie outside `[0, n - 1]`; the fit then extrapolates from the
/// nearest `span` points. Positions where every weight vanishes fall back to
/// the nearest observation.
fn loess(y: &[f64], robustness: Option<&[f64]>, span: usize, at: impl Iterator<Item = f64>) -> Vec<f64> {
    let n = y.len();
    if n == 0 {
        return at.map(|_| 0.0).collect();
    }
    let q = span.min(n);
    let last = (n - 1) as f64;

    at.map(|x| {
        let center = x.round().clamp(0.0, last) as usize;
        let left = center.saturating_sub(q / 2).min(n - q);
        let right = left + q - 1;

        let mut h = (x - left as f64).max(right as f64 - x);
        if span > n {
            h += ((span - n) / 2) as f64;
        }

        match local_linear(y, robustness, left, right, x, h) {
            Some(v) => v,
            None => y[center],
        }
    })
    .collect()
}

fn local_linear(
    y: &[f64],
    robustness: Option<&[f64]>,
    left: usize,
    right: usize,
    x: f64,
    h: f64,
) -> Option<f64> {
    let h_hi = 0.999 * h;
    let h_lo = 0.001 * h;

    let mut w: Vec<f64> = (left..=right)
        .map(|j| {
            let r = (j as f64 - x).abs();
            let tricube = if r <= h_lo {
                1.0
            } else if r <= h_hi {
                (1.0 - (r / h).powi(3)).powi(3)
            } else {
                0.0
            };
            tricube * robustness.map_or(1.0, |rw| rw[j])
        })
        .collect();

    let total: f64 = w.iter().sum();
    if !(total > 0.0) {
        return None;
    }
    w.iter_mut().for_each(|wj| *wj /= total);

    if h > 0.0 {
        let center: f64 = w.iter().enumerate().map(|(k, wj)| wj * (left + k) as f64).sum();
        let spread: f64 = w
            .iter()
            .enumerate()
            .map(|(k, wj)| wj * ((left + k) as f64 - center).powi(2))
            .sum();
        let range = (y.len() - 1) as f64;
        if spread.sqrt() > 0.001 * range {
            let slope = (x - center) / spread;
            for (k, wj) in w.iter_mut().enumerate() {
                *wj *= slope * ((left + k) as f64 - center) + 1.0;
            }
        }
    }

    Some(w.iter().enumerate().map(|(k, wj)| wj * y[left + k]).sum())
}

/// Bisquare weights with scale `6 * median(|r|)`.
fn robustness_weights(remainder: &[f64]) -> Vec<f64> {
    let abs: Vec<f64> = remainder.iter().map(|r| r.abs()).collect();
    let h = 6.0 * median(&abs);

    remainder
        .iter()
        .map(|r| {
            if !(h > 1e-12) {
                return 1.0;
            }
            let u = r.abs() / h;
            if u <= 0.001 {
                1.0
            } else if u <= 0.999 {
                (1.0 - u * u).powi(2)
            } else {
                0.0
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn generate_seasonal_series(n: usize, period: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let trend = 0.1 * i as f64;
                let seasonal = 10.0 * (2.0 * PI * i as f64 / period as f64).sin();
                trend + seasonal
            })
            .collect()
    }

    #[test]
    fn default_spans_for_monthly_data() {
        let stl = STL::new(12);
        assert_eq!(stl.spans(), (7, 23, 13));
        assert!(!stl.is_robust());

        let stl = STL::new(12).with_seasonal_smoothness(8);
        assert_eq!(stl.spans().0, 9);
    }

    #[test]
    fn moving_average_shrinks_output() {
        let ma = moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(ma, vec![2.0, 3.0, 4.0]);
        assert!(moving_average(&[1.0], 3).is_empty());
    }

    #[test]
    fn loess_reproduces_lines_and_extrapolates() {
        let y: Vec<f64> = (0..10).map(|i| 3.0 + 2.0 * i as f64).collect();
        let fitted = loess(&y, None, 5, (-1..=10).map(|i| i as f64));
        for (k, v) in fitted.iter().enumerate() {
            let x = k as f64 - 1.0;
            assert_relative_eq!(*v, 3.0 + 2.0 * x, epsilon = 1e-9);
        }
    }

    #[test]
    fn stl_reconstructs_input() {
        let series = generate_seasonal_series(158, 12);
        let result = STL::new(12).decompose(&series).unwrap();

        assert_eq!(result.len(), series.len());
        for i in 0..series.len() {
            let reconstructed = result.trend[i] + result.seasonal[i] + result.remainder[i];
            assert_relative_eq!(series[i], reconstructed, epsilon = 1e-9);
        }
    }

    #[test]
    fn stl_recovers_components() {
        let period = 12;
        let series = generate_seasonal_series(144, period);
        let result = STL::new(period).decompose(&series).unwrap();

        // Away from the edges the trend is the 0.1 slope line.
        for i in 24..120 {
            assert!((result.trend[i] - 0.1 * i as f64).abs() < 0.5);
        }
        assert!(result.seasonal_strength() > 0.9);
    }

    #[test]
    fn stl_detects_trend() {
        let series: Vec<f64> = (0..120)
            .map(|i| 2.0 * i as f64 + 0.1 * (2.0 * PI * i as f64 / 12.0).sin())
            .collect();
        let result = STL::new(12).decompose(&series).unwrap();
        assert!(result.trend_strength() > 0.9);
    }

    #[test]
    fn stl_linear_series_has_no_seasonality() {
        let series: Vec<f64> = (0..100).map(|i| 5.0 + 0.5 * i as f64).collect();
        let result = STL::new(10).decompose(&series).unwrap();

        for s in &result.seasonal {
            assert!(s.abs() < 1e-8, "seasonal should vanish, got {}", s);
        }
    }

    #[test]
    fn stl_constant_series() {
        let series = vec![5.0; 100];
        let result = STL::new(10).decompose(&series).unwrap();

        for (&s, &r) in result.seasonal.iter().zip(result.remainder.iter()) {
            assert!(s.abs() < 1e-9);
            assert!(r.abs() < 1e-9);
        }
        assert_eq!(result.seasonal_strength(), 0.0);
    }

    #[test]
    fn stl_insufficient_data() {
        assert!(STL::new(12).decompose(&[1.0; 20]).is_none());
        assert!(STL::new(1).decompose(&[1.0; 20]).is_none());
        assert!(STL::new(4).decompose(&[1.0, f64::NAN, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]).is_none());
    }

    #[test]
    fn stl_robust_downweights_outliers() {
        let period = 12;
        let mut series = generate_seasonal_series(120, period);
        series[30] += 100.0;
        series[60] -= 100.0;

        let result = STL::new(period).robust().decompose(&series).unwrap();

        assert!(result.weights[30] < 0.1);
        assert!(result.weights[60] < 0.1);
        // The outliers end up in the remainder, not the trend.
        assert!(result.remainder[30] > 80.0);
        assert!(result.remainder[60] < -80.0);
    }

    #[test]
    fn stl_partial_last_cycle() {
        // 158 months: 13 years and 2 months, subseries of unequal length.
        let series = generate_seasonal_series(158, 12);
        let result = STL::new(12).decompose(&series).unwrap();
        assert_eq!(result.last_cycle(12).len(), 12);
        assert!(result.seasonal_strength() > 0.9);
    }

    #[test]
    fn stl_strengths_in_unit_range() {
        let series = generate_seasonal_series(120, 12);
        let result = STL::new(12).decompose(&series).unwrap();

        assert!((0.0..=1.0).contains(&result.seasonal_strength()));
        assert!((0.0..=1.0).contains(&result.trend_strength()));
    }
}
