//! Raw periodogram via FFT.

use rustfft::{num_complex::Complex64, FftPlanner};
use serde::{Deserialize, Serialize};

/// Detrending applied before the transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detrend {
    None,
    /// Subtract the mean.
    #[default]
    Constant,
    /// Subtract a least-squares line.
    Linear,
}

impl Detrend {
    pub fn apply(self, x: &[f64]) -> Vec<f64> {
        let n = x.len();
        if n == 0 {
            return Vec::new();
        }
        match self {
            Self::None => x.to_vec(),
            Self::Constant => {
                let mean = x.iter().sum::<f64>() / n as f64;
                x.iter().map(|v| v - mean).collect()
            }
            Self::Linear => {
                let nf = n as f64;
                let t_mean = (nf - 1.0) / 2.0;
                let x_mean = x.iter().sum::<f64>() / nf;
                let (mut sxy, mut sxx) = (0.0, 0.0);
                for (t, v) in x.iter().enumerate() {
                    let dt = t as f64 - t_mean;
                    sxy += dt * (v - x_mean);
                    sxx += dt * dt;
                }
                let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
                x.iter()
                    .enumerate()
                    .map(|(t, v)| v - x_mean - slope * (t as f64 - t_mean))
                    .collect()
            }
        }
    }
}

/// Forward FFT of a real signal, bins `0..=n/2`.
pub fn fft_real(signal: &[f64]) -> Vec<Complex64> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }

    let mut buffer: Vec<Complex64> = signal.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    buffer.truncate(n / 2 + 1);
    buffer
}

/// One spectral peak.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectralPeak {
    /// Cycles per month.
    pub frequency: f64,
    /// Months per cycle.
    pub period: f64,
    pub power: f64,
    /// Fraction of the total periodogram power.
    pub share: f64,
}

/// Periodogram ordinates `I(f_k) = |X_k|^2 / n` at `f_k = k / n`,
/// `k = 1..=n/2`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Periodogram {
    n: usize,
    frequencies: Vec<f64>,
    powers: Vec<f64>,
}

impl Periodogram {
    /// Build from precomputed ordinates of a length-`n` series. The longer
    /// of the two vectors is truncated.
    pub fn from_parts(n: usize, mut frequencies: Vec<f64>, mut powers: Vec<f64>) -> Self {
        let len = frequencies.len().min(powers.len());
        frequencies.truncate(len);
        powers.truncate(len);
        Self {
            n,
            frequencies,
            powers,
        }
    }

    pub fn len(&self) -> usize {
        self.powers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.powers.is_empty()
    }

    /// Length of the transformed series.
    pub fn series_len(&self) -> usize {
        self.n
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn powers(&self) -> &[f64] {
        &self.powers
    }

    pub fn periods(&self) -> Vec<f64> {
        self.frequencies.iter().map(|f| 1.0 / f).collect()
    }

    pub fn total_power(&self) -> f64 {
        self.powers.iter().sum()
    }

    /// Fourier bin `k` of a frequency.
    pub fn bin_of(&self, frequency: f64) -> usize {
        (frequency * self.n as f64).round() as usize
    }

    /// Up to `k` local maxima with period at least `min_period`, strongest
    /// first.
    pub fn dominant(&self, k: usize, min_period: f64) -> Vec<SpectralPeak> {
        let total = self.total_power();
        // Ordinates at rounding-noise level are not peaks.
        let floor = total * 1e-12;
        let last = self.powers.len().saturating_sub(1);
        let mut peaks: Vec<SpectralPeak> = self
            .powers
            .iter()
            .enumerate()
            .filter(|&(i, &power)| {
                let left = i == 0 || power > self.powers[i - 1];
                let right = i == last || power >= self.powers[i + 1];
                left && right && power > floor
            })
            .map(|(i, &power)| SpectralPeak {
                frequency: self.frequencies[i],
                period: 1.0 / self.frequencies[i],
                power,
                share: if total > 0.0 { power / total } else { 0.0 },
            })
            .filter(|peak| peak.period >= min_period)
            .collect();

        peaks.sort_by(|a, b| b.power.total_cmp(&a.power));
        peaks.truncate(k);
        peaks
    }
}

/// Periodogram of `x` after `detrend`.
///
/// Series shorter than 4 give an empty periodogram.
pub fn periodogram(x: &[f64], detrend: Detrend) -> Periodogram {
    let n = x.len();
    if n < 4 {
        return Periodogram {
            n,
            ..Default::default()
        };
    }

    let spectrum = fft_real(&detrend.apply(x));
    let nf = n as f64;
    let (frequencies, powers) = spectrum
        .iter()
        .enumerate()
        .skip(1)
        .map(|(k, c)| (k as f64 / nf, c.norm_sqr() / nf))
        .unzip();

    Periodogram {
        n,
        frequencies,
        powers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn sine(n: usize, period: f64, amplitude: f64) -> Vec<f64> {
        (0..n)
            .map(|t| amplitude * (2.0 * PI * t as f64 / period).sin())
            .collect()
    }

    #[test]
    fn frequencies_cover_half_band() {
        let p = periodogram(&sine(120, 12.0, 1.0), Detrend::Constant);
        assert_eq!(p.len(), 60);
        assert_relative_eq!(p.frequencies()[0], 1.0 / 120.0);
        assert_relative_eq!(*p.frequencies().last().unwrap(), 0.5);
        assert_relative_eq!(p.periods()[9], 12.0, epsilon = 1e-12);
    }

    #[test]
    fn sine_power_sits_in_one_bin() {
        // Amplitude A at a Fourier frequency gives I = n A^2 / 4.
        let p = periodogram(&sine(120, 12.0, 2.0), Detrend::None);
        assert_relative_eq!(p.powers()[9], 120.0, epsilon = 1e-9);
        let others: f64 = p.total_power() - p.powers()[9];
        assert!(others < 1e-9);
    }

    #[test]
    fn parseval() {
        let x: Vec<f64> = (0..64).map(|t| ((t * 37 % 11) as f64) - 5.0).collect();
        let centered = Detrend::Constant.apply(&x);
        let sum_sq: f64 = centered.iter().map(|v| v * v).sum();
        let p = periodogram(&x, Detrend::Constant);
        // Bins 1..n/2-1 appear twice in the full spectrum, Nyquist once.
        let last = p.powers().len() - 1;
        let doubled: f64 = 2.0 * p.powers()[..last].iter().sum::<f64>() + p.powers()[last];
        assert_relative_eq!(doubled, sum_sq, epsilon = 1e-9);
    }

    #[test]
    fn dominant_peaks_ranked_by_power() {
        let x: Vec<f64> = sine(144, 12.0, 3.0)
            .iter()
            .zip(sine(144, 6.0, 1.0))
            .map(|(a, b)| a + b)
            .collect();
        let peaks = periodogram(&x, Detrend::Constant).dominant(3, 2.0);

        assert_eq!(peaks.len(), 2);
        assert_relative_eq!(peaks[0].period, 12.0, epsilon = 1e-9);
        assert_relative_eq!(peaks[1].period, 6.0, epsilon = 1e-9);
        assert_relative_eq!(peaks[0].share, 0.9, epsilon = 1e-9);
    }

    #[test]
    fn dominant_respects_min_period() {
        let x: Vec<f64> = sine(144, 12.0, 1.0)
            .iter()
            .zip(sine(144, 3.0, 5.0))
            .map(|(a, b)| a + b)
            .collect();
        let peaks = periodogram(&x, Detrend::Constant).dominant(5, 4.0);
        assert_relative_eq!(peaks[0].period, 12.0, epsilon = 1e-9);
    }

    #[test]
    fn linear_detrend_removes_line() {
        let x: Vec<f64> = (0..50).map(|t| 3.0 + 0.7 * t as f64).collect();
        for v in Detrend::Linear.apply(&x) {
            assert_relative_eq!(v, 0.0, epsilon = 1e-9);
        }
        let p = periodogram(&x, Detrend::Linear);
        assert!(p.total_power() < 1e-12);
    }

    #[test]
    fn short_and_empty_inputs() {
        assert!(periodogram(&[1.0, 2.0, 3.0], Detrend::None).is_empty());
        assert!(fft_real(&[]).is_empty());
        assert!(Detrend::Linear.apply(&[]).is_empty());
    }
}
