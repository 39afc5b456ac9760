//! Spectral comparison of the observed series and the STL remainder.

use serde::{Deserialize, Serialize};

use crate::spectral::fisher::{fisher_g_test, FisherGResult};
use crate::spectral::periodogram::{periodogram, Detrend, Periodogram, SpectralPeak};

/// Annual cycle of a monthly series.
pub const ANNUAL_PERIOD: f64 = 12.0;
/// Semi-annual cycle of a monthly series.
pub const SEMI_ANNUAL_PERIOD: f64 = 6.0;

/// Options for [`spectral_summary_with`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpectralConfig {
    /// Peaks reported per spectrum.
    pub top_k: usize,
    /// Shortest period considered a peak, in months.
    pub min_period: f64,
    pub series_detrend: Detrend,
    pub remainder_detrend: Detrend,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_period: 2.0,
            series_detrend: Detrend::Linear,
            remainder_detrend: Detrend::Constant,
        }
    }
}

/// Peaks and Fisher's g for one spectrum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumSummary {
    pub peaks: Vec<SpectralPeak>,
    pub fisher: FisherGResult,
    #[serde(skip)]
    pub periodogram: Periodogram,
}

impl SpectrumSummary {
    pub fn new(periodogram: Periodogram, top_k: usize, min_period: f64) -> Self {
        Self {
            peaks: periodogram.dominant(top_k, min_period),
            fisher: fisher_g_test(&periodogram),
            periodogram,
        }
    }

    /// Strongest reported peak within one Fourier bin of `period`.
    pub fn peak_near(&self, period: f64) -> Option<&SpectralPeak> {
        let n = self.periodogram.series_len();
        if n == 0 || !(period > 0.0) {
            return None;
        }
        let target = self.periodogram.bin_of(1.0 / period);
        self.peaks
            .iter()
            .find(|peak| self.periodogram.bin_of(peak.frequency).abs_diff(target) <= 1)
    }
}

/// Whether a cycle shows up in each spectrum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleCheck {
    pub period: f64,
    pub in_series: bool,
    pub in_remainder: bool,
    pub series_share: Option<f64>,
    pub remainder_share: Option<f64>,
}

impl CycleCheck {
    fn new(period: f64, series: &SpectrumSummary, remainder: &SpectrumSummary) -> Self {
        let series_peak = series.peak_near(period);
        let remainder_peak = remainder.peak_near(period);
        Self {
            period,
            in_series: series_peak.is_some(),
            in_remainder: remainder_peak.is_some(),
            series_share: series_peak.map(|p| p.share),
            remainder_share: remainder_peak.map(|p| p.share),
        }
    }

    /// Present in the observed series and gone from the remainder.
    pub fn removed_by_decomposition(&self) -> bool {
        self.in_series && !self.in_remainder
    }
}

/// Spectral view of the observed series next to the remainder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectralSummary {
    pub series: SpectrumSummary,
    pub remainder: SpectrumSummary,
    pub annual: CycleCheck,
    pub semi_annual: CycleCheck,
}

/// [`spectral_summary_with`] under the default configuration.
pub fn spectral_summary(series: &[f64], remainder: &[f64]) -> SpectralSummary {
    spectral_summary_with(series, remainder, &SpectralConfig::default())
}

/// Compare the dominant cycles of `series` and `remainder`.
///
/// A cycle counts as present when one of the `top_k` peaks lies within one
/// Fourier bin of its frequency.
pub fn spectral_summary_with(
    series: &[f64],
    remainder: &[f64],
    config: &SpectralConfig,
) -> SpectralSummary {
    let series = SpectrumSummary::new(
        periodogram(series, config.series_detrend),
        config.top_k,
        config.min_period,
    );
    let remainder = SpectrumSummary::new(
        periodogram(remainder, config.remainder_detrend),
        config.top_k,
        config.min_period,
    );
    let annual = CycleCheck::new(ANNUAL_PERIOD, &series, &remainder);
    let semi_annual = CycleCheck::new(SEMI_ANNUAL_PERIOD, &series, &remainder);

    SpectralSummary {
        series,
        remainder,
        annual,
        semi_annual,
    }
}
