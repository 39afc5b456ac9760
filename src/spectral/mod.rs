//! Frequency-domain checks: periodogram, dominant cycles and Fisher's g.
//!
//! # Example
//!
//! ```
//! use elecsales::spectral::{periodogram, Detrend};
//!
//! let x: Vec<f64> = (0..120)
//!     .map(|t| (2.0 * std::f64::consts::PI * t as f64 / 12.0).sin())
//!     .collect();
//! let peaks = periodogram(&x, Detrend::Constant).dominant(1, 2.0);
//! assert!((peaks[0].period - 12.0).abs() < 1e-9);
//! ```

mod fisher;
mod periodogram;
mod summary;

pub use fisher::{fisher_g_test, FisherGResult};
pub use periodogram::{fft_real, periodogram, Detrend, Periodogram, SpectralPeak};
pub use summary::{
    spectral_summary, spectral_summary_with, CycleCheck, SpectralConfig, SpectralSummary,
    SpectrumSummary, ANNUAL_PERIOD, SEMI_ANNUAL_PERIOD,
};
