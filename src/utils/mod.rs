//! Numerical helpers shared by the models and tests.

pub mod metrics;
pub mod ols;
pub mod optimization;
pub mod stats;

pub use metrics::{calculate_metrics, AccuracyMetrics};
pub use ols::{lstsq, OlsFit};
pub use optimization::{nelder_mead, NelderMeadConfig, NelderMeadResult};
pub use stats::{mean, median, normal_cdf, quantile_normal, std_dev, variance};
