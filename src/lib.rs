//! # elecsales
//!
//! Classical time-series modelling of monthly retail electricity sales.
//!
//! The workflow decomposes a monthly series with STL, fits ARMA models to
//! the remainder over a small order grid, extrapolates the trend with a
//! polynomial and repeats the last seasonal cycle. The forecast is the sum
//! of the three component forecasts. Periodogram, Fisher's g, ADF, KPSS and
//! Ljung-Box checks confirm what each step removed.
//!
//! ```
//! use elecsales::prelude::*;
//! use chrono::NaiveDate;
//!
//! let values: Vec<f64> = (0..72)
//!     .map(|t| 100.0 + 0.5 * t as f64 + 10.0 * (std::f64::consts::PI * t as f64 / 6.0).sin())
//!     .collect();
//! let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
//! let series = MonthlySeries::new(start, values, "demo")?;
//!
//! let stl = STL::new(12).decompose(series.values()).unwrap();
//! assert!(stl.seasonal_strength() > 0.9);
//! # Ok::<(), AnalysisError>(())
//! ```

#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::needless_range_loop)]

pub mod analysis;
pub mod core;
pub mod error;
pub mod io;
pub mod models;
pub mod seasonality;
pub mod spectral;
pub mod utils;
pub mod validation;

pub use error::{AnalysisError, Result};

pub mod prelude {
    pub use crate::analysis::{Analysis, AnalysisConfig, AnalysisReport};
    pub use crate::core::{Forecast, MonthlySeries};
    pub use crate::error::{AnalysisError, Result};
    pub use crate::models::{Arma, ArmaGridSearch, ArmaOrder, Forecaster, PolynomialTrend};
    pub use crate::seasonality::{STLResult, STL};
    pub use crate::utils::{calculate_metrics, AccuracyMetrics};
}
