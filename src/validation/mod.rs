//! Statistical tests for the series and for model residuals.
//!
//! # Example
//!
//! ```
//! use elecsales::validation::{adf_test, durbin_watson, kpss_test, ljung_box};
//! use elecsales::validation::{AdfConfig, KpssConfig};
//!
//! let residuals = vec![0.1, -0.2, 0.15, -0.1, 0.05, -0.08, 0.12, -0.15, 0.1, -0.05];
//! let table = ljung_box(&residuals, 5, 0);
//! assert_eq!(table.rows.len(), 5);
//!
//! let dw = durbin_watson(&residuals);
//! assert!(dw.statistic > 2.0);
//!
//! let series: Vec<f64> = (0..60).map(|i| (i as f64 * 0.7).sin()).collect();
//! let adf = adf_test(&series, &AdfConfig::default());
//! let kpss = kpss_test(&series, &KpssConfig::default());
//! assert!(adf.statistic.is_finite() && kpss.statistic.is_finite());
//! ```

pub mod correlogram;
pub mod stationarity;

pub use correlogram::{acf, confidence_band, pacf, Correlogram};
pub use residual_tests::{
    durbin_watson, ljung_box, AutocorrelationType, DurbinWatsonResult, LjungBoxRow, LjungBoxTable,
};
pub use stationarity::{
    adf_critical_values, adf_p_value, adf_test, kpss_test, test_stationarity, AdfConfig,
    AdfRegression, CriticalValues, KpssConfig, KpssLags, KpssRegression, StationarityReport,
    StationarityResult, StationarityTest, StationarityVerdict,
};
