//! Analysis configuration, loaded from TOML.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::io::{DataConfig, Layout};
use crate::models::{ArmaGridConfig, MAX_DEGREE};
use crate::seasonality::STL;
use crate::spectral::SpectralConfig;
use crate::validation::{AdfConfig, KpssConfig};

/// STL settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecompositionConfig {
    /// Seasonal period in months.
    pub period: usize,
    /// Seasonal span `ns`; the STL default when unset.
    pub seasonal_span: Option<usize>,
    /// Trend span `nt`; derived from `ns` when unset.
    pub trend_span: Option<usize>,
    /// Low-pass span `nl`.
    pub low_pass_span: Option<usize>,
    /// Use robustness iterations.
    pub robust: bool,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            period: 12,
            seasonal_span: None,
            trend_span: None,
            low_pass_span: None,
            robust: false,
        }
    }
}

impl DecompositionConfig {
    /// The configured decomposer.
    pub fn stl(&self) -> STL {
        let mut stl = STL::new(self.period);
        if let Some(ns) = self.seasonal_span {
            stl = stl.with_seasonal_smoothness(ns);
        }
        if let Some(nt) = self.trend_span {
            stl = stl.with_trend_smoothness(nt);
        }
        if let Some(nl) = self.low_pass_span {
            stl = stl.with_low_pass_smoothness(nl);
        }
        if self.robust {
            stl = stl.robust();
        }
        stl
    }
}

/// Polynomial trend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrendConfig {
    pub degree: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self { degree: 2 }
    }
}

/// Forecast horizon, interval level and holdout length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForecastConfig {
    /// Months forecast past the last observation.
    pub horizon: usize,
    /// Prediction interval coverage.
    pub level: f64,
    /// Trailing months withheld for evaluation; 0 disables it.
    pub holdout: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 24,
            level: 0.95,
            holdout: 0,
        }
    }
}

/// Hypothesis test settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnosticsConfig {
    pub adf: AdfConfig,
    pub kpss: KpssConfig,
    /// Significance level for every verdict.
    pub alpha: f64,
    /// Ljung-Box lags reported for the ARMA residuals.
    pub ljung_box_lags: Vec<usize>,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            adf: AdfConfig::default(),
            kpss: KpssConfig::default(),
            alpha: 0.05,
            ljung_box_lags: vec![6, 12, 24],
        }
    }
}

impl DiagnosticsConfig {
    /// Largest configured Ljung-Box lag.
    pub fn max_ljung_box_lag(&self) -> usize {
        self.ljung_box_lags.iter().copied().max().unwrap_or(0)
    }
}

/// Command-line values that replace their configuration-file counterparts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub layout: Option<Layout>,
    pub series_filter: Option<String>,
    pub date_column: Option<String>,
    pub value_column: Option<String>,
    pub horizon: Option<usize>,
    pub holdout: Option<usize>,
    pub top_k: Option<usize>,
}

/// Full configuration of an analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub data: DataConfig,
    pub decomposition: DecompositionConfig,
    pub arma: ArmaGridConfig,
    pub trend: TrendConfig,
    pub forecast: ForecastConfig,
    pub spectral: SpectralConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl AnalysisConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|err| AnalysisError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| AnalysisError::Config(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Replace file values with every override that is set.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(layout) = overrides.layout {
            self.data.layout = layout;
        }
        if let Some(filter) = &overrides.series_filter {
            self.data.series_filter = filter.clone();
        }
        if let Some(column) = &overrides.date_column {
            self.data.date_column = column.clone();
        }
        if let Some(column) = &overrides.value_column {
            self.data.value_column = column.clone();
        }
        if let Some(horizon) = overrides.horizon {
            self.forecast.horizon = horizon;
        }
        if let Some(holdout) = overrides.holdout {
            self.forecast.holdout = holdout;
        }
        if let Some(top_k) = overrides.top_k {
            self.spectral.top_k = top_k;
        }
    }

    /// Check every section for out-of-range values.
    pub fn validate(&self) -> Result<()> {
        self.data.validate()?;
        self.arma.validate()?;

        if self.decomposition.period < 2 {
            return Err(AnalysisError::Config(format!(
                "decomposition.period must be at least 2, got {}",
                self.decomposition.period
            )));
        }
        if self.trend.degree > MAX_DEGREE {
            return Err(AnalysisError::Config(format!(
                "trend.degree must be at most {MAX_DEGREE}, got {}",
                self.trend.degree
            )));
        }
        if self.forecast.horizon == 0 {
            return Err(AnalysisError::Config(
                "forecast.horizon must be positive".to_string(),
            ));
        }
        if !(self.forecast.level > 0.0 && self.forecast.level < 1.0) {
            return Err(AnalysisError::Config(format!(
                "forecast.level must lie in (0, 1), got {}",
                self.forecast.level
            )));
        }
        if !(self.diagnostics.alpha > 0.0 && self.diagnostics.alpha < 1.0) {
            return Err(AnalysisError::Config(format!(
                "diagnostics.alpha must lie in (0, 1), got {}",
                self.diagnostics.alpha
            )));
        }
        if self.diagnostics.ljung_box_lags.contains(&0) {
            return Err(AnalysisError::Config(
                "diagnostics.ljung_box_lags must be positive".to_string(),
            ));
        }
        if self.spectral.top_k == 0 {
            return Err(AnalysisError::Config(
                "spectral.top_k must be positive".to_string(),
            ));
        }
        if !(self.spectral.min_period >= 2.0) {
            return Err(AnalysisError::Config(format!(
                "spectral.min_period must be at least 2, got {}",
                self.spectral.min_period
            )));
        }
        Ok(())
    }
}
