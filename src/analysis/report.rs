//! Analysis results and their text rendering.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::{Forecast, MonthlySeries};
use crate::error::Result;
use crate::models::{Arma, ArmaOrder, FitOutcome, Forecaster, GridSearchResult, PolynomialTrend};
use crate::seasonality::STLResult;
use crate::spectral::{CycleCheck, SpectralSummary, SpectrumSummary};
use crate::utils::{mean, std_dev, AccuracyMetrics};
use crate::validation::{DurbinWatsonResult, LjungBoxRow, StationarityReport, StationarityResult};

/// Descriptive statistics of the analysed series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub label: String,
    pub nobs: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SeriesSummary {
    pub fn of(series: &MonthlySeries) -> Self {
        let values = series.values();
        Self {
            label: series.label().to_string(),
            nobs: series.len(),
            start: series.start(),
            end: series.end(),
            mean: mean(values),
            std_dev: std_dev(values),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// STL settings in use and component strengths.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecompositionSummary {
    pub period: usize,
    pub seasonal_span: usize,
    pub trend_span: usize,
    pub low_pass_span: usize,
    pub robust: bool,
    pub seasonal_strength: f64,
    pub trend_strength: f64,
}

/// One month of the decomposition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentRow {
    pub date: NaiveDate,
    pub observed: f64,
    pub trend: f64,
    pub seasonal: f64,
    pub remainder: f64,
}

impl ComponentRow {
    pub fn table(series: &MonthlySeries, stl: &STLResult) -> Vec<Self> {
        series
            .dates()
            .iter()
            .zip(series.values())
            .enumerate()
            .map(|(i, (&date, &observed))| Self {
                date,
                observed,
                trend: stl.trend[i],
                seasonal: stl.seasonal[i],
                remainder: stl.remainder[i],
            })
            .collect()
    }
}

/// One forecast month: the three components and their sum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub date: NaiveDate,
    pub trend: f64,
    pub seasonal: f64,
    pub remainder: f64,
    pub forecast: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Component forecasts over one horizon.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentForecasts {
    pub trend: Forecast,
    pub seasonal: Forecast,
    pub remainder: Forecast,
    pub total: Forecast,
}

impl ComponentForecasts {
    pub fn horizon(&self) -> usize {
        self.total.horizon()
    }

    /// Rows dated by `dates`; extra dates or steps are dropped.
    pub fn rows(&self, dates: &[NaiveDate]) -> Vec<ForecastRow> {
        let lower = self.total.lower();
        let upper = self.total.upper();
        dates
            .iter()
            .take(self.horizon())
            .enumerate()
            .map(|(i, &date)| ForecastRow {
                date,
                trend: self.trend.point()[i],
                seasonal: self.seasonal.point()[i],
                remainder: self.remainder.point()[i],
                forecast: self.total.point()[i],
                lower: lower.map(|l| l[i]),
                upper: upper.map(|u| u[i]),
            })
            .collect()
    }
}

/// The selected ARMA model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmaSummary {
    pub name: String,
    pub order: ArmaOrder,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    /// `None` when no mean term was fitted.
    pub mean: Option<f64>,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    pub converged: bool,
}

impl ArmaSummary {
    pub fn of(model: &Arma) -> Self {
        Self {
            name: model.name(),
            order: model.order(),
            ar: model.ar_coefficients().to_vec(),
            ma: model.ma_coefficients().to_vec(),
            mean: model.includes_mean().then(|| model.mean()),
            sigma2: model.sigma2().unwrap_or(f64::NAN),
            log_likelihood: model.log_likelihood().unwrap_or(f64::NAN),
            aic: model.aic().unwrap_or(f64::NAN),
            bic: model.bic().unwrap_or(f64::NAN),
            converged: model.converged(),
        }
    }
}

/// White-noise checks on the ARMA residuals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualDiagnostics {
    /// Ljung-Box rows at the configured lags.
    pub ljung_box: Vec<LjungBoxRow>,
    /// Independence not rejected at the largest lag.
    pub white_noise: bool,
    pub durbin_watson: DurbinWatsonResult,
}

/// Fitted trend polynomial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSummary {
    pub degree: usize,
    /// Raw time-index scale, lowest power first.
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
}

impl TrendSummary {
    pub fn of(model: &PolynomialTrend) -> Self {
        Self {
            degree: model.degree(),
            coefficients: model.coefficients().unwrap_or_default(),
            r_squared: model.r_squared().unwrap_or(f64::NAN),
        }
    }
}

/// Stationarity of the observed series and of the remainder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationaritySection {
    pub observed: StationarityReport,
    pub remainder: StationarityReport,
}

/// One withheld month against its forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldoutRow {
    pub date: NaiveDate,
    pub actual: f64,
    pub forecast: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Out-of-sample evaluation on the trailing months.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldoutReport {
    /// Last month used for fitting.
    pub train_end: NaiveDate,
    pub horizon: usize,
    /// Order selected on the training stretch.
    pub order: ArmaOrder,
    pub metrics: AccuracyMetrics,
    /// Share of withheld months inside the prediction interval.
    pub coverage: Option<f64>,
    pub rows: Vec<HoldoutRow>,
}

/// Everything one analysis run produces.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub series: SeriesSummary,
    pub decomposition: DecompositionSummary,
    pub stationarity: StationaritySection,
    pub grid: GridSearchResult,
    pub arma: ArmaSummary,
    pub residuals: ResidualDiagnostics,
    pub trend: TrendSummary,
    /// Prediction interval coverage used for the forecast.
    pub level: f64,
    pub forecast: Vec<ForecastRow>,
    pub spectral: SpectralSummary,
    pub holdout: Option<HoldoutReport>,
    pub components: Vec<ComponentRow>,
}

impl AnalysisReport {
    /// Human-readable summary.
    pub fn render_summary(&self) -> String {
        self.to_string()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn write_coefficients(f: &mut fmt::Formatter<'_>, name: &str, values: &[f64]) -> fmt::Result {
    if values.is_empty() {
        return Ok(());
    }
    let list: Vec<String> = values.iter().map(|v| format!("{v:.4}")).collect();
    writeln!(f, "  {name:<10} [{}]", list.join(", "))
}

impl fmt::Display for SeriesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Series '{}': {} months, {} to {}",
            self.label,
            self.nobs,
            self.start.format("%Y-%m"),
            self.end.format("%Y-%m")
        )?;
        writeln!(
            f,
            "  mean {:.2}  sd {:.2}  min {:.2}  max {:.2}",
            self.mean, self.std_dev, self.min, self.max
        )
    }
}

impl fmt::Display for DecompositionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "STL decomposition (period {}, ns {}, nt {}, nl {}{})",
            self.period,
            self.seasonal_span,
            self.trend_span,
            self.low_pass_span,
            if self.robust { ", robust" } else { "" }
        )?;
        writeln!(f, "  seasonal strength {:.3}", self.seasonal_strength)?;
        writeln!(f, "  trend strength    {:.3}", self.trend_strength)
    }
}

fn write_test(f: &mut fmt::Formatter<'_>, name: &str, result: &StationarityResult) -> fmt::Result {
    writeln!(
        f,
        "    {name:<5} stat {:>8.3}  p {:.4}  lags {:>2}  5% cv {:.3}",
        result.statistic, result.p_value, result.lags, result.critical_values.cv_5pct
    )
}

impl fmt::Display for StationaritySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stationarity")?;
        for (name, report) in [("observed", &self.observed), ("remainder", &self.remainder)] {
            writeln!(f, "  {name}: {:?}", report.verdict)?;
            write_test(f, "ADF", &report.adf)?;
            write_test(f, "KPSS", &report.kpss)?;
        }
        Ok(())
    }
}

/// Display adapter printing a grid search as a score table.
pub struct GridTable<'a>(pub &'a GridSearchResult);

impl fmt::Display for GridTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grid = self.0;
        let best = grid.best_order();
        writeln!(
            f,
            "ARMA grid ({} candidates, {} failed, ranked by {:?})",
            grid.entries().len(),
            grid.num_failed(),
            grid.criterion()
        )?;
        writeln!(f, "  {:<9} {:>11} {:>11}  status", "order", "aic", "bic")?;
        for entry in grid.entries() {
            let marker = if Some(entry.order) == best { " *" } else { "" };
            match &entry.outcome {
                FitOutcome::Fitted { aic, bic, converged, .. } => writeln!(
                    f,
                    "  {:<9} {:>11.3} {:>11.3}  {}{marker}",
                    entry.order.to_string(),
                    aic,
                    bic,
                    if *converged { "ok" } else { "not converged" }
                )?,
                FitOutcome::Failed { reason } => writeln!(
                    f,
                    "  {:<9} {:>11} {:>11}  failed: {reason}",
                    entry.order.to_string(),
                    "-",
                    "-"
                )?,
            }
        }
        match best {
            Some(order) => writeln!(f, "  best order {order}"),
            None => writeln!(f, "  no candidate could be fitted"),
        }
    }
}

impl fmt::Display for ArmaSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Remainder model {}: AIC {:.3}  BIC {:.3}  sigma^2 {:.4}{}",
            self.name,
            self.aic,
            self.bic,
            self.sigma2,
            if self.converged { "" } else { "  (optimiser did not converge)" }
        )?;
        write_coefficients(f, "ar", &self.ar)?;
        write_coefficients(f, "ma", &self.ma)?;
        if let Some(mean) = self.mean {
            writeln!(f, "  {:<10} {mean:.4}", "mean")?;
        }
        Ok(())
    }
}

impl fmt::Display for ResidualDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Residual diagnostics")?;
        for row in &self.ljung_box {
            writeln!(
                f,
                "  Ljung-Box lag {:>2}: Q {:>8.3}  df {:>2}  p {:.4}",
                row.lag, row.statistic, row.df, row.p_value
            )?;
        }
        writeln!(f, "  white noise: {}", yes_no(self.white_noise))?;
        writeln!(
            f,
            "  Durbin-Watson {:.3} ({:?})",
            self.durbin_watson.statistic, self.durbin_watson.interpretation
        )
    }
}

impl fmt::Display for TrendSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Trend polynomial degree {} (R^2 {:.4})",
            self.degree, self.r_squared
        )?;
        write_coefficients(f, "coef", &self.coefficients)
    }
}

fn write_spectrum(f: &mut fmt::Formatter<'_>, name: &str, spectrum: &SpectrumSummary) -> fmt::Result {
    writeln!(
        f,
        "  {name}: Fisher g {:.4} (p {:.3e})",
        spectrum.fisher.statistic, spectrum.fisher.p_value
    )?;
    for peak in &spectrum.peaks {
        writeln!(
            f,
            "    period {:>7.2} months  power {:>12.3}  share {:>5.1}%",
            peak.period,
            peak.power,
            100.0 * peak.share
        )?;
    }
    Ok(())
}

fn write_cycle(f: &mut fmt::Formatter<'_>, name: &str, cycle: &CycleCheck) -> fmt::Result {
    writeln!(
        f,
        "  {name} ({} months): in series {}, in remainder {}",
        cycle.period,
        yes_no(cycle.in_series),
        yes_no(cycle.in_remainder)
    )
}

/// Display adapter for a [`SpectralSummary`].
pub struct SpectralTable<'a>(pub &'a SpectralSummary);

impl fmt::Display for SpectralTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.0;
        writeln!(f, "Spectral analysis")?;
        write_spectrum(f, "observed", &summary.series)?;
        write_spectrum(f, "remainder", &summary.remainder)?;
        write_cycle(f, "annual", &summary.annual)?;
        write_cycle(f, "semi-annual", &summary.semi_annual)
    }
}

impl fmt::Display for HoldoutReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;
        writeln!(
            f,
            "Holdout: last {} months (trained through {}, order {})",
            self.horizon,
            self.train_end.format("%Y-%m"),
            self.order
        )?;
        writeln!(
            f,
            "  MAE {:.3}  RMSE {:.3}  sMAPE {:.2}%",
            m.mae, m.rmse, m.smape
        )?;
        if let Some(mape) = m.mape {
            writeln!(f, "  MAPE {mape:.2}%")?;
        }
        if let Some(mase) = m.mase {
            writeln!(f, "  MASE {mase:.3}")?;
        }
        if let Some(coverage) = self.coverage {
            writeln!(f, "  interval coverage {:.1}%", 100.0 * coverage)?;
        }
        Ok(())
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.series)?;
        writeln!(f)?;
        write!(f, "{}", self.decomposition)?;
        writeln!(f)?;
        write!(f, "{}", self.stationarity)?;
        writeln!(f)?;
        write!(f, "{}", GridTable(&self.grid))?;
        writeln!(f)?;
        write!(f, "{}", self.arma)?;
        write!(f, "{}", self.residuals)?;
        writeln!(f)?;
        write!(f, "{}", self.trend)?;
        writeln!(f)?;

        writeln!(
            f,
            "Forecast ({} months, {:.0}% intervals)",
            self.forecast.len(),
            100.0 * self.level
        )?;
        writeln!(
            f,
            "  {:<7} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "month", "trend", "seasonal", "remainder", "forecast", "lower", "upper"
        )?;
        for row in &self.forecast {
            writeln!(
                f,
                "  {:<7} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
                row.date.format("%Y-%m").to_string(),
                row.trend,
                row.seasonal,
                row.remainder,
                row.forecast,
                row.lower.unwrap_or(f64::NAN),
                row.upper.unwrap_or(f64::NAN)
            )?;
        }
        writeln!(f)?;
        write!(f, "{}", SpectralTable(&self.spectral))?;

        if let Some(holdout) = &self.holdout {
            writeln!(f)?;
            write!(f, "{holdout}")?;
        }
        Ok(())
    }
}
