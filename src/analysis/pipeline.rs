//! End-to-end analysis: decompose, model, forecast and check.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::analysis::config::AnalysisConfig;
use crate::analysis::report::{
    AnalysisReport, ArmaSummary, ComponentForecasts, ComponentRow, DecompositionSummary,
    HoldoutReport, HoldoutRow, ResidualDiagnostics, SeriesSummary, StationaritySection,
    TrendSummary,
};
use crate::core::{Forecast, MonthlySeries};
use crate::error::{AnalysisError, Result};
use crate::io::{clean_observations, load_csv};
use crate::models::{
    Arma, ArmaGridSearch, Forecaster, GridSearchResult, PolynomialTrend, SeasonalCycle,
};
use crate::seasonality::STLResult;
use crate::spectral::{spectral_summary_with, SpectralSummary};
use crate::utils::calculate_metrics;
use crate::validation::{durbin_watson, ljung_box, test_stationarity, StationarityVerdict};

/// Models fitted to one stretch of the series.
#[derive(Debug, Clone)]
pub struct ComponentModels {
    pub stl: STLResult,
    pub grid: GridSearchResult,
    pub arma: Arma,
    pub trend: PolynomialTrend,
    pub cycle: SeasonalCycle,
}

/// Runs the configured analysis on a monthly series.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    config: AnalysisConfig,
}

impl Analysis {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn period(&self) -> usize {
        self.config.decomposition.period
    }

    /// Load and clean the configured input file.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<MonthlySeries> {
        let raw = load_csv(path, &self.config.data)?;
        let series = clean_observations(&raw, &self.config.data, self.period())?;
        info!(
            label = series.label(),
            n = series.len(),
            start = %series.start().format("%Y-%m"),
            end = %series.end().format("%Y-%m"),
            "series ready"
        );
        Ok(series)
    }

    /// STL decomposition of `values`.
    pub fn decompose(&self, values: &[f64]) -> Result<STLResult> {
        let stl = self.config.decomposition.stl();
        stl.decompose(values).ok_or(AnalysisError::InsufficientData {
            needed: 2 * self.period(),
            got: values.len(),
        })
    }

    pub fn decomposition_summary(&self, stl: &STLResult) -> DecompositionSummary {
        let decomposer = self.config.decomposition.stl();
        let (ns, nt, nl) = decomposer.spans();
        DecompositionSummary {
            period: decomposer.period(),
            seasonal_span: ns,
            trend_span: nt,
            low_pass_span: nl,
            robust: decomposer.is_robust(),
            seasonal_strength: stl.seasonal_strength(),
            trend_strength: stl.trend_strength(),
        }
    }

    /// ADF and KPSS on the observed series and the remainder.
    ///
    /// Fails when either series gives an undefined statistic.
    pub fn stationarity(&self, observed: &[f64], remainder: &[f64]) -> Result<StationaritySection> {
        let diag = &self.config.diagnostics;
        let section = StationaritySection {
            observed: test_stationarity(observed, &diag.adf, &diag.kpss, diag.alpha),
            remainder: test_stationarity(remainder, &diag.adf, &diag.kpss, diag.alpha),
        };
        for (name, report) in [("series", &section.observed), ("remainder", &section.remainder)] {
            if report.verdict == StationarityVerdict::Undefined {
                return Err(AnalysisError::ComputationError(format!(
                    "stationarity tests undefined for the {name} (ADF p = {}, KPSS p = {})",
                    report.adf.p_value, report.kpss.p_value
                )));
            }
        }
        Ok(section)
    }

    /// ARMA grid search on the remainder.
    pub fn grid_search(&self, remainder: &[f64]) -> GridSearchResult {
        ArmaGridSearch::new(self.config.arma.clone()).search(remainder)
    }

    /// Periodogram comparison of the observed series and the remainder.
    pub fn spectrum(&self, observed: &[f64], remainder: &[f64]) -> SpectralSummary {
        spectral_summary_with(observed, remainder, &self.config.spectral)
    }

    /// Ljung-Box at the configured lags and Durbin-Watson on the ARMA
    /// residuals.
    pub fn residual_diagnostics(&self, model: &Arma) -> ResidualDiagnostics {
        let diag = &self.config.diagnostics;
        let residuals = model.residuals().unwrap_or_default();
        let model_df = model.order().num_coefficients();
        let table = ljung_box(residuals, diag.max_ljung_box_lag(), model_df);

        let mut lags = diag.ljung_box_lags.clone();
        lags.sort_unstable();
        lags.dedup();
        let rows: Vec<_> = lags.iter().filter_map(|&lag| table.at(lag).cloned()).collect();
        if rows.len() < lags.len() {
            warn!(
                requested = lags.len(),
                available = rows.len(),
                "Ljung-Box lags beyond the residual length were skipped"
            );
        }

        ResidualDiagnostics {
            ljung_box: rows,
            white_noise: table.is_white_noise(diag.alpha),
            durbin_watson: durbin_watson(residuals),
        }
    }

    /// Decompose `values` and fit the three component models.
    pub fn fit_components(&self, values: &[f64]) -> Result<ComponentModels> {
        let stl = self.decompose(values)?;
        debug!(
            seasonal_strength = stl.seasonal_strength(),
            trend_strength = stl.trend_strength(),
            "decomposed"
        );

        let grid = self.grid_search(&stl.remainder);
        let arma = grid.fit_best(&stl.remainder)?;
        info!(
            model = arma.name().as_str(),
            aic = arma.aic().unwrap_or(f64::NAN),
            failed = grid.num_failed(),
            "selected remainder model"
        );

        let mut trend = PolynomialTrend::new(self.config.trend.degree);
        trend.fit(&stl.trend)?;

        let mut cycle = SeasonalCycle::new(self.period());
        cycle.fit(&stl.seasonal)?;

        Ok(ComponentModels {
            stl,
            grid,
            arma,
            trend,
            cycle,
        })
    }

    /// Component forecasts and their sum for `horizon` months.
    pub fn forecast(&self, models: &ComponentModels, horizon: usize) -> Result<ComponentForecasts> {
        let trend = models.trend.predict(horizon)?;
        let seasonal = models.cycle.predict(horizon)?;
        let remainder = models
            .arma
            .predict_with_intervals(horizon, self.config.forecast.level)?;
        let total = Forecast::sum(&[&trend, &seasonal, &remainder])?;
        Ok(ComponentForecasts {
            trend,
            seasonal,
            remainder,
            total,
        })
    }

    /// Full analysis of `series`.
    pub fn run(&self, series: &MonthlySeries) -> Result<AnalysisReport> {
        let values = series.values();
        info!(label = series.label(), n = values.len(), "starting analysis");

        let summary = SeriesSummary::of(series);
        let models = self.fit_components(values)?;
        let decomposition = self.decomposition_summary(&models.stl);
        let stationarity = self.stationarity(values, &models.stl.remainder)?;
        debug!(
            observed = ?stationarity.observed.verdict,
            remainder = ?stationarity.remainder.verdict,
            "stationarity"
        );

        let residuals = self.residual_diagnostics(&models.arma);
        if !residuals.white_noise {
            warn!(
                model = models.arma.name().as_str(),
                "remainder model residuals fail the Ljung-Box test"
            );
        }

        let horizon = self.config.forecast.horizon;
        let forecasts = self.forecast(&models, horizon)?;
        let forecast = forecasts.rows(&series.future_dates(horizon));

        let spectral = self.spectrum(values, &models.stl.remainder);
        debug!(
            annual_removed = spectral.annual.removed_by_decomposition(),
            semi_annual_removed = spectral.semi_annual.removed_by_decomposition(),
            "spectral check"
        );

        let holdout = match self.config.forecast.holdout {
            0 => None,
            h => Some(self.holdout(series, h)?),
        };

        info!("analysis complete");
        Ok(AnalysisReport {
            series: summary,
            decomposition,
            stationarity,
            arma: ArmaSummary::of(&models.arma),
            residuals,
            trend: TrendSummary::of(&models.trend),
            level: self.config.forecast.level,
            forecast,
            spectral,
            holdout,
            components: ComponentRow::table(series, &models.stl),
            grid: models.grid,
        })
    }

    /// Refit on all but the last `h` months and score the `h`-step
    /// forecast against them.
    pub fn holdout(&self, series: &MonthlySeries, h: usize) -> Result<HoldoutReport> {
        let n = series.len();
        if h == 0 || h >= n {
            return Err(AnalysisError::InvalidParameter(format!(
                "holdout of {h} months must be inside 1..{n}"
            )));
        }
        let (train, test) = series.split_at(n - h)?;
        info!(train = train.len(), test = test.len(), "holdout evaluation");

        let models = self.fit_components(train.values())?;
        let forecasts = self.forecast(&models, h)?;
        let total = &forecasts.total;
        let metrics = calculate_metrics(
            test.values(),
            total.point(),
            Some((train.values(), self.period())),
        )?;

        let lower = total.lower();
        let upper = total.upper();
        let rows: Vec<HoldoutRow> = test
            .dates()
            .iter()
            .zip(test.values())
            .enumerate()
            .map(|(i, (&date, &actual))| HoldoutRow {
                date,
                actual,
                forecast: total.point()[i],
                lower: lower.map(|l| l[i]),
                upper: upper.map(|u| u[i]),
            })
            .collect();

        let coverage = match (lower, upper) {
            (Some(_), Some(_)) => {
                let inside = rows
                    .iter()
                    .filter(|r| match (r.lower, r.upper) {
                        (Some(lo), Some(hi)) => (lo..=hi).contains(&r.actual),
                        _ => false,
                    })
                    .count();
                Some(inside as f64 / rows.len() as f64)
            }
            _ => None,
        };

        info!(mae = metrics.mae, rmse = metrics.rmse, "holdout scored");
        Ok(HoldoutReport {
            train_end: train.end(),
            horizon: h,
            order: models.arma.order(),
            metrics,
            coverage,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    /// Synthetic monthly sales: quadratic growth, annual and semi-annual
    /// cycles, AR(1) noise.
    fn sales(n: usize, seed: u64) -> MonthlySeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ar = 0.0;
        let values = (0..n)
            .map(|t| {
                ar = 0.5 * ar + rng.gen_range(-1.0..1.0);
                let t = t as f64;
                20_000.0 + 15.0 * t - 0.02 * t * t
                    + 1_500.0 * (2.0 * PI * t / 12.0).cos()
                    + 400.0 * (2.0 * PI * t / 6.0).sin()
                    + 150.0 * ar
            })
            .collect();
        MonthlySeries::new(
            NaiveDate::from_ymd_opt(2010, 1, 1).unwrap(),
            values,
            "California : all sectors",
        )
        .unwrap()
    }

    fn small_grid() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.arma.p_range = [0, 2];
        config.arma.q_range = [0, 1];
        config.forecast.horizon = 12;
        config
    }

    #[test]
    fn run_produces_consistent_report() {
        let series = sales(120, 1);
        let report = Analysis::new(small_grid()).run(&series).unwrap();

        assert_eq!(report.series.nobs, 120);
        assert_eq!(report.components.len(), 120);
        assert_eq!(report.grid.entries().len(), 6);
        assert!(report.decomposition.seasonal_strength > 0.8);

        for row in &report.components {
            assert_relative_eq!(
                row.trend + row.seasonal + row.remainder,
                row.observed,
                epsilon = 1e-6
            );
        }

        assert_eq!(report.forecast.len(), 12);
        assert_eq!(
            report.forecast[0].date,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
        for row in &report.forecast {
            assert_relative_eq!(
                row.forecast,
                row.trend + row.seasonal + row.remainder,
                epsilon = 1e-9
            );
            let (lo, hi) = (row.lower.unwrap(), row.upper.unwrap());
            assert!(lo < row.forecast && row.forecast < hi);
        }

        assert_eq!(
            report.residuals.ljung_box.iter().map(|r| r.lag).collect::<Vec<_>>(),
            vec![6, 12, 24]
        );
        assert!(report.spectral.annual.in_series);
        assert!(report.holdout.is_none());

        let text = report.render_summary();
        assert!(text.contains("California : all sectors"));
        assert!(text.contains("best order"));
        assert!(text.contains("Spectral analysis"));
    }

    #[test]
    fn seasonal_forecast_keeps_phase() {
        let series = sales(96, 2);
        let analysis = Analysis::new(small_grid());
        let models = analysis.fit_components(series.values()).unwrap();
        let forecasts = analysis.forecast(&models, 24).unwrap();

        let n = series.len();
        for h in 0..24 {
            assert_relative_eq!(
                forecasts.seasonal.point()[h],
                models.stl.seasonal[n - 12 + h % 12],
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn holdout_scores_withheld_months() {
        let mut config = small_grid();
        config.forecast.holdout = 12;
        let series = sales(120, 3);
        let report = Analysis::new(config).run(&series).unwrap();

        let holdout = report.holdout.unwrap();
        assert_eq!(holdout.horizon, 12);
        assert_eq!(holdout.rows.len(), 12);
        assert_eq!(holdout.train_end, NaiveDate::from_ymd_opt(2018, 12, 1).unwrap());
        assert_eq!(holdout.rows[0].actual, series.values()[108]);
        // The signal dominates the noise, so the forecast tracks closely.
        assert!(holdout.metrics.mape.unwrap() < 5.0);
        let coverage = holdout.coverage.unwrap();
        assert!((0.0..=1.0).contains(&coverage));
    }

    #[test]
    fn holdout_rejects_bad_lengths() {
        let series = sales(60, 4);
        let analysis = Analysis::new(small_grid());
        assert!(analysis.holdout(&series, 0).is_err());
        assert!(analysis.holdout(&series, 60).is_err());
        // 50 training months is fine; 20 is below two cycles after the split.
        assert!(analysis.holdout(&series, 10).is_ok());
        assert!(matches!(
            analysis.holdout(&series, 40),
            Err(AnalysisError::InsufficientData { needed: 24, got: 20 })
        ));
    }

    #[test]
    fn short_series_is_insufficient() {
        let series = sales(20, 5);
        assert_eq!(
            Analysis::default().run(&series).unwrap_err(),
            AnalysisError::InsufficientData { needed: 24, got: 20 }
        );
    }

    #[test]
    fn report_serializes_to_json() {
        let report = Analysis::new(small_grid()).run(&sales(72, 6)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["series"]["nobs"], 72);
        assert_eq!(json["grid"]["entries"].as_array().unwrap().len(), 6);
        assert!(json["grid"]["entries"][0]["status"].is_string());
        assert_eq!(json["forecast"].as_array().unwrap().len(), 12);
        assert_eq!(json["forecast"][0]["date"], "2016-01-01");
        assert!(json["holdout"].is_null());
    }

    #[test]
    fn constant_input_has_no_stationarity_verdict() {
        let analysis = Analysis::default();
        let err = analysis.stationarity(&[5.0; 48], &[0.0; 48]).unwrap_err();
        assert!(matches!(err, AnalysisError::ComputationError(msg) if msg.contains("series")));

        let series = sales(96, 7);
        let stl = analysis.decompose(series.values()).unwrap();
        let err = analysis.stationarity(series.values(), &[0.0; 96]).unwrap_err();
        assert!(matches!(err, AnalysisError::ComputationError(msg) if msg.contains("remainder")));
        assert!(analysis.stationarity(series.values(), &stl.remainder).is_ok());
    }
}
