//! Stationarity tests: Augmented Dickey-Fuller and KPSS.
//!
//! Both tests return a [`StationarityResult`] with `NaN` statistics when the
//! series is too short for the requested regression, rather than an error.

use serde::{Deserialize, Serialize};

use crate::utils::ols::lstsq;
use crate::utils::stats::normal_cdf;

/// Deterministic terms of the ADF regression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdfRegression {
    /// Intercept only.
    #[default]
    Constant,
    /// Intercept and linear trend.
    ConstantTrend,
    /// No deterministic terms.
    NoConstant,
}

impl AdfRegression {
    fn num_terms(self) -> usize {
        match self {
            Self::NoConstant => 0,
            Self::Constant => 1,
            Self::ConstantTrend => 2,
        }
    }
}

/// ADF configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdfConfig {
    pub regression: AdfRegression,
    /// Largest augmentation lag. Defaults to `ceil(12 (n/100)^(1/4))`.
    pub max_lag: Option<usize>,
    /// Pick the lag by AIC; otherwise use `max_lag` directly.
    pub autolag: bool,
}

impl Default for AdfConfig {
    fn default() -> Self {
        Self {
            regression: AdfRegression::Constant,
            max_lag: None,
            autolag: true,
        }
    }
}

/// Deterministic terms of the KPSS null hypothesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpssRegression {
    /// Level stationarity.
    #[default]
    Level,
    /// Trend stationarity.
    Trend,
}

/// Bandwidth rule for the Newey-West long-run variance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpssLags {
    /// `trunc(4 (n/100)^(1/4))`
    Short,
    /// `trunc(12 (n/100)^(1/4))`
    #[default]
    Long,
    Fixed(usize),
}

impl KpssLags {
    fn resolve(self, n: usize) -> usize {
        let base = (n as f64 / 100.0).powf(0.25);
        let lags = match self {
            Self::Short => (4.0 * base) as usize,
            Self::Long => (12.0 * base) as usize,
            Self::Fixed(lags) => lags,
        };
        lags.min(n.saturating_sub(1))
    }
}

/// KPSS configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KpssConfig {
    pub regression: KpssRegression,
    pub lags: KpssLags,
}

/// Which test produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StationarityTest {
    Adf,
    Kpss,
}

/// Critical values at common significance levels.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CriticalValues {
    pub cv_1pct: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cv_2_5pct: Option<f64>,
    pub cv_5pct: f64,
    pub cv_10pct: f64,
}

/// Result of a stationarity test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationarityResult {
    pub test: StationarityTest,
    pub statistic: f64,
    pub p_value: f64,
    /// Augmentation lags (ADF) or bandwidth (KPSS).
    pub lags: usize,
    /// Observations in the final regression.
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

impl StationarityResult {
    fn undefined(test: StationarityTest, nobs: usize) -> Self {
        Self {
            test,
            statistic: f64::NAN,
            p_value: f64::NAN,
            lags: 0,
            nobs,
            critical_values: CriticalValues::default(),
        }
    }

    /// Whether the test points to stationarity at level `alpha`.
    ///
    /// ADF rejects its unit-root null when `p < alpha`; KPSS keeps its
    /// stationarity null when `p >= alpha`. Undefined results are `false`.
    pub fn is_stationary(&self, alpha: f64) -> bool {
        if self.p_value.is_nan() {
            return false;
        }
        match self.test {
            StationarityTest::Adf => self.p_value < alpha,
            StationarityTest::Kpss => self.p_value >= alpha,
        }
    }
}

// MacKinnon (1994) response surface for one regressor.
const TAU_MAX: [f64; 3] = [f64::INFINITY, 2.74, 0.7];
const TAU_MIN: [f64; 3] = [-19.04, -18.83, -16.18];
const TAU_STAR: [f64; 3] = [-1.04, -1.61, -2.89];
const TAU_SMALLP: [[f64; 3]; 3] = [
    [0.6344, 1.2378, 0.032496],
    [2.1659, 1.4412, 0.038269],
    [3.2512, 1.6047, 0.049588],
];
const TAU_LARGEP: [[f64; 4]; 3] = [
    [0.4797, 0.93557, -0.06999, 0.033066],
    [1.7339, 0.93202, -0.12745, -0.010368],
    [2.5261, 0.61654, -0.37956, -0.060285],
];

// MacKinnon (2010) finite-sample critical values, rows 1%, 5%, 10%.
const TAU_2010: [[[f64; 4]; 3]; 3] = [
    [
        [-2.56574, -2.2358, -3.627, 0.0],
        [-1.94100, -0.2686, -3.365, 31.223],
        [-1.61682, 0.2656, -2.714, 25.364],
    ],
    [
        [-3.43035, -6.5393, -16.786, -79.433],
        [-2.86154, -2.8903, -4.234, -40.040],
        [-2.56677, -1.5384, -2.809, 0.0],
    ],
    [
        [-3.95877, -9.0531, -28.428, -134.155],
        [-3.41049, -4.3904, -9.036, -45.374],
        [-3.12705, -2.5856, -3.925, -22.380],
    ],
];

const KPSS_LEVEL_CRIT: [f64; 4] = [0.347, 0.463, 0.574, 0.739];
const KPSS_TREND_CRIT: [f64; 4] = [0.119, 0.146, 0.176, 0.216];
const KPSS_PVALUES: [f64; 4] = [0.10, 0.05, 0.025, 0.01];

fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Approximate ADF p-value (MacKinnon 1994).
pub fn adf_p_value(statistic: f64, regression: AdfRegression) -> f64 {
    if statistic.is_nan() {
        return f64::NAN;
    }
    let i = regression.num_terms();
    if statistic > TAU_MAX[i] {
        return 1.0;
    }
    if statistic < TAU_MIN[i] {
        return 0.0;
    }
    let z = if statistic <= TAU_STAR[i] {
        polyval(&TAU_SMALLP[i], statistic)
    } else {
        polyval(&TAU_LARGEP[i], statistic)
    };
    normal_cdf(z)
}

/// ADF critical values for `nobs` observations (MacKinnon 2010).
pub fn adf_critical_values(regression: AdfRegression, nobs: usize) -> CriticalValues {
    let t = nobs as f64;
    let surface = &TAU_2010[regression.num_terms()];
    let at = |row: &[f64; 4]| row[0] + row[1] / t + row[2] / (t * t) + row[3] / (t * t * t);
    CriticalValues {
        cv_1pct: at(&surface[0]),
        cv_2_5pct: None,
        cv_5pct: at(&surface[1]),
        cv_10pct: at(&surface[2]),
    }
}

/// Regression rows for a given augmentation lag.
///
/// Row `t` regresses `dx[t]` on the deterministic terms, `x[t]` and
/// `dx[t-1..=t-lag]`; the first `start` differences are dropped.
fn adf_design(
    x: &[f64],
    dx: &[f64],
    lag: usize,
    start: usize,
    regression: AdfRegression,
) -> (Vec<Vec<f64>>, Vec<f64>) {
    let mut design = Vec::with_capacity(dx.len() - start);
    let mut y = Vec::with_capacity(dx.len() - start);
    for t in start..dx.len() {
        let mut row = Vec::with_capacity(regression.num_terms() + 1 + lag);
        match regression {
            AdfRegression::NoConstant => {}
            AdfRegression::Constant => row.push(1.0),
            AdfRegression::ConstantTrend => {
                row.push(1.0);
                row.push((t - start + 1) as f64);
            }
        }
        row.push(x[t]);
        row.extend((1..=lag).map(|j| dx[t - j]));
        design.push(row);
        y.push(dx[t]);
    }
    (design, y)
}

/// Augmented Dickey-Fuller unit-root test.
///
/// The null hypothesis is a unit root. With `autolag` every lag in
/// `0..=max_lag` is fitted on the common sample that drops the first
/// `max_lag` differences, and the lowest AIC wins. The chosen lag is then
/// refitted on all available observations.
pub fn adf_test(x: &[f64], config: &AdfConfig) -> StationarityResult {
    let n = x.len();
    let terms = config.regression.num_terms();
    let undefined = StationarityResult::undefined(StationarityTest::Adf, n);
    if n < 6 || x.iter().any(|v| !v.is_finite()) {
        return undefined;
    }

    let default_lag = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    let cap = match (n / 2).checked_sub(terms + 1) {
        Some(cap) => cap,
        None => return undefined,
    };
    let max_lag = config.max_lag.unwrap_or(default_lag).min(cap);

    let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();

    let lag = if config.autolag {
        let mut best: Option<(usize, f64)> = None;
        for lag in 0..=max_lag {
            let (design, y) = adf_design(x, &dx, lag, max_lag, config.regression);
            let Ok(fit) = lstsq(&design, &y) else {
                continue;
            };
            if !(fit.rss > 0.0) {
                continue;
            }
            let nobs = fit.nobs as f64;
            let aic = nobs * (fit.rss / nobs).ln() + 2.0 * fit.num_params() as f64;
            if best.is_none_or(|(_, best_aic)| aic < best_aic) {
                best = Some((lag, aic));
            }
        }
        match best {
            Some((lag, _)) => lag,
            None => return undefined,
        }
    } else {
        max_lag
    };

    let (design, y) = adf_design(x, &dx, lag, lag, config.regression);
    let Ok(fit) = lstsq(&design, &y) else {
        return undefined;
    };
    let statistic = fit.t_stat(terms);
    if !statistic.is_finite() {
        return StationarityResult { lags: lag, ..undefined };
    }

    StationarityResult {
        test: StationarityTest::Adf,
        statistic,
        p_value: adf_p_value(statistic, config.regression),
        lags: lag,
        nobs: fit.nobs,
        critical_values: adf_critical_values(config.regression, fit.nobs),
    }
}

/// Linear interpolation in the KPSS table, clamped to `[0.01, 0.10]`.
fn kpss_p_value(statistic: f64, critical: &[f64; 4]) -> f64 {
    if statistic.is_nan() {
        return f64::NAN;
    }
    if statistic <= critical[0] {
        return KPSS_PVALUES[0];
    }
    if statistic >= critical[3] {
        return KPSS_PVALUES[3];
    }
    let i = critical
        .windows(2)
        .position(|w| statistic <= w[1])
        .unwrap_or(2);
    let frac = (statistic - critical[i]) / (critical[i + 1] - critical[i]);
    KPSS_PVALUES[i] + frac * (KPSS_PVALUES[i + 1] - KPSS_PVALUES[i])
}

/// Newey-West long-run variance with Bartlett weights.
fn long_run_variance(residuals: &[f64], lags: usize) -> f64 {
    let n = residuals.len() as f64;
    let mut s: f64 = residuals.iter().map(|r| r * r).sum();
    for j in 1..=lags {
        let weight = 1.0 - j as f64 / (lags + 1) as f64;
        let gamma: f64 = residuals
            .iter()
            .skip(j)
            .zip(residuals.iter())
            .map(|(a, b)| a * b)
            .sum();
        s += 2.0 * weight * gamma;
    }
    s / n
}

/// KPSS test of level or trend stationarity.
///
/// The null hypothesis is stationarity, so large statistics (small
/// p-values) indicate a unit root.
pub fn kpss_test(x: &[f64], config: &KpssConfig) -> StationarityResult {
    let n = x.len();
    let undefined = StationarityResult::undefined(StationarityTest::Kpss, n);
    if n < 4 || x.iter().any(|v| !v.is_finite()) {
        return undefined;
    }

    let (residuals, critical) = match config.regression {
        KpssRegression::Level => {
            let mean = x.iter().sum::<f64>() / n as f64;
            (x.iter().map(|v| v - mean).collect::<Vec<_>>(), KPSS_LEVEL_CRIT)
        }
        KpssRegression::Trend => {
            let design: Vec<Vec<f64>> = (0..n).map(|t| vec![1.0, t as f64]).collect();
            match lstsq(&design, x) {
                Ok(fit) => (fit.residuals, KPSS_TREND_CRIT),
                Err(_) => return undefined,
            }
        }
    };

    let lags = config.lags.resolve(n);
    let variance = long_run_variance(&residuals, lags);
    if !(variance > 0.0) {
        return StationarityResult { lags, ..undefined };
    }

    let mut partial = 0.0;
    let eta = residuals
        .iter()
        .map(|r| {
            partial += r;
            partial * partial
        })
        .sum::<f64>()
        / (n * n) as f64;
    let statistic = eta / variance;

    StationarityResult {
        test: StationarityTest::Kpss,
        statistic,
        p_value: kpss_p_value(statistic, &critical),
        lags,
        nobs: n,
        critical_values: CriticalValues {
            cv_1pct: critical[3],
            cv_2_5pct: Some(critical[2]),
            cv_5pct: critical[1],
            cv_10pct: critical[0],
        },
    }
}

/// Joint reading of ADF and KPSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StationarityVerdict {
    /// ADF rejects a unit root, KPSS keeps stationarity.
    Stationary,
    /// ADF keeps the unit root, KPSS rejects stationarity.
    NonStationary,
    /// Both reject their nulls: difference the series.
    DifferenceStationary,
    /// Neither rejects: stationary around a deterministic trend.
    TrendStationary,
    /// A p-value is undefined (constant or too-short input).
    Undefined,
}

impl StationarityVerdict {
    pub fn from_results(adf: &StationarityResult, kpss: &StationarityResult, alpha: f64) -> Self {
        if adf.p_value.is_nan() || kpss.p_value.is_nan() {
            return Self::Undefined;
        }
        match (adf.is_stationary(alpha), kpss.is_stationary(alpha)) {
            (true, true) => Self::Stationary,
            (false, false) => Self::NonStationary,
            (true, false) => Self::DifferenceStationary,
            (false, true) => Self::TrendStationary,
        }
    }
}

/// ADF, KPSS and their joint verdict for one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationarityReport {
    pub adf: StationarityResult,
    pub kpss: StationarityResult,
    pub verdict: StationarityVerdict,
}

/// Run both tests with the given configurations.
pub fn test_stationarity(
    x: &[f64],
    adf: &AdfConfig,
    kpss: &KpssConfig,
    alpha: f64,
) -> StationarityReport {
    let adf = adf_test(x, adf);
    let kpss = kpss_test(x, kpss);
    let verdict = StationarityVerdict::from_results(&adf, &kpss, alpha);
    StationarityReport { adf, kpss, verdict }
}
