//! Exhaustive ARMA order selection over a (p, d, q) grid.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AnalysisError, Result};
use crate::models::arma::model::{Arma, ArmaOrder};
use crate::models::Forecaster;

/// Largest order accepted for any of p, d and q.
const MAX_ORDER: usize = 10;

/// Information criterion used to rank candidate orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    #[default]
    Aic,
    Bic,
}

/// Grid search configuration. Ranges are inclusive `[low, high]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArmaGridConfig {
    pub p_range: [usize; 2],
    pub d_range: [usize; 2],
    pub q_range: [usize; 2],
    /// Mean term for every candidate. `None` includes it only when `d = 0`.
    pub include_mean: Option<bool>,
    pub criterion: Criterion,
    /// Iteration cap for each optimiser run.
    pub max_iter: usize,
}

impl Default for ArmaGridConfig {
    fn default() -> Self {
        Self {
            p_range: [0, 5],
            d_range: [0, 0],
            q_range: [0, 5],
            include_mean: None,
            criterion: Criterion::Aic,
            max_iter: 2000,
        }
    }
}

impl ArmaGridConfig {
    /// Check that every range is ordered and within bounds.
    pub fn validate(&self) -> Result<()> {
        for (name, [low, high]) in [
            ("p_range", self.p_range),
            ("d_range", self.d_range),
            ("q_range", self.q_range),
        ] {
            if low > high {
                return Err(AnalysisError::Config(format!(
                    "arma.{name}: lower bound {low} exceeds upper bound {high}"
                )));
            }
            if high > MAX_ORDER {
                return Err(AnalysisError::Config(format!(
                    "arma.{name}: upper bound {high} exceeds {MAX_ORDER}"
                )));
            }
        }
        if self.max_iter == 0 {
            return Err(AnalysisError::Config(
                "arma.max_iter must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Candidate orders in visiting order: d, then p, then q.
    pub fn orders(&self) -> Vec<ArmaOrder> {
        let mut orders = Vec::new();
        for d in self.d_range[0]..=self.d_range[1] {
            for p in self.p_range[0]..=self.p_range[1] {
                for q in self.q_range[0]..=self.q_range[1] {
                    orders.push(ArmaOrder::new(p, d, q));
                }
            }
        }
        orders
    }

    fn model(&self, order: ArmaOrder) -> Arma {
        let model = Arma::new(order).with_max_iter(self.max_iter);
        match self.include_mean {
            Some(include) => model.with_mean(include),
            None => model,
        }
    }
}

/// Outcome of fitting one candidate order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FitOutcome {
    Fitted {
        aic: f64,
        bic: f64,
        log_likelihood: f64,
        sigma2: f64,
        num_params: usize,
        converged: bool,
    },
    Failed {
        reason: String,
    },
}

impl FitOutcome {
    fn from_model(model: &Arma) -> Result<Self> {
        match (model.aic(), model.bic(), model.log_likelihood(), model.sigma2()) {
            (Some(aic), Some(bic), Some(log_likelihood), Some(sigma2)) => Ok(Self::Fitted {
                aic,
                bic,
                log_likelihood,
                sigma2,
                num_params: model.num_params(),
                converged: model.converged(),
            }),
            _ => Err(AnalysisError::FitRequired),
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, Self::Fitted { .. })
    }

    /// Score under `criterion`, `None` for a failed fit.
    pub fn score(&self, criterion: Criterion) -> Option<f64> {
        match self {
            Self::Fitted { aic, bic, .. } => Some(match criterion {
                Criterion::Aic => *aic,
                Criterion::Bic => *bic,
            }),
            Self::Failed { .. } => None,
        }
    }
}

/// One grid cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridEntry {
    #[serde(flatten)]
    pub order: ArmaOrder,
    #[serde(flatten)]
    pub outcome: FitOutcome,
}

/// Every candidate and its outcome, in visiting order.
#[derive(Debug, Clone, Serialize)]
pub struct GridSearchResult {
    entries: Vec<GridEntry>,
    criterion: Criterion,
    #[serde(skip)]
    config: ArmaGridConfig,
}

impl GridSearchResult {
    pub fn entries(&self) -> &[GridEntry] {
        &self.entries
    }

    pub fn criterion(&self) -> Criterion {
        self.criterion
    }

    pub fn num_failed(&self) -> usize {
        self.entries.iter().filter(|e| !e.outcome.is_fitted()).count()
    }

    /// Lowest-scoring successful fit.
    ///
    /// Equal scores prefer fewer parameters, then the earlier entry.
    pub fn best(&self) -> Option<&GridEntry> {
        self.entries
            .iter()
            .filter_map(|entry| {
                let score = entry.outcome.score(self.criterion)?;
                score.is_finite().then_some((entry, score))
            })
            .min_by(|(a, sa), (b, sb)| {
                sa.total_cmp(sb)
                    .then(a.order.num_coefficients().cmp(&b.order.num_coefficients()))
            })
            .map(|(entry, _)| entry)
    }

    pub fn best_order(&self) -> Option<ArmaOrder> {
        self.best().map(|entry| entry.order)
    }

    /// `(order, score)` per entry; failed fits score `None`.
    pub fn score_table(&self) -> Vec<(ArmaOrder, Option<f64>)> {
        self.entries
            .iter()
            .map(|entry| (entry.order, entry.outcome.score(self.criterion)))
            .collect()
    }

    /// Refit the winning order on `values`.
    pub fn fit_best(&self, values: &[f64]) -> Result<Arma> {
        let order = self.best_order().ok_or_else(|| {
            AnalysisError::ComputationError(format!(
                "all {} candidate ARMA orders failed to fit",
                self.entries.len()
            ))
        })?;
        let mut model = self.config.model(order);
        model.fit(values)?;
        Ok(model)
    }
}

/// Fits every order of an [`ArmaGridConfig`] and ranks them.
#[derive(Debug, Clone, Default)]
pub struct ArmaGridSearch {
    config: ArmaGridConfig,
}

impl ArmaGridSearch {
    pub fn new(config: ArmaGridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArmaGridConfig {
        &self.config
    }

    /// Fit each candidate order. Failures are recorded, never propagated.
    pub fn search(&self, values: &[f64]) -> GridSearchResult {
        let orders = self.config.orders();
        debug!(candidates = orders.len(), n = values.len(), "starting ARMA grid search");

        let entries: Vec<GridEntry> = orders
            .into_iter()
            .map(|order| {
                let mut model = self.config.model(order);
                let outcome = model
                    .fit(values)
                    .and_then(|_| FitOutcome::from_model(&model))
                    .unwrap_or_else(|err| FitOutcome::Failed {
                        reason: err.to_string(),
                    });
                match &outcome {
                    FitOutcome::Fitted { aic, converged, .. } => {
                        debug!(%order, aic, converged, "fitted");
                    }
                    FitOutcome::Failed { reason } => {
                        warn!(%order, reason = reason.as_str(), "fit failed");
                    }
                }
                GridEntry { order, outcome }
            })
            .collect();

        let result = GridSearchResult {
            entries,
            criterion: self.config.criterion,
            config: self.config.clone(),
        };
        match result.best() {
            Some(best) => info!(
                order = %best.order,
                score = best.outcome.score(result.criterion),
                failed = result.num_failed(),
                "selected ARMA order"
            ),
            None => warn!(candidates = result.entries.len(), "no ARMA order could be fitted"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use statrs::distribution::Normal;

    fn ar1(n: usize, phi: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut x = 0.0;
        (0..n + 100)
            .map(|_| {
                let shock: f64 = rng.sample(normal);
                x = phi * x + shock;
                x
            })
            .skip(100)
            .collect()
    }

    fn fitted(aic: f64, num_params: usize) -> FitOutcome {
        FitOutcome::Fitted {
            aic,
            bic: aic,
            log_likelihood: 0.0,
            sigma2: 1.0,
            num_params,
            converged: true,
        }
    }

    fn result_with(entries: Vec<GridEntry>) -> GridSearchResult {
        GridSearchResult {
            entries,
            criterion: Criterion::Aic,
            config: ArmaGridConfig::default(),
        }
    }

    #[test]
    fn default_grid_has_36_orders() {
        let config = ArmaGridConfig::default();
        let orders = config.orders();
        assert_eq!(orders.len(), 36);
        assert_eq!(orders[0], ArmaOrder::arma(0, 0));
        assert_eq!(orders[1], ArmaOrder::arma(0, 1));
        assert_eq!(orders[35], ArmaOrder::arma(5, 5));
    }

    #[test]
    fn search_prefers_true_ar1() {
        let values = ar1(300, 0.7, 42);
        let config = ArmaGridConfig {
            p_range: [0, 2],
            q_range: [0, 2],
            criterion: Criterion::Bic,
            ..Default::default()
        };
        let result = ArmaGridSearch::new(config).search(&values);

        assert_eq!(result.entries().len(), 9);
        assert_eq!(result.num_failed(), 0);
        let best = result.best_order().unwrap();
        assert!(best.p >= 1, "selected {best}");

        let model = result.fit_best(&values).unwrap();
        assert_eq!(model.order(), best);
    }

    #[test]
    fn failed_fits_are_recorded_not_fatal() {
        // Too short for the larger orders.
        let values = ar1(6, 0.5, 1);
        let config = ArmaGridConfig {
            p_range: [0, 4],
            q_range: [0, 1],
            ..Default::default()
        };
        let result = ArmaGridSearch::new(config).search(&values);

        assert_eq!(result.entries().len(), 10);
        assert!(result.num_failed() > 0);
        let best = result.best().unwrap();
        assert!(best.outcome.is_fitted());
        assert!(result
            .score_table()
            .iter()
            .any(|(order, score)| order.p == 4 && score.is_none()));
    }

    #[test]
    fn all_failures_give_no_best() {
        let result = ArmaGridSearch::default().search(&[1.0; 40]);
        assert!(result.best().is_none());
        assert_eq!(result.num_failed(), 36);
        assert!(matches!(
            result.fit_best(&[1.0; 40]),
            Err(AnalysisError::ComputationError(_))
        ));
    }

    #[test]
    fn ties_prefer_fewer_parameters_then_first() {
        let result = result_with(vec![
            GridEntry {
                order: ArmaOrder::arma(2, 1),
                outcome: fitted(100.0, 5),
            },
            GridEntry {
                order: ArmaOrder::arma(1, 0),
                outcome: fitted(100.0, 3),
            },
            GridEntry {
                order: ArmaOrder::arma(0, 1),
                outcome: fitted(100.0, 3),
            },
            GridEntry {
                order: ArmaOrder::arma(3, 3),
                outcome: FitOutcome::Failed {
                    reason: "diverged".to_string(),
                },
            },
        ]);

        assert_eq!(result.best_order(), Some(ArmaOrder::arma(1, 0)));
    }

    #[test]
    fn lower_score_wins() {
        let result = result_with(vec![
            GridEntry {
                order: ArmaOrder::arma(0, 0),
                outcome: fitted(120.0, 2),
            },
            GridEntry {
                order: ArmaOrder::arma(2, 2),
                outcome: fitted(99.5, 6),
            },
        ]);
        assert_eq!(result.best_order(), Some(ArmaOrder::arma(2, 2)));
    }

    #[test]
    fn config_validation() {
        assert!(ArmaGridConfig::default().validate().is_ok());

        let reversed = ArmaGridConfig {
            p_range: [3, 1],
            ..Default::default()
        };
        assert!(matches!(reversed.validate(), Err(AnalysisError::Config(_))));

        let too_large = ArmaGridConfig {
            q_range: [0, 11],
            ..Default::default()
        };
        assert!(too_large.validate().is_err());
    }

    #[test]
    fn entries_serialize_flat() {
        let entry = GridEntry {
            order: ArmaOrder::arma(1, 2),
            outcome: FitOutcome::Failed {
                reason: "too short".to_string(),
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["p"], 1);
        assert_eq!(json["q"], 2);
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "too short");
    }

    #[test]
    fn orders_visit_d_then_p_then_q() {
        let config = ArmaGridConfig {
            p_range: [0, 1],
            d_range: [0, 1],
            q_range: [0, 1],
            ..Default::default()
        };
        let orders = config.orders();
        assert_eq!(
            orders,
            vec![
                ArmaOrder::new(0, 0, 0),
                ArmaOrder::new(0, 0, 1),
                ArmaOrder::new(1, 0, 0),
                ArmaOrder::new(1, 0, 1),
                ArmaOrder::new(0, 1, 0),
                ArmaOrder::new(0, 1, 1),
                ArmaOrder::new(1, 1, 0),
                ArmaOrder::new(1, 1, 1),
            ]
        );
    }

    #[test]
    fn ties_across_differencing_keep_lower_d() {
        let config = ArmaGridConfig {
            p_range: [0, 1],
            d_range: [0, 1],
            q_range: [0, 1],
            ..Default::default()
        };
        // ARIMA(1,0,0) and ARIMA(0,1,1) tie; every other order scores worse.
        let tied = [ArmaOrder::new(1, 0, 0), ArmaOrder::new(0, 1, 1)];
        let entries = config
            .orders()
            .into_iter()
            .map(|order| GridEntry {
                order,
                outcome: fitted(if tied.contains(&order) { 100.0 } else { 150.0 }, 3),
            })
            .collect();

        assert_eq!(result_with(entries).best_order(), Some(ArmaOrder::new(1, 0, 0)));
    }
}
