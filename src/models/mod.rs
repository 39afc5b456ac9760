//! Component models: ARMA for the remainder, a polynomial for the trend and
//! a repeating cycle for the seasonal component.

pub mod arma;
mod seasonal_cycle;
mod traits;
mod trend;

pub use arma::{
    Arma, ArmaGridConfig, ArmaGridSearch, ArmaOrder, Criterion, FitOutcome, GridEntry,
    GridSearchResult,
};
pub use seasonal_cycle::SeasonalCycle;
pub use traits::{BoxedForecaster, Forecaster};
pub use trend::{PolynomialTrend, MAX_DEGREE};
