//! ARMA / ARIMA models for the decomposition remainder.
//!
//! - [`Arma`]: CSS-estimated ARIMA(p, d, q) with stationary and invertible
//!   parameters
//! - [`ArmaGridSearch`]: exhaustive order selection by AIC or BIC
//! - differencing helpers

mod diff;
mod grid;
mod model;
mod transform;

pub use diff::{difference, integrate, seasonal_difference};
pub use grid::{
    ArmaGridConfig, ArmaGridSearch, Criterion, FitOutcome, GridEntry, GridSearchResult,
};
pub use model::{Arma, ArmaOrder};
pub use transform::{ar_to_pacf, constrain_ar, constrain_ma, pacf_to_ar, unconstrain_ar};
