//! Core data structures for monthly series and forecasts.

mod forecast;
mod series;

pub use forecast::Forecast;
pub use series::{add_months, month_start, months_between, MonthlySeries};
