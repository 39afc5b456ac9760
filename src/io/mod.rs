//! Reading the sales export and writing analysis outputs.
//!
//! Two input layouts are understood: a long table with one month per row,
//! and the wide electricity data browser export with one series per row.
//! [`clean_observations`] turns either into a gap-free [`MonthlySeries`].
//!
//! [`MonthlySeries`]: crate::core::MonthlySeries

mod cleaning;
mod loader;
mod writer;

pub use cleaning::{clean_observations, MissingPolicy};
pub use loader::{
    load_csv, load_csv_from_reader, parse_month, parse_value, DataConfig, Layout, Observation,
    RawSeries,
};
pub use writer::{
    write_all, write_components_csv, write_forecast_csv, write_grid_csv, write_periodogram_csv,
    write_report_json, write_rows,
};
