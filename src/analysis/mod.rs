//! The end-to-end workflow: configuration, pipeline and report.
//!
//! # Example
//!
//! ```no_run
//! use elecsales::analysis::{Analysis, AnalysisConfig};
//!
//! let config = AnalysisConfig::from_file("elecsales.toml")?;
//! let analysis = Analysis::new(config);
//! let series = analysis.load("sales.csv")?;
//! let report = analysis.run(&series)?;
//! println!("{}", report.render_summary());
//! # Ok::<(), elecsales::AnalysisError>(())
//! ```

mod config;
mod pipeline;
mod report;

pub use config::{
    AnalysisConfig, ConfigOverrides, DecompositionConfig, DiagnosticsConfig, ForecastConfig, TrendConfig,
};
pub use pipeline::{Analysis, ComponentModels};
pub use report::{
    AnalysisReport, ArmaSummary, ComponentForecasts, ComponentRow, DecompositionSummary,
    ForecastRow, GridTable, HoldoutReport, HoldoutRow, ResidualDiagnostics, SeriesSummary,
    SpectralTable, StationaritySection, TrendSummary,
};
