//! CSV and JSON outputs for external plotting.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::analysis::{AnalysisReport, ComponentRow, ForecastRow};
use crate::error::{AnalysisError, Result};
use crate::models::{FitOutcome, GridSearchResult};
use crate::spectral::Periodogram;

fn io_error(path: &Path, err: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Io(format!("{}: {err}", path.display()))
}

/// Serialize `rows` as CSV with a header row.
pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_file<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file = File::create(path).map_err(|err| io_error(path, err))?;
    write_rows(BufWriter::new(file), rows)?;
    debug!(path = %path.display(), rows = rows.len(), "wrote csv");
    Ok(())
}

/// date, observed, trend, seasonal, remainder
pub fn write_components_csv(path: impl AsRef<Path>, rows: &[ComponentRow]) -> Result<()> {
    write_file(path.as_ref(), rows)
}

/// date, trend, seasonal, remainder, forecast, lower, upper
pub fn write_forecast_csv(path: impl AsRef<Path>, rows: &[ForecastRow]) -> Result<()> {
    write_file(path.as_ref(), rows)
}

#[derive(Serialize)]
struct PeriodogramRow {
    frequency: f64,
    period: f64,
    power: f64,
}

/// frequency, period, power
pub fn write_periodogram_csv(path: impl AsRef<Path>, periodogram: &Periodogram) -> Result<()> {
    let rows: Vec<PeriodogramRow> = periodogram
        .frequencies()
        .iter()
        .zip(periodogram.powers())
        .map(|(&frequency, &power)| PeriodogramRow {
            frequency,
            period: 1.0 / frequency,
            power,
        })
        .collect();
    write_file(path.as_ref(), &rows)
}

#[derive(Serialize)]
struct GridRow<'a> {
    p: usize,
    d: usize,
    q: usize,
    aic: Option<f64>,
    status: &'static str,
    reason: Option<&'a str>,
}

/// p, d, q, aic, status, reason. Failed fits leave `aic` empty.
pub fn write_grid_csv(path: impl AsRef<Path>, grid: &GridSearchResult) -> Result<()> {
    let rows: Vec<GridRow<'_>> = grid
        .entries()
        .iter()
        .map(|entry| {
            let (aic, status, reason) = match &entry.outcome {
                FitOutcome::Fitted { aic, .. } => (Some(*aic), "fitted", None),
                FitOutcome::Failed { reason } => (None, "failed", Some(reason.as_str())),
            };
            GridRow {
                p: entry.order.p,
                d: entry.order.d,
                q: entry.order.q,
                aic,
                status,
                reason,
            }
        })
        .collect();
    write_file(path.as_ref(), &rows)
}

/// The full report as pretty-printed JSON.
pub fn write_report_json(path: impl AsRef<Path>, report: &AnalysisReport) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|err| io_error(path, err))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush().map_err(|err| io_error(path, err))?;
    Ok(())
}

/// Write every output of `report` into `dir`, creating it if needed.
/// Returns the written paths.
pub fn write_all(dir: impl AsRef<Path>, report: &AnalysisReport) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|err| io_error(dir, err))?;

    let paths = [
        "components.csv",
        "forecast.csv",
        "periodogram_series.csv",
        "periodogram_remainder.csv",
        "grid.csv",
        "report.json",
    ]
    .map(|name| dir.join(name));

    write_components_csv(&paths[0], &report.components)?;
    write_forecast_csv(&paths[1], &report.forecast)?;
    write_periodogram_csv(&paths[2], &report.spectral.series.periodogram)?;
    write_periodogram_csv(&paths[3], &report.spectral.remainder.periodogram)?;
    write_grid_csv(&paths[4], &report.grid)?;
    write_report_json(&paths[5], report)?;

    info!(dir = %dir.display(), files = paths.len(), "wrote outputs");
    Ok(paths.to_vec())
}
