//! Turning raw observations into a gap-free monthly series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{add_months, month_start, months_between, MonthlySeries};
use crate::error::{AnalysisError, Result};
use crate::io::loader::{DataConfig, RawSeries};

/// Treatment of missing months and missing-value cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Any gap is an error.
    #[default]
    Error,
    /// Trim leading and trailing gaps; interior gaps are an error.
    Drop,
    /// Trim leading and trailing gaps, then interpolate interior ones
    /// linearly.
    Interpolate,
}

/// Clean raw observations into a [`MonthlySeries`].
///
/// Observations are sorted by month, duplicates keep the last occurrence,
/// the `[start, end]` window and `scale` from `config` are applied, and gaps
/// are handled by `config.missing`. At least two full cycles of `period`
/// months must remain.
pub fn clean_observations(
    raw: &RawSeries,
    config: &DataConfig,
    period: usize,
) -> Result<MonthlySeries> {
    let mut observations: Vec<(NaiveDate, Option<f64>, usize)> = raw
        .observations
        .iter()
        .map(|o| (month_start(o.date), o.value, o.line))
        .collect();
    observations.sort_by_key(|(date, _, _)| *date);

    let mut deduped: Vec<(NaiveDate, Option<f64>)> = Vec::with_capacity(observations.len());
    for (date, value, line) in observations {
        match deduped.last_mut() {
            Some(last) if last.0 == date => {
                warn!(month = %date.format("%Y-%m"), line, "duplicate month, keeping the later row");
                last.1 = value;
            }
            _ => deduped.push((date, value)),
        }
    }

    deduped.retain(|(date, _)| {
        config.start.map_or(true, |s| *date >= month_start(s))
            && config.end.map_or(true, |e| *date <= month_start(e))
    });
    let (Some(&(first, _)), Some(&(last, _))) = (deduped.first(), deduped.last()) else {
        return Err(AnalysisError::EmptyData);
    };

    // Every calendar month between the first and last observation.
    let span = months_between(first, last) as usize + 1;
    let mut grid: Vec<Option<f64>> = vec![None; span];
    for (date, value) in &deduped {
        grid[months_between(first, *date) as usize] = value.map(|v| v * config.scale);
    }

    let gaps = grid.iter().filter(|v| v.is_none()).count();
    let (offset, values) = fill_gaps(&grid, config.missing, first)?;
    if gaps > 0 {
        debug!(gaps, policy = ?config.missing, "handled missing months");
    }

    let needed = 2 * period;
    if values.len() < needed {
        return Err(AnalysisError::InsufficientData {
            needed,
            got: values.len(),
        });
    }

    MonthlySeries::new(add_months(first, offset as i64), values, raw.label.clone())
}

/// Apply `policy` to the month grid. Returns the index of the first kept
/// month and the values.
fn fill_gaps(
    grid: &[Option<f64>],
    policy: MissingPolicy,
    first: NaiveDate,
) -> Result<(usize, Vec<f64>)> {
    let missing_error = |idx: usize| {
        warn!(month = %add_months(first, idx as i64).format("%Y-%m"), "missing value");
        AnalysisError::MissingValues
    };

    if policy == MissingPolicy::Error {
        if let Some(idx) = grid.iter().position(Option::is_none) {
            return Err(missing_error(idx));
        }
        return Ok((0, grid.iter().flatten().copied().collect()));
    }

    let Some(lo) = grid.iter().position(Option::is_some) else {
        return Err(AnalysisError::EmptyData);
    };
    let hi = grid.iter().rposition(Option::is_some).unwrap_or(lo);
    let core = &grid[lo..=hi];

    match policy {
        MissingPolicy::Drop => match core.iter().position(Option::is_none) {
            Some(idx) => Err(missing_error(lo + idx)),
            None => Ok((lo, core.iter().flatten().copied().collect())),
        },
        _ => Ok((lo, interpolate(core))),
    }
}

/// Linear interpolation of interior `None`s; the ends must be present.
fn interpolate(values: &[Option<f64>]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<(usize, f64)> = None;

    for (i, value) in values.iter().enumerate() {
        let Some(v) = *value else {
            continue;
        };
        if let Some((j, pv)) = prev {
            let steps = (i - j) as f64;
            for k in 1..(i - j) {
                out.push(pv + (v - pv) * k as f64 / steps);
            }
        }
        out.push(v);
        prev = Some((i, v));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::loader::Observation;
    use approx::assert_relative_eq;

    fn ym(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn raw(values: &[(NaiveDate, Option<f64>)]) -> RawSeries {
        RawSeries {
            label: "ca".to_string(),
            observations: values
                .iter()
                .enumerate()
                .map(|(i, &(date, value))| Observation {
                    date,
                    value,
                    line: i + 2,
                })
                .collect(),
        }
    }

    fn months(start: NaiveDate, values: &[Option<f64>]) -> Vec<(NaiveDate, Option<f64>)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (add_months(start, i as i64), *v))
            .collect()
    }

    #[test]
    fn sorts_reversed_input() {
        let mut obs = months(ym(2010, 1), &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
        obs.reverse();
        let series = clean_observations(&raw(&obs), &DataConfig::default(), 2).unwrap();
        assert_eq!(series.values(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(series.start(), ym(2010, 1));
        assert_eq!(series.label(), "ca");
    }

    #[test]
    fn duplicate_month_keeps_last() {
        let mut obs = months(ym(2010, 1), &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
        obs.push((ym(2010, 2), Some(20.0)));
        let series = clean_observations(&raw(&obs), &DataConfig::default(), 2).unwrap();
        assert_eq!(series.values(), &[1.0, 20.0, 3.0, 4.0]);
    }

    #[test]
    fn window_and_scale() {
        let obs = months(ym(2009, 1), &vec![Some(1000.0); 36]);
        let config = DataConfig {
            start: Some(ym(2010, 1)),
            end: Some(ym(2010, 12)),
            scale: 0.001,
            ..Default::default()
        };
        let series = clean_observations(&raw(&obs), &config, 6).unwrap();
        assert_eq!(series.len(), 12);
        assert_eq!(series.start(), ym(2010, 1));
        assert_relative_eq!(series.values()[0], 1.0);

        let config = DataConfig {
            start: Some(ym(2030, 1)),
            ..Default::default()
        };
        assert_eq!(
            clean_observations(&raw(&obs), &config, 6),
            Err(AnalysisError::EmptyData)
        );
    }

    #[test]
    fn error_policy_rejects_gaps() {
        let gap = vec![(ym(2010, 1), Some(1.0)), (ym(2010, 3), Some(3.0))];
        assert_eq!(
            clean_observations(&raw(&gap), &DataConfig::default(), 1),
            Err(AnalysisError::MissingValues)
        );
        let token = months(ym(2010, 1), &[Some(1.0), None, Some(3.0)]);
        assert_eq!(
            clean_observations(&raw(&token), &DataConfig::default(), 1),
            Err(AnalysisError::MissingValues)
        );
    }

    #[test]
    fn drop_policy_trims_edges_only() {
        let config = DataConfig {
            missing: MissingPolicy::Drop,
            ..Default::default()
        };
        let edges = months(ym(2010, 1), &[None, Some(1.0), Some(2.0), Some(3.0), Some(4.0), None]);
        let series = clean_observations(&raw(&edges), &config, 2).unwrap();
        assert_eq!(series.values(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(series.start(), ym(2010, 2));

        let interior = months(ym(2010, 1), &[Some(1.0), None, Some(3.0), Some(4.0)]);
        assert_eq!(
            clean_observations(&raw(&interior), &config, 1),
            Err(AnalysisError::MissingValues)
        );
    }

    #[test]
    fn interpolate_policy_fills_interior_gaps() {
        let config = DataConfig {
            missing: MissingPolicy::Interpolate,
            ..Default::default()
        };
        let obs = vec![
            (ym(2010, 1), None),
            (ym(2010, 2), Some(1.0)),
            (ym(2010, 3), None),
            // 2010-04 absent from the file entirely
            (ym(2010, 5), Some(7.0)),
            (ym(2010, 6), Some(8.0)),
        ];
        let series = clean_observations(&raw(&obs), &config, 2).unwrap();
        assert_eq!(series.start(), ym(2010, 2));
        let expected = [1.0, 3.0, 5.0, 7.0, 8.0];
        for (v, e) in series.values().iter().zip(expected) {
            assert_relative_eq!(*v, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn too_short_for_two_cycles() {
        let obs = months(ym(2010, 1), &vec![Some(1.0); 23]);
        assert_eq!(
            clean_observations(&raw(&obs), &DataConfig::default(), 12),
            Err(AnalysisError::InsufficientData { needed: 24, got: 23 })
        );
    }
}
