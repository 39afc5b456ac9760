//! Monthly series with calendar-month timestamps.

use crate::error::{AnalysisError, Result};
use chrono::{Datelike, Months, NaiveDate};

/// Truncate a date to the first day of its month.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    // Day 1 always exists for a valid year/month pair.
    date.with_day(1).unwrap_or(date)
}

/// Shift a month start by `k` months (negative shifts go backwards).
pub fn add_months(date: NaiveDate, k: i64) -> NaiveDate {
    let start = month_start(date);
    let shifted = if k >= 0 {
        start.checked_add_months(Months::new(k as u32))
    } else {
        start.checked_sub_months(Months::new(k.unsigned_abs() as u32))
    };
    shifted.unwrap_or(start)
}

/// Number of whole months from `from` to `to` (may be negative).
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to.year() as i64 - from.year() as i64) * 12 + to.month() as i64 - from.month() as i64
}

/// A gap-free monthly series.
///
/// Dates are month starts and strictly consecutive; every month carries
/// exactly one finite value.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
    label: String,
}

impl MonthlySeries {
    /// Build a series of consecutive months starting at `start`.
    pub fn new(start: NaiveDate, values: Vec<f64>, label: impl Into<String>) -> Result<Self> {
        if values.is_empty() {
            return Err(AnalysisError::EmptyData);
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AnalysisError::MissingValues);
        }

        let start = month_start(start);
        let dates = (0..values.len())
            .map(|i| add_months(start, i as i64))
            .collect();

        Ok(Self {
            dates,
            values,
            label: label.into(),
        })
    }

    /// Build a series from dated observations.
    ///
    /// Dates are normalised to month starts. The observations must be sorted,
    /// unique per month and without gaps.
    pub fn from_observations(
        observations: Vec<(NaiveDate, f64)>,
        label: impl Into<String>,
    ) -> Result<Self> {
        if observations.is_empty() {
            return Err(AnalysisError::EmptyData);
        }

        let mut dates = Vec::with_capacity(observations.len());
        let mut values = Vec::with_capacity(observations.len());

        for (i, (date, value)) in observations.into_iter().enumerate() {
            let date = month_start(date);
            if !value.is_finite() {
                return Err(AnalysisError::MissingValues);
            }
            if let Some(&prev) = dates.last() {
                match months_between(prev, date) {
                    1 => {}
                    0 => {
                        return Err(AnalysisError::InvalidParameter(format!(
                            "duplicate month {} at position {}",
                            date.format("%Y-%m"),
                            i
                        )))
                    }
                    m if m < 0 => {
                        return Err(AnalysisError::InvalidParameter(format!(
                            "months must be increasing: {} follows {}",
                            date.format("%Y-%m"),
                            prev.format("%Y-%m")
                        )))
                    }
                    m => {
                        return Err(AnalysisError::InvalidParameter(format!(
                            "gap of {} months between {} and {}",
                            m - 1,
                            prev.format("%Y-%m"),
                            date.format("%Y-%m")
                        )))
                    }
                }
            }
            dates.push(date);
            values.push(value);
        }

        Ok(Self {
            dates,
            values,
            label: label.into(),
        })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First month of the series.
    pub fn start(&self) -> NaiveDate {
        self.dates[0]
    }

    /// Last month of the series.
    pub fn end(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    /// Split into the first `n` months and the remainder.
    pub fn split_at(&self, n: usize) -> Result<(MonthlySeries, MonthlySeries)> {
        if n == 0 || n >= self.len() {
            return Err(AnalysisError::InvalidParameter(format!(
                "split point {} must be inside 1..{}",
                n,
                self.len()
            )));
        }
        let head = Self {
            dates: self.dates[..n].to_vec(),
            values: self.values[..n].to_vec(),
            label: self.label.clone(),
        };
        let tail = Self {
            dates: self.dates[n..].to_vec(),
            values: self.values[n..].to_vec(),
            label: self.label.clone(),
        };
        Ok((head, tail))
    }

    /// Keep only months within `[from, to]` (inclusive, either bound optional).
    pub fn slice_dates(&self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self> {
        let from = from.map(month_start);
        let to = to.map(month_start);

        let (dates, values): (Vec<NaiveDate>, Vec<f64>) = self
            .dates
            .iter()
            .zip(self.values.iter())
            .filter(|(d, _)| from.is_none_or(|f| **d >= f) && to.is_none_or(|t| **d <= t))
            .map(|(d, v)| (*d, *v))
            .unzip();

        if dates.is_empty() {
            return Err(AnalysisError::EmptyData);
        }

        Ok(Self {
            dates,
            values,
            label: self.label.clone(),
        })
    }

    /// The `horizon` months following the last observation.
    pub fn future_dates(&self, horizon: usize) -> Vec<NaiveDate> {
        let end = self.end();
        (1..=horizon).map(|h| add_months(end, h as i64)).collect()
    }
}
