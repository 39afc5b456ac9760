//! CSV loading for long and wide (EIA browser export) layouts.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::month_start;
use crate::error::{AnalysisError, Result};
use crate::io::cleaning::MissingPolicy;

/// Shape of the input file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// One observation per row under a header.
    #[default]
    Long,
    /// One series per row, one month per column.
    Wide,
}

impl FromStr for Layout {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long" => Ok(Self::Long),
            "wide" => Ok(Self::Wide),
            other => Err(AnalysisError::InvalidParameter(format!(
                "unknown layout '{other}', expected 'long' or 'wide'"
            ))),
        }
    }
}

/// Input file options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub layout: Layout,
    /// Date column of a long file.
    pub date_column: String,
    /// Value column of a long file.
    pub value_column: String,
    /// Substring selecting the row of a wide file.
    pub series_filter: String,
    /// First month kept.
    #[serde(with = "month_serde")]
    pub start: Option<NaiveDate>,
    /// Last month kept.
    #[serde(with = "month_serde")]
    pub end: Option<NaiveDate>,
    pub missing: MissingPolicy,
    /// Multiplier applied to every value.
    pub scale: f64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            layout: Layout::Long,
            date_column: "date".to_string(),
            value_column: "value".to_string(),
            series_filter: "all sectors".to_string(),
            start: None,
            end: None,
            missing: MissingPolicy::Error,
            scale: 1.0,
        }
    }
}

impl DataConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale == 0.0 {
            return Err(AnalysisError::Config(format!(
                "data.scale must be finite and non-zero, got {}",
                self.scale
            )));
        }
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err(AnalysisError::Config(format!(
                    "data.start {start} is after data.end {end}"
                )));
            }
        }
        match self.layout {
            Layout::Long if self.date_column.trim().is_empty() => Err(AnalysisError::Config(
                "data.date_column must not be empty".to_string(),
            )),
            Layout::Long if self.value_column.trim().is_empty() => Err(AnalysisError::Config(
                "data.value_column must not be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Month-level dates in TOML accept every format [`parse_month`] does.
mod month_serde {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format("%Y-%m").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        raw.map(|s| {
            super::parse_month(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("unrecognised month '{s}'")))
        })
        .transpose()
    }
}

/// One parsed row before cleaning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    /// `None` for a missing-value token.
    pub value: Option<f64>,
    /// 1-based source line.
    pub line: usize,
}

/// Observations of one series as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub label: String,
    pub observations: Vec<Observation>,
}

const MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

const MISSING_TOKENS: [&str; 6] = ["", "--", "na", "nan", "w", "(na)"];

fn year_month(year: &str, month: &str) -> Option<NaiveDate> {
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Parse a month label into the first day of that month.
///
/// Accepts `YYYY-MM`, `YYYY-MM-DD`, `YYYYMM`, `YYYY/MM` and `Mon YYYY`
/// (full month names work too).
pub fn parse_month(label: &str) -> Option<NaiveDate> {
    let s = label.trim().trim_matches('"').trim();

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(month_start(date));
    }
    if let Some((year, month)) = s.split_once('-').or_else(|| s.split_once('/')) {
        return year_month(year, month);
    }
    if s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit()) {
        return year_month(&s[..4], &s[4..]);
    }

    let mut parts = s.split_whitespace();
    let (name, year) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || name.len() < 3 || !name.is_ascii() {
        return None;
    }
    let prefix = name[..3].to_ascii_lowercase();
    let month = MONTH_NAMES.iter().position(|m| *m == prefix)? as u32 + 1;
    if year.len() != 4 {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, 1)
}

/// Parse one value cell; missing-value tokens give `Ok(None)`.
pub fn parse_value(cell: &str) -> std::result::Result<Option<f64>, String> {
    let cleaned: String = cell
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '"' && *c != '\'')
        .collect();
    let cleaned = cleaned.trim();
    if MISSING_TOKENS.contains(&cleaned.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    cleaned
        .parse::<f64>()
        .map(|v| v.is_finite().then_some(v))
        .map_err(|_| format!("invalid value '{}'", cell.trim()))
}

fn record_line(record: &csv::StringRecord) -> usize {
    record.position().map(|p| p.line() as usize).unwrap_or_default()
}

fn find_column(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    let wanted = name.trim().to_ascii_lowercase();
    headers
        .iter()
        .position(|h| h.trim().to_ascii_lowercase() == wanted)
        .ok_or_else(|| AnalysisError::Parse {
            line: record_line(headers).max(1),
            message: format!("column '{name}' not found in header"),
        })
}

fn read_long<R: Read>(reader: R, config: &DataConfig) -> Result<RawSeries> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let date_idx = find_column(&headers, &config.date_column)?;
    let value_idx = find_column(&headers, &config.value_column)?;

    let mut observations = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record_line(&record);
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let date_cell = record.get(date_idx).unwrap_or_default();
        let date = parse_month(date_cell).ok_or_else(|| AnalysisError::Parse {
            line,
            message: format!("bad month label '{date_cell}'"),
        })?;
        let value = parse_value(record.get(value_idx).unwrap_or_default())
            .map_err(|message| AnalysisError::Parse { line, message })?;

        observations.push(Observation { date, value, line });
    }

    Ok(RawSeries {
        label: config.value_column.clone(),
        observations,
    })
}

fn read_wide<R: Read>(reader: R, config: &DataConfig) -> Result<RawSeries> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut month_columns: Option<Vec<(usize, NaiveDate)>> = None;
    let filter = config.series_filter.to_ascii_lowercase();

    for record in rdr.records() {
        let record = record?;
        let line = record_line(&record);
        let first = record.get(0).unwrap_or_default().trim().to_ascii_lowercase();

        if month_columns.is_none() {
            if first == "description" {
                month_columns = Some(wide_header(&record, line)?);
            }
            continue;
        }
        let Some(columns) = month_columns.as_ref() else {
            continue;
        };

        if !first.contains(&filter) {
            continue;
        }

        let label = record.get(0).unwrap_or_default().trim().to_string();
        let mut observations = Vec::with_capacity(columns.len());
        for &(idx, date) in columns {
            let value = parse_value(record.get(idx).unwrap_or_default())
                .map_err(|message| AnalysisError::Parse { line, message })?;
            observations.push(Observation { date, value, line });
        }
        debug!(label = label.as_str(), line, "selected wide row");
        return Ok(RawSeries {
            label,
            observations,
        });
    }

    match month_columns {
        None => Err(AnalysisError::Parse {
            line: 0,
            message: "no header row starting with 'description'".to_string(),
        }),
        Some(_) => Err(AnalysisError::InvalidParameter(format!(
            "no row matches series filter '{}'",
            config.series_filter
        ))),
    }
}

/// Month columns of a wide header. Metadata columns precede the first month.
fn wide_header(record: &csv::StringRecord, line: usize) -> Result<Vec<(usize, NaiveDate)>> {
    let mut columns = Vec::new();
    for (idx, cell) in record.iter().enumerate().skip(1) {
        match parse_month(cell) {
            Some(date) => columns.push((idx, date)),
            None if columns.is_empty() || cell.trim().is_empty() => {}
            None => {
                return Err(AnalysisError::Parse {
                    line,
                    message: format!("bad month label '{cell}'"),
                })
            }
        }
    }
    if columns.is_empty() {
        return Err(AnalysisError::Parse {
            line,
            message: "header has no month columns".to_string(),
        });
    }
    Ok(columns)
}

/// Read observations from any reader.
pub fn load_csv_from_reader<R: Read>(reader: R, config: &DataConfig) -> Result<RawSeries> {
    let raw = match config.layout {
        Layout::Long => read_long(reader, config)?,
        Layout::Wide => read_wide(reader, config)?,
    };
    if raw.observations.is_empty() {
        return Err(AnalysisError::EmptyData);
    }
    let missing = raw.observations.iter().filter(|o| o.value.is_none()).count();
    debug!(rows = raw.observations.len(), missing, "parsed observations");
    Ok(raw)
}

/// Read observations from a CSV file.
pub fn load_csv(path: impl AsRef<Path>, config: &DataConfig) -> Result<RawSeries> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|err| AnalysisError::Io(format!("{}: {err}", path.display())))?;
    let raw = load_csv_from_reader(file, config)?;
    info!(
        path = %path.display(),
        layout = ?config.layout,
        label = raw.label.as_str(),
        rows = raw.observations.len(),
        "loaded series"
    );
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    const WIDE: &str = "\
Retail sales of electricity, monthly
thousand megawatthours
Source: U.S. Energy Information Administration
description,units,source key,Mar 2010,Feb 2010,Jan 2010
\"California : all sectors\",thousand megawatthours,ELEC.SALES.CA-ALL.M,\"20,101\",19500,--
California : residential,thousand megawatthours,ELEC.SALES.CA-RES.M,7000,7100,7200
";

    #[test]
    fn month_formats() {
        assert_eq!(parse_month("2010-03"), Some(ym(2010, 3)));
        assert_eq!(parse_month("2010-03-17"), Some(ym(2010, 3)));
        assert_eq!(parse_month("201003"), Some(ym(2010, 3)));
        assert_eq!(parse_month("2010/3"), Some(ym(2010, 3)));
        assert_eq!(parse_month("Mar 2010"), Some(ym(2010, 3)));
        assert_eq!(parse_month("march 2010"), Some(ym(2010, 3)));
        assert_eq!(parse_month(" \"Dec 2022\" "), Some(ym(2022, 12)));

        assert_eq!(parse_month("Foo 2010"), None);
        assert_eq!(parse_month("2010-13"), None);
        assert_eq!(parse_month("10-03"), None);
        assert_eq!(parse_month("2010"), None);
        assert_eq!(parse_month(""), None);
    }

    #[test]
    fn value_cells() {
        assert_eq!(parse_value(" 20,101 "), Ok(Some(20101.0)));
        assert_eq!(parse_value("\"1,234.5\""), Ok(Some(1234.5)));
        for token in ["", "--", "NA", "NaN", "W", "(NA)"] {
            assert_eq!(parse_value(token), Ok(None), "token {token:?}");
        }
        assert!(parse_value("abc").is_err());
    }

    #[test]
    fn long_layout_matches_columns_case_insensitively() {
        let csv = "Date,Sales\n2010-01,100.5\n2010-02,NA\n\n2010-03,\"1,200\"\n";
        let config = DataConfig {
            date_column: "DATE".to_string(),
            value_column: "sales".to_string(),
            ..Default::default()
        };
        let raw = load_csv_from_reader(csv.as_bytes(), &config).unwrap();
        assert_eq!(raw.label, "sales");
        assert_eq!(raw.observations.len(), 3);
        assert_eq!(raw.observations[0].date, ym(2010, 1));
        assert_eq!(raw.observations[1].value, None);
        assert_eq!(raw.observations[2].value, Some(1200.0));
    }

    #[test]
    fn long_layout_reports_bad_line() {
        let csv = "date,value\n2010-01,1\nFoo 2010,2\n";
        let err = load_csv_from_reader(csv.as_bytes(), &DataConfig::default()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Parse {
                line: 3,
                message: "bad month label 'Foo 2010'".to_string()
            }
        );
    }

    #[test]
    fn long_layout_missing_column() {
        let csv = "month,value\n2010-01,1\n";
        let err = load_csv_from_reader(csv.as_bytes(), &DataConfig::default()).unwrap_err();
        assert!(err.to_string().contains("column 'date' not found"));
    }

    #[test]
    fn wide_layout_selects_filtered_row() {
        let config = DataConfig {
            layout: Layout::Wide,
            ..Default::default()
        };
        let raw = load_csv_from_reader(WIDE.as_bytes(), &config).unwrap();
        assert_eq!(raw.label, "California : all sectors");
        let dates: Vec<NaiveDate> = raw.observations.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![ym(2010, 3), ym(2010, 2), ym(2010, 1)]);
        assert_eq!(raw.observations[0].value, Some(20101.0));
        assert_eq!(raw.observations[2].value, None);

        let residential = DataConfig {
            layout: Layout::Wide,
            series_filter: "RESIDENTIAL".to_string(),
            ..Default::default()
        };
        let raw = load_csv_from_reader(WIDE.as_bytes(), &residential).unwrap();
        assert_eq!(raw.observations[2].value, Some(7200.0));
    }

    #[test]
    fn wide_layout_errors() {
        let config = DataConfig {
            layout: Layout::Wide,
            series_filter: "commercial".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            load_csv_from_reader(WIDE.as_bytes(), &config),
            Err(AnalysisError::InvalidParameter(_))
        ));

        let no_header = "just,some\nmetadata,lines\n";
        let config = DataConfig {
            layout: Layout::Wide,
            ..Default::default()
        };
        assert!(matches!(
            load_csv_from_reader(no_header.as_bytes(), &config),
            Err(AnalysisError::Parse { .. })
        ));

        let bad_month = "description,Jan 2010,Smarch 2010\nall sectors,1,2\n";
        let err = load_csv_from_reader(bad_month.as_bytes(), &config).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Parse {
                line: 1,
                message: "bad month label 'Smarch 2010'".to_string()
            }
        );
    }

    #[test]
    fn layout_from_str_and_toml() {
        assert_eq!("WIDE".parse::<Layout>(), Ok(Layout::Wide));
        assert!("tall".parse::<Layout>().is_err());

        let config: DataConfig =
            toml::from_str("layout = \"wide\"\nstart = \"Jan 2012\"\nend = \"2020-06\"").unwrap();
        assert_eq!(config.layout, Layout::Wide);
        assert_eq!(config.start, Some(ym(2012, 1)));
        assert_eq!(config.end, Some(ym(2020, 6)));
        assert!(toml::from_str::<DataConfig>("start = \"soon\"").is_err());
        assert!(toml::from_str::<DataConfig>("colour = \"red\"").is_err());
    }

    #[test]
    fn validate_rejects_bad_settings() {
        let mut config = DataConfig::default();
        assert!(config.validate().is_ok());
        config.scale = 0.0;
        assert!(config.validate().is_err());

        let config = DataConfig {
            start: Some(ym(2020, 1)),
            end: Some(ym(2019, 1)),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));
    }
}
