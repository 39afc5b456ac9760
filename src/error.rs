//! Error types for the elecsales library.

use thiserror::Error;

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur while loading, modelling or reporting a series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// Missing values detected when not allowed.
    #[error("missing values detected in data")]
    MissingValues,

    /// Computation error (e.g., numerical issues).
    #[error("computation error: {0}")]
    ComputationError(String),

    /// Malformed input at a given line of a CSV file.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::Io(err.to_string())
    }
}

impl From<csv::Error> for AnalysisError {
    fn from(err: csv::Error) -> Self {
        let line = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or_default();
        AnalysisError::Parse {
            line,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = AnalysisError::EmptyData;
        assert_eq!(err.to_string(), "empty input data");

        let err = AnalysisError::InsufficientData { needed: 24, got: 5 };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 24, got 5"
        );

        let err = AnalysisError::Parse {
            line: 7,
            message: "bad month label 'Foo 2010'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "parse error at line 7: bad month label 'Foo 2010'"
        );

        let err = AnalysisError::Config("p_range is empty".to_string());
        assert_eq!(err.to_string(), "configuration error: p_range is empty");

        let err = AnalysisError::FitRequired;
        assert_eq!(err.to_string(), "model must be fitted before prediction");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "sales.csv");
        let err: AnalysisError = io.into();
        assert!(matches!(err, AnalysisError::Io(msg) if msg.contains("sales.csv")));
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = AnalysisError::MissingValues;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
