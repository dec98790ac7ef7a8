//! Runner error types.

use std::path::PathBuf;

use chrono::NaiveDate;
use screener_core::ScreenError;
use thiserror::Error;

/// Errors from a bar source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no data for '{0}'")]
    NotFound(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("bad data in {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error(transparent)]
    Series(#[from] ScreenError),
}

/// Errors that abort a whole pick request.
#[derive(Debug, Error)]
pub enum PickError {
    #[error(transparent)]
    Screen(#[from] ScreenError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Errors writing a report or picks export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors loading a run config file.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("convert [settings] to JSON: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("invalid [run] value: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_errors_pass_through_unchanged() {
        let err: PickError = ScreenError::UnsupportedStrategy("martingale".into()).into();
        assert_eq!(err.to_string(), "unsupported strategy: martingale");
        assert!(matches!(err, PickError::Screen(_)));
    }

    #[test]
    fn not_found_names_the_code() {
        let err = SourceError::NotFound("600000.SH".into());
        assert_eq!(err.to_string(), "no data for '600000.SH'");
    }

    #[test]
    fn export_errors_are_not_source_errors() {
        let err: ExportError = String::from_utf8(vec![0xff]).unwrap_err().into();
        assert!(matches!(err, ExportError::Utf8(_)));
        assert!(err.to_string().starts_with("csv output is not UTF-8"));
    }
}
