//! Errors raised while reading inputs or exchanging result sheets.

use circap_core::CircapError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    /// A required sheet is absent from the input directory
    #[error("missing input sheet: {}", .0.display())]
    MissingSheet(PathBuf),

    #[error("reading {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value could not be interpreted
    #[error("{sheet}: {message}")]
    InvalidValue { sheet: String, message: String },

    /// A (year, location, tech) entry of the horizon is absent
    #[error("{sheet}: no entry for {key}")]
    MissingEntry { sheet: String, key: String },

    #[error("input validation failed: {0}")]
    Validation(String),
}

impl LoadError {
    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        LoadError::Csv {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(sheet: &str, message: impl Into<String>) -> Self {
        LoadError::InvalidValue {
            sheet: sheet.to_string(),
            message: message.into(),
        }
    }
}

impl From<LoadError> for CircapError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Io { source, .. } => CircapError::Io(source),
            LoadError::MissingEntry { .. } => CircapError::Lookup(err.to_string()),
            LoadError::Validation(msg) => CircapError::Validation(msg),
            other => CircapError::Parse(other.to_string()),
        }
    }
}

/// Waiting for another window's result sheets failed.
#[derive(Error, Debug)]
pub enum HandoffError {
    #[error(
        "timed out after {waited:?} waiting for sheets in {}: {}",
        dir.display(),
        missing.join(", ")
    )]
    Timeout {
        dir: PathBuf,
        waited: Duration,
        missing: Vec<String>,
    },
}

impl From<HandoffError> for CircapError {
    fn from(err: HandoffError) -> Self {
        CircapError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_entry_maps_to_lookup() {
        let err = LoadError::MissingEntry {
            sheet: "costs".into(),
            key: "2030 EU27.solarPV".into(),
        };
        assert_eq!(err.to_string(), "costs: no entry for 2030 EU27.solarPV");
        assert!(matches!(CircapError::from(err), CircapError::Lookup(_)));
    }

    #[test]
    fn test_timeout_lists_missing_sheets() {
        let err = HandoffError::Timeout {
            dir: PathBuf::from("out/w1"),
            waited: Duration::from_millis(50),
            missing: vec!["decom.csv".into(), "scrap.csv".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("decom.csv, scrap.csv"));
        assert!(msg.contains("out/w1"));
    }
}
