//! Unified error types for the circap workspace
//!
//! [`CircapError`] is the common error representation at crate boundaries.
//! Domain errors (model construction, loading, handoff) convert into it so
//! callers can use `?` uniformly.
//!
//! # Example
//!
//! ```ignore
//! use circap_core::{CircapError, CircapResult};
//!
//! fn run(dir: &Path) -> CircapResult<()> {
//!     let data = load_extension_dir(dir)?;
//!     solve_window(&data, &config)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all circap operations.
#[derive(Error, Debug)]
pub enum CircapError {
    /// I/O errors (file access, directory creation, ...)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Solver/model errors
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A (year, location, tech) key that must exist is absent
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using CircapError.
pub type CircapResult<T> = Result<T, CircapError>;

impl From<anyhow::Error> for CircapError {
    fn from(err: anyhow::Error) -> Self {
        CircapError::Other(format!("{:#}", err))
    }
}

impl From<String> for CircapError {
    fn from(s: String) -> Self {
        CircapError::Other(s)
    }
}

impl From<&str> for CircapError {
    fn from(s: &str) -> Self {
        CircapError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for CircapError {
    fn from(err: serde_json::Error) -> Self {
        CircapError::Parse(err.to_string())
    }
}
