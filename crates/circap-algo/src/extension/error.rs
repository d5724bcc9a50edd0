//! Errors raised while building or solving an extension model.

use circap_core::CircapError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A rule referenced a variable outside the window's index
    #[error("missing index: {0}")]
    MissingIndex(String),

    /// A rule referenced a parameter absent from the input tables
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// Input data failed validation
    #[error("invalid input data: {0}")]
    InvalidData(String),

    /// The model has no feasible assignment
    #[error("problem infeasible{}", format_conflicts(.conflicts))]
    Infeasible { conflicts: Vec<String> },

    #[error("problem unbounded")]
    Unbounded,

    #[error("solver failed: {0}")]
    SolverFailed(String),

    /// Yearly cost variables do not add up to the aggregate cost totals
    #[error("cost aggregates inconsistent: yearly sum {yearly:.6} vs aggregate {aggregate:.6}")]
    InconsistentCosts { yearly: f64, aggregate: f64 },
}

fn format_conflicts(conflicts: &[String]) -> String {
    if conflicts.is_empty() {
        String::new()
    } else {
        format!("; conflicting rule families: {}", conflicts.join(", "))
    }
}

pub type ModelResult<T> = Result<T, ModelError>;

impl From<CircapError> for ModelError {
    fn from(err: CircapError) -> Self {
        match err {
            CircapError::Lookup(msg) => ModelError::MissingParameter(msg),
            other => ModelError::InvalidData(other.to_string()),
        }
    }
}

impl From<ModelError> for CircapError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::MissingIndex(_) | ModelError::MissingParameter(_) => {
                CircapError::Lookup(err.to_string())
            }
            ModelError::InvalidData(msg) => CircapError::Validation(msg),
            other => CircapError::Solver(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infeasible_display_lists_conflicts() {
        let err = ModelError::Infeasible {
            conflicts: vec!["continuity".into(), "new_capacity_limit".into()],
        };
        assert_eq!(
            err.to_string(),
            "problem infeasible; conflicting rule families: continuity, new_capacity_limit"
        );
        assert_eq!(
            ModelError::Infeasible { conflicts: vec![] }.to_string(),
            "problem infeasible"
        );
    }

    #[test]
    fn test_lookup_maps_both_ways() {
        let err: ModelError = CircapError::Lookup("dcr 2025 EU27.solarPV".into()).into();
        assert!(matches!(err, ModelError::MissingParameter(_)));
        let back: CircapError = ModelError::MissingIndex("capacity_ext[2024]".into()).into();
        assert!(matches!(back, CircapError::Lookup(_)));
    }
}
