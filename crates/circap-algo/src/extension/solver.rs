//! Extension MILP solver
//!
//! Hands an assembled model to a good_lp backend, extracts the solution and
//! runs the post-solve checks. When a window is infeasible, a deletion filter
//! over rule families narrows the conflict down before reporting it.

use super::base::BaseEnergyModel;
use super::error::{ModelError, ModelResult};
use super::model::{build_model, BuiltModel};
use super::problem::ExtensionProblem;
use super::rules::{NamedRow, RuleFamily};
use super::solution::ExtensionSolution;
use super::verify::{approx_eq, verify_solution};
use anyhow::anyhow;
#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs;
#[cfg(feature = "solver-microlp")]
use good_lp::solvers::microlp::microlp;
use good_lp::{ProblemVariables, ResolutionError, SolverModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info, warn};

/// MILP backends compiled into this build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilpSolverKind {
    #[default]
    #[cfg(feature = "solver-microlp")]
    MicroLp,
    #[cfg(feature = "solver-highs")]
    Highs,
}

impl MilpSolverKind {
    pub fn available() -> &'static [&'static str] {
        AVAILABLE_MILP_SOLVERS
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            #[cfg(feature = "solver-microlp")]
            MilpSolverKind::MicroLp => "microlp",
            #[cfg(feature = "solver-highs")]
            MilpSolverKind::Highs => "highs",
        }
    }
}

const AVAILABLE_MILP_SOLVERS: &[&str] = &[
    #[cfg(feature = "solver-microlp")]
    "microlp",
    #[cfg(feature = "solver-highs")]
    "highs",
];

fn unknown_solver_error(label: &str) -> anyhow::Error {
    anyhow!(
        "unknown milp solver '{}'; supported values: {}",
        label,
        MilpSolverKind::available().join(", ")
    )
}

impl FromStr for MilpSolverKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.to_ascii_lowercase();
        match normalized.as_str() {
            "microlp" => {
                #[cfg(feature = "solver-microlp")]
                {
                    Ok(MilpSolverKind::MicroLp)
                }
                #[cfg(not(feature = "solver-microlp"))]
                {
                    Err(unknown_solver_error(&normalized))
                }
            }
            "highs" => {
                #[cfg(feature = "solver-highs")]
                {
                    Ok(MilpSolverKind::Highs)
                }
                #[cfg(not(feature = "solver-highs"))]
                {
                    Err(unknown_solver_error(&normalized))
                }
            }
            other => Err(unknown_solver_error(other)),
        }
    }
}

/// Extension solver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: MilpSolverKind,
    /// Maximum solve time (seconds); honoured by HiGHS
    pub max_time_seconds: f64,
    /// MIP optimality gap tolerance; honoured by HiGHS
    pub mip_gap: f64,
    pub verbose: bool,
    /// Run the deletion filter when a window is infeasible
    pub diagnose_infeasibility: bool,
    /// Relative tolerance of the post-solve checks
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: MilpSolverKind::default(),
            max_time_seconds: 300.0,
            mip_gap: 0.01,
            verbose: false,
            diagnose_infeasibility: true,
            tolerance: 1e-5,
        }
    }
}

fn with_rows<M: SolverModel>(mut model: M, rows: &[NamedRow]) -> M {
    for named in rows {
        model.add_constraint(named.row.to_constraint());
    }
    model
}

fn solve_with<M>(
    model: M,
    built: &BuiltModel,
    start: Instant,
) -> Result<ExtensionSolution, ResolutionError>
where
    M: SolverModel<Error = ResolutionError>,
{
    let solution = with_rows(model, &built.rows).solve()?;
    let window = built.window;
    Ok(ExtensionSolution::extract(
        &solution,
        built,
        window,
        start.elapsed(),
    ))
}

fn probe_with<M>(model: M, built: &BuiltModel) -> Result<(), ResolutionError>
where
    M: SolverModel<Error = ResolutionError>,
{
    with_rows(model, &built.rows).solve().map(|_| ())
}

fn take_variables(built: &mut BuiltModel) -> ProblemVariables {
    std::mem::replace(&mut built.vars, ProblemVariables::new())
}

fn run_backend(
    built: &mut BuiltModel,
    config: &SolverConfig,
    start: Instant,
) -> Result<ExtensionSolution, ResolutionError> {
    let vars = take_variables(built);
    let objective = built.objective.clone();
    match config.backend {
        #[cfg(feature = "solver-microlp")]
        MilpSolverKind::MicroLp => {
            let model = vars.minimise(objective).using(microlp);
            solve_with(model, built, start)
        }
        #[cfg(feature = "solver-highs")]
        MilpSolverKind::Highs => {
            let model = vars
                .minimise(objective)
                .using(highs)
                .set_option("output_flag", config.verbose)
                .set_option("time_limit", config.max_time_seconds)
                .set_option("mip_rel_gap", config.mip_gap);
            solve_with(model, built, start)
        }
    }
}

fn probe_backend(built: &mut BuiltModel, config: &SolverConfig) -> Result<(), ResolutionError> {
    let vars = take_variables(built);
    let objective = built.objective.clone();
    match config.backend {
        #[cfg(feature = "solver-microlp")]
        MilpSolverKind::MicroLp => probe_with(vars.minimise(objective).using(microlp), built),
        #[cfg(feature = "solver-highs")]
        MilpSolverKind::Highs => probe_with(
            vars.minimise(objective)
                .using(highs)
                .set_option("output_flag", false)
                .set_option("time_limit", config.max_time_seconds),
            built,
        ),
    }
}

/// Solve one window of the extension problem.
///
/// # Example
///
/// ```no_run
/// use circap_algo::extension::{solve_extension, ExtensionProblem, NoBaseModel, SolverConfig};
/// use circap_core::ExtensionData;
///
/// let data = ExtensionData::new(2025, 2030); // Load your tables
/// let problem = ExtensionProblem::new(data);
/// let solution = solve_extension(&problem, &NoBaseModel, &SolverConfig::default())?;
/// println!("{}", solution.summary());
/// # Ok::<(), circap_algo::extension::ModelError>(())
/// ```
pub fn solve_extension(
    problem: &ExtensionProblem,
    base: &dyn BaseEnergyModel,
    config: &SolverConfig,
) -> ModelResult<ExtensionSolution> {
    let start = Instant::now();
    let mut built = build_model(problem, base, &BTreeSet::new())?;
    info!(
        window = %built.window,
        backend = config.backend.as_str(),
        rows = built.rows.len(),
        "solving extension window"
    );

    let mut solution = match run_backend(&mut built, config, start) {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => {
            warn!(window = %built.window, "extension window infeasible");
            let conflicts = if config.diagnose_infeasibility {
                diagnose_infeasibility(problem, base, config)?
                    .iter()
                    .map(|f| f.as_str().to_string())
                    .collect()
            } else {
                Vec::new()
            };
            return Err(ModelError::Infeasible { conflicts });
        }
        Err(ResolutionError::Unbounded) => return Err(ModelError::Unbounded),
        Err(other) => return Err(ModelError::SolverFailed(other.to_string())),
    };

    let yearly: f64 = solution.years.values().map(|v| v.yearly_cost()).sum();
    let aggregate: f64 = solution.costs_new.values().sum();
    if !approx_eq(yearly, aggregate, config.tolerance) {
        return Err(ModelError::InconsistentCosts { yearly, aggregate });
    }

    solution.diagnostics = verify_solution(problem, &solution, config.tolerance);
    if solution.diagnostics.has_errors() {
        warn!(
            window = %solution.window,
            errors = solution.diagnostics.error_count(),
            "post-solve verification found violations"
        );
    }
    if solution.max_row_violation > config.tolerance * 1f64.max(solution.objective.abs()) {
        warn!(
            violation = solution.max_row_violation,
            "solver returned rows outside tolerance"
        );
    }

    info!(
        window = %solution.window,
        objective = solution.objective,
        extension_cost = solution.extension_cost,
        elapsed_ms = solution.solve_time.as_millis() as u64,
        "extension window solved"
    );
    Ok(solution)
}

/// Whether the model with `disabled` families left out is still infeasible.
fn still_infeasible(
    problem: &ExtensionProblem,
    base: &dyn BaseEnergyModel,
    config: &SolverConfig,
    disabled: &BTreeSet<RuleFamily>,
) -> ModelResult<bool> {
    let mut built = build_model(problem, base, disabled)?;
    match probe_backend(&mut built, config) {
        Ok(()) | Err(ResolutionError::Unbounded) => Ok(false),
        Err(ResolutionError::Infeasible) => Ok(true),
        Err(other) => Err(ModelError::SolverFailed(other.to_string())),
    }
}

/// Deletion filter over rule families.
///
/// Each family is dropped in turn; if the model stays infeasible without it,
/// it stays dropped. The families left over form an irreducible conflicting
/// set: removing any one of them makes the window feasible. Returns an empty
/// list when the full model is feasible.
pub fn diagnose_infeasibility(
    problem: &ExtensionProblem,
    base: &dyn BaseEnergyModel,
    config: &SolverConfig,
) -> ModelResult<Vec<RuleFamily>> {
    let mut disabled = BTreeSet::new();
    if !still_infeasible(problem, base, config, &disabled)? {
        return Ok(Vec::new());
    }
    let families = build_model(problem, base, &disabled)?.families();

    for &family in &families {
        disabled.insert(family);
        if !still_infeasible(problem, base, config, &disabled)? {
            disabled.remove(&family);
        }
        debug!(
            family = family.as_str(),
            conflicting = !disabled.contains(&family),
            "deletion filter step"
        );
    }

    let conflicts: Vec<RuleFamily> = families
        .into_iter()
        .filter(|f| !disabled.contains(f))
        .collect();
    info!(
        conflicts = ?conflicts.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
        "infeasibility diagnosis complete"
    );
    Ok(conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_kind_parsing() {
        assert_eq!(
            "MicroLP".parse::<MilpSolverKind>().unwrap(),
            MilpSolverKind::MicroLp
        );
        let err = "gurobi".parse::<MilpSolverKind>().unwrap_err();
        assert!(err.to_string().contains("supported values"));
        assert!(MilpSolverKind::available().contains(&"microlp"));
    }

    #[test]
    fn test_solver_config_defaults_from_empty_object() {
        let config: SolverConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.backend, MilpSolverKind::MicroLp);
        assert!(config.diagnose_infeasibility);
        assert!((config.mip_gap - 0.01).abs() < 1e-12);
    }
}
