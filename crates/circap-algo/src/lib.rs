//! # circap-algo: Capacity extension optimization
//!
//! Builds and solves the circular-economy capacity extension MILP for one
//! planning window at a time.
//!
//! ## Modules
//!
//! - [`extension`]: variables, the rule registry, base-model coupling,
//!   solver dispatch, infeasibility diagnosis and post-solve verification
//!
//! ## Example
//!
//! ```ignore
//! use circap_algo::extension::{
//!     solve_extension, ExtensionProblemBuilder, NoBaseModel, SolverConfig,
//! };
//!
//! let data = circap_io::load_extension_dir("input/")?.data;
//! let problem = ExtensionProblemBuilder::new(data).big_m(1e6).build();
//! let solution = solve_extension(&problem, &NoBaseModel, &SolverConfig::default())?;
//! println!("{}", solution.summary());
//! ```

pub mod extension;
pub mod test_utils;

pub use extension::{
    solve_extension, BaseEnergyModel, ExtensionProblem, ExtensionProblemBuilder,
    ExtensionSolution, MilpSolverKind, ModelError, ModelResult, NoBaseModel, PolicyConfig,
    ResidualDemandBase, SolverConfig,
};
