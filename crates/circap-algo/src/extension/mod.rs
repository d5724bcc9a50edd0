//! Circular-economy capacity extension
//!
//! This module implements a Mixed-Integer Linear Programming (MILP)
//! formulation for extending renewable generation capacity through four
//! supply channels, with a learning curve on remanufacturing and scrap
//! accounting for decommissioned capacity.
//!
//! ## Problem Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CAPACITY EXTENSION                                                      │
//! │  ──────────────────                                                      │
//! │                                                                          │
//! │  Given:                                                                  │
//! │    • Installed capacity and stockpile per (location, tech)              │
//! │    • Yearly unit costs, installable ceilings, domestic-content ratios   │
//! │    • A stepwise learning curve for remanufacturing                      │
//! │    • Load factors per timestep                                          │
//! │                                                                          │
//! │  Decide, per year:                                                       │
//! │    • New capacity split into Imported / Stockout / Primary / Secondary  │
//! │    • Stockpile movements and decommissioning                            │
//! │    • The active learning step (binary)                                  │
//! │                                                                          │
//! │  Minimize:                                                               │
//! │    Σ costs_new[import, storage, eu_primary, eu_secondary] + base cost   │
//! │                                                                          │
//! │  Subject to:                                                             │
//! │    • Capacity continuity and channel decomposition                      │
//! │    • Stockpile balance, ramp and domestic-content limits                │
//! │    • Learning-curve step selection and price monotonicity               │
//! │    • Scrap balance and recycling growth                                 │
//! │    • Electricity supplied to the base model's Elec balance              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## MILP Formulation
//!
//! ```text
//! CapExt[y]   = CapExt[y-1] + New[y] - Dec[y]           (CapExt[y0-1] = carried)
//! New[y]      = Imp[y] + Out[y] + Pri[y] + Sec[y]
//! Stock[y]    = Stock[y-1] + In[y] - Out[y]              (In ≤ 0.5·Imp)
//! PR[y]       = Σ_n P[n] · BD[y,n],   Σ_n BD[y,n] ≤ 1,   BD ∈ {0,1}
//! PR[y]       ≥ PR[y-1]
//! SecSum[y]  ≥ Σ_n BD[y,n] · T[n]
//! Z[y,n]      = Sec[y] · BD[y,n]                         (Big-M)
//! Scrap[y]    = Scrap[y-1] + ScrapDec[y] - ScrapRec[y]
//! cost_sec[y] = c_remanuf·Sec[y] - Σ_n P[n]·Z[y,n] + c_recycle·ScrapRec[y]
//! ```
//!
//! ## Big-M Product
//!
//! The discount on remanufacturing cost multiplies a continuous quantity by
//! a binary step flag. With `M` an upper bound on `Sec`:
//!
//! ```text
//! Z ≤ M·BD        Z ≤ Sec        Z ≥ Sec - M + M·BD        Z ≥ 0
//! ```
//!
//! so `Z = Sec` when the step is active and `Z = 0` otherwise.
//!
//! ## Windows
//!
//! A build covers one [`circap_core::Window`]. Rules that reach back one year
//! distinguish the absolute first year (no predecessor, rule skipped), the
//! first year of a later window (predecessor is a carried parameter) and
//! interior years (predecessor is a variable).

mod base;
mod error;
mod model;
mod problem;
mod rules;
mod solution;
mod solver;
mod vars;
mod verify;

pub use base::{BaseCoupling, BaseEnergyModel, NoBaseModel, ResidualDemandBase, Vertex};
pub use error::{ModelError, ModelResult};
pub use model::{build_model, BuiltModel};
pub use problem::{
    BenchmarkRule, BenchmarkVariant, CumulativeCap, DecommissionFloor, ExtensionProblem,
    ExtensionProblemBuilder, PolicyConfig,
};
pub use rules::{registered_families, NamedRow, Relation, Row, RuleFamily};
pub use solution::{ExtensionSolution, YearValues};
pub use solver::{diagnose_infeasibility, solve_extension, MilpSolverKind, SolverConfig};
pub use vars::{BalanceVars, CostType, ExtensionVars, StepVars, YearVars};
pub use verify::{approx_eq, verify_solution};
