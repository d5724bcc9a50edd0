//! # circap-core: shared types for circular capacity planning
//!
//! Index types, typed parameter tables, result sheets and the carry-over
//! snapshot used by the capacity-extension model and its rolling-horizon
//! orchestrator.
//!
//! ```text
//! ExtensionData ──build/solve──► ResultSheets ──extract(y-1)──► WindowState
//!       ▲                                                            │
//!       └──────────────────────── apply (next window) ───────────────┘
//! ```

pub mod carry;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod index;
pub mod results;

pub use carry::{SiteCarry, WindowState};
pub use data::{ExtensionData, LearningCurve, LearningStep, TechParams, YearlyParams};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{CircapError, CircapResult};
pub use index::{
    CapacityKey, SiteTech, TimestepKey, Window, Year, YearPosition, ELEC_COMMODITY, EPOCH_YEAR,
};
pub use results::{CapacityRecord, ChannelBalance, CostRecord, ResultSheets, SheetName};
