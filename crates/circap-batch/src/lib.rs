//! Rolling-horizon orchestration.
//!
//! Splits the planning horizon into windows, solves them one after another
//! and threads the terminal state of each window into the next as its
//! initial condition. Windows depend on their predecessor, so the runner is
//! a strict serial loop; a failed window halts the remainder of the horizon.

pub mod config;
pub mod manifest;
pub mod runner;
pub mod window;

pub use config::{load_run_config, BaseConfig, HandoffMode, HorizonMode, RunConfig, WindowScheme};
pub use manifest::{
    load_run_manifest, write_run_manifest, RunManifest, WindowRecord, WindowStatus,
    RUN_MANIFEST_FILE,
};
pub use runner::{run_horizon, window_dir, HorizonSummary};
pub use window::plan_windows;
