use crate::config::{HandoffMode, RunConfig};
use crate::manifest::{
    write_run_manifest, RunManifest, WindowRecord, WindowStatus, RUN_MANIFEST_FILE,
};
use crate::window::plan_windows;
use anyhow::{Context, Result};
use chrono::Utc;
use circap_algo::{solve_extension, BaseEnergyModel, ExtensionProblemBuilder};
use circap_core::{ExtensionData, SheetName, SiteTech, Window, WindowState};
use circap_io::{read_sheets, wait_for_sheets, write_carry_over, write_sheets, PollConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Outcome of a horizon run; the manifest on disk carries the same records.
#[derive(Debug)]
pub struct HorizonSummary {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub manifest_path: PathBuf,
    pub windows: Vec<WindowRecord>,
    /// Carry-over extracted from the last solved window
    pub final_state: Option<WindowState>,
}

impl HorizonSummary {
    pub fn succeeded(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

/// Output directory of one window below `root`.
pub fn window_dir(root: &Path, window: &Window) -> PathBuf {
    root.join(format!("window_{}_{}", window.start, window.end))
}

struct WindowOutcome {
    objective: f64,
    extension_cost: f64,
    warnings: usize,
    solve_time_ms: u64,
    state: WindowState,
}

/// Solve the configured horizon window by window.
///
/// **Per window:**
/// 1. Slice the data to the window and overwrite its seeds with the
///    carry-over of the previous window (none for the first window).
/// 2. Build and solve the extension problem against the configured base model.
/// 3. Write the result sheets and `carry_over.json` to `window_<start>_<end>/`.
/// 4. Extract the state at the next window's `start - 1` (the terminal year
///    for fixed windows).
///
/// With [`HandoffMode::Files`] step 1 waits for the previous window's sheets
/// on disk and rebuilds the carry-over from them instead of using the
/// in-memory snapshot.
///
/// A failed window is terminal: the remaining windows are recorded as
/// skipped. Results of earlier windows stay on disk and the run manifest is
/// written either way; the returned summary reports the failure.
pub fn run_horizon(
    data: &ExtensionData,
    config: &RunConfig,
    scenario: Option<&str>,
) -> Result<HorizonSummary> {
    let horizon = config.horizon(data)?;
    let windows = plan_windows(horizon, config.mode, config.window, config.scheme)?;
    fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "creating run output root '{}'",
            config.output_root.display()
        )
    })?;
    let base = config.base.model();
    info!(
        mode = %config.mode,
        horizon = %horizon,
        windows = windows.len(),
        base = base.name(),
        "starting horizon run"
    );

    let mut records = Vec::with_capacity(windows.len());
    let mut carried: Option<WindowState> = None;
    // Seed the previous window was solved with, for rebuilding its totals
    let mut previous_seed: Option<WindowState> = None;
    let mut previous_dir: Option<PathBuf> = None;
    let mut halted_by: Option<Window> = None;

    for (i, window) in windows.iter().enumerate() {
        let output = window_dir(&config.output_root, window);
        if let Some(failed) = halted_by {
            records.push(WindowRecord {
                window: *window,
                status: WindowStatus::Skipped,
                objective: None,
                extension_cost: None,
                warnings: 0,
                solve_time_ms: None,
                error: Some(format!("window {} failed", failed)),
                output: output.display().to_string(),
            });
            continue;
        }

        info!(window = %window, index = i + 1, of = windows.len(), "solving window");
        let seed = match (config.handoff, &previous_dir) {
            (HandoffMode::Files, Some(dir)) => read_handoff(
                dir,
                window,
                data.site_techs(),
                previous_seed.as_ref(),
                config.poll(),
            )
            .map(Some),
            _ => Ok(carried.clone()),
        };
        let outcome = seed.and_then(|seed| {
            let next = windows.get(i + 1);
            solve_window(data, config, base.as_ref(), window, next, seed.as_ref(), &output)
                .map(|outcome| (seed, outcome))
        });

        match outcome {
            Ok((seed, outcome)) => {
                info!(
                    window = %window,
                    objective = outcome.objective,
                    extension_cost = outcome.extension_cost,
                    carry_year = outcome.state.source_year,
                    "window solved"
                );
                records.push(WindowRecord {
                    window: *window,
                    status: WindowStatus::Ok,
                    objective: Some(outcome.objective),
                    extension_cost: Some(outcome.extension_cost),
                    warnings: outcome.warnings,
                    solve_time_ms: Some(outcome.solve_time_ms),
                    error: None,
                    output: output.display().to_string(),
                });
                previous_seed = seed;
                carried = Some(outcome.state);
                previous_dir = Some(output);
            }
            Err(err) => {
                error!(window = %window, "window failed, halting horizon: {:#}", err);
                records.push(WindowRecord {
                    window: *window,
                    status: WindowStatus::Failed,
                    objective: None,
                    extension_cost: None,
                    warnings: 0,
                    solve_time_ms: None,
                    error: Some(format!("{:#}", err)),
                    output: output.display().to_string(),
                });
                halted_by = Some(*window);
            }
        }
    }

    let count = |status: WindowStatus| records.iter().filter(|r| r.status == status).count();
    let (completed, failed, skipped) = (
        count(WindowStatus::Ok),
        count(WindowStatus::Failed),
        count(WindowStatus::Skipped),
    );
    let manifest = RunManifest {
        created_at: Utc::now(),
        scenario: scenario.map(str::to_string),
        mode: config.mode,
        scheme: config.scheme,
        handoff: config.handoff,
        horizon,
        num_windows: records.len(),
        completed,
        failed,
        skipped,
        windows: records.clone(),
    };
    let manifest_path = config.output_root.join(RUN_MANIFEST_FILE);
    write_run_manifest(&manifest_path, &manifest)?;
    info!(completed, failed, skipped, manifest = %manifest_path.display(), "horizon run finished");

    Ok(HorizonSummary {
        completed,
        failed,
        skipped,
        manifest_path,
        windows: records,
        final_state: carried,
    })
}

fn solve_window(
    data: &ExtensionData,
    config: &RunConfig,
    base: &dyn BaseEnergyModel,
    window: &Window,
    next: Option<&Window>,
    seed: Option<&WindowState>,
    output: &Path,
) -> Result<WindowOutcome> {
    let mut slice = data
        .slice(*window)
        .with_context(|| format!("slicing data to window {}", window))?;
    if let Some(state) = seed {
        state.apply(&mut slice).with_context(|| {
            format!(
                "seeding window {} from year {}",
                window, state.source_year
            )
        })?;
    }

    let problem = ExtensionProblemBuilder::new(slice)
        .policy(config.policy.clone())
        .build();
    let solution = solve_extension(&problem, base, &config.solver)
        .with_context(|| format!("solving window {}", window))?;

    let sheets = solution.to_sheets(seed);
    write_sheets(output, &sheets)?;
    let carry_year = next.map(|w| w.carry_year()).unwrap_or(window.end);
    let state = WindowState::from_sheets(&sheets, carry_year, solution.sites(), seed)
        .with_context(|| format!("extracting carry-over of window {} at {}", window, carry_year))?;
    write_carry_over(output, &state)?;

    Ok(WindowOutcome {
        objective: solution.objective,
        extension_cost: solution.extension_cost,
        warnings: solution.diagnostics.warning_count(),
        solve_time_ms: solution.solve_time.as_millis() as u64,
        state,
    })
}

/// Rebuild the carry-over of `window` from the sheets the previous window
/// wrote to `dir`, waiting until they are all present.
fn read_handoff<'a>(
    dir: &Path,
    window: &Window,
    sites: impl IntoIterator<Item = &'a SiteTech>,
    previous_seed: Option<&WindowState>,
    poll: PollConfig,
) -> Result<WindowState> {
    wait_for_sheets(dir, &SheetName::ALL, poll)?;
    let sheets = read_sheets(dir)?;
    let state = WindowState::from_sheets(&sheets, window.carry_year(), sites, previous_seed)
        .with_context(|| {
            format!(
                "reading carry-over for window {} from '{}'",
                window,
                dir.display()
            )
        })?;
    debug!(
        window = %window,
        source_year = state.source_year,
        dir = %dir.display(),
        "carry-over read from sheets"
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HorizonMode;
    use circap_algo::test_utils::single_site_data;
    use tempfile::tempdir;

    #[test]
    fn window_dir_names() {
        let w = Window::new(2025, 2029).unwrap();
        assert_eq!(
            window_dir(Path::new("out"), &w),
            PathBuf::from("out/window_2025_2029")
        );
    }

    #[test]
    fn perfect_run_writes_one_window() {
        let dir = tempdir().unwrap();
        let data = single_site_data(2025, 2026);
        let config = RunConfig {
            output_root: dir.path().to_path_buf(),
            ..RunConfig::default()
        };
        let summary = run_horizon(&data, &config, None).unwrap();
        assert!(summary.succeeded());
        assert_eq!(summary.windows.len(), 1);
        assert_eq!(config.mode, HorizonMode::Perfect);

        let out = window_dir(dir.path(), &Window::new(2025, 2026).unwrap());
        assert!(out.join("decom.csv").is_file());
        assert!(out.join(circap_io::sheets::CARRY_OVER_FILE).is_file());
        assert!(summary.manifest_path.is_file());
        assert_eq!(summary.final_state.unwrap().source_year, 2026);
    }
}
