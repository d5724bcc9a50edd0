//! `circap run`: load inputs, apply a scenario and solve the horizon.

use anyhow::{anyhow, Context, Result};
use circap_algo::MilpSolverKind;
use circap_batch::{load_run_config, run_horizon, HandoffMode, RunConfig, WindowStatus};
use circap_io::load_extension_dir;
use circap_scenarios::{
    apply_scenario, load_spec_from_path, resolve_scenarios, select_scenario, ResolvedScenario,
};
use circap_cli::RunArgs;
use std::io::{self, Write};
use std::path::PathBuf;
use tabwriter::TabWriter;
use tracing::{info, warn};

pub fn handle(args: &RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => load_run_config(path)?,
        None => RunConfig::default(),
    };
    apply_flags(&mut config, args)?;

    let (scenario, input_from_set) = match &args.scenario {
        Some(path) => {
            let set = load_spec_from_path(path)?;
            let resolved = resolve_scenarios(&set)?;
            (Some(pick(resolved, args.select.as_deref())?), set.input_dir.map(PathBuf::from))
        }
        None => (None, None),
    };
    let input = args
        .input
        .clone()
        .or(input_from_set)
        .ok_or_else(|| {
            anyhow!("no input directory; pass --input or set input_dir in the scenario set")
        })?;

    let loaded = load_extension_dir(&input)
        .with_context(|| format!("loading input directory '{}'", input.display()))?;
    if loaded.diagnostics.warning_count() > 0 {
        warn!(
            warnings = loaded.diagnostics.warning_count(),
            "input loaded with warnings"
        );
    }
    let mut data = loaded.data;
    if let Some(scenario) = &scenario {
        apply_scenario(&mut data, &mut config.policy, scenario)?;
    }

    info!(
        input = %input.display(),
        mode = %config.mode,
        solver = config.solver.backend.as_str(),
        out = %config.output_root.display(),
        "running horizon"
    );
    let summary = run_horizon(
        &data,
        &config,
        scenario.as_ref().map(|s| s.scenario_id.as_str()),
    )?;

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "WINDOW\tSTATUS\tOBJECTIVE\tEXTENSION COST\tOUTPUT")?;
    for record in &summary.windows {
        let status = match record.status {
            WindowStatus::Ok => "ok",
            WindowStatus::Failed => "failed",
            WindowStatus::Skipped => "skipped",
        };
        writeln!(
            writer,
            "{}-{}\t{}\t{}\t{}\t{}",
            record.window.start,
            record.window.end,
            status,
            record
                .objective
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".into()),
            record
                .extension_cost
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".into()),
            record.output
        )?;
    }
    writer.flush()?;
    println!("run manifest: {}", summary.manifest_path.display());

    if !summary.succeeded() {
        let reason = summary
            .windows
            .iter()
            .find_map(|r| r.error.clone())
            .unwrap_or_default();
        return Err(anyhow!(
            "{} of {} windows did not complete: {}",
            summary.failed + summary.skipped,
            summary.windows.len(),
            reason
        ));
    }
    Ok(())
}

fn apply_flags(config: &mut RunConfig, args: &RunArgs) -> Result<()> {
    if let Some(mode) = &args.mode {
        config.mode = mode.parse()?;
    }
    if let Some(window) = args.window {
        config.window = window;
    }
    if let Some(scheme) = &args.scheme {
        config.scheme = scheme.parse()?;
    }
    if args.file_handoff {
        config.handoff = HandoffMode::Files;
    }
    if args.start.is_some() {
        config.start = args.start;
    }
    if args.end.is_some() {
        config.end = args.end;
    }
    if let Some(out) = &args.out {
        config.output_root = out.clone();
    }
    if let Some(solver) = &args.solver {
        config.solver.backend = solver.parse::<MilpSolverKind>()?;
    }
    Ok(())
}

/// A set with a single scenario needs no `--select`.
fn pick(resolved: Vec<ResolvedScenario>, select: Option<&str>) -> Result<ResolvedScenario> {
    match select {
        Some(id) => select_scenario(resolved, id),
        None if resolved.len() == 1 => resolved
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("scenario set is empty")),
        None => Err(anyhow!(
            "scenario set has {} scenarios; choose one with --select ({})",
            resolved.len(),
            resolved
                .iter()
                .map(|s| s.scenario_id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}
