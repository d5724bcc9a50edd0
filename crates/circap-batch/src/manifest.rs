use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use circap_core::Window;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::Path;

use crate::config::{HandoffMode, HorizonMode, WindowScheme};

pub const RUN_MANIFEST_FILE: &str = "run_manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    Ok,
    Failed,
    /// Not attempted because an earlier window failed
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowRecord {
    pub window: Window,
    pub status: WindowStatus,
    pub objective: Option<f64>,
    pub extension_cost: Option<f64>,
    /// Verification warnings of the solved window
    #[serde(default)]
    pub warnings: usize,
    pub solve_time_ms: Option<u64>,
    pub error: Option<String>,
    pub output: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub created_at: DateTime<Utc>,
    pub scenario: Option<String>,
    pub mode: HorizonMode,
    pub scheme: WindowScheme,
    pub handoff: HandoffMode,
    pub horizon: Window,
    pub num_windows: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub windows: Vec<WindowRecord>,
}

pub fn write_run_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating manifest directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(manifest).context("serializing run manifest to JSON")?;
    fs::write(path, json).with_context(|| format!("writing run manifest '{}'", path.display()))?;
    Ok(())
}

pub fn load_run_manifest(path: &Path) -> Result<RunManifest> {
    let file =
        File::open(path).with_context(|| format!("opening run manifest '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing run manifest '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn manifest_writes_and_reads_back() {
        let record = WindowRecord {
            window: Window::new(2025, 2029).unwrap(),
            status: WindowStatus::Ok,
            objective: Some(12.5),
            extension_cost: Some(10.0),
            warnings: 0,
            solve_time_ms: Some(42),
            error: None,
            output: "out/window_2025_2029".into(),
        };
        let manifest = RunManifest {
            created_at: Utc::now(),
            scenario: Some("reference".into()),
            mode: HorizonMode::Rolling,
            scheme: WindowScheme::Fixed,
            handoff: HandoffMode::InProcess,
            horizon: Window::new(2025, 2029).unwrap(),
            num_windows: 1,
            completed: 1,
            failed: 0,
            skipped: 0,
            windows: vec![record],
        };
        let tmp = NamedTempFile::new().unwrap();
        write_run_manifest(tmp.path(), &manifest).unwrap();
        let text = fs::read_to_string(tmp.path()).unwrap();
        assert!(text.contains("\"mode\": \"rolling\""));
        let parsed = load_run_manifest(tmp.path()).unwrap();
        assert_eq!(parsed.scenario.as_deref(), Some("reference"));
        assert_eq!(parsed.windows[0].status, WindowStatus::Ok);
        assert_eq!(parsed.windows[0].window.end, 2029);
    }
}
