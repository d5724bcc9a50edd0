use anyhow::{anyhow, Context, Result};
use circap_algo::{BaseEnergyModel, NoBaseModel, PolicyConfig, ResidualDemandBase, SolverConfig};
use circap_core::{ExtensionData, Window, Year};
use circap_io::PollConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Perfect foresight solves the whole horizon at once; rolling solves
/// consecutive windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizonMode {
    #[default]
    Perfect,
    Rolling,
}

impl HorizonMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HorizonMode::Perfect => "perfect",
            HorizonMode::Rolling => "rolling",
        }
    }
}

impl fmt::Display for HorizonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HorizonMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "perfect" => Ok(HorizonMode::Perfect),
            "rolling" => Ok(HorizonMode::Rolling),
            other => Err(anyhow!(
                "unknown horizon mode '{}'; use 'perfect' or 'rolling'",
                other
            )),
        }
    }
}

/// Shape of rolling windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowScheme {
    /// `[s, s + window - 1]`, clipped at the horizon end
    #[default]
    Fixed,
    /// `[s, horizon_end]`; consecutive starts still advance by `window`
    OpenEnded,
}

impl FromStr for WindowScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "fixed" => Ok(WindowScheme::Fixed),
            "open_ended" => Ok(WindowScheme::OpenEnded),
            other => Err(anyhow!(
                "unknown window scheme '{}'; use 'fixed' or 'open_ended'",
                other
            )),
        }
    }
}

/// How the carry-over state travels between windows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffMode {
    /// Pass the extracted `WindowState` directly
    #[default]
    InProcess,
    /// Re-read the previous window's result sheets from disk
    Files,
}

/// Base energy model the extension is coupled to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaseConfig {
    #[default]
    None,
    ResidualDemand { backup_cost: f64, co2_factor: f64 },
}

impl BaseConfig {
    pub fn model(&self) -> Box<dyn BaseEnergyModel> {
        match *self {
            BaseConfig::None => Box::new(NoBaseModel),
            BaseConfig::ResidualDemand {
                backup_cost,
                co2_factor,
            } => Box::new(ResidualDemandBase {
                backup_cost,
                co2_factor,
            }),
        }
    }
}

/// Everything a horizon run needs besides the input data.
///
/// ```toml
/// mode = "rolling"
/// window = 5
/// output_root = "out/reference"
///
/// [base]
/// kind = "residual_demand"
/// backup_cost = 1e4
/// co2_factor = 0.4
///
/// [solver]
/// backend = "microlp"
/// mip_gap = 0.001
///
/// [policy]
/// minimum_stock = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// First solved year; defaults to the data's `y0`
    pub start: Option<Year>,
    /// Last solved year; defaults to the data's `y_end`
    pub end: Option<Year>,
    pub mode: HorizonMode,
    /// Window length in years (rolling mode)
    pub window: u32,
    pub scheme: WindowScheme,
    pub handoff: HandoffMode,
    pub output_root: PathBuf,
    pub poll_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub base: BaseConfig,
    pub solver: SolverConfig,
    pub policy: PolicyConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            mode: HorizonMode::Perfect,
            window: 5,
            scheme: WindowScheme::Fixed,
            handoff: HandoffMode::InProcess,
            output_root: PathBuf::from("out"),
            poll_timeout_ms: 60_000,
            poll_interval_ms: 200,
            base: BaseConfig::None,
            solver: SolverConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn poll(&self) -> PollConfig {
        PollConfig {
            timeout: Duration::from_millis(self.poll_timeout_ms),
            interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }

    /// Solved horizon: the configured bounds, or the data's own.
    pub fn horizon(&self, data: &ExtensionData) -> Result<Window> {
        let start = self.start.unwrap_or(data.y0);
        let end = self.end.unwrap_or(data.y_end);
        if start < data.y0 || end > data.y_end {
            return Err(anyhow!(
                "horizon [{}, {}] exceeds the loaded data [{}, {}]",
                start,
                end,
                data.y0,
                data.y_end
            ));
        }
        Window::new(start, end).context("invalid run horizon")
    }
}

pub fn load_run_config(path: &Path) -> Result<RunConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading run config '{}'", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing run config '{}'", path.display()))
}
