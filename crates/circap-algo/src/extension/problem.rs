//! Extension problem definition
//!
//! Combines the typed parameter tables with the policy switches that select
//! between the historical variants of several rules.

use circap_core::{ExtensionData, Year, EPOCH_YEAR};
use serde::{Deserialize, Serialize};

/// How the pre-horizon fleet retires while no in-window cohort has reached
/// the end of its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecommissionFloor {
    /// `Decommissioned[y] = decommission_start`
    #[default]
    Flat,
    /// `Decommissioned[y] = decommission_start + multiplier * NewCapacity[y]`
    Proportional { multiplier: f64 },
}

/// Which channels count towards the domestic-content benchmark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkVariant {
    /// `Primary + Secondary + Stockout - StockImported`
    #[default]
    NetStock,
    /// `Primary + Secondary`
    DomesticOnly,
}

/// Minimum share of new capacity supplied through non-import channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRule {
    pub share: f64,
    #[serde(default)]
    pub variant: BenchmarkVariant,
}

impl Default for BenchmarkRule {
    fn default() -> Self {
        Self {
            share: 0.4,
            variant: BenchmarkVariant::NetStock,
        }
    }
}

/// Upper bound on new capacity of one technology installed up to a milestone year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeCap {
    pub tech: String,
    pub through_year: Year,
    pub cap: f64,
}

impl CumulativeCap {
    /// TYNDP best-estimate milestones for solar PV (MW).
    pub fn tyndp_solar() -> Vec<CumulativeCap> {
        [(2030, 558_118.0), (2040, 1_177_233.0), (2050, 1_753_785.0)]
            .into_iter()
            .map(|(through_year, cap)| CumulativeCap {
                tech: "solarPV".to_string(),
                through_year,
                cap,
            })
            .collect()
    }
}

/// Policy switches and numerical constants of the formulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Absolute first simulated year
    pub epoch_year: Year,
    /// Big-M bound of the learning-curve product linearization; capped at the
    /// installable ceiling unless `reuse_headroom` is set
    pub big_m: f64,
    pub decommission_floor: DecommissionFloor,
    /// Allow last year's decommissioned volume on top of the installable ceiling
    pub reuse_headroom: bool,
    /// Maximum share of imports routed into the stockpile
    pub max_stock_in_share: f64,
    /// Domestic-content benchmark; `None` disables it
    pub benchmark: Option<BenchmarkRule>,
    pub cumulative_caps: Vec<CumulativeCap>,
    /// Enforce `Stockpile >= stock_level`
    pub minimum_stock: bool,
    /// Enforce the yearly growth limit of recovered scrap
    pub recycling_growth_limit: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            epoch_year: EPOCH_YEAR,
            big_m: 1e10,
            decommission_floor: DecommissionFloor::Flat,
            reuse_headroom: false,
            max_stock_in_share: 0.5,
            benchmark: Some(BenchmarkRule::default()),
            cumulative_caps: Vec::new(),
            minimum_stock: false,
            recycling_growth_limit: true,
        }
    }
}

/// One model build: data of a single window plus policy.
#[derive(Debug, Clone)]
pub struct ExtensionProblem {
    pub data: ExtensionData,
    pub policy: PolicyConfig,
}

impl ExtensionProblem {
    pub fn new(data: ExtensionData) -> Self {
        Self {
            data,
            policy: PolicyConfig::default(),
        }
    }
}

/// Builder for [`ExtensionProblem`].
pub struct ExtensionProblemBuilder {
    problem: ExtensionProblem,
}

impl ExtensionProblemBuilder {
    pub fn new(data: ExtensionData) -> Self {
        Self {
            problem: ExtensionProblem::new(data),
        }
    }

    pub fn policy(mut self, policy: PolicyConfig) -> Self {
        self.problem.policy = policy;
        self
    }

    pub fn big_m(mut self, big_m: f64) -> Self {
        self.problem.policy.big_m = big_m;
        self
    }

    pub fn epoch_year(mut self, year: Year) -> Self {
        self.problem.policy.epoch_year = year;
        self
    }

    pub fn decommission_floor(mut self, floor: DecommissionFloor) -> Self {
        self.problem.policy.decommission_floor = floor;
        self
    }

    pub fn benchmark(mut self, rule: Option<BenchmarkRule>) -> Self {
        self.problem.policy.benchmark = rule;
        self
    }

    pub fn cumulative_cap(mut self, cap: CumulativeCap) -> Self {
        self.problem.policy.cumulative_caps.push(cap);
        self
    }

    pub fn reuse_headroom(mut self, enabled: bool) -> Self {
        self.problem.policy.reuse_headroom = enabled;
        self
    }

    pub fn minimum_stock(mut self, enabled: bool) -> Self {
        self.problem.policy.minimum_stock = enabled;
        self
    }

    pub fn build(self) -> ExtensionProblem {
        self.problem
    }
}
