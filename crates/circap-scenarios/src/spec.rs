use anyhow::{anyhow, bail, Context, Result};
use circap_algo::extension::{BenchmarkRule, CumulativeCap, DecommissionFloor};
use circap_algo::PolicyConfig;
use circap_core::{SiteTech, Year, YearlyParams};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub version: Option<u32>,
    /// Parameter directory the scenarios were written against
    pub input_dir: Option<String>,
    #[serde(default)]
    pub defaults: ScenarioDefaults,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefaults {
    #[serde(default = "default_scale")]
    pub demand_scale: f64,
    #[serde(default)]
    pub policy: PolicyPatch,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_scale() -> f64 {
    1.0
}

impl Default for ScenarioDefaults {
    fn default() -> Self {
        Self {
            demand_scale: default_scale(),
            policy: PolicyPatch::default(),
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub scenario_id: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    pub demand_scale: Option<f64>,
    #[serde(default)]
    pub policy: PolicyPatch,
    #[serde(default)]
    pub site_overrides: Vec<SiteOverride>,
    #[serde(default)]
    pub yearly_overrides: Vec<YearlyOverride>,
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
}

/// Policy fields a scenario may set. Absent fields keep the configured value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch_year: Option<Year>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub big_m: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decommission_floor: Option<DecommissionFloor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reuse_headroom: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_stock_in_share: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkToggle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cumulative_caps: Option<CapsPreset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_stock: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recycling_growth_limit: Option<bool>,
}

/// `benchmark: false` disables the rule, `true` restores the default
/// 40 % rule, a map sets share and variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BenchmarkToggle {
    Enabled(bool),
    Rule(BenchmarkRule),
}

impl BenchmarkToggle {
    pub fn rule(&self) -> Option<BenchmarkRule> {
        match self {
            BenchmarkToggle::Enabled(true) => Some(BenchmarkRule::default()),
            BenchmarkToggle::Enabled(false) => None,
            BenchmarkToggle::Rule(rule) => Some(*rule),
        }
    }
}

/// Either a named set of milestone caps or an explicit list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapsPreset {
    Named(String),
    Explicit(Vec<CumulativeCap>),
}

impl CapsPreset {
    pub fn caps(&self) -> Result<Vec<CumulativeCap>> {
        match self {
            CapsPreset::Named(name) => match name.as_str() {
                "tyndp" | "tyndp_solar" => Ok(CumulativeCap::tyndp_solar()),
                "none" => Ok(Vec::new()),
                other => Err(anyhow!(
                    "unknown cumulative cap preset '{}'; use 'tyndp_solar' or 'none'",
                    other
                )),
            },
            CapsPreset::Explicit(caps) => Ok(caps.clone()),
        }
    }
}

impl PolicyPatch {
    /// Merge with `base`; fields set on `self` win.
    pub fn over(&self, base: &PolicyPatch) -> PolicyPatch {
        PolicyPatch {
            epoch_year: self.epoch_year.or(base.epoch_year),
            big_m: self.big_m.or(base.big_m),
            decommission_floor: self.decommission_floor.or(base.decommission_floor),
            reuse_headroom: self.reuse_headroom.or(base.reuse_headroom),
            max_stock_in_share: self.max_stock_in_share.or(base.max_stock_in_share),
            benchmark: self.benchmark.or(base.benchmark),
            cumulative_caps: self
                .cumulative_caps
                .clone()
                .or_else(|| base.cumulative_caps.clone()),
            minimum_stock: self.minimum_stock.or(base.minimum_stock),
            recycling_growth_limit: self.recycling_growth_limit.or(base.recycling_growth_limit),
        }
    }

    pub fn apply_to(&self, policy: &mut PolicyConfig) -> Result<()> {
        if let Some(year) = self.epoch_year {
            policy.epoch_year = year;
        }
        if let Some(big_m) = self.big_m {
            policy.big_m = big_m;
        }
        if let Some(floor) = self.decommission_floor {
            policy.decommission_floor = floor;
        }
        if let Some(enabled) = self.reuse_headroom {
            policy.reuse_headroom = enabled;
        }
        if let Some(share) = self.max_stock_in_share {
            policy.max_stock_in_share = share;
        }
        if let Some(toggle) = self.benchmark {
            policy.benchmark = toggle.rule();
        }
        if let Some(preset) = &self.cumulative_caps {
            policy.cumulative_caps = preset.caps()?;
        }
        if let Some(enabled) = self.minimum_stock {
            policy.minimum_stock = enabled;
        }
        if let Some(enabled) = self.recycling_growth_limit {
            policy.recycling_growth_limit = enabled;
        }
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if let Some(big_m) = self.big_m {
            if !(big_m.is_finite() && big_m > 0.0) {
                bail!("big_m must be positive, got {}", big_m);
            }
        }
        if let Some(share) = self.max_stock_in_share {
            if !(0.0..=1.0).contains(&share) {
                bail!("max_stock_in_share must lie in [0, 1], got {}", share);
            }
        }
        if let Some(rule) = self.benchmark.and_then(|b| b.rule()) {
            if !(0.0..=1.0).contains(&rule.share) {
                bail!("benchmark share must lie in [0, 1], got {}", rule.share);
            }
        }
        if let Some(preset) = &self.cumulative_caps {
            preset.caps()?;
        }
        Ok(())
    }
}

/// Technology attribute overrides for every site matching `target`.
///
/// `target` is `LOCATION.TECH`; either part may be `*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteOverride {
    pub target: String,
    pub attributes: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearlyField {
    ImportCost,
    ManufacturingCost,
    RemanufacturingCost,
    RecyclingCost,
    InstallableCapacity,
    Dcr,
    StockLevel,
}

impl YearlyField {
    pub fn slot<'a>(&self, params: &'a mut YearlyParams) -> &'a mut f64 {
        match self {
            YearlyField::ImportCost => &mut params.import_cost,
            YearlyField::ManufacturingCost => &mut params.manufacturing_cost,
            YearlyField::RemanufacturingCost => &mut params.remanufacturing_cost,
            YearlyField::RecyclingCost => &mut params.recycling_cost,
            YearlyField::InstallableCapacity => &mut params.installable_capacity,
            YearlyField::Dcr => &mut params.dcr,
            YearlyField::StockLevel => &mut params.stock_level,
        }
    }
}

/// Set or scale one yearly table for matching sites, optionally limited
/// to `[from, to]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyOverride {
    pub target: String,
    pub field: YearlyField,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Year>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Year>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

impl YearlyOverride {
    pub fn covers(&self, year: Year) -> bool {
        self.from.map_or(true, |from| year >= from) && self.to.map_or(true, |to| year <= to)
    }

    pub fn apply(&self, current: f64) -> f64 {
        match (self.value, self.scale) {
            (Some(value), _) => value,
            (None, Some(scale)) => current * scale,
            (None, None) => current,
        }
    }
}

/// Whether a `LOCATION.TECH` pattern selects `site`.
pub fn target_matches(target: &str, site: &SiteTech) -> bool {
    match target.split_once('.') {
        Some((location, tech)) => {
            (location == "*" || location == site.location) && (tech == "*" || tech == site.tech)
        }
        None => false,
    }
}

fn check_target(target: &str) -> Result<()> {
    match target.split_once('.') {
        Some((location, tech)) if !location.is_empty() && !tech.is_empty() => Ok(()),
        _ => Err(anyhow!(
            "target '{}' must have the form LOCATION.TECH ('*' matches any)",
            target
        )),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedScenario {
    pub scenario_id: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub demand_scale: f64,
    pub policy: PolicyPatch,
    pub site_overrides: Vec<SiteOverride>,
    pub yearly_overrides: Vec<YearlyOverride>,
    pub metadata: BTreeMap<String, String>,
}

pub fn load_spec_from_path(path: &Path) -> Result<ScenarioSet> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading scenario spec '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing scenario spec yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing scenario spec json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing scenario spec"),
    }
}

pub fn resolve_scenarios(set: &ScenarioSet) -> Result<Vec<ResolvedScenario>> {
    if set.scenarios.is_empty() {
        return Err(anyhow!("scenario set contains no scenarios"));
    }
    let defaults = &set.defaults;
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(set.scenarios.len());
    for scenario in &set.scenarios {
        let id = scenario.scenario_id.trim();
        if id.is_empty() {
            return Err(anyhow!("scenario_id cannot be empty"));
        }
        if !seen.insert(id.to_string()) {
            return Err(anyhow!("duplicate scenario_id '{}' in spec", id));
        }

        let policy = scenario.policy.over(&defaults.policy);
        policy
            .check()
            .with_context(|| format!("policy of scenario '{}'", id))?;
        let demand_scale = scenario.demand_scale.unwrap_or(defaults.demand_scale);
        if !(demand_scale.is_finite() && demand_scale >= 0.0) {
            return Err(anyhow!(
                "scenario '{}': demand_scale must be non-negative, got {}",
                id,
                demand_scale
            ));
        }
        for site in &scenario.site_overrides {
            check_target(&site.target).with_context(|| format!("scenario '{}'", id))?;
        }
        for yearly in &scenario.yearly_overrides {
            check_target(&yearly.target).with_context(|| format!("scenario '{}'", id))?;
            match (yearly.value, yearly.scale) {
                (Some(_), Some(_)) => {
                    return Err(anyhow!(
                        "scenario '{}': override of {} sets both value and scale",
                        id,
                        yearly.target
                    ))
                }
                (None, None) => {
                    return Err(anyhow!(
                        "scenario '{}': override of {} needs a value or a scale",
                        id,
                        yearly.target
                    ))
                }
                _ => {}
            }
            if let (Some(from), Some(to)) = (yearly.from, yearly.to) {
                if from > to {
                    return Err(anyhow!(
                        "scenario '{}': override of {} has from {} after to {}",
                        id,
                        yearly.target,
                        from,
                        to
                    ));
                }
            }
        }

        resolved.push(ResolvedScenario {
            scenario_id: id.to_string(),
            description: scenario.description.clone(),
            tags: scenario
                .tags
                .clone()
                .unwrap_or_else(|| defaults.tags.clone()),
            demand_scale,
            policy,
            site_overrides: scenario.site_overrides.clone(),
            yearly_overrides: scenario.yearly_overrides.clone(),
            metadata: scenario
                .metadata
                .clone()
                .unwrap_or_else(|| defaults.metadata.clone()),
        });
    }
    Ok(resolved)
}

/// Pick one scenario by id.
pub fn select_scenario(resolved: Vec<ResolvedScenario>, id: &str) -> Result<ResolvedScenario> {
    let available: Vec<String> = resolved.iter().map(|s| s.scenario_id.clone()).collect();
    resolved
        .into_iter()
        .find(|s| s.scenario_id == id)
        .ok_or_else(|| {
            anyhow!(
                "scenario '{}' not found; available: {}",
                id,
                available.join(", ")
            )
        })
}

pub fn validate(set: &ScenarioSet) -> Result<()> {
    resolve_scenarios(set).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use circap_algo::extension::BenchmarkVariant;

    const SPEC: &str = r#"
version: 1
defaults:
  demand_scale: 1.1
  policy:
    minimum_stock: true
scenarios:
  - scenario_id: reference
  - scenario_id: no_benchmark
    tags: [policy]
    policy:
      benchmark: false
      cumulative_caps: tyndp_solar
  - scenario_id: domestic
    demand_scale: 0.9
    policy:
      benchmark:
        share: 0.6
        variant: domestic_only
      minimum_stock: false
    yearly_overrides:
      - target: "*.solarPV"
        field: import_cost
        scale: 1.25
        from: 2030
"#;

    fn parsed() -> ScenarioSet {
        serde_yaml::from_str(SPEC).unwrap()
    }

    #[test]
    fn resolves_defaults_and_overrides() {
        let resolved = resolve_scenarios(&parsed()).unwrap();
        assert_eq!(resolved.len(), 3);

        let reference = &resolved[0];
        assert_eq!(reference.demand_scale, 1.1);
        assert_eq!(reference.policy.minimum_stock, Some(true));
        assert!(reference.tags.is_empty());

        let domestic = &resolved[2];
        assert_eq!(domestic.demand_scale, 0.9);
        assert_eq!(domestic.policy.minimum_stock, Some(false));
        let rule = domestic.policy.benchmark.and_then(|b| b.rule()).unwrap();
        assert_eq!(rule.share, 0.6);
        assert_eq!(rule.variant, BenchmarkVariant::DomesticOnly);
        assert!(domestic.yearly_overrides[0].covers(2030));
        assert!(!domestic.yearly_overrides[0].covers(2029));
    }

    #[test]
    fn patch_updates_policy() {
        let resolved = resolve_scenarios(&parsed()).unwrap();
        let mut policy = PolicyConfig::default();
        resolved[1].policy.apply_to(&mut policy).unwrap();
        assert!(policy.benchmark.is_none());
        assert_eq!(policy.cumulative_caps.len(), 3);
        assert!(policy.minimum_stock);
        assert_eq!(policy.max_stock_in_share, 0.5);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut set = parsed();
        set.scenarios[1].scenario_id = "reference".into();
        let err = resolve_scenarios(&set).unwrap_err();
        assert!(err.to_string().contains("duplicate scenario_id"));
    }

    #[test]
    fn rejects_unknown_preset_and_bad_targets() {
        let mut set = parsed();
        set.scenarios[0].policy.cumulative_caps = Some(CapsPreset::Named("ambitious".into()));
        assert!(validate(&set).is_err());

        let mut set = parsed();
        set.scenarios[2].yearly_overrides[0].target = "solarPV".into();
        assert!(validate(&set).is_err());

        let mut set = parsed();
        set.scenarios[2].yearly_overrides[0].value = Some(1.0);
        assert!(validate(&set).is_err());
    }

    #[test]
    fn empty_set_is_invalid() {
        assert!(validate(&ScenarioSet::default()).is_err());
    }

    #[test]
    fn target_patterns() {
        let pv = SiteTech::new("EU27", "solarPV");
        assert!(target_matches("EU27.solarPV", &pv));
        assert!(target_matches("*.solarPV", &pv));
        assert!(target_matches("EU27.*", &pv));
        assert!(!target_matches("EU27.windon", &pv));
        assert!(!target_matches("solarPV", &pv));
    }

    #[test]
    fn select_reports_available_ids() {
        let resolved = resolve_scenarios(&parsed()).unwrap();
        assert_eq!(
            select_scenario(resolved.clone(), "domestic")
                .unwrap()
                .scenario_id,
            "domestic"
        );
        let err = select_scenario(resolved, "missing").unwrap_err();
        assert!(err.to_string().contains("reference, no_benchmark, domestic"));
    }
}
