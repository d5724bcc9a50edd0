//! Typed parameter tables for the capacity-extension model.
//!
//! [`ExtensionData`] is what the loader produces and what the model builder
//! consumes: per-(location, tech) attributes, per-(year, location, tech)
//! cost and ceiling tables, load-factor time series and the learning-curve
//! step tables.

use crate::index::{CapacityKey, SiteTech, TimestepKey, Window, Year};
use crate::{CircapError, CircapResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Technologies that receive the default secondary-manufacturing learning curve.
pub const LEARNING_TECHS: [&str; 3] = ["solarPV", "windon", "windoff"];

/// Cumulative secondary capacity thresholds (MW) of the default curve.
const DEFAULT_THRESHOLDS: [f64; 7] = [0.0, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7];

/// Price reductions (EUR/MW) of the default curve, learning rate 3.55 %.
const DEFAULT_REDUCTIONS: [f64; 7] = [
    0.0,
    46841.69972,
    88383.54549,
    125225.1836,
    157898.4141,
    186874.8668,
    212572.8099,
];

/// Longest accepted technical lifetime in years.
pub const MAX_LIFETIME: u32 = 1000;

/// Static attributes of one (location, technology) pair.
///
/// The `initial_*`, `decommission_start`, `price_reduction_init` and
/// `last_*_cap` fields are the seeds of the first modelled year. A rolling
/// run overwrites them with the previous window's terminal state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechParams {
    /// Installed extension capacity before the window (MW)
    pub initial_capacity: f64,
    /// Stockpile level before the window (MW)
    pub initial_stockpile: f64,
    /// Technical lifetime in years
    pub lifetime: u32,
    /// Surcharge factor on imported and stock-imported volumes
    pub anti_dumping_index: f64,
    /// Absolute yearly ramp allowance for EU-primary production
    pub dq_primary: f64,
    /// Absolute yearly ramp allowance for EU-secondary production
    pub dq_secondary: f64,
    /// Relative yearly growth rate for EU-primary production
    pub ir_primary: f64,
    /// Relative yearly growth rate for EU-secondary production
    pub ir_secondary: f64,
    /// Minimum share of last year's EU-primary production kept
    pub dr_primary: f64,
    /// Minimum share of last year's EU-secondary production kept
    pub dr_secondary: f64,
    /// Storage cost per MW held in stock
    pub storage_cost: f64,
    /// Logistic cost per MW moved into stock
    pub logistic_cost: f64,
    /// Cumulative secondary capacity before the window (MW)
    pub initial_secondary_cap: f64,
    /// Scrap generated per MW decommissioned
    pub scrap: f64,
    /// Raw material demand per MW manufactured
    pub mining: f64,
    /// Share of scrap recovered by recycling
    pub recycling_efficiency: f64,
    /// Relative yearly growth limit of recovered scrap
    pub ir_recycling: f64,
    /// Decommissioning of the pre-horizon fleet (MW/year)
    pub decommission_start: f64,
    /// Price reduction of the year before the window
    pub price_reduction_init: f64,
    /// EU-primary production of the year before the window
    pub last_primary_cap: f64,
    /// EU-secondary production of the year before the window
    pub last_secondary_cap: f64,
    /// Net scrap stock before the window
    pub initial_scrap_total: f64,
}

impl TechParams {
    /// Attribute names as they appear in `technologies.csv` and scenario overrides.
    pub const ATTRIBUTES: [&'static str; 22] = [
        "initial_capacity",
        "initial_stockpile",
        "lifetime",
        "anti_dumping_index",
        "dq_primary",
        "dq_secondary",
        "ir_primary",
        "ir_secondary",
        "dr_primary",
        "dr_secondary",
        "storage_cost",
        "logistic_cost",
        "initial_secondary_cap",
        "scrap",
        "mining",
        "recycling_efficiency",
        "ir_recycling",
        "decommission_start",
        "price_reduction_init",
        "last_primary_cap",
        "last_secondary_cap",
        "initial_scrap_total",
    ];

    /// Set an attribute by its sheet name.
    pub fn set_attribute(&mut self, name: &str, value: f64) -> CircapResult<()> {
        let slot = match name {
            "lifetime" => {
                if !(value.is_finite() && (1.0..=MAX_LIFETIME as f64).contains(&value)) {
                    return Err(CircapError::Validation(format!(
                        "lifetime must be in 1..={}, got {}",
                        MAX_LIFETIME, value
                    )));
                }
                self.lifetime = value.round() as u32;
                return Ok(());
            }
            "initial_capacity" => &mut self.initial_capacity,
            "initial_stockpile" => &mut self.initial_stockpile,
            "anti_dumping_index" => &mut self.anti_dumping_index,
            "dq_primary" => &mut self.dq_primary,
            "dq_secondary" => &mut self.dq_secondary,
            "ir_primary" => &mut self.ir_primary,
            "ir_secondary" => &mut self.ir_secondary,
            "dr_primary" => &mut self.dr_primary,
            "dr_secondary" => &mut self.dr_secondary,
            "storage_cost" => &mut self.storage_cost,
            "logistic_cost" => &mut self.logistic_cost,
            "initial_secondary_cap" => &mut self.initial_secondary_cap,
            "scrap" => &mut self.scrap,
            "mining" => &mut self.mining,
            "recycling_efficiency" => &mut self.recycling_efficiency,
            "ir_recycling" => &mut self.ir_recycling,
            "decommission_start" => &mut self.decommission_start,
            "price_reduction_init" => &mut self.price_reduction_init,
            "last_primary_cap" => &mut self.last_primary_cap,
            "last_secondary_cap" => &mut self.last_secondary_cap,
            "initial_scrap_total" => &mut self.initial_scrap_total,
            other => {
                return Err(CircapError::Config(format!(
                    "unknown technology attribute '{}'",
                    other
                )))
            }
        };
        *slot = value;
        Ok(())
    }

    /// Scrap recovered per MW of EU-secondary production.
    ///
    /// Zero when no recycling efficiency is configured.
    pub fn scrap_recovery_ratio(&self) -> f64 {
        if self.recycling_efficiency > 0.0 {
            self.mining / self.recycling_efficiency
        } else {
            0.0
        }
    }
}

/// Exogenous values indexed by (year, location, tech).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearlyParams {
    /// Unit import cost (EUR/MW)
    pub import_cost: f64,
    /// Unit EU-primary manufacturing cost (EUR/MW)
    pub manufacturing_cost: f64,
    /// Unit EU-secondary remanufacturing cost before learning (EUR/MW)
    pub remanufacturing_cost: f64,
    /// Unit recycling cost on recovered scrap
    pub recycling_cost: f64,
    /// Ceiling on new capacity (MW)
    pub installable_capacity: f64,
    /// Domestic-content ratio: max secondary share of extended capacity
    pub dcr: f64,
    /// Minimum stockpile level (used by the optional stock-level rule)
    pub stock_level: f64,
}

/// One linearization step of a learning curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningStep {
    pub step: u32,
    /// Price discount on secondary manufacturing once the step is active
    pub price_reduction: f64,
    /// Cumulative secondary capacity required to activate the step
    pub capacity_threshold: f64,
}

/// Piecewise step table mapping cumulative secondary capacity to a discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningCurve {
    pub steps: Vec<LearningStep>,
}

impl LearningCurve {
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self {
            steps: pairs
                .iter()
                .enumerate()
                .map(|(n, &(price_reduction, capacity_threshold))| LearningStep {
                    step: n as u32,
                    price_reduction,
                    capacity_threshold,
                })
                .collect(),
        }
    }

    /// Seven-step secondary-manufacturing curve applied to PV and wind.
    pub fn default_secondary() -> Self {
        let pairs: Vec<(f64, f64)> = DEFAULT_REDUCTIONS
            .iter()
            .copied()
            .zip(DEFAULT_THRESHOLDS.iter().copied())
            .collect();
        Self::from_pairs(&pairs)
    }

    /// Same thresholds, no discount: technologies without learning.
    pub fn flat() -> Self {
        let pairs: Vec<(f64, f64)> = DEFAULT_THRESHOLDS.iter().map(|&t| (0.0, t)).collect();
        Self::from_pairs(&pairs)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn validate(&self) -> CircapResult<()> {
        if self.steps.is_empty() {
            return Err(CircapError::Validation(
                "learning curve has no steps".into(),
            ));
        }
        for pair in self.steps.windows(2) {
            if pair[1].capacity_threshold < pair[0].capacity_threshold {
                return Err(CircapError::Validation(format!(
                    "learning curve thresholds must be non-decreasing (step {} < step {})",
                    pair[1].step, pair[0].step
                )));
            }
        }
        Ok(())
    }
}

/// Complete input of one model build.
#[derive(Debug, Clone)]
pub struct ExtensionData {
    /// First modelled year of this build (window start)
    pub y0: Year,
    /// Last modelled year of this build
    pub y_end: Year,
    /// Hours represented by one extension timestep
    pub hours: f64,
    pub locations: Vec<String>,
    pub sites: BTreeMap<SiteTech, TechParams>,
    pub yearly: BTreeMap<CapacityKey, YearlyParams>,
    pub timesteps: Vec<u32>,
    pub load_factors: BTreeMap<TimestepKey, f64>,
    /// Electricity demand per (timestep, year, location), MWh
    pub demand: BTreeMap<(u32, Year, String), f64>,
    /// Learning curves by technology name
    pub learning: BTreeMap<String, LearningCurve>,
    /// Curve for technologies without an entry in `learning`
    pub fallback_curve: LearningCurve,
}

impl ExtensionData {
    pub fn new(y0: Year, y_end: Year) -> Self {
        let learning = LEARNING_TECHS
            .iter()
            .map(|t| (t.to_string(), LearningCurve::default_secondary()))
            .collect();
        Self {
            y0,
            y_end,
            hours: 1.0,
            locations: Vec::new(),
            sites: BTreeMap::new(),
            yearly: BTreeMap::new(),
            timesteps: Vec::new(),
            load_factors: BTreeMap::new(),
            demand: BTreeMap::new(),
            learning,
            fallback_curve: LearningCurve::flat(),
        }
    }

    pub fn window(&self) -> Window {
        Window {
            start: self.y0,
            end: self.y_end,
        }
    }

    pub fn years(&self) -> impl Iterator<Item = Year> {
        self.y0..=self.y_end
    }

    pub fn site_techs(&self) -> impl Iterator<Item = &SiteTech> {
        self.sites.keys()
    }

    pub fn params(&self, site: &SiteTech) -> CircapResult<&TechParams> {
        self.sites
            .get(site)
            .ok_or_else(|| CircapError::Lookup(format!("no technology attributes for {}", site)))
    }

    pub fn params_mut(&mut self, site: &SiteTech) -> CircapResult<&mut TechParams> {
        self.sites
            .get_mut(site)
            .ok_or_else(|| CircapError::Lookup(format!("no technology attributes for {}", site)))
    }

    pub fn yearly(&self, year: Year, site: &SiteTech) -> CircapResult<&YearlyParams> {
        self.yearly.get(&site.at(year)).ok_or_else(|| {
            CircapError::Lookup(format!("no yearly parameters for {} {}", year, site))
        })
    }

    pub fn load_factor(&self, timestep: u32, year: Year, site: &SiteTech) -> f64 {
        self.load_factors
            .get(&TimestepKey {
                timestep,
                key: site.at(year),
            })
            .copied()
            .unwrap_or(0.0)
    }

    pub fn demand_at(&self, timestep: u32, year: Year, location: &str) -> f64 {
        self.demand
            .get(&(timestep, year, location.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn curve_for(&self, tech: &str) -> &LearningCurve {
        self.learning.get(tech).unwrap_or(&self.fallback_curve)
    }

    /// Register a (location, tech) pair with its attributes.
    pub fn insert_site(&mut self, site: SiteTech, params: TechParams) {
        if !self.locations.contains(&site.location) {
            self.locations.push(site.location.clone());
        }
        self.sites.insert(site, params);
    }

    /// Restrict all year-indexed tables to `window`.
    pub fn slice(&self, window: Window) -> CircapResult<ExtensionData> {
        if window.start < self.y0 || window.end > self.y_end {
            return Err(CircapError::Validation(format!(
                "window {} outside data horizon [{}, {}]",
                window, self.y0, self.y_end
            )));
        }
        let mut sliced = self.clone();
        sliced.y0 = window.start;
        sliced.y_end = window.end;
        sliced.yearly.retain(|k, _| window.contains(k.year));
        sliced.load_factors.retain(|k, _| window.contains(k.key.year));
        sliced.demand.retain(|(_, y, _), _| window.contains(*y));
        Ok(sliced)
    }

    pub fn validate(&self) -> CircapResult<()> {
        if self.locations.is_empty() || self.sites.is_empty() {
            return Err(CircapError::Validation(
                "at least one location and technology are required".into(),
            ));
        }
        if self.y0 > self.y_end {
            return Err(CircapError::Validation(format!(
                "y0 {} is after y_end {}",
                self.y0, self.y_end
            )));
        }
        if !(self.hours.is_finite() && self.hours > 0.0) {
            return Err(CircapError::Validation(format!(
                "hours per timestep must be positive, got {}",
                self.hours
            )));
        }
        for (site, params) in &self.sites {
            if !(1..=MAX_LIFETIME).contains(&params.lifetime) {
                return Err(CircapError::Validation(format!(
                    "lifetime of {} must be in 1..={}, got {}",
                    site, MAX_LIFETIME, params.lifetime
                )));
            }
            for year in self.years() {
                self.yearly(year, site)?;
            }
            self.curve_for(&site.tech).validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> ExtensionData {
        let mut data = ExtensionData::new(2025, 2027);
        let site = SiteTech::new("EU27", "solarPV");
        data.insert_site(
            site.clone(),
            TechParams {
                lifetime: 25,
                ..TechParams::default()
            },
        );
        for y in 2025..=2027 {
            data.yearly.insert(site.at(y), YearlyParams::default());
        }
        data
    }

    #[test]
    fn test_default_curve_shape() {
        let curve = LearningCurve::default_secondary();
        assert_eq!(curve.len(), 7);
        assert_eq!(curve.steps[0].price_reduction, 0.0);
        assert_eq!(curve.steps[6].capacity_threshold, 1e7);
        assert!(curve.validate().is_ok());
        assert!(LearningCurve::flat().steps.iter().all(|s| s.price_reduction == 0.0));
    }

    #[test]
    fn test_curve_for_falls_back_to_flat() {
        let data = tiny();
        assert_eq!(data.curve_for("solarPV").steps[1].price_reduction, 46841.69972);
        assert_eq!(data.curve_for("biomass").steps[1].price_reduction, 0.0);
    }

    #[test]
    fn test_set_attribute_rejects_short_lifetime() {
        let mut p = TechParams::default();
        assert!(p.set_attribute("lifetime", 0.0).is_err());
        p.set_attribute("lifetime", 30.0).unwrap();
        assert_eq!(p.lifetime, 30);
        assert!(p.set_attribute("lifetime", 5e9).is_err());
        assert!(p.set_attribute("lifetime", f64::INFINITY).is_err());
        assert_eq!(p.lifetime, 30);
        assert!(p.set_attribute("colour", 1.0).is_err());
    }

    #[test]
    fn test_scrap_recovery_ratio_guards_zero_efficiency() {
        let mut p = TechParams::default();
        p.mining = 0.8;
        assert_eq!(p.scrap_recovery_ratio(), 0.0);
        p.recycling_efficiency = 0.4;
        assert!((p.scrap_recovery_ratio() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_slice_restricts_years() {
        let data = tiny();
        let sliced = data.slice(Window::new(2026, 2027).unwrap()).unwrap();
        assert_eq!(sliced.y0, 2026);
        assert_eq!(sliced.yearly.len(), 2);
        assert!(data.slice(Window::new(2024, 2026).unwrap()).is_err());
    }

    #[test]
    fn test_validate_requires_yearly_rows() {
        let mut data = tiny();
        assert!(data.validate().is_ok());
        data.yearly.remove(&CapacityKey::new(2026, "EU27", "solarPV"));
        assert!(matches!(data.validate(), Err(CircapError::Lookup(_))));
    }

    #[test]
    fn test_validate_rejects_overlong_lifetime() {
        let mut data = tiny();
        data.params_mut(&SiteTech::new("EU27", "solarPV"))
            .unwrap()
            .lifetime = u32::MAX;
        let err = data.validate().unwrap_err();
        assert!(err.to_string().contains("lifetime of EU27.solarPV"));
    }
}
