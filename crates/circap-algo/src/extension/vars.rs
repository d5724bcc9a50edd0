//! Decision-variable schema of the extension model.
//!
//! Every variable is continuous and non-negative except the step-activation
//! flags, which are binary. Variables exist only for the years of the window
//! being built; a rule that asks for anything else gets
//! [`ModelError::MissingIndex`].

use super::error::{ModelError, ModelResult};
use circap_core::{CapacityKey, ExtensionData, SiteTech, TimestepKey, Year};
use good_lp::{variable, ProblemVariables, Variable};
use std::collections::BTreeMap;
use std::fmt;

/// Aggregated cost categories entering the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CostType {
    Import,
    Storage,
    Primary,
    Secondary,
}

impl CostType {
    pub const ALL: [CostType; 4] = [
        CostType::Import,
        CostType::Storage,
        CostType::Primary,
        CostType::Secondary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CostType::Import => "import",
            CostType::Storage => "storage",
            CostType::Primary => "eu_primary",
            CostType::Secondary => "eu_secondary",
        }
    }
}

impl fmt::Display for CostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step-activation flag and its linearized product with EU-secondary production.
#[derive(Debug, Clone, Copy)]
pub struct StepVars {
    /// Binary: step active in this year
    pub active: Variable,
    /// `active * secondary`, linearized with big-M rows
    pub product: Variable,
}

/// Variables of one (year, location, tech).
#[derive(Debug, Clone)]
pub struct YearVars {
    pub capacity_ext: Variable,
    pub capacity_new: Variable,
    pub imported: Variable,
    pub stockout: Variable,
    pub primary: Variable,
    pub secondary: Variable,
    pub stock_imported: Variable,
    pub stockpile: Variable,
    pub decommissioned: Variable,
    pub anti_dumping: Variable,
    pub price_reduction: Variable,
    pub secondary_cumulative: Variable,
    pub scrap_dec: Variable,
    pub scrap_rec: Variable,
    pub scrap_total: Variable,
    pub cost_import: Variable,
    pub cost_storage: Variable,
    pub cost_primary: Variable,
    pub cost_secondary: Variable,
    pub cost_scrap: Variable,
    /// One entry per learning-curve step, in curve order
    pub steps: Vec<StepVars>,
}

/// Per-timestep energy delivered by extension capacity, total and by channel.
#[derive(Debug, Clone, Copy)]
pub struct BalanceVars {
    pub total: Variable,
    pub imported: Variable,
    pub stockout: Variable,
    pub primary: Variable,
    pub secondary: Variable,
}

/// Index of all extension variables of one model build.
#[derive(Debug, Clone, Default)]
pub struct ExtensionVars {
    pub years: BTreeMap<CapacityKey, YearVars>,
    pub balance: BTreeMap<TimestepKey, BalanceVars>,
    pub costs_new: BTreeMap<CostType, Variable>,
}

fn nonneg(vars: &mut ProblemVariables) -> Variable {
    vars.add(variable().min(0.0))
}

impl YearVars {
    fn declare(vars: &mut ProblemVariables, n_steps: usize) -> Self {
        let steps = (0..n_steps)
            .map(|_| StepVars {
                active: vars.add(variable().binary()),
                product: nonneg(vars),
            })
            .collect();
        Self {
            capacity_ext: nonneg(vars),
            capacity_new: nonneg(vars),
            imported: nonneg(vars),
            stockout: nonneg(vars),
            primary: nonneg(vars),
            secondary: nonneg(vars),
            stock_imported: nonneg(vars),
            stockpile: nonneg(vars),
            decommissioned: nonneg(vars),
            anti_dumping: nonneg(vars),
            price_reduction: nonneg(vars),
            secondary_cumulative: nonneg(vars),
            scrap_dec: nonneg(vars),
            scrap_rec: nonneg(vars),
            scrap_total: nonneg(vars),
            cost_import: nonneg(vars),
            cost_storage: nonneg(vars),
            cost_primary: nonneg(vars),
            cost_secondary: nonneg(vars),
            cost_scrap: nonneg(vars),
            steps,
        }
    }
}

impl ExtensionVars {
    /// Create the variables for every year of the data window.
    pub fn declare(vars: &mut ProblemVariables, data: &ExtensionData) -> Self {
        let mut index = ExtensionVars::default();
        for site in data.site_techs() {
            let n_steps = data.curve_for(&site.tech).len();
            for year in data.years() {
                index
                    .years
                    .insert(site.at(year), YearVars::declare(vars, n_steps));
                for &timestep in &data.timesteps {
                    index.balance.insert(
                        TimestepKey {
                            timestep,
                            key: site.at(year),
                        },
                        BalanceVars {
                            total: nonneg(vars),
                            imported: nonneg(vars),
                            stockout: nonneg(vars),
                            primary: nonneg(vars),
                            secondary: nonneg(vars),
                        },
                    );
                }
            }
        }
        for cost_type in CostType::ALL {
            index.costs_new.insert(cost_type, nonneg(vars));
        }
        index
    }

    pub fn at(&self, year: Year, site: &SiteTech) -> ModelResult<&YearVars> {
        self.years.get(&site.at(year)).ok_or_else(|| {
            ModelError::MissingIndex(format!("no variables for ({}, {})", year, site))
        })
    }

    pub fn step(&self, year: Year, site: &SiteTech, step: usize) -> ModelResult<StepVars> {
        self.at(year, site)?.steps.get(step).copied().ok_or_else(|| {
            ModelError::MissingIndex(format!("no step {} for ({}, {})", step, year, site))
        })
    }

    pub fn balance_at(
        &self,
        timestep: u32,
        year: Year,
        site: &SiteTech,
    ) -> ModelResult<&BalanceVars> {
        self.balance
            .get(&TimestepKey {
                timestep,
                key: site.at(year),
            })
            .ok_or_else(|| {
                ModelError::MissingIndex(format!(
                    "no balance variables for (t={}, {}, {})",
                    timestep, year, site
                ))
            })
    }

    pub fn cost_new(&self, cost_type: CostType) -> ModelResult<Variable> {
        self.costs_new
            .get(&cost_type)
            .copied()
            .ok_or_else(|| ModelError::MissingIndex(format!("no aggregate for {}", cost_type)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::single_site_data;

    #[test]
    fn test_declares_one_set_per_year_and_site() {
        let data = single_site_data(2025, 2027);
        let mut vars = ProblemVariables::new();
        let index = ExtensionVars::declare(&mut vars, &data);
        assert_eq!(index.years.len(), 3);
        assert_eq!(index.costs_new.len(), 4);
        let site = SiteTech::new("EU27", "solarPV");
        assert_eq!(index.at(2026, &site).unwrap().steps.len(), 7);
        assert_eq!(index.balance.len(), 3 * data.timesteps.len());
    }

    #[test]
    fn test_lookup_outside_window_is_missing_index() {
        let data = single_site_data(2025, 2026);
        let mut vars = ProblemVariables::new();
        let index = ExtensionVars::declare(&mut vars, &data);
        let site = SiteTech::new("EU27", "solarPV");
        assert!(matches!(
            index.at(2024, &site),
            Err(ModelError::MissingIndex(_))
        ));
        assert!(index.step(2025, &site, 9).is_err());
        assert!(index.balance_at(99, 2025, &site).is_err());
    }
}
