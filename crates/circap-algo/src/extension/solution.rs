//! Extension solution data structures
//!
//! Holds the solved values of one window and turns them into the named
//! result sheets and the carry-over snapshot for the next window.

use super::model::BuiltModel;
use super::vars::{CostType, YearVars};
use circap_core::{
    CapacityKey, CapacityRecord, ChannelBalance, CircapResult, CostRecord, Diagnostics,
    ResultSheets, SiteTech, TimestepKey, Window, WindowState, Year,
};
use good_lp::Solution;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Solved values of one (year, location, tech).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearValues {
    pub capacity_ext: f64,
    pub capacity_new: f64,
    pub imported: f64,
    pub stockout: f64,
    pub primary: f64,
    pub secondary: f64,
    pub stock_imported: f64,
    pub stockpile: f64,
    pub decommissioned: f64,
    pub anti_dumping: f64,
    pub price_reduction: f64,
    pub secondary_cumulative: f64,
    pub scrap_dec: f64,
    pub scrap_rec: f64,
    pub scrap_total: f64,
    pub cost_import: f64,
    pub cost_storage: f64,
    pub cost_primary: f64,
    pub cost_secondary: f64,
    pub cost_scrap: f64,
    /// Step-activation flags in curve order
    pub step_active: Vec<f64>,
    pub step_product: Vec<f64>,
}

impl YearValues {
    fn read(sol: &impl Solution, v: &YearVars) -> Self {
        Self {
            capacity_ext: sol.value(v.capacity_ext),
            capacity_new: sol.value(v.capacity_new),
            imported: sol.value(v.imported),
            stockout: sol.value(v.stockout),
            primary: sol.value(v.primary),
            secondary: sol.value(v.secondary),
            stock_imported: sol.value(v.stock_imported),
            stockpile: sol.value(v.stockpile),
            decommissioned: sol.value(v.decommissioned),
            anti_dumping: sol.value(v.anti_dumping),
            price_reduction: sol.value(v.price_reduction),
            secondary_cumulative: sol.value(v.secondary_cumulative),
            scrap_dec: sol.value(v.scrap_dec),
            scrap_rec: sol.value(v.scrap_rec),
            scrap_total: sol.value(v.scrap_total),
            cost_import: sol.value(v.cost_import),
            cost_storage: sol.value(v.cost_storage),
            cost_primary: sol.value(v.cost_primary),
            cost_secondary: sol.value(v.cost_secondary),
            cost_scrap: sol.value(v.cost_scrap),
            step_active: v.steps.iter().map(|s| sol.value(s.active)).collect(),
            step_product: v.steps.iter().map(|s| sol.value(s.product)).collect(),
        }
    }

    /// Index of the active learning step, if any.
    pub fn active_step(&self) -> Option<usize> {
        self.step_active.iter().position(|&b| b > 0.5)
    }

    pub fn yearly_cost(&self) -> f64 {
        self.cost_import + self.cost_storage + self.cost_primary + self.cost_secondary
    }
}

/// Complete solution of one window
#[derive(Debug, Clone)]
pub struct ExtensionSolution {
    pub window: Window,
    pub optimal: bool,
    /// Total objective value (extension + base)
    pub objective: f64,
    pub extension_cost: f64,
    pub base_cost: f64,
    pub years: BTreeMap<CapacityKey, YearValues>,
    pub balance: BTreeMap<TimestepKey, ChannelBalance>,
    /// Aggregate cost per category
    pub costs_new: BTreeMap<CostType, f64>,
    pub process_input: BTreeMap<(Year, String), f64>,
    pub co2: BTreeMap<Year, f64>,
    /// Largest violation over all assembled rows
    pub max_row_violation: f64,
    /// Post-solve verification report
    pub diagnostics: Diagnostics,
    pub solve_time: Duration,
    pub status_message: String,
}

impl ExtensionSolution {
    pub(crate) fn extract(
        sol: &impl Solution,
        built: &BuiltModel,
        window: Window,
        solve_time: Duration,
    ) -> Self {
        let years = built
            .index
            .years
            .iter()
            .map(|(k, v)| (k.clone(), YearValues::read(sol, v)))
            .collect();
        let balance = built
            .index
            .balance
            .iter()
            .map(|(k, b)| {
                (
                    k.clone(),
                    ChannelBalance {
                        total: sol.value(b.total),
                        imported: sol.value(b.imported),
                        stockout: sol.value(b.stockout),
                        primary: sol.value(b.primary),
                        secondary: sol.value(b.secondary),
                    },
                )
            })
            .collect();
        let costs_new = built
            .index
            .costs_new
            .iter()
            .map(|(t, v)| (*t, sol.value(*v)))
            .collect();
        let process_input = built
            .base
            .process_input
            .iter()
            .map(|(k, e)| (k.clone(), e.eval_with(sol)))
            .collect();
        let co2 = built
            .base
            .co2
            .iter()
            .map(|(y, e)| (*y, e.eval_with(sol)))
            .collect();
        let max_row_violation = built
            .rows
            .iter()
            .map(|r| r.row.violation(sol))
            .fold(0.0, f64::max);

        Self {
            window,
            optimal: true,
            objective: built.objective.eval_with(sol),
            extension_cost: built.extension_cost.eval_with(sol),
            base_cost: built.base.objective.eval_with(sol),
            years,
            balance,
            costs_new,
            process_input,
            co2,
            max_row_violation,
            diagnostics: Diagnostics::new(),
            solve_time,
            status_message: "Optimal".to_string(),
        }
    }

    pub fn value(&self, year: Year, site: &SiteTech) -> Option<&YearValues> {
        self.years.get(&site.at(year))
    }

    pub fn sites(&self) -> BTreeSet<&SiteTech> {
        self.years.keys().map(|k| &k.site).collect()
    }

    pub fn total_co2(&self) -> f64 {
        self.co2.values().sum()
    }

    /// Export the window as result sheets. `carried` offsets the cumulative CO2.
    pub fn to_sheets(&self, carried: Option<&WindowState>) -> ResultSheets {
        let mut sheets = ResultSheets::default();
        for (key, v) in &self.years {
            sheets
                .extension_total_caps
                .insert(key.clone(), v.capacity_ext);
            sheets.extension_only_caps.insert(
                key.clone(),
                CapacityRecord {
                    new: v.capacity_new,
                    imported: v.imported,
                    stockout: v.stockout,
                    primary: v.primary,
                    secondary: v.secondary,
                    stock_imported: v.stock_imported,
                    stockpile: v.stockpile,
                },
            );
            sheets.decom.insert(key.clone(), v.decommissioned);
            sheets
                .secondary_cap_sum
                .insert(key.clone(), v.secondary_cumulative);
            sheets.scrap.insert(key.clone(), v.scrap_total);
            sheets
                .pricereduction_sec
                .insert(key.clone(), v.price_reduction);
            sheets.extension_cost.insert(
                key.clone(),
                CostRecord {
                    import: v.cost_import,
                    storage: v.cost_storage,
                    primary: v.cost_primary,
                    secondary: v.cost_secondary,
                    scrap: v.cost_scrap,
                },
            );
        }
        sheets.extension_balance = self.balance.clone();
        sheets.e_pro_in = self.process_input.clone();

        let mut cumulative = carried.map(|c| c.co2_total).unwrap_or(0.0);
        for year in self.window.years() {
            let yearly = self.co2.get(&year).copied().unwrap_or(0.0);
            cumulative += yearly;
            sheets.us_co2.insert(year, yearly);
            sheets.total_co2.insert(year, cumulative);
        }
        sheets
    }

    /// Carry-over snapshot at the last year of this window.
    pub fn terminal_state(&self, previous: Option<&WindowState>) -> CircapResult<WindowState> {
        let sheets = self.to_sheets(previous);
        WindowState::from_sheets(&sheets, self.window.end, self.sites(), previous)
    }

    /// Format a human-readable summary
    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!(
            "Extension Solution {}\n{}\n",
            self.window,
            "=".repeat(40)
        ));
        s.push_str(&format!(
            "Status: {}\n",
            if self.optimal { "Optimal" } else { "Not optimal" }
        ));
        s.push_str(&format!("Objective: {:.2}\n", self.objective));
        s.push_str(&format!("  Extension: {:.2}\n", self.extension_cost));
        for (cost_type, value) in &self.costs_new {
            s.push_str(&format!("    {:<13} {:.2}\n", cost_type.as_str(), value));
        }
        s.push_str(&format!("  Base: {:.2}\n", self.base_cost));
        s.push_str(&format!("CO2: {:.2} t\n", self.total_co2()));
        s.push_str(&format!("Solve Time: {:.2?}\n", self.solve_time));
        s.push_str(&format!("Verification: {}\n", self.diagnostics.summary()));

        let end = self.window.end;
        let terminal: Vec<_> = self.years.iter().filter(|(k, _)| k.year == end).collect();
        if !terminal.is_empty() {
            s.push_str(&format!("\nTerminal state ({}):\n", end));
            for (key, v) in terminal {
                s.push_str(&format!(
                    "  {}: capacity {:.1} MW, stock {:.1} MW, secondary cum. {:.1} MW, \
                     price reduction {:.2}\n",
                    key.site, v.capacity_ext, v.stockpile, v.secondary_cumulative, v.price_reduction
                ));
            }
        }
        s
    }
}
