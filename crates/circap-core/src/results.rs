//! Result sheets of one solved window.
//!
//! The sheet names are a stable contract: the file handoff between rolling
//! windows reads them back by name, and downstream reporting keys on them.

use crate::index::{CapacityKey, TimestepKey, Year};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Named result sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetName {
    ExtensionTotalCaps,
    ExtensionOnlyCaps,
    Decom,
    TotalCo2,
    SecondaryCapSum,
    Scrap,
    ExtensionBalance,
    EProIn,
    ExtensionCost,
    UsCo2,
    PricereductionSec,
}

impl SheetName {
    pub const ALL: [SheetName; 11] = [
        SheetName::ExtensionTotalCaps,
        SheetName::ExtensionOnlyCaps,
        SheetName::Decom,
        SheetName::TotalCo2,
        SheetName::SecondaryCapSum,
        SheetName::Scrap,
        SheetName::ExtensionBalance,
        SheetName::EProIn,
        SheetName::ExtensionCost,
        SheetName::UsCo2,
        SheetName::PricereductionSec,
    ];

    /// Sheets the carry-over extraction depends on.
    pub const CARRY_OVER: [SheetName; 6] = [
        SheetName::ExtensionTotalCaps,
        SheetName::ExtensionOnlyCaps,
        SheetName::Decom,
        SheetName::SecondaryCapSum,
        SheetName::Scrap,
        SheetName::PricereductionSec,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SheetName::ExtensionTotalCaps => "extension_total_caps",
            SheetName::ExtensionOnlyCaps => "extension_only_caps",
            SheetName::Decom => "decom",
            SheetName::TotalCo2 => "total_co2",
            SheetName::SecondaryCapSum => "secondary_cap_sum",
            SheetName::Scrap => "scrap",
            SheetName::ExtensionBalance => "extension_balance",
            SheetName::EProIn => "e_pro_in",
            SheetName::ExtensionCost => "extension_cost",
            SheetName::UsCo2 => "us_co2",
            SheetName::PricereductionSec => "pricereduction_sec",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl fmt::Display for SheetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// New capacity by channel plus the stock position of one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CapacityRecord {
    pub new: f64,
    pub imported: f64,
    pub stockout: f64,
    pub primary: f64,
    pub secondary: f64,
    pub stock_imported: f64,
    pub stockpile: f64,
}

/// Yearly cost by channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub import: f64,
    pub storage: f64,
    pub primary: f64,
    pub secondary: f64,
    pub scrap: f64,
}

impl CostRecord {
    /// Channel total; scrap cost is already part of `secondary`.
    pub fn total(&self) -> f64 {
        self.import + self.storage + self.primary + self.secondary
    }
}

/// Delivered energy by extension capacity for one timestep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelBalance {
    pub total: f64,
    pub imported: f64,
    pub stockout: f64,
    pub primary: f64,
    pub secondary: f64,
}

/// All result sheets of one window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSheets {
    pub extension_total_caps: BTreeMap<CapacityKey, f64>,
    pub extension_only_caps: BTreeMap<CapacityKey, CapacityRecord>,
    pub decom: BTreeMap<CapacityKey, f64>,
    /// Cumulative CO2 including the carried total
    pub total_co2: BTreeMap<Year, f64>,
    pub secondary_cap_sum: BTreeMap<CapacityKey, f64>,
    pub scrap: BTreeMap<CapacityKey, f64>,
    pub extension_balance: BTreeMap<TimestepKey, ChannelBalance>,
    /// Base-model process input per (year, location)
    pub e_pro_in: BTreeMap<(Year, String), f64>,
    pub extension_cost: BTreeMap<CapacityKey, CostRecord>,
    /// Yearly CO2
    pub us_co2: BTreeMap<Year, f64>,
    pub pricereduction_sec: BTreeMap<CapacityKey, f64>,
}

impl ResultSheets {
    /// Last year with capacity results.
    pub fn last_year(&self) -> Option<Year> {
        self.extension_total_caps.keys().map(|k| k.year).max()
    }

    pub fn total_extension_cost(&self) -> f64 {
        self.extension_cost.values().map(CostRecord::total).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_names_are_unique() {
        let mut names: Vec<&str> = SheetName::ALL.iter().map(|s| s.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), SheetName::ALL.len());
        assert_eq!(SheetName::UsCo2.file_name(), "us_co2.csv");
    }

    #[test]
    fn test_cost_total_excludes_double_counted_scrap() {
        let c = CostRecord {
            import: 1.0,
            storage: 2.0,
            primary: 3.0,
            secondary: 4.0,
            scrap: 0.5,
        };
        assert_eq!(c.total(), 10.0);
    }

    #[test]
    fn test_last_year() {
        let mut sheets = ResultSheets::default();
        assert_eq!(sheets.last_year(), None);
        sheets
            .extension_total_caps
            .insert(CapacityKey::new(2026, "EU27", "solarPV"), 1.0);
        sheets
            .extension_total_caps
            .insert(CapacityKey::new(2025, "EU27", "solarPV"), 1.0);
        assert_eq!(sheets.last_year(), Some(2026));
    }
}
