//! Carry-over state threaded between rolling-horizon windows.
//!
//! A [`WindowState`] is a snapshot of the terminal year of one solved window,
//! read from its [`ResultSheets`]. Applying it to the next window's
//! [`ExtensionData`] overwrites the seed attributes, so the next window's
//! `y0` rules reference the previous window's terminal values instead of the
//! static inputs.

use crate::data::{ExtensionData, TechParams};
use crate::index::{SiteTech, Year};
use crate::results::{ResultSheets, SheetName};
use crate::{CircapError, CircapResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal values of one (location, tech) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteCarry {
    pub capacity: f64,
    pub stockpile: f64,
    pub decommission_start: f64,
    pub secondary_cumulative: f64,
    pub scrap_total: f64,
    pub price_reduction: f64,
    pub last_primary: f64,
    pub last_secondary: f64,
}

impl SiteCarry {
    /// Seeds currently configured on a parameter set.
    pub fn from_params(params: &TechParams) -> Self {
        Self {
            capacity: params.initial_capacity,
            stockpile: params.initial_stockpile,
            decommission_start: params.decommission_start,
            secondary_cumulative: params.initial_secondary_cap,
            scrap_total: params.initial_scrap_total,
            price_reduction: params.price_reduction_init,
            last_primary: params.last_primary_cap,
            last_secondary: params.last_secondary_cap,
        }
    }

    fn write_into(&self, params: &mut TechParams) {
        params.initial_capacity = self.capacity;
        params.initial_stockpile = self.stockpile;
        params.decommission_start = self.decommission_start;
        params.initial_secondary_cap = self.secondary_cumulative;
        params.initial_scrap_total = self.scrap_total;
        params.price_reduction_init = self.price_reduction;
        params.last_primary_cap = self.last_primary;
        params.last_secondary_cap = self.last_secondary;
    }
}

/// Snapshot handed from one window to the next.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowState {
    /// Year the snapshot was read at (`next_window.start - 1`)
    pub source_year: Year,
    pub sites: BTreeMap<SiteTech, SiteCarry>,
    /// Cumulative CO2 through `source_year`
    pub co2_total: f64,
    /// Cumulative extension cost through `source_year`
    pub cost_total: f64,
}

fn lookup<'a, V>(
    sheet: &'a BTreeMap<crate::CapacityKey, V>,
    name: SheetName,
    year: Year,
    site: &SiteTech,
) -> CircapResult<&'a V> {
    sheet.get(&site.at(year)).ok_or_else(|| {
        CircapError::Lookup(format!(
            "carry-over key ({}, {}, {}) missing from sheet '{}'",
            year, site.location, site.tech, name
        ))
    })
}

impl WindowState {
    /// Read the terminal state of `year` for every site in `sites`.
    ///
    /// Any missing key is fatal.
    pub fn from_sheets<'a>(
        sheets: &ResultSheets,
        year: Year,
        sites: impl IntoIterator<Item = &'a SiteTech>,
        previous: Option<&WindowState>,
    ) -> CircapResult<Self> {
        let mut state = WindowState {
            source_year: year,
            ..WindowState::default()
        };
        for site in sites {
            let caps = lookup(
                &sheets.extension_only_caps,
                SheetName::ExtensionOnlyCaps,
                year,
                site,
            )?;
            let capacity = lookup(
                &sheets.extension_total_caps,
                SheetName::ExtensionTotalCaps,
                year,
                site,
            )?;
            let secondary_cumulative =
                lookup(&sheets.secondary_cap_sum, SheetName::SecondaryCapSum, year, site)?;
            let price_reduction = lookup(
                &sheets.pricereduction_sec,
                SheetName::PricereductionSec,
                year,
                site,
            )?;
            let carry = SiteCarry {
                capacity: *capacity,
                stockpile: caps.stockpile,
                decommission_start: *lookup(&sheets.decom, SheetName::Decom, year, site)?,
                secondary_cumulative: *secondary_cumulative,
                scrap_total: *lookup(&sheets.scrap, SheetName::Scrap, year, site)?,
                price_reduction: *price_reduction,
                last_primary: caps.primary,
                last_secondary: caps.secondary,
            };
            state.sites.insert(site.clone(), carry);
        }

        state.co2_total = match sheets.total_co2.get(&year) {
            Some(v) => *v,
            None if sheets.total_co2.is_empty() => previous.map(|p| p.co2_total).unwrap_or(0.0),
            None => {
                return Err(CircapError::Lookup(format!(
                    "carry-over year {} missing from sheet '{}'",
                    year,
                    SheetName::TotalCo2
                )))
            }
        };
        let window_cost: f64 = sheets
            .extension_cost
            .iter()
            .filter(|(k, _)| k.year <= year)
            .map(|(_, c)| c.total())
            .sum();
        state.cost_total = previous.map(|p| p.cost_total).unwrap_or(0.0) + window_cost;
        Ok(state)
    }

    /// Overwrite the seed attributes of `data` with this snapshot.
    pub fn apply(&self, data: &mut ExtensionData) -> CircapResult<()> {
        for (site, params) in data.sites.iter_mut() {
            let carry = self.sites.get(site).ok_or_else(|| {
                CircapError::Lookup(format!(
                    "carry-over from {} has no entry for {}",
                    self.source_year, site
                ))
            })?;
            carry.write_into(params);
        }
        Ok(())
    }

    /// Seeds a data set currently carries, in snapshot form.
    pub fn seeds_of(data: &ExtensionData) -> BTreeMap<SiteTech, SiteCarry> {
        data.sites
            .iter()
            .map(|(site, params)| (site.clone(), SiteCarry::from_params(params)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::CapacityRecord;
    use crate::CapacityKey;

    fn sheets_for(year: Year) -> ResultSheets {
        let key = CapacityKey::new(year, "EU27", "solarPV");
        let mut s = ResultSheets::default();
        s.extension_total_caps.insert(key.clone(), 1450.0);
        s.extension_only_caps.insert(
            key.clone(),
            CapacityRecord {
                primary: 12.0,
                secondary: 3.0,
                stockpile: 40.0,
                ..CapacityRecord::default()
            },
        );
        s.decom.insert(key.clone(), 2000.0);
        s.secondary_cap_sum.insert(key.clone(), 150.0);
        s.scrap.insert(key.clone(), 77.0);
        s.pricereduction_sec.insert(key, 46841.69972);
        s.total_co2.insert(year, 9.5);
        s
    }

    #[test]
    fn test_extract_and_apply_round_trip() {
        let site = SiteTech::new("EU27", "solarPV");
        let sheets = sheets_for(2026);
        let state = WindowState::from_sheets(&sheets, 2026, [&site], None).unwrap();

        let mut data = ExtensionData::new(2027, 2028);
        data.insert_site(site.clone(), TechParams::default());
        state.apply(&mut data).unwrap();

        let seeds = WindowState::seeds_of(&data);
        assert_eq!(seeds[&site], state.sites[&site]);
        assert_eq!(data.sites[&site].initial_capacity, 1450.0);
        assert_eq!(data.sites[&site].last_secondary_cap, 3.0);
        assert_eq!(state.co2_total, 9.5);
    }

    #[test]
    fn test_missing_key_is_fatal() {
        let site = SiteTech::new("EU27", "windon");
        let sheets = sheets_for(2026);
        let err = WindowState::from_sheets(&sheets, 2026, [&site], None).unwrap_err();
        assert!(matches!(err, CircapError::Lookup(_)));

        let solar = SiteTech::new("EU27", "solarPV");
        assert!(WindowState::from_sheets(&sheets, 2025, [&solar], None).is_err());
    }

    #[test]
    fn test_apply_requires_every_site() {
        let state = WindowState::default();
        let mut data = ExtensionData::new(2027, 2028);
        data.insert_site(SiteTech::new("EU27", "solarPV"), TechParams::default());
        assert!(state.apply(&mut data).is_err());
    }
}
