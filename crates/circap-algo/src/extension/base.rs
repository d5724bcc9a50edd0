//! Seam to the general-purpose energy model the extension plugs into.
//!
//! The base model owns its own variables and rows. The extension hands it
//! the electricity supply of extended capacity per `(timestep, year,
//! location)` vertex, to be added to the `Elec` commodity balance there.

use super::error::ModelResult;
use super::rules::{NamedRow, Row, RuleFamily};
use circap_core::{ExtensionData, Year, ELEC_COMMODITY};
use good_lp::{variable, Expression, ProblemVariables};
use std::collections::BTreeMap;

/// `(timestep, year, location)`
pub type Vertex = (u32, Year, String);

/// What a base model adds to one build.
#[derive(Debug, Clone)]
pub struct BaseCoupling {
    pub objective: Expression,
    pub rows: Vec<NamedRow>,
    /// Process input energy per (year, location), reported as `e_pro_in`
    pub process_input: BTreeMap<(Year, String), Expression>,
    /// Emissions per year, reported as `us_co2`
    pub co2: BTreeMap<Year, Expression>,
}

impl Default for BaseCoupling {
    fn default() -> Self {
        Self {
            objective: Expression::from(0.0),
            rows: Vec::new(),
            process_input: BTreeMap::new(),
            co2: BTreeMap::new(),
        }
    }
}

pub trait BaseEnergyModel {
    fn name(&self) -> &str;

    /// Declare the base model against `supply`, the extension's additive
    /// electricity term per vertex.
    fn couple(
        &self,
        data: &ExtensionData,
        vars: &mut ProblemVariables,
        supply: &BTreeMap<Vertex, Expression>,
    ) -> ModelResult<BaseCoupling>;
}

/// Extension-only build: the objective is the extension cost alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBaseModel;

impl BaseEnergyModel for NoBaseModel {
    fn name(&self) -> &str {
        "none"
    }

    fn couple(
        &self,
        _data: &ExtensionData,
        _vars: &mut ProblemVariables,
        _supply: &BTreeMap<Vertex, Expression>,
    ) -> ModelResult<BaseCoupling> {
        Ok(BaseCoupling::default())
    }
}

/// Electricity demand per vertex, met by extension supply plus a priced
/// backup process with a CO2 intensity.
#[derive(Debug, Clone, Copy)]
pub struct ResidualDemandBase {
    /// Cost of backup generation per MWh
    pub backup_cost: f64,
    /// Emissions of backup generation, t/MWh
    pub co2_factor: f64,
}

impl Default for ResidualDemandBase {
    fn default() -> Self {
        Self {
            backup_cost: 1e4,
            co2_factor: 0.4,
        }
    }
}

impl BaseEnergyModel for ResidualDemandBase {
    fn name(&self) -> &str {
        "residual_demand"
    }

    fn couple(
        &self,
        data: &ExtensionData,
        vars: &mut ProblemVariables,
        supply: &BTreeMap<Vertex, Expression>,
    ) -> ModelResult<BaseCoupling> {
        let mut coupling = BaseCoupling::default();
        for &t in &data.timesteps {
            for year in data.years() {
                for location in &data.locations {
                    let backup = vars.add(variable().min(0.0));
                    let vertex = (t, year, location.clone());
                    let ext = supply
                        .get(&vertex)
                        .cloned()
                        .unwrap_or_else(|| Expression::from(0.0));
                    let demand = data.demand_at(t, year, location);

                    coupling.rows.push(NamedRow {
                        family: RuleFamily::Base,
                        name: format!("res_vertex[{},{},{},{}]", t, year, location, ELEC_COMMODITY),
                        row: Row::ge(ext + backup, demand),
                    });
                    coupling.objective += self.backup_cost * backup;
                    *coupling
                        .process_input
                        .entry((year, location.clone()))
                        .or_insert_with(|| Expression::from(0.0)) += backup;
                    *coupling
                        .co2
                        .entry(year)
                        .or_insert_with(|| Expression::from(0.0)) += self.co2_factor * backup;
                }
            }
        }
        Ok(coupling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::single_site_data;

    #[test]
    fn test_no_base_contributes_nothing() {
        let data = single_site_data(2025, 2026);
        let mut vars = ProblemVariables::new();
        let c = NoBaseModel
            .couple(&data, &mut vars, &BTreeMap::new())
            .unwrap();
        assert!(c.rows.is_empty());
        assert!(c.co2.is_empty());
    }

    #[test]
    fn test_residual_demand_one_row_per_vertex() {
        let data = single_site_data(2025, 2026);
        let mut vars = ProblemVariables::new();
        let c = ResidualDemandBase::default()
            .couple(&data, &mut vars, &BTreeMap::new())
            .unwrap();
        assert_eq!(c.rows.len(), data.timesteps.len() * 2);
        assert_eq!(c.co2.len(), 2);
        assert_eq!(c.process_input.len(), 2);
    }
}
