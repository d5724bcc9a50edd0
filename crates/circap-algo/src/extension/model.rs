//! Model assembly: variables, registered rows, base-model coupling and the
//! objective, ready to hand to a MILP backend.

use super::base::{BaseCoupling, BaseEnergyModel, Vertex};
use super::error::ModelResult;
use super::problem::ExtensionProblem;
use super::rules::{assemble, NamedRow, RuleContext, RuleFamily};
use super::vars::{CostType, ExtensionVars};
use circap_core::Window;
use good_lp::{Expression, ProblemVariables};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A fully assembled but unsolved model.
pub struct BuiltModel {
    pub window: Window,
    pub vars: ProblemVariables,
    pub index: ExtensionVars,
    pub rows: Vec<NamedRow>,
    pub objective: Expression,
    /// Extension part of the objective
    pub extension_cost: Expression,
    pub base: BaseCoupling,
}

impl BuiltModel {
    pub fn families(&self) -> BTreeSet<RuleFamily> {
        self.rows.iter().map(|r| r.family).collect()
    }
}

/// Build one window. Families in `disabled` are left out, which the
/// infeasibility diagnosis uses to probe subsets.
pub fn build_model(
    problem: &ExtensionProblem,
    base: &dyn BaseEnergyModel,
    disabled: &BTreeSet<RuleFamily>,
) -> ModelResult<BuiltModel> {
    let data = &problem.data;
    data.validate()?;

    let mut vars = ProblemVariables::new();
    let index = ExtensionVars::declare(&mut vars, data);

    let mut rows = {
        let ctx = RuleContext {
            data,
            policy: &problem.policy,
            vars: &index,
        };
        assemble(&ctx, disabled)?
    };

    let mut supply: BTreeMap<Vertex, Expression> = BTreeMap::new();
    for (key, b) in &index.balance {
        *supply
            .entry((key.timestep, key.key.year, key.key.site.location.clone()))
            .or_insert_with(|| Expression::from(0.0)) += b.total;
    }
    let base_coupling = base.couple(data, &mut vars, &supply)?;
    if !disabled.contains(&RuleFamily::Base) {
        rows.extend(base_coupling.rows.iter().cloned());
    }

    let mut extension_cost = Expression::from(0.0);
    for cost_type in CostType::ALL {
        extension_cost += index.cost_new(cost_type)?;
    }
    let objective = extension_cost.clone() + base_coupling.objective.clone();

    debug!(
        base = base.name(),
        window_start = data.y0,
        window_end = data.y_end,
        rows = rows.len(),
        "assembled extension model"
    );

    Ok(BuiltModel {
        window: data.window(),
        vars,
        index,
        rows,
        objective,
        extension_cost,
        base: base_coupling,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::error::ModelError;
    use crate::extension::base::{NoBaseModel, ResidualDemandBase};
    use crate::test_utils::single_site_data;

    #[test]
    fn test_build_counts_base_rows() {
        let problem = ExtensionProblem::new(single_site_data(2025, 2026));
        let without = build_model(&problem, &NoBaseModel, &BTreeSet::new()).unwrap();
        let with = build_model(&problem, &ResidualDemandBase::default(), &BTreeSet::new()).unwrap();
        assert_eq!(
            with.rows.len() - without.rows.len(),
            problem.data.timesteps.len() * 2
        );
        assert!(with.families().contains(&RuleFamily::Base));
    }

    #[test]
    fn test_invalid_data_is_rejected_before_build() {
        let mut data = single_site_data(2025, 2026);
        data.hours = 0.0;
        let problem = ExtensionProblem::new(data);
        assert!(matches!(
            build_model(&problem, &NoBaseModel, &BTreeSet::new()),
            Err(ModelError::InvalidData(_))
        ));
    }

    #[test]
    fn test_overlong_lifetime_is_rejected_before_build() {
        let mut data = single_site_data(2025, 2026);
        data.params_mut(&circap_core::SiteTech::new("EU27", "solarPV"))
            .unwrap()
            .lifetime = u32::MAX;
        let problem = ExtensionProblem::new(data);
        match build_model(&problem, &NoBaseModel, &BTreeSet::new()) {
            Err(ModelError::InvalidData(msg)) => assert!(msg.contains("lifetime"), "{}", msg),
            other => panic!("expected invalid data, got {:?}", other.map(|m| m.rows.len())),
        }
    }
}
