use anyhow::{anyhow, Context, Result};
use circap_algo::PolicyConfig;
use circap_core::ExtensionData;
use serde::Serialize;
use tracing::{debug, info};

use crate::spec::{target_matches, ResolvedScenario};

/// Counts of what a scenario changed, for logging and run manifests.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppliedScenario {
    pub scenario_id: String,
    pub attributes_set: usize,
    pub yearly_values_set: usize,
    pub demand_entries_scaled: usize,
}

/// Apply a resolved scenario to loaded data and a policy, in place.
///
/// **Order:**
/// 1. Technology attribute overrides, via `TechParams::set_attribute`.
/// 2. Yearly value overrides (absolute value or scale factor).
/// 3. Demand scaling.
/// 4. Policy patch.
///
/// A target that selects no technology, or a yearly override that selects
/// no year of the loaded horizon, is an error.
pub fn apply_scenario(
    data: &mut ExtensionData,
    policy: &mut PolicyConfig,
    scenario: &ResolvedScenario,
) -> Result<AppliedScenario> {
    let mut applied = AppliedScenario {
        scenario_id: scenario.scenario_id.clone(),
        ..AppliedScenario::default()
    };

    for site_override in &scenario.site_overrides {
        let mut matched = 0;
        for (site, params) in data.sites.iter_mut() {
            if !target_matches(&site_override.target, site) {
                continue;
            }
            matched += 1;
            for (name, value) in &site_override.attributes {
                params
                    .set_attribute(name, *value)
                    .with_context(|| format!("overriding {} of {}", name, site))?;
                applied.attributes_set += 1;
            }
        }
        if matched == 0 {
            return Err(anyhow!(
                "scenario '{}': target '{}' matches no technology",
                scenario.scenario_id,
                site_override.target
            ));
        }
    }

    for yearly in &scenario.yearly_overrides {
        let mut matched = 0;
        for (key, params) in data.yearly.iter_mut() {
            if !(target_matches(&yearly.target, &key.site) && yearly.covers(key.year)) {
                continue;
            }
            let slot = yearly.field.slot(params);
            *slot = yearly.apply(*slot);
            matched += 1;
        }
        if matched == 0 {
            return Err(anyhow!(
                "scenario '{}': {:?} override of '{}' selects no year in [{}, {}]",
                scenario.scenario_id,
                yearly.field,
                yearly.target,
                data.y0,
                data.y_end
            ));
        }
        debug!(
            target = %yearly.target,
            field = ?yearly.field,
            entries = matched,
            "applied yearly override"
        );
        applied.yearly_values_set += matched;
    }

    if scenario.demand_scale != 1.0 {
        for value in data.demand.values_mut() {
            *value *= scenario.demand_scale;
        }
        applied.demand_entries_scaled = data.demand.len();
    }

    scenario
        .policy
        .apply_to(policy)
        .with_context(|| format!("applying policy of scenario '{}'", scenario.scenario_id))?;

    data.validate()
        .with_context(|| format!("data after scenario '{}'", scenario.scenario_id))?;

    info!(
        scenario = %scenario.scenario_id,
        attributes = applied.attributes_set,
        yearly = applied.yearly_values_set,
        demand = applied.demand_entries_scaled,
        "applied scenario"
    );
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{PolicyPatch, SiteOverride, YearlyField, YearlyOverride};
    use circap_algo::test_utils::{set_demand, single_site_data};
    use circap_core::SiteTech;
    use std::collections::BTreeMap;

    fn scenario() -> ResolvedScenario {
        ResolvedScenario {
            scenario_id: "test".into(),
            description: None,
            tags: Vec::new(),
            demand_scale: 1.0,
            policy: PolicyPatch::default(),
            site_overrides: Vec::new(),
            yearly_overrides: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    fn pv() -> SiteTech {
        SiteTech::new("EU27", "solarPV")
    }

    #[test]
    fn overrides_attributes_and_yearly_values() {
        let mut data = single_site_data(2025, 2027);
        set_demand(&mut data, "EU27", 2025, 100.0);
        let mut policy = PolicyConfig::default();
        let mut s = scenario();
        s.demand_scale = 2.0;
        s.site_overrides.push(SiteOverride {
            target: "EU27.*".into(),
            attributes: [("storage_cost".to_string(), 12.5)].into(),
        });
        s.yearly_overrides.push(YearlyOverride {
            target: "*.solarPV".into(),
            field: YearlyField::InstallableCapacity,
            from: Some(2026),
            to: None,
            value: None,
            scale: Some(2.0),
        });
        s.policy.benchmark = Some(crate::spec::BenchmarkToggle::Enabled(false));

        let applied = apply_scenario(&mut data, &mut policy, &s).unwrap();
        assert_eq!(applied.attributes_set, 1);
        assert_eq!(applied.yearly_values_set, 2);
        assert_eq!(applied.demand_entries_scaled, 2);

        assert_eq!(data.params(&pv()).unwrap().storage_cost, 12.5);
        assert_eq!(data.yearly(2025, &pv()).unwrap().installable_capacity, 500.0);
        assert_eq!(data.yearly(2027, &pv()).unwrap().installable_capacity, 1000.0);
        assert_eq!(data.demand_at(1, 2025, "EU27"), 200.0);
        assert!(policy.benchmark.is_none());
    }

    #[test]
    fn unmatched_target_is_an_error() {
        let mut data = single_site_data(2025, 2025);
        let mut policy = PolicyConfig::default();
        let mut s = scenario();
        s.site_overrides.push(SiteOverride {
            target: "FR.solarPV".into(),
            attributes: [("scrap".to_string(), 0.5)].into(),
        });
        let err = apply_scenario(&mut data, &mut policy, &s).unwrap_err();
        assert!(err.to_string().contains("matches no technology"));
    }

    #[test]
    fn unknown_attribute_is_an_error() {
        let mut data = single_site_data(2025, 2025);
        let mut policy = PolicyConfig::default();
        let mut s = scenario();
        s.site_overrides.push(SiteOverride {
            target: "EU27.solarPV".into(),
            attributes: [("efficiency".to_string(), 0.5)].into(),
        });
        assert!(apply_scenario(&mut data, &mut policy, &s).is_err());
    }

    #[test]
    fn override_outside_horizon_is_an_error() {
        let mut data = single_site_data(2025, 2026);
        let mut policy = PolicyConfig::default();
        let mut s = scenario();
        s.yearly_overrides.push(YearlyOverride {
            target: "EU27.solarPV".into(),
            field: YearlyField::Dcr,
            from: Some(2040),
            to: None,
            value: Some(0.5),
            scale: None,
        });
        assert!(apply_scenario(&mut data, &mut policy, &s).is_err());
    }
}
