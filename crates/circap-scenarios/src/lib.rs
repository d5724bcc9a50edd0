//! Scenario sets for the capacity-extension model.
//!
//! A scenario file (YAML or JSON) names a list of scenarios, each a patch
//! over the loaded [`circap_core::ExtensionData`] and the
//! [`circap_algo::PolicyConfig`]: technology attribute overrides, yearly
//! value overrides, demand scaling and policy-rule toggles.

pub mod apply;
pub mod spec;

pub use apply::{apply_scenario, AppliedScenario};
pub use spec::{
    load_spec_from_path, resolve_scenarios, select_scenario, validate, BenchmarkToggle, CapsPreset,
    PolicyPatch, ResolvedScenario, ScenarioDefaults, ScenarioSet, ScenarioSpec, SiteOverride,
    YearlyField, YearlyOverride,
};
