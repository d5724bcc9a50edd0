use circap_algo::test_utils::single_site_data;
use circap_algo::PolicyConfig;
use circap_core::SiteTech;
use circap_scenarios::{apply_scenario, load_spec_from_path, resolve_scenarios, select_scenario};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn repo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join(relative)
}

#[test]
fn bundled_scenarios_resolve() {
    let set = load_spec_from_path(&repo_path("test_data/scenarios/eu27.yaml")).unwrap();
    let resolved = resolve_scenarios(&set).unwrap();
    let ids: Vec<_> = resolved.iter().map(|s| s.scenario_id.as_str()).collect();
    assert_eq!(
        ids,
        ["reference", "domestic_push", "import_tariff", "high_demand"]
    );
    assert!(resolved.iter().all(|s| s.tags == ["eu27"]));
}

#[test]
fn json_spec_applies_to_data() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("set.json");
    fs::write(
        &path,
        r#"{
  "scenarios": [
    {
      "scenario_id": "cheap_recycling",
      "site_overrides": [
        { "target": "EU27.solarPV", "attributes": { "recycling_efficiency": 0.9, "mining": 0.3 } }
      ],
      "yearly_overrides": [
        { "target": "EU27.solarPV", "field": "recycling_cost", "value": 10.0, "to": 2025 }
      ],
      "policy": { "decommission_floor": { "kind": "proportional", "multiplier": 0.05 } }
    }
  ]
}"#,
    )
    .unwrap();

    let set = load_spec_from_path(&path).unwrap();
    let scenario = select_scenario(resolve_scenarios(&set).unwrap(), "cheap_recycling").unwrap();
    let mut data = single_site_data(2025, 2026);
    let mut policy = PolicyConfig::default();
    let applied = apply_scenario(&mut data, &mut policy, &scenario).unwrap();

    let pv = SiteTech::new("EU27", "solarPV");
    assert_eq!(applied.attributes_set, 2);
    assert_eq!(applied.yearly_values_set, 1);
    assert_eq!(data.params(&pv).unwrap().recycling_efficiency, 0.9);
    assert_eq!(data.yearly(2025, &pv).unwrap().recycling_cost, 10.0);
    assert_eq!(data.yearly(2026, &pv).unwrap().recycling_cost, 1_000.0);
    assert_eq!(
        policy.decommission_floor,
        circap_algo::extension::DecommissionFloor::Proportional { multiplier: 0.05 }
    );
}

#[test]
fn malformed_spec_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "scenarios: [ { description: no id } ]").unwrap();
    let err = load_spec_from_path(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("parsing scenario spec yaml"));
}
