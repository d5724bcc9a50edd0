use assert_cmd::Command;
use predicates::prelude::*;
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

fn circap() -> Command {
    Command::cargo_bin("circap").unwrap()
}

#[test]
fn windows_prints_the_plan() {
    circap()
        .args(["windows", "--start", "2025", "--end", "2031", "--window", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2025-2027"))
        .stdout(predicate::str::contains("2028-2030"))
        .stdout(predicate::str::contains("2031-2031"));
}

#[test]
fn windows_rejects_unknown_mode() {
    circap()
        .args(["windows", "--start", "2025", "--end", "2030", "--mode", "greedy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown horizon mode"));
}

#[test]
fn validate_reports_the_fixture() {
    let input = repo_path("test_data/eu27");
    let scenarios = repo_path("test_data/scenarios/eu27.yaml");
    circap()
        .args([
            "validate",
            "--input",
            input.to_str().unwrap(),
            "--scenario",
            scenarios.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("horizon 2025-2028"))
        .stdout(predicate::str::contains("2 technologies"))
        .stdout(predicate::str::contains("4 scenarios OK"));
}

#[test]
fn validate_fails_on_missing_sheet() {
    let dir = tempdir().unwrap();
    circap()
        .args(["validate", "--input", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing input sheet"));
}

#[test]
fn rolling_run_writes_windows_and_manifest() {
    let out = tempdir().unwrap();
    let input = repo_path("test_data/eu27");
    circap()
        .args([
            "run",
            "--input",
            input.to_str().unwrap(),
            "--mode",
            "rolling",
            "--window",
            "2",
            "--out",
            out.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2025-2026"))
        .stdout(predicate::str::contains("2027-2028"))
        .stdout(predicate::str::contains("run manifest"));

    let first = out.path().join("window_2025_2026");
    assert!(first.join("carry_over.json").is_file());
    assert!(first.join("extension_total_caps.csv").is_file());
    assert!(out.path().join("window_2027_2028/pricereduction_sec.csv").is_file());

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.path().join("run_manifest.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["completed"], 2);
    assert_eq!(manifest["mode"], "rolling");
}

#[test]
fn config_file_with_residual_demand_base() {
    let out = tempdir().unwrap();
    let input = repo_path("test_data/eu27");
    let config = repo_path("test_data/configs/rolling.toml");
    circap()
        .args([
            "run",
            "--input",
            input.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
            "--out",
            out.path().to_str().unwrap(),
        ])
        .assert()
        .success();

    // timestep 2 demand exceeds extension supply, so backup runs and emits CO2
    let co2 = fs::read_to_string(out.path().join("window_2025_2026/total_co2.csv")).unwrap();
    assert!(co2.starts_with("year,value"));
    let emitted: f64 = co2
        .lines()
        .last()
        .and_then(|l| l.split(',').nth(1))
        .unwrap()
        .parse()
        .unwrap();
    assert!(emitted > 0.0);
}

#[test]
fn scenario_selection_is_recorded() {
    let out = tempdir().unwrap();
    let input = repo_path("test_data/eu27");
    let scenarios = repo_path("test_data/scenarios/eu27.yaml");
    circap()
        .args([
            "run",
            "--input",
            input.to_str().unwrap(),
            "--scenario",
            scenarios.to_str().unwrap(),
            "--select",
            "domestic_push",
            "--out",
            out.path().to_str().unwrap(),
        ])
        .assert()
        .success();
    let manifest = fs::read_to_string(out.path().join("run_manifest.json")).unwrap();
    assert!(manifest.contains("\"scenario\": \"domestic_push\""));
}

#[test]
fn ambiguous_scenario_set_needs_select() {
    let input = repo_path("test_data/eu27");
    let scenarios = repo_path("test_data/scenarios/eu27.yaml");
    circap()
        .args([
            "run",
            "--input",
            input.to_str().unwrap(),
            "--scenario",
            scenarios.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("choose one with --select"));
}

#[test]
fn unknown_solver_is_rejected() {
    let input = repo_path("test_data/eu27");
    circap()
        .args([
            "run",
            "--input",
            input.to_str().unwrap(),
            "--solver",
            "cplex",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown milp solver"));
}
