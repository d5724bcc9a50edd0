//! Rolling horizons over the toy single-site data set.

use circap_algo::test_utils::{set_demand, short_learning_curve, single_site_data};
use circap_batch::{
    load_run_manifest, run_horizon, window_dir, BaseConfig, HandoffMode, HorizonMode, RunConfig,
    WindowScheme, WindowStatus,
};
use circap_core::{SiteTech, Window};
use circap_io::{read_carry_over, read_sheets};
use std::path::Path;
use tempfile::tempdir;

fn pv() -> SiteTech {
    SiteTech::new("EU27", "solarPV")
}

fn rolling(root: &Path, window: u32, handoff: HandoffMode) -> RunConfig {
    RunConfig {
        mode: HorizonMode::Rolling,
        window,
        handoff,
        output_root: root.to_path_buf(),
        ..RunConfig::default()
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-6 * 1f64.max(a.abs()).max(b.abs())
}

/// The seed of window two equals the terminal values of window one, so
/// capacity continuity spans the boundary.
#[test]
fn carry_over_seeds_the_next_window() {
    let dir = tempdir().unwrap();
    let data = single_site_data(2025, 2028);
    let config = rolling(dir.path(), 2, HandoffMode::InProcess);
    let summary = run_horizon(&data, &config, None).unwrap();
    assert!(summary.succeeded());
    assert_eq!(summary.completed, 2);

    let first = window_dir(dir.path(), &Window::new(2025, 2026).unwrap());
    let second = window_dir(dir.path(), &Window::new(2027, 2028).unwrap());
    let first_sheets = read_sheets(&first).unwrap();
    let carried = read_carry_over(&first).unwrap();
    assert_eq!(carried.source_year, 2026);

    let seed = carried.sites[&pv()];
    let terminal = first_sheets.extension_total_caps[&pv().at(2026)];
    assert!(close(seed.capacity, terminal));
    assert!(close(seed.capacity, 980.0));
    assert!(close(
        seed.stockpile,
        first_sheets.extension_only_caps[&pv().at(2026)].stockpile
    ));
    assert!(close(seed.scrap_total, first_sheets.scrap[&pv().at(2026)]));
    assert!(close(
        seed.price_reduction,
        first_sheets.pricereduction_sec[&pv().at(2026)]
    ));

    let second_sheets = read_sheets(&second).unwrap();
    let caps = &second_sheets.extension_only_caps[&pv().at(2027)];
    let expected = seed.capacity + caps.new - second_sheets.decom[&pv().at(2027)];
    assert!(close(second_sheets.extension_total_caps[&pv().at(2027)], expected));

    let last = summary.final_state.unwrap();
    assert_eq!(last.source_year, 2028);
    assert!(close(last.sites[&pv()].capacity, 960.0));
}

/// With demand and a reachable learning curve, the carried scrap stock and
/// price reduction are non-zero and window two continues from them.
#[test]
fn carried_scrap_and_learning_seed_the_next_window() {
    let dir = tempdir().unwrap();
    let mut data = single_site_data(2025, 2028);
    data.learning.insert("solarPV".into(), short_learning_curve());
    let params = data.params_mut(&pv()).unwrap();
    params.scrap = 0.5;
    params.mining = 0.2;
    params.recycling_efficiency = 0.5;
    params.initial_scrap_total = 500.0;
    for year in 2025..=2028 {
        data.yearly.get_mut(&pv().at(year)).unwrap().remanufacturing_cost = 200_000.0;
        set_demand(&mut data, "EU27", year, 230.0);
    }
    let config = RunConfig {
        base: BaseConfig::ResidualDemand {
            backup_cost: 1e7,
            co2_factor: 0.4,
        },
        ..rolling(dir.path(), 2, HandoffMode::InProcess)
    };
    let summary = run_horizon(&data, &config, None).unwrap();
    assert!(summary.succeeded());

    let first = window_dir(dir.path(), &Window::new(2025, 2026).unwrap());
    let first_sheets = read_sheets(&first).unwrap();
    let seed = read_carry_over(&first).unwrap().sites[&pv()];
    assert!(seed.scrap_total > 0.0);
    assert!(seed.price_reduction >= 1000.0);
    assert!(seed.secondary_cumulative > 0.0);
    assert!(close(seed.scrap_total, first_sheets.scrap[&pv().at(2026)]));

    let second = window_dir(dir.path(), &Window::new(2027, 2028).unwrap());
    let sheets = read_sheets(&second).unwrap();
    let key = pv().at(2027);
    let secondary = sheets.extension_only_caps[&key].secondary;
    let scrap_dec = 0.5 * sheets.decom[&key];
    let scrap_rec = (0.2 / 0.5) * secondary;
    assert!(close(sheets.scrap[&key], seed.scrap_total + scrap_dec - scrap_rec));
    assert!(sheets.pricereduction_sec[&key] >= seed.price_reduction - 1e-6);
    assert!(close(
        sheets.secondary_cap_sum[&key],
        seed.secondary_cumulative + secondary
    ));
}

/// Re-reading the sheets from disk yields the same carry-over as the
/// in-memory handoff.
#[test]
fn file_handoff_matches_in_process() {
    let data = single_site_data(2025, 2028);
    let memory = tempdir().unwrap();
    let files = tempdir().unwrap();

    let a = run_horizon(&data, &rolling(memory.path(), 2, HandoffMode::InProcess), None).unwrap();
    let b = run_horizon(&data, &rolling(files.path(), 2, HandoffMode::Files), None).unwrap();
    assert!(a.succeeded() && b.succeeded());

    let (a, b) = (a.final_state.unwrap(), b.final_state.unwrap());
    assert_eq!(a.source_year, b.source_year);
    for (site, carry) in &a.sites {
        let other = b.sites[site];
        assert!(close(carry.capacity, other.capacity));
        assert!(close(carry.decommission_start, other.decommission_start));
        assert!(close(carry.secondary_cumulative, other.secondary_cumulative));
    }
    assert!(close(a.cost_total, b.cost_total));
}

/// Open-ended windows overlap; the carry-over is read at the next start - 1.
#[test]
fn open_ended_windows_carry_from_inside_the_window() {
    let dir = tempdir().unwrap();
    let data = single_site_data(2025, 2028);
    let config = RunConfig {
        scheme: WindowScheme::OpenEnded,
        ..rolling(dir.path(), 2, HandoffMode::InProcess)
    };
    let summary = run_horizon(&data, &config, Some("overlap")).unwrap();
    assert!(summary.succeeded());
    let windows: Vec<_> = summary.windows.iter().map(|r| r.window).collect();
    assert_eq!(
        windows,
        [Window::new(2025, 2028).unwrap(), Window::new(2027, 2028).unwrap()]
    );

    let first = read_carry_over(&window_dir(dir.path(), &windows[0])).unwrap();
    assert_eq!(first.source_year, 2026);
    assert!(close(first.sites[&pv()].capacity, 980.0));

    let manifest = load_run_manifest(&summary.manifest_path).unwrap();
    assert_eq!(manifest.scenario.as_deref(), Some("overlap"));
    assert_eq!(manifest.scheme, WindowScheme::OpenEnded);
}

/// An infeasible window stops the horizon; later windows are skipped and
/// produce no output.
#[test]
fn failed_window_halts_the_horizon() {
    let dir = tempdir().unwrap();
    let mut data = single_site_data(2025, 2028);
    let yearly = data.yearly.get_mut(&pv().at(2026)).unwrap();
    yearly.installable_capacity = 0.0;
    yearly.stock_level = 50.0;
    let mut config = rolling(dir.path(), 1, HandoffMode::InProcess);
    config.policy.minimum_stock = true;

    let summary = run_horizon(&data, &config, None).unwrap();
    assert!(!summary.succeeded());
    let statuses: Vec<_> = summary.windows.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [
            WindowStatus::Ok,
            WindowStatus::Failed,
            WindowStatus::Skipped,
            WindowStatus::Skipped
        ]
    );
    let failure = summary.windows[1].error.as_deref().unwrap();
    assert!(failure.contains("infeasible"), "{}", failure);
    assert!(failure.contains("minimum_stock"), "{}", failure);

    let failed_dir = window_dir(dir.path(), &Window::new(2026, 2026).unwrap());
    assert!(!failed_dir.join("decom.csv").exists());
    assert!(window_dir(dir.path(), &Window::new(2025, 2025).unwrap())
        .join("decom.csv")
        .is_file());

    let manifest = load_run_manifest(&summary.manifest_path).unwrap();
    assert_eq!((manifest.completed, manifest.failed, manifest.skipped), (1, 1, 2));
    // earlier terminal state survives
    assert_eq!(summary.final_state.unwrap().source_year, 2025);
}
