use circap_core::SiteTech;
use circap_io::{load_extension_dir, LoadError};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn repo_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join(relative)
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        fs::copy(entry.path(), to.join(entry.file_name())).unwrap();
    }
}

#[test]
fn test_load_eu27_fixture() {
    let loaded = load_extension_dir(repo_path("test_data/eu27")).unwrap();
    let data = &loaded.data;

    assert_eq!((data.y0, data.y_end), (2025, 2028));
    assert_eq!(data.locations, vec!["EU27".to_string()]);
    assert_eq!(data.sites.len(), 2);
    assert_eq!(data.timesteps, vec![1, 2, 3, 4]);

    let solar = SiteTech::new("EU27", "solarPV");
    let params = data.params(&solar).unwrap();
    assert_eq!(params.lifetime, 25);
    assert_eq!(params.decommission_start, 1200.0);
    assert_eq!(data.yearly(2027, &solar).unwrap().installable_capacity, 30000.0);
    assert_eq!(data.load_factor(2, 2026, &solar), 0.3);
    assert_eq!(data.demand_at(2, 2025, "EU27"), 100000.0);
    // default seven-step curve for PV
    assert_eq!(data.curve_for("solarPV").len(), 7);
    assert_eq!(loaded.diagnostics.error_count(), 0);
}

#[test]
fn test_missing_yearly_entry_is_fatal() {
    let dir = tempdir().unwrap();
    copy_dir(&repo_path("test_data/eu27"), dir.path());
    let dcr = fs::read_to_string(dir.path().join("dcr.csv")).unwrap();
    let trimmed: Vec<&str> = dcr
        .lines()
        .filter(|l| !l.starts_with("2028,EU27,windon"))
        .collect();
    fs::write(dir.path().join("dcr.csv"), trimmed.join("\n")).unwrap();

    match load_extension_dir(dir.path()) {
        Err(LoadError::MissingEntry { sheet, key }) => {
            assert_eq!(sheet, "dcr");
            assert_eq!(key, "2028 EU27.windon");
        }
        other => panic!("expected missing entry, got {:?}", other.map(|r| r.data.y0)),
    }
}

#[test]
fn test_missing_attribute_column_defaults_with_warning() {
    let dir = tempdir().unwrap();
    copy_dir(&repo_path("test_data/eu27"), dir.path());
    fs::write(
        dir.path().join("technologies.csv"),
        "technology,initial_capacity,lifetime\n\
         EU27.solarPV,100,25\nEU27.windon,50,20\nbroken,1,1\n",
    )
    .unwrap();

    let loaded = load_extension_dir(dir.path()).unwrap();
    let solar = loaded.data.params(&SiteTech::new("EU27", "solarPV")).unwrap();
    assert_eq!(solar.initial_capacity, 100.0);
    assert_eq!(solar.scrap, 0.0);
    assert!(loaded
        .diagnostics
        .issues
        .iter()
        .any(|i| i.message.contains("'scrap' missing")));
    assert!(loaded
        .diagnostics
        .issues
        .iter()
        .any(|i| i.message.contains("LOCATION.TECH")));
}

#[test]
fn test_missing_required_sheet() {
    let dir = tempdir().unwrap();
    copy_dir(&repo_path("test_data/eu27"), dir.path());
    fs::remove_file(dir.path().join("costs.csv")).unwrap();
    assert!(matches!(
        load_extension_dir(dir.path()),
        Err(LoadError::MissingSheet(_))
    ));
}

#[test]
fn test_overlong_lifetime_is_rejected() {
    let dir = tempdir().unwrap();
    copy_dir(&repo_path("test_data/eu27"), dir.path());
    fs::write(
        dir.path().join("technologies.csv"),
        "technology,initial_capacity,lifetime\nEU27.solarPV,100,1e12\nEU27.windon,50,20\n",
    )
    .unwrap();

    match load_extension_dir(dir.path()) {
        Err(LoadError::InvalidValue { sheet, message }) => {
            assert_eq!(sheet, "technologies.csv");
            assert!(message.contains("EU27.solarPV"), "{}", message);
            assert!(message.contains("lifetime"), "{}", message);
        }
        other => panic!("expected invalid lifetime, got {:?}", other.map(|r| r.data.y0)),
    }
}
