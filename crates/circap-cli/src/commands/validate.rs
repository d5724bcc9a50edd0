//! `circap validate`: load inputs and report what was found.

use anyhow::{Context, Result};
use circap_algo::PolicyConfig;
use circap_io::load_extension_dir;
use circap_scenarios::{apply_scenario, load_spec_from_path, resolve_scenarios};
use std::path::Path;

pub fn handle(input: &Path, scenario: Option<&Path>) -> Result<()> {
    let loaded = load_extension_dir(input)
        .with_context(|| format!("loading input directory '{}'", input.display()))?;
    let data = &loaded.data;
    println!(
        "{}: horizon {}-{}, {} locations, {} technologies, {} timesteps",
        input.display(),
        data.y0,
        data.y_end,
        data.locations.len(),
        data.sites.len(),
        data.timesteps.len()
    );
    println!("Diagnostics: {}", loaded.diagnostics.summary());
    for issue in &loaded.diagnostics.issues {
        println!("  [{}] {}", issue.category, issue.message);
    }

    if let Some(path) = scenario {
        let set = load_spec_from_path(path)?;
        let resolved = resolve_scenarios(&set)?;
        // each scenario must apply cleanly to the loaded data
        for scenario in &resolved {
            let mut data = loaded.data.clone();
            let mut policy = PolicyConfig::default();
            apply_scenario(&mut data, &mut policy, scenario)?;
        }
        println!(
            "Scenario set {}: {} scenarios OK",
            path.display(),
            resolved.len()
        );
    }
    Ok(())
}
