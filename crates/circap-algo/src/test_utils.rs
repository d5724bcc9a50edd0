//! Small fixtures shared by unit and integration tests.

use circap_core::{
    ExtensionData, LearningCurve, SiteTech, TechParams, TimestepKey, Year, YearlyParams,
};

/// One EU27 solar PV site with the default seven-step learning curve,
/// two timesteps per year and a comfortable installable ceiling.
pub fn single_site_data(y0: Year, y_end: Year) -> ExtensionData {
    let mut data = ExtensionData::new(y0, y_end);
    let site = SiteTech::new("EU27", "solarPV");
    data.insert_site(
        site.clone(),
        TechParams {
            initial_capacity: 1000.0,
            lifetime: 25,
            dq_primary: 100.0,
            dq_secondary: 100.0,
            ir_primary: 0.1,
            ir_secondary: 0.1,
            decommission_start: 10.0,
            ..TechParams::default()
        },
    );
    data.timesteps = vec![1, 2];
    for year in y0..=y_end {
        data.yearly.insert(
            site.at(year),
            YearlyParams {
                import_cost: 300_000.0,
                manufacturing_cost: 400_000.0,
                remanufacturing_cost: 450_000.0,
                recycling_cost: 1_000.0,
                installable_capacity: 500.0,
                dcr: 1.0,
                stock_level: 0.0,
            },
        );
        for &t in &data.timesteps {
            data.load_factors.insert(
                TimestepKey {
                    timestep: t,
                    key: site.at(year),
                },
                0.2,
            );
        }
    }
    data
}

/// A short curve with reachable thresholds: discounts 1000/2000/3000 at
/// cumulative secondary capacity 50/150/1e6.
pub fn short_learning_curve() -> LearningCurve {
    LearningCurve::from_pairs(&[(0.0, 0.0), (1000.0, 50.0), (2000.0, 150.0), (3000.0, 1e6)])
}

/// Set electricity demand of every timestep at `location` in `year`.
pub fn set_demand(data: &mut ExtensionData, location: &str, year: Year, mwh: f64) {
    let timesteps = data.timesteps.clone();
    for t in timesteps {
        data.demand.insert((t, year, location.to_string()), mwh);
    }
}
