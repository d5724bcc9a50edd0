//! Parameter loader: a directory of CSV sheets into typed [`ExtensionData`].
//!
//! ```text
//! input/
//! ├── base.csv                  param,value (y0, y_end, hours)
//! ├── locations.csv             location
//! ├── technologies.csv          technology (LOC.TECH) + attribute columns
//! ├── costs.csv                 year,location,tech,import,manufacturing,remanufacturing,recycling
//! ├── installable_capacity.csv  year,location,tech,value
//! ├── dcr.csv                   year,location,tech,value
//! ├── stock_levels.csv          year,location,tech,value   (optional)
//! ├── load_factors.csv          timestep,year,location,tech,value
//! ├── learning_curve.csv        [tech,]step,price_reduction,capacity_threshold (optional)
//! └── demand.csv                timestep,year,location,value (optional)
//! ```
//!
//! Absent technology attributes default to zero with a warning. Rows for
//! years outside `[y0, y_end]` are ignored. Every `(year, location, tech)` of
//! the horizon must be present in the cost, ceiling and DCR sheets.

use crate::error::LoadError;
use circap_core::data::LEARNING_TECHS;
use circap_core::{
    CapacityKey, Diagnostics, ExtensionData, LearningCurve, LearningStep, SiteTech, TechParams,
    TimestepKey, Year, YearlyParams,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const BASE_SHEET: &str = "base.csv";
pub const LOCATIONS_SHEET: &str = "locations.csv";
pub const TECHNOLOGIES_SHEET: &str = "technologies.csv";
pub const COSTS_SHEET: &str = "costs.csv";
pub const INSTALLABLE_SHEET: &str = "installable_capacity.csv";
pub const DCR_SHEET: &str = "dcr.csv";
pub const STOCK_LEVELS_SHEET: &str = "stock_levels.csv";
pub const LOAD_FACTORS_SHEET: &str = "load_factors.csv";
pub const LEARNING_SHEET: &str = "learning_curve.csv";
pub const DEMAND_SHEET: &str = "demand.csv";

/// Loaded data plus the warnings collected on the way.
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub data: ExtensionData,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Deserialize)]
struct BaseRow {
    param: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct LocationRow {
    location: String,
}

#[derive(Debug, Deserialize)]
struct CostRow {
    year: Year,
    location: String,
    tech: String,
    import: f64,
    manufacturing: f64,
    remanufacturing: f64,
    #[serde(default)]
    recycling: f64,
}

#[derive(Debug, Deserialize)]
struct ValueRow {
    year: Year,
    location: String,
    tech: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct LoadFactorRow {
    timestep: u32,
    year: Year,
    location: String,
    tech: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct LearningRow {
    #[serde(default)]
    tech: Option<String>,
    step: u32,
    price_reduction: f64,
    capacity_threshold: f64,
}

#[derive(Debug, Deserialize)]
struct DemandRow {
    timestep: u32,
    year: Year,
    location: String,
    value: f64,
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>, LoadError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| LoadError::csv(path, e))
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, LoadError> {
    reader(path)?
        .deserialize()
        .map(|row| row.map_err(|e| LoadError::csv(path, e)))
        .collect()
}

fn required(dir: &Path, name: &str) -> Result<PathBuf, LoadError> {
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(LoadError::MissingSheet(path))
    }
}

fn optional(dir: &Path, name: &str) -> Option<PathBuf> {
    let path = dir.join(name);
    path.is_file().then_some(path)
}

/// Load a scenario input directory.
///
/// # Example
///
/// ```no_run
/// use circap_io::load_extension_dir;
///
/// let loaded = load_extension_dir("input/")?;
/// println!("{} sites, {} warnings", loaded.data.sites.len(), loaded.diagnostics.warning_count());
/// # Ok::<(), circap_io::LoadError>(())
/// ```
pub fn load_extension_dir(dir: impl AsRef<Path>) -> Result<LoadResult, LoadError> {
    let dir = dir.as_ref();
    let mut diagnostics = Diagnostics::new();

    let (y0, y_end, hours) = read_base(&required(dir, BASE_SHEET)?)?;
    let mut data = ExtensionData::new(y0, y_end);
    data.hours = hours;

    for row in read_rows::<LocationRow>(&required(dir, LOCATIONS_SHEET)?)? {
        if !row.location.is_empty() && !data.locations.contains(&row.location) {
            data.locations.push(row.location);
        }
    }
    if data.locations.is_empty() {
        return Err(LoadError::Validation(format!(
            "{} lists no locations",
            LOCATIONS_SHEET
        )));
    }

    read_technologies(
        &required(dir, TECHNOLOGIES_SHEET)?,
        &mut data,
        &mut diagnostics,
    )?;
    read_yearly(dir, &mut data, &mut diagnostics)?;
    read_load_factors(&required(dir, LOAD_FACTORS_SHEET)?, &mut data, &mut diagnostics)?;

    if let Some(path) = optional(dir, LEARNING_SHEET) {
        read_learning(&path, &mut data)?;
    } else {
        debug!("no {}, using the default learning curve", LEARNING_SHEET);
    }
    if let Some(path) = optional(dir, DEMAND_SHEET) {
        for row in read_rows::<DemandRow>(&path)? {
            if data.window().contains(row.year) {
                data.demand
                    .insert((row.timestep, row.year, row.location), row.value);
            }
        }
    }

    data.validate()
        .map_err(|e| LoadError::Validation(e.to_string()))?;

    info!(
        dir = %dir.display(),
        y0 = data.y0,
        y_end = data.y_end,
        sites = data.sites.len(),
        timesteps = data.timesteps.len(),
        warnings = diagnostics.warning_count(),
        "loaded extension input"
    );
    Ok(LoadResult { data, diagnostics })
}

fn read_base(path: &Path) -> Result<(Year, Year, f64), LoadError> {
    let params: BTreeMap<String, f64> = read_rows::<BaseRow>(path)?
        .into_iter()
        .map(|r| (r.param, r.value))
        .collect();
    let year = |name: &str| -> Result<Year, LoadError> {
        let value = params
            .get(name)
            .ok_or_else(|| {
                LoadError::invalid(BASE_SHEET, format!("missing parameter '{}'", name))
            })?;
        if value.fract() != 0.0 || *value < 0.0 {
            return Err(LoadError::invalid(
                BASE_SHEET,
                format!("'{}' must be a year, got {}", name, value),
            ));
        }
        Ok(*value as Year)
    };
    let y0 = year("y0")?;
    let y_end = year("y_end")?;
    if y0 > y_end {
        return Err(LoadError::Validation(format!(
            "y0 {} is after y_end {}",
            y0, y_end
        )));
    }
    Ok((y0, y_end, params.get("hours").copied().unwrap_or(1.0)))
}

fn read_technologies(
    path: &Path,
    data: &mut ExtensionData,
    diagnostics: &mut Diagnostics,
) -> Result<(), LoadError> {
    let mut rdr = reader(path)?;
    let headers = rdr.headers().map_err(|e| LoadError::csv(path, e))?.clone();
    let id_col = headers
        .iter()
        .position(|h| h == "technology")
        .ok_or_else(|| LoadError::invalid(TECHNOLOGIES_SHEET, "no 'technology' column"))?;

    let mut columns: BTreeMap<&str, usize> = BTreeMap::new();
    for (i, header) in headers.iter().enumerate() {
        if i == id_col {
            continue;
        }
        match TechParams::ATTRIBUTES.iter().find(|a| **a == header) {
            Some(&attr) => {
                columns.insert(attr, i);
            }
            None => diagnostics.add_warning(
                "technologies",
                &format!("ignoring unknown attribute column '{}'", header),
            ),
        }
    }
    for attr in TechParams::ATTRIBUTES {
        if !columns.contains_key(attr) {
            warn!(attribute = attr, "technology attribute missing, defaulting to 0");
            diagnostics.add_warning(
                "technologies",
                &format!("attribute '{}' missing, defaulting to 0", attr),
            );
        }
    }

    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| LoadError::csv(path, e))?;
        let line = line + 2;
        let id = record.get(id_col).unwrap_or_default();
        let Some((location, tech)) = id.split_once('.') else {
            warn!(technology = id, line, "technology without LOCATION.TECH form, skipped");
            diagnostics.add_warning_at_line(
                "technologies",
                &format!("'{}' is not of the form LOCATION.TECH, skipped", id),
                line,
            );
            continue;
        };
        if !data.locations.iter().any(|l| l == location) {
            return Err(LoadError::invalid(
                TECHNOLOGIES_SHEET,
                format!("line {}: unknown location '{}'", line, location),
            ));
        }

        let site = SiteTech::new(location, tech);
        let mut params = TechParams::default();
        for (attr, &col) in &columns {
            let cell = record.get(col).unwrap_or_default();
            if cell.is_empty() {
                diagnostics.add_warning_with_entity(
                    "technologies",
                    &format!("empty '{}', defaulting to 0", attr),
                    &site.to_string(),
                );
                continue;
            }
            let value: f64 = cell.parse().map_err(|_| {
                LoadError::invalid(
                    TECHNOLOGIES_SHEET,
                    format!("line {}: '{}' is not a number for '{}'", line, cell, attr),
                )
            })?;
            params.set_attribute(attr, value).map_err(|e| {
                LoadError::invalid(TECHNOLOGIES_SHEET, format!("{}: {}", site, e))
            })?;
        }
        data.insert_site(site, params);
    }
    if data.sites.is_empty() {
        return Err(LoadError::Validation(format!(
            "{} defines no technologies",
            TECHNOLOGIES_SHEET
        )));
    }
    Ok(())
}

/// Keep rows inside the horizon for known sites; warn about the others.
fn site_key(
    data: &ExtensionData,
    sheet: &str,
    year: Year,
    location: &str,
    tech: &str,
    diagnostics: &mut Diagnostics,
) -> Option<CapacityKey> {
    if !data.window().contains(year) {
        return None;
    }
    let key = CapacityKey::new(year, location, tech);
    if data.sites.contains_key(&key.site) {
        Some(key)
    } else {
        diagnostics.add_warning_with_entity(
            sheet,
            "row for undefined technology ignored",
            &key.to_string(),
        );
        None
    }
}

fn read_values(
    path: &Path,
    sheet: &str,
    data: &ExtensionData,
    diagnostics: &mut Diagnostics,
) -> Result<BTreeMap<CapacityKey, f64>, LoadError> {
    let mut values = BTreeMap::new();
    for row in read_rows::<ValueRow>(path)? {
        if let Some(key) = site_key(data, sheet, row.year, &row.location, &row.tech, diagnostics) {
            values.insert(key, row.value);
        }
    }
    Ok(values)
}

fn read_yearly(
    dir: &Path,
    data: &mut ExtensionData,
    diagnostics: &mut Diagnostics,
) -> Result<(), LoadError> {
    let mut costs = BTreeMap::new();
    for row in read_rows::<CostRow>(&required(dir, COSTS_SHEET)?)? {
        let key = site_key(data, "costs", row.year, &row.location, &row.tech, diagnostics);
        if let Some(key) = key {
            costs.insert(key, row);
        }
    }
    let installable = read_values(
        &required(dir, INSTALLABLE_SHEET)?,
        "installable_capacity",
        data,
        diagnostics,
    )?;
    let dcr = read_values(&required(dir, DCR_SHEET)?, "dcr", data, diagnostics)?;
    let stock_levels = match optional(dir, STOCK_LEVELS_SHEET) {
        Some(path) => read_values(&path, "stock_levels", data, diagnostics)?,
        None => {
            diagnostics.add_warning(
                "stock_levels",
                "no stock_levels.csv, minimum stock levels are 0",
            );
            BTreeMap::new()
        }
    };

    let sites: Vec<SiteTech> = data.sites.keys().cloned().collect();
    let years: Vec<Year> = data.years().collect();
    for site in &sites {
        for &year in &years {
            let key = site.at(year);
            let missing = |sheet: &str| LoadError::MissingEntry {
                sheet: sheet.to_string(),
                key: key.to_string(),
            };
            let cost = costs.get(&key).ok_or_else(|| missing("costs"))?;
            let params = YearlyParams {
                import_cost: cost.import,
                manufacturing_cost: cost.manufacturing,
                remanufacturing_cost: cost.remanufacturing,
                recycling_cost: cost.recycling,
                installable_capacity: *installable
                    .get(&key)
                    .ok_or_else(|| missing("installable_capacity"))?,
                dcr: *dcr.get(&key).ok_or_else(|| missing("dcr"))?,
                stock_level: stock_levels.get(&key).copied().unwrap_or(0.0),
            };
            data.yearly.insert(key, params);
        }
    }
    Ok(())
}

fn read_load_factors(
    path: &Path,
    data: &mut ExtensionData,
    diagnostics: &mut Diagnostics,
) -> Result<(), LoadError> {
    let mut timesteps = BTreeSet::new();
    for row in read_rows::<LoadFactorRow>(path)? {
        timesteps.insert(row.timestep);
        let key = site_key(data, "load_factors", row.year, &row.location, &row.tech, diagnostics);
        if let Some(key) = key {
            data.load_factors.insert(
                TimestepKey {
                    timestep: row.timestep,
                    key,
                },
                row.value,
            );
        }
    }
    if timesteps.is_empty() {
        diagnostics.add_warning("load_factors", "no timesteps, the extension delivers no energy");
    }
    data.timesteps = timesteps.into_iter().collect();
    Ok(())
}

fn read_learning(path: &Path, data: &mut ExtensionData) -> Result<(), LoadError> {
    let mut tables: BTreeMap<Option<String>, Vec<LearningStep>> = BTreeMap::new();
    for row in read_rows::<LearningRow>(path)? {
        let tech = row.tech.filter(|t| !t.is_empty());
        tables.entry(tech).or_default().push(LearningStep {
            step: row.step,
            price_reduction: row.price_reduction,
            capacity_threshold: row.capacity_threshold,
        });
    }
    for (tech, mut steps) in tables {
        steps.sort_by_key(|s| s.step);
        let curve = LearningCurve { steps };
        curve
            .validate()
            .map_err(|e| LoadError::invalid(LEARNING_SHEET, e.to_string()))?;
        match tech {
            Some(tech) => {
                data.learning.insert(tech, curve);
            }
            None => {
                for tech in LEARNING_TECHS {
                    data.learning.insert(tech.to_string(), curve.clone());
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_base_requires_years() {
        let dir = tempdir().unwrap();
        write(dir.path(), BASE_SHEET, "param,value\ny0,2025\n");
        let err = read_base(&dir.path().join(BASE_SHEET)).unwrap_err();
        assert!(err.to_string().contains("y_end"));
    }

    #[test]
    fn test_base_defaults_hours() {
        let dir = tempdir().unwrap();
        write(dir.path(), BASE_SHEET, "param,value\ny0,2025\ny_end,2030\n");
        let (y0, y_end, hours) = read_base(&dir.path().join(BASE_SHEET)).unwrap();
        assert_eq!((y0, y_end, hours), (2025, 2030, 1.0));
    }

    #[test]
    fn test_untagged_learning_rows_apply_to_learning_techs() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            LEARNING_SHEET,
            "step,price_reduction,capacity_threshold\n1,500,10\n0,0,0\n",
        );
        let mut data = ExtensionData::new(2025, 2025);
        read_learning(&dir.path().join(LEARNING_SHEET), &mut data).unwrap();
        let curve = data.curve_for("windon");
        assert_eq!(curve.len(), 2);
        assert_eq!(curve.steps[0].step, 0);
        assert_eq!(curve.steps[1].price_reduction, 500.0);
        // other technologies keep the flat fallback
        assert_eq!(data.curve_for("hydro").steps[1].price_reduction, 0.0);
    }

    #[test]
    fn test_decreasing_thresholds_rejected() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            LEARNING_SHEET,
            "tech,step,price_reduction,capacity_threshold\nsolarPV,0,0,10\nsolarPV,1,5,1\n",
        );
        let mut data = ExtensionData::new(2025, 2025);
        assert!(read_learning(&dir.path().join(LEARNING_SHEET), &mut data).is_err());
    }
}
