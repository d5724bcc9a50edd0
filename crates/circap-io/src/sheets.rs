//! Result sheets on disk.
//!
//! Each sheet of a window is written as `<dir>/<sheet>.csv` through a
//! temporary file and a rename, so a reader polling the directory never sees
//! a partially written sheet. The carry-over snapshot goes next to them as
//! `carry_over.json`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use circap_core::{
    CapacityKey, CapacityRecord, ChannelBalance, CostRecord, ResultSheets, SheetName,
    TimestepKey, WindowState, Year,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CARRY_OVER_FILE: &str = "carry_over.json";

#[derive(Debug, Serialize, Deserialize)]
struct ValueRow {
    year: Year,
    location: String,
    tech: String,
    value: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CapsRow {
    year: Year,
    location: String,
    tech: String,
    new: f64,
    imported: f64,
    stockout: f64,
    primary: f64,
    secondary: f64,
    stock_imported: f64,
    stockpile: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CostRow {
    year: Year,
    location: String,
    tech: String,
    import: f64,
    storage: f64,
    primary: f64,
    secondary: f64,
    scrap: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct YearRow {
    year: Year,
    value: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct BalanceRow {
    timestep: u32,
    year: Year,
    location: String,
    tech: String,
    total: f64,
    imported: f64,
    stockout: f64,
    primary: f64,
    secondary: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProcessRow {
    year: Year,
    location: String,
    value: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CarryOverFile {
    written_at: DateTime<Utc>,
    state: WindowState,
}

/// Write `bytes` to `path` via a sibling temp file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .with_context(|| format!("no file name in {}", path.display()))?;
    let tmp = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));
    fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("atomic rename: {} -> {}", tmp.display(), path.display()))
}

fn encode<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.into_inner().context("flushing csv buffer")
}

fn value_rows(sheet: &BTreeMap<CapacityKey, f64>) -> impl Iterator<Item = ValueRow> + '_ {
    sheet.iter().map(|(k, v)| ValueRow {
        year: k.year,
        location: k.site.location.clone(),
        tech: k.site.tech.clone(),
        value: *v,
    })
}

fn year_rows(sheet: &BTreeMap<Year, f64>) -> impl Iterator<Item = YearRow> + '_ {
    sheet.iter().map(|(y, v)| YearRow {
        year: *y,
        value: *v,
    })
}

fn encode_sheet(sheets: &ResultSheets, name: SheetName) -> Result<Vec<u8>> {
    match name {
        SheetName::ExtensionTotalCaps => encode(value_rows(&sheets.extension_total_caps)),
        SheetName::Decom => encode(value_rows(&sheets.decom)),
        SheetName::SecondaryCapSum => encode(value_rows(&sheets.secondary_cap_sum)),
        SheetName::Scrap => encode(value_rows(&sheets.scrap)),
        SheetName::PricereductionSec => encode(value_rows(&sheets.pricereduction_sec)),
        SheetName::TotalCo2 => encode(year_rows(&sheets.total_co2)),
        SheetName::UsCo2 => encode(year_rows(&sheets.us_co2)),
        SheetName::ExtensionOnlyCaps => {
            encode(sheets.extension_only_caps.iter().map(|(k, c)| CapsRow {
                year: k.year,
                location: k.site.location.clone(),
                tech: k.site.tech.clone(),
                new: c.new,
                imported: c.imported,
                stockout: c.stockout,
                primary: c.primary,
                secondary: c.secondary,
                stock_imported: c.stock_imported,
                stockpile: c.stockpile,
            }))
        }
        SheetName::ExtensionCost => encode(sheets.extension_cost.iter().map(|(k, c)| CostRow {
            year: k.year,
            location: k.site.location.clone(),
            tech: k.site.tech.clone(),
            import: c.import,
            storage: c.storage,
            primary: c.primary,
            secondary: c.secondary,
            scrap: c.scrap,
        })),
        SheetName::ExtensionBalance => {
            encode(sheets.extension_balance.iter().map(|(k, b)| BalanceRow {
                timestep: k.timestep,
                year: k.key.year,
                location: k.key.site.location.clone(),
                tech: k.key.site.tech.clone(),
                total: b.total,
                imported: b.imported,
                stockout: b.stockout,
                primary: b.primary,
                secondary: b.secondary,
            }))
        }
        SheetName::EProIn => encode(sheets.e_pro_in.iter().map(|((y, loc), v)| ProcessRow {
            year: *y,
            location: loc.clone(),
            value: *v,
        })),
    }
}

/// Write every sheet of `sheets` into `dir`, creating it if needed.
pub fn write_sheets(dir: &Path, sheets: &ResultSheets) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut written = Vec::with_capacity(SheetName::ALL.len());
    for name in SheetName::ALL {
        let path = dir.join(name.file_name());
        let bytes =
            encode_sheet(sheets, name).with_context(|| format!("encoding sheet '{}'", name))?;
        write_atomic(&path, &bytes)?;
        written.push(path);
    }
    debug!(dir = %dir.display(), sheets = written.len(), "wrote result sheets");
    Ok(written)
}

fn decode<T: DeserializeOwned>(dir: &Path, name: SheetName) -> Result<Vec<T>> {
    let path = dir.join(name.file_name());
    let mut reader =
        csv::Reader::from_path(&path).with_context(|| format!("opening sheet {}", path.display()))?;
    reader
        .deserialize()
        .map(|row| row.with_context(|| format!("reading sheet {}", path.display())))
        .collect()
}

fn read_values(dir: &Path, name: SheetName) -> Result<BTreeMap<CapacityKey, f64>> {
    Ok(decode::<ValueRow>(dir, name)?
        .into_iter()
        .map(|r| (CapacityKey::new(r.year, r.location, r.tech), r.value))
        .collect())
}

fn read_years(dir: &Path, name: SheetName) -> Result<BTreeMap<Year, f64>> {
    Ok(decode::<YearRow>(dir, name)?
        .into_iter()
        .map(|r| (r.year, r.value))
        .collect())
}

/// Read all sheets of one window back from `dir`.
pub fn read_sheets(dir: &Path) -> Result<ResultSheets> {
    let extension_only_caps = decode::<CapsRow>(dir, SheetName::ExtensionOnlyCaps)?
        .into_iter()
        .map(|r| {
            (
                CapacityKey::new(r.year, r.location, r.tech),
                CapacityRecord {
                    new: r.new,
                    imported: r.imported,
                    stockout: r.stockout,
                    primary: r.primary,
                    secondary: r.secondary,
                    stock_imported: r.stock_imported,
                    stockpile: r.stockpile,
                },
            )
        })
        .collect();
    let extension_cost = decode::<CostRow>(dir, SheetName::ExtensionCost)?
        .into_iter()
        .map(|r| {
            (
                CapacityKey::new(r.year, r.location, r.tech),
                CostRecord {
                    import: r.import,
                    storage: r.storage,
                    primary: r.primary,
                    secondary: r.secondary,
                    scrap: r.scrap,
                },
            )
        })
        .collect();
    let extension_balance = decode::<BalanceRow>(dir, SheetName::ExtensionBalance)?
        .into_iter()
        .map(|r| {
            (
                TimestepKey {
                    timestep: r.timestep,
                    key: CapacityKey::new(r.year, r.location, r.tech),
                },
                ChannelBalance {
                    total: r.total,
                    imported: r.imported,
                    stockout: r.stockout,
                    primary: r.primary,
                    secondary: r.secondary,
                },
            )
        })
        .collect();
    let e_pro_in = decode::<ProcessRow>(dir, SheetName::EProIn)?
        .into_iter()
        .map(|r| ((r.year, r.location), r.value))
        .collect();

    Ok(ResultSheets {
        extension_total_caps: read_values(dir, SheetName::ExtensionTotalCaps)?,
        extension_only_caps,
        decom: read_values(dir, SheetName::Decom)?,
        total_co2: read_years(dir, SheetName::TotalCo2)?,
        secondary_cap_sum: read_values(dir, SheetName::SecondaryCapSum)?,
        scrap: read_values(dir, SheetName::Scrap)?,
        extension_balance,
        e_pro_in,
        extension_cost,
        us_co2: read_years(dir, SheetName::UsCo2)?,
        pricereduction_sec: read_values(dir, SheetName::PricereductionSec)?,
    })
}

pub fn write_carry_over(dir: &Path, state: &WindowState) -> Result<PathBuf> {
    let path = dir.join(CARRY_OVER_FILE);
    let file = CarryOverFile {
        written_at: Utc::now(),
        state: state.clone(),
    };
    let bytes = serde_json::to_vec_pretty(&file).context("serializing carry-over state")?;
    write_atomic(&path, &bytes)?;
    Ok(path)
}

pub fn read_carry_over(dir: &Path) -> Result<WindowState> {
    let path = dir.join(CARRY_OVER_FILE);
    let bytes = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let file: CarryOverFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(file.state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use circap_core::SiteTech;
    use tempfile::tempdir;

    fn sample() -> ResultSheets {
        let key = CapacityKey::new(2026, "EU27", "solarPV");
        let mut sheets = ResultSheets::default();
        sheets.extension_total_caps.insert(key.clone(), 980.0);
        sheets.extension_only_caps.insert(
            key.clone(),
            CapacityRecord {
                new: 5.0,
                primary: 3.0,
                secondary: 2.0,
                stockpile: 1.5,
                ..CapacityRecord::default()
            },
        );
        sheets.decom.insert(key.clone(), 10.0);
        sheets.secondary_cap_sum.insert(key.clone(), 2.0);
        sheets.scrap.insert(key.clone(), 0.5);
        sheets.pricereduction_sec.insert(key.clone(), 0.0);
        sheets.extension_cost.insert(
            key.clone(),
            CostRecord {
                primary: 1.2e6,
                ..CostRecord::default()
            },
        );
        sheets.extension_balance.insert(
            TimestepKey {
                timestep: 7,
                key,
            },
            ChannelBalance {
                total: 196.0,
                ..ChannelBalance::default()
            },
        );
        sheets.e_pro_in.insert((2026, "EU27".into()), 12.0);
        sheets.total_co2.insert(2026, 4.8);
        sheets.us_co2.insert(2026, 4.8);
        sheets
    }

    #[test]
    fn test_sheets_survive_disk() {
        let dir = tempdir().unwrap();
        let written = write_sheets(dir.path(), &sample()).unwrap();
        assert_eq!(written.len(), SheetName::ALL.len());
        assert!(dir.path().join("pricereduction_sec.csv").is_file());
        // no temp files left behind
        assert!(fs::read_dir(dir.path())
            .unwrap()
            .all(|e| !e.unwrap().file_name().to_string_lossy().ends_with(".tmp")));

        let back = read_sheets(dir.path()).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_value_sheet_header() {
        let dir = tempdir().unwrap();
        write_sheets(dir.path(), &sample()).unwrap();
        let text = fs::read_to_string(dir.path().join("decom.csv")).unwrap();
        assert!(text.starts_with("year,location,tech,value\n"));
        assert!(text.contains("2026,EU27,solarPV,10"));
    }

    #[test]
    fn test_carry_over_file() {
        let dir = tempdir().unwrap();
        let mut state = WindowState {
            source_year: 2026,
            co2_total: 4.8,
            ..WindowState::default()
        };
        state
            .sites
            .insert(SiteTech::new("EU27", "solarPV"), Default::default());
        write_carry_over(dir.path(), &state).unwrap();
        assert_eq!(read_carry_over(dir.path()).unwrap(), state);
    }

    #[test]
    fn test_missing_sheet_is_reported() {
        let dir = tempdir().unwrap();
        let err = read_sheets(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("extension_only_caps.csv"));
    }
}
