//! Index types shared by every layer: planning years, (location, technology)
//! pairs, the composite keys used by parameter tables and result sheets, and
//! the planning window.

use crate::{CircapError, CircapResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A planning year (support time-frame).
pub type Year = u32;

/// Absolute first simulated year. Rules that reference a predecessor year are
/// skipped here because no prior value exists, not even a carried one.
pub const EPOCH_YEAR: Year = 2024;

/// Commodity the extension injects into the base model's vertex balance.
pub const ELEC_COMMODITY: &str = "Elec";

/// A (location, technology) pair, written `LOCATION.TECH` in input sheets
/// and serialized the same way.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiteTech {
    pub location: String,
    pub tech: String,
}

impl SiteTech {
    pub fn new(location: impl Into<String>, tech: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            tech: tech.into(),
        }
    }

    pub fn at(&self, year: Year) -> CapacityKey {
        CapacityKey {
            year,
            site: self.clone(),
        }
    }
}

impl fmt::Display for SiteTech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.location, self.tech)
    }
}

impl FromStr for SiteTech {
    type Err = CircapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((loc, tech)) if !loc.is_empty() && !tech.is_empty() => {
                Ok(SiteTech::new(loc.trim(), tech.trim()))
            }
            _ => Err(CircapError::Parse(format!(
                "expected LOCATION.TECH, got '{}'",
                s
            ))),
        }
    }
}

impl TryFrom<String> for SiteTech {
    type Error = CircapError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SiteTech> for String {
    fn from(site: SiteTech) -> Self {
        site.to_string()
    }
}

/// `(year, location, tech)` key used by yearly parameter tables and result sheets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CapacityKey {
    pub year: Year,
    pub site: SiteTech,
}

impl CapacityKey {
    pub fn new(year: Year, location: impl Into<String>, tech: impl Into<String>) -> Self {
        Self {
            year,
            site: SiteTech::new(location, tech),
        }
    }
}

impl fmt::Display for CapacityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.year, self.site)
    }
}

/// `(timestep, year, location, tech)` key for per-timestep quantities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimestepKey {
    pub timestep: u32,
    pub key: CapacityKey,
}

/// Where a year sits relative to the absolute epoch and the window start.
///
/// `AbsoluteStart` wins when the window itself starts at the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearPosition {
    /// `year == EPOCH_YEAR`: predecessor-referencing rules are skipped.
    AbsoluteStart,
    /// `year == y0` of a later window: the predecessor is a carried parameter.
    WindowStart,
    /// Any later year: the predecessor is the in-window variable at `year - 1`.
    Interior,
}

impl YearPosition {
    pub fn classify(year: Year, y0: Year, epoch: Year) -> Self {
        if year == epoch {
            YearPosition::AbsoluteStart
        } else if year == y0 {
            YearPosition::WindowStart
        } else {
            YearPosition::Interior
        }
    }
}

/// Inclusive range of planning years solved together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: Year,
    pub end: Year,
}

impl Window {
    pub fn new(start: Year, end: Year) -> CircapResult<Self> {
        if start > end {
            return Err(CircapError::Validation(format!(
                "window start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn years(&self) -> impl Iterator<Item = Year> {
        self.start..=self.end
    }

    pub fn contains(&self, year: Year) -> bool {
        (self.start..=self.end).contains(&year)
    }

    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Year whose terminal state seeds this window.
    pub fn carry_year(&self) -> Year {
        self.start.saturating_sub(1)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_tech_parse() {
        let st: SiteTech = "EU27.solarPV".parse().unwrap();
        assert_eq!(st.location, "EU27");
        assert_eq!(st.tech, "solarPV");
        assert_eq!(st.to_string(), "EU27.solarPV");
        assert!("solarPV".parse::<SiteTech>().is_err());
        assert!(".solarPV".parse::<SiteTech>().is_err());
    }

    #[test]
    fn test_three_state_classification() {
        assert_eq!(
            YearPosition::classify(2024, 2024, EPOCH_YEAR),
            YearPosition::AbsoluteStart
        );
        assert_eq!(
            YearPosition::classify(2025, 2025, EPOCH_YEAR),
            YearPosition::WindowStart
        );
        assert_eq!(
            YearPosition::classify(2026, 2025, EPOCH_YEAR),
            YearPosition::Interior
        );
        // a later year equal to the epoch of a custom run is still the absolute start
        assert_eq!(
            YearPosition::classify(2030, 2028, 2030),
            YearPosition::AbsoluteStart
        );
    }

    #[test]
    fn test_window_bounds() {
        let w = Window::new(2025, 2029).unwrap();
        assert_eq!(w.len(), 5);
        assert_eq!(w.years().collect::<Vec<_>>(), vec![2025, 2026, 2027, 2028, 2029]);
        assert_eq!(w.carry_year(), 2024);
        assert!(w.contains(2029));
        assert!(!w.contains(2030));
        assert!(Window::new(2030, 2029).is_err());
    }

    #[test]
    fn test_capacity_key_ordering_is_year_major() {
        let a = CapacityKey::new(2025, "EU27", "windon");
        let b = CapacityKey::new(2026, "AT", "solarPV");
        assert!(a < b);
    }

    #[test]
    fn test_site_tech_serializes_as_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(SiteTech::new("EU27", "windon"), 1.0);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"EU27.windon":1.0}"#);
        let back: std::collections::BTreeMap<SiteTech, f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}
