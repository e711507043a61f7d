use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::geo;
use crate::kinematics::Drift;

const DEFAULT_HYSTERESIS_NM: f64 = 2.0;
const REFLECTION_SPREAD_DEG: f64 = 20.0;

/// One concentric annular sector with altitude bounds.
#[derive(Debug, Clone)]
pub struct SectorDefinition {
    pub name: String,
    pub sector_type: String,
    pub radius_nm_inner: f64,
    pub radius_nm_outer: f64,
    pub altitude_ft_min: f64,
    pub altitude_ft_max: f64,
    pub controller_hint: String,
    pub hysteresis_nm: f64,
    pub behavior: String,
    pub params: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntryFix {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Spawn-zone parameters for one flight type.
#[derive(Debug, Clone, Deserialize)]
pub struct SpawnZone {
    pub sector: String,
    pub radius_nm_min: f64,
    pub radius_nm_max: f64,
    pub altitude_ft_min: f64,
    pub altitude_ft_max: f64,
    pub speed_kts_min: f64,
    pub speed_kts_max: f64,
    #[serde(default)]
    pub random_bearing: bool,
}

#[derive(Debug, Deserialize)]
struct RawSector {
    name: String,
    #[serde(rename = "type")]
    sector_type: String,
    radius_nm_inner: f64,
    radius_nm_outer: f64,
    altitude_ft_min: f64,
    altitude_ft_max: f64,
    #[serde(default)]
    controller_hint: String,
    hysteresis_nm: Option<f64>,
    #[serde(default)]
    behavior: Option<String>,
    #[serde(default)]
    drift_params: Option<Value>,
    #[serde(default)]
    descent_params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    sectors: Vec<RawSector>,
    #[serde(default)]
    entry_fixes: Vec<EntryFix>,
    #[serde(default)]
    handoff_thresholds: HashMap<String, Value>,
    #[serde(default)]
    spawn_zones: HashMap<String, SpawnZone>,
    #[serde(default)]
    airport: Option<RawAirport>,
}

#[derive(Debug, Deserialize)]
struct RawAirport {
    center: RawCenter,
}

#[derive(Debug, Deserialize)]
struct RawCenter {
    lat: f64,
    lon: f64,
}

/// Static sector layout around the airport, immutable after load.
#[derive(Debug, Clone)]
pub struct Airspace {
    /// Sorted by inner radius so position lookup walks inside-out.
    sectors: Vec<SectorDefinition>,
    pub entry_fixes: Vec<EntryFix>,
    pub handoff_thresholds: HashMap<String, Value>,
    spawn_zones: HashMap<String, SpawnZone>,
    pub center_lat: f64,
    pub center_lon: f64,
}

impl Airspace {
    /// Built-in CYYZ sector stack.
    pub fn defaults() -> Self {
        let sector = |name: &str,
                      sector_type: &str,
                      inner: f64,
                      outer: f64,
                      alt_min: f64,
                      alt_max: f64,
                      hint: &str,
                      behavior: &str| SectorDefinition {
            name: name.to_string(),
            sector_type: sector_type.to_string(),
            radius_nm_inner: inner,
            radius_nm_outer: outer,
            altitude_ft_min: alt_min,
            altitude_ft_max: alt_max,
            controller_hint: hint.to_string(),
            hysteresis_nm: DEFAULT_HYSTERESIS_NM,
            behavior: behavior.to_string(),
            params: Value::Object(Default::default()),
        };

        let mut airspace = Self {
            sectors: vec![
                sector(
                    "RUNWAY",
                    "RUNWAY_OPS",
                    0.0,
                    3.0,
                    0.0,
                    3000.0,
                    "TOWER_ATC",
                    "final_approach",
                ),
                sector(
                    "APPROACH",
                    "APPROACH_DEPARTURE",
                    0.0,
                    10.0,
                    0.0,
                    18000.0,
                    "APPROACH_ATC",
                    "approach_sequencing",
                ),
                sector(
                    "ENROUTE",
                    "ENROUTE",
                    10.0,
                    30.0,
                    0.0,
                    35000.0,
                    "ENROUTE_ATC",
                    "controlled_descent",
                ),
                sector(
                    "ENTRY",
                    "ENTRY_EXIT",
                    30.0,
                    60.0,
                    0.0,
                    60000.0,
                    "ENTRY_ATC",
                    "random_drift",
                ),
            ],
            entry_fixes: Vec::new(),
            handoff_thresholds: HashMap::new(),
            spawn_zones: HashMap::new(),
            center_lat: 43.6777,
            center_lon: -79.6248,
        };
        airspace.sort_sectors();
        airspace
    }

    /// Load sector configuration, falling back to defaults when the file is
    /// missing or malformed.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::defaults();
        };

        match Self::from_file(path) {
            Ok(airspace) => {
                info!(
                    "Loaded airspace config: {} sectors, {} entry fixes",
                    airspace.sectors.len(),
                    airspace.entry_fixes.len()
                );
                airspace
            }
            Err(e) => {
                warn!(
                    "Failed to load airspace config {}: {e}; using default sectors",
                    path.display()
                );
                Self::defaults()
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read airspace config {}", path.display()))?;
        Self::from_json(&contents)
    }

    /// Parse a sector configuration document.
    pub fn from_json(contents: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(contents).context("invalid airspace JSON")?;
        let defaults = Self::defaults();

        let sectors = raw
            .sectors
            .into_iter()
            .map(|s| SectorDefinition {
                name: s.name,
                sector_type: s.sector_type,
                radius_nm_inner: s.radius_nm_inner,
                radius_nm_outer: s.radius_nm_outer,
                altitude_ft_min: s.altitude_ft_min,
                altitude_ft_max: s.altitude_ft_max,
                controller_hint: s.controller_hint,
                hysteresis_nm: s.hysteresis_nm.unwrap_or(DEFAULT_HYSTERESIS_NM),
                behavior: s.behavior.unwrap_or_else(|| "controlled".to_string()),
                params: s
                    .drift_params
                    .or(s.descent_params)
                    .unwrap_or(Value::Object(Default::default())),
            })
            .collect();

        let (center_lat, center_lon) = raw
            .airport
            .map(|a| (a.center.lat, a.center.lon))
            .unwrap_or((defaults.center_lat, defaults.center_lon));

        let mut airspace = Self {
            sectors,
            entry_fixes: raw.entry_fixes,
            handoff_thresholds: raw.handoff_thresholds,
            spawn_zones: raw.spawn_zones,
            center_lat,
            center_lon,
        };
        airspace.sort_sectors();
        Ok(airspace)
    }

    fn sort_sectors(&mut self) {
        self.sectors
            .sort_by(|a, b| a.radius_nm_inner.total_cmp(&b.radius_nm_inner));
    }

    pub fn sectors(&self) -> &[SectorDefinition] {
        &self.sectors
    }

    pub fn sector_by_name(&self, name: &str) -> Option<&SectorDefinition> {
        self.sectors.iter().find(|s| s.name == name)
    }

    /// Innermost sector containing the given range and altitude, if any.
    pub fn sector_for(&self, distance_nm: f64, altitude_ft: f64) -> Option<&SectorDefinition> {
        self.sectors.iter().find(|s| {
            s.radius_nm_inner <= distance_nm
                && distance_nm <= s.radius_nm_outer
                && s.altitude_ft_min <= altitude_ft
                && altitude_ft <= s.altitude_ft_max
        })
    }

    /// Report a sector change for an inbound aircraft.
    ///
    /// Transitions are only reported while the distance is strictly
    /// decreasing; an aircraft drifting outward keeps its current sector.
    pub fn check_transition(
        &self,
        current_sector: &str,
        distance_nm: f64,
        altitude_ft: f64,
        prev_distance_nm: f64,
    ) -> Option<(String, String)> {
        let new_sector = self.sector_for(distance_nm, altitude_ft)?;
        if new_sector.name != current_sector && distance_nm < prev_distance_nm {
            return Some((current_sector.to_string(), new_sector.name.clone()));
        }
        None
    }

    /// True when the aircraft is at or beyond the sector's outer ring,
    /// hysteresis applied.
    pub fn at_outer_boundary(&self, sector_name: &str, distance_nm: f64) -> bool {
        match self.sector_by_name(sector_name) {
            Some(sector) => distance_nm >= sector.radius_nm_outer - sector.hysteresis_nm,
            None => false,
        }
    }

    /// Heading for bouncing an uncontrolled aircraft off the outer ring:
    /// toward the field center, spread by up to ±20°.
    pub fn reflection_heading(&self, lat: f64, lon: f64, drift: &mut Drift) -> f64 {
        let bearing = geo::bearing_between(lat, lon, self.center_lat, self.center_lon);
        geo::normalize_heading(bearing + drift.sample(REFLECTION_SPREAD_DEG))
    }

    pub fn nearest_entry_fix(&self, lat: f64, lon: f64) -> Option<&EntryFix> {
        self.entry_fixes.iter().min_by(|a, b| {
            let da = geo::flat_earth_distance_nm(lat, lon, a.lat, a.lon);
            let db = geo::flat_earth_distance_nm(lat, lon, b.lat, b.lon);
            da.total_cmp(&db)
        })
    }

    /// Spawn-zone parameters for a flight type, with arrival defaults.
    pub fn spawn_zone(&self, flight_type: &str) -> SpawnZone {
        let key = if flight_type == "ARRIVAL" {
            "arrivals"
        } else {
            "departures"
        };

        self.spawn_zones.get(key).cloned().unwrap_or(SpawnZone {
            sector: "ENTRY".to_string(),
            radius_nm_min: 40.0,
            radius_nm_max: 60.0,
            altitude_ft_min: 25000.0,
            altitude_ft_max: 35000.0,
            speed_kts_min: 280.0,
            speed_kts_max: 350.0,
            random_bearing: true,
        })
    }
}
