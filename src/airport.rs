use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::geo;

const CYYZ_LAT: f64 = 43.6777;
const CYYZ_LON: f64 = -79.6248;
const CYYZ_ELEVATION_FT: f64 = 569.0;

const ENTRY_RING_RADIUS_NM: f64 = 30.0;
const ENTRY_RING_COUNT: usize = 8;

/// One runway parsed from the airport GeoJSON.
#[derive(Debug, Clone)]
pub struct Runway {
    pub name: String,
    pub ref_designator: String,
    pub length: Option<Value>,
    pub width: Option<Value>,
    /// Raw geometry coordinates, passed through untouched.
    pub coordinates: Value,
}

/// Named point on the arrival ring around the field.
#[derive(Debug, Clone)]
pub struct EntryWaypoint {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub bearing_deg: f64,
    pub distance_nm: f64,
}

/// Static airport reference data, immutable after load.
#[derive(Debug, Clone)]
pub struct AirportData {
    pub icao: String,
    pub lat: f64,
    pub lon: f64,
    pub elevation_ft: f64,
    pub runways: Vec<Runway>,
    pub entry_waypoints: Vec<EntryWaypoint>,
}

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(default)]
    coordinates: Value,
}

impl AirportData {
    /// Default CYYZ reference with a generated entry ring.
    pub fn cyyz() -> Self {
        let mut airport = Self {
            icao: "CYYZ".to_string(),
            lat: CYYZ_LAT,
            lon: CYYZ_LON,
            elevation_ft: CYYZ_ELEVATION_FT,
            runways: Vec::new(),
            entry_waypoints: Vec::new(),
        };
        airport.generate_entry_waypoints(ENTRY_RING_RADIUS_NM, ENTRY_RING_COUNT);
        airport
    }

    /// Load airport data, falling back to defaults when the file is missing
    /// or malformed.
    pub fn load(path: Option<&Path>) -> Self {
        let mut airport = Self::cyyz();

        let Some(path) = path else {
            return airport;
        };

        match fs::read_to_string(path) {
            Ok(contents) => match airport.apply_geojson(&contents) {
                Ok(count) => info!("Loaded {} runways from {}", count, path.display()),
                Err(e) => warn!(
                    "Error parsing airport data {}: {e}; using default {} center",
                    path.display(),
                    airport.icao
                ),
            },
            Err(e) => warn!(
                "Airport data file {} unreadable: {e}; using default {} center",
                path.display(),
                airport.icao
            ),
        }

        airport
    }

    /// Parse a GeoJSON FeatureCollection and collect its runway features.
    /// Returns the number of runways found.
    pub fn apply_geojson(&mut self, contents: &str) -> Result<usize> {
        let collection: FeatureCollection =
            serde_json::from_str(contents).context("invalid GeoJSON document")?;
        if collection.kind != "FeatureCollection" {
            anyhow::bail!("expected FeatureCollection, found {}", collection.kind);
        }

        for feature in collection.features {
            if feature.properties.get("aeroway").and_then(Value::as_str) != Some("runway") {
                continue;
            }

            let props = &feature.properties;
            self.runways.push(Runway {
                name: props
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
                    .to_string(),
                ref_designator: props
                    .get("ref")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                length: props.get("length").cloned(),
                width: props.get("width").cloned(),
                coordinates: feature
                    .geometry
                    .map(|g| g.coordinates)
                    .unwrap_or(Value::Null),
            });
        }

        Ok(self.runways.len())
    }

    /// Generate compass-named entry waypoints in a ring around the field.
    pub fn generate_entry_waypoints(&mut self, radius_nm: f64, count: usize) {
        const DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

        self.entry_waypoints = (0..count)
            .map(|i| {
                let bearing_deg = (360.0 / count as f64) * i as f64;
                let bearing_rad = bearing_deg.to_radians();

                let delta_lat = (radius_nm / geo::NM_PER_DEGREE_LAT) * bearing_rad.cos();
                let delta_lon = (radius_nm
                    / (geo::NM_PER_DEGREE_LAT * self.lat.to_radians().cos()))
                    * bearing_rad.sin();

                EntryWaypoint {
                    name: format!(
                        "{}_{}{}",
                        self.icao,
                        DIRECTIONS[i % DIRECTIONS.len()],
                        radius_nm as i64
                    ),
                    lat: self.lat + delta_lat,
                    lon: self.lon + delta_lon,
                    bearing_deg,
                    distance_nm: radius_nm,
                }
            })
            .collect();
    }

    pub fn nearest_entry_waypoint(&self, lat: f64, lon: f64) -> Option<&EntryWaypoint> {
        self.entry_waypoints.iter().min_by(|a, b| {
            let da = geo::flat_earth_distance_nm(lat, lon, a.lat, a.lon);
            let db = geo::flat_earth_distance_nm(lat, lon, b.lat, b.lon);
            da.total_cmp(&db)
        })
    }

    pub fn distance_to_field_nm(&self, lat: f64, lon: f64) -> f64 {
        geo::flat_earth_distance_nm(lat, lon, self.lat, self.lon)
    }

    /// Magnetic heading implied by a runway designator ("05L/23R" -> 50).
    pub fn runway_heading(ref_designator: &str) -> Option<f64> {
        let pattern = Regex::new(r"^(\d{1,2})").ok()?;
        let number: f64 = pattern
            .captures(ref_designator)?
            .get(1)?
            .as_str()
            .parse()
            .ok()?;
        Some(number * 10.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOJSON: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "properties": {"aeroway": "runway", "name": "05/23", "ref": "05/23", "length": 3389},
                "geometry": {"type": "LineString", "coordinates": [[-79.63, 43.67], [-79.60, 43.69]]}
            },
            {
                "properties": {"aeroway": "taxiway", "name": "B"},
                "geometry": {"type": "LineString", "coordinates": []}
            }
        ]
    }"#;

    #[test]
    fn test_apply_geojson_keeps_only_runways() {
        let mut airport = AirportData::cyyz();
        let count = airport.apply_geojson(GEOJSON).unwrap();
        assert_eq!(count, 1);
        assert_eq!(airport.runways[0].ref_designator, "05/23");
        assert_eq!(airport.runways[0].length, Some(serde_json::json!(3389)));
    }

    #[test]
    fn test_apply_geojson_rejects_non_collection() {
        let mut airport = AirportData::cyyz();
        assert!(airport.apply_geojson(r#"{"type": "Feature"}"#).is_err());
        assert!(airport.apply_geojson("not json").is_err());
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let airport = AirportData::load(Some(Path::new("/nonexistent/airport.json")));
        assert_eq!(airport.icao, "CYYZ");
        assert!((airport.lat - 43.6777).abs() < 1e-9);
        assert_eq!(airport.elevation_ft, 569.0);
    }

    #[test]
    fn test_entry_ring_geometry() {
        let airport = AirportData::cyyz();
        assert_eq!(airport.entry_waypoints.len(), 8);
        assert_eq!(airport.entry_waypoints[0].name, "CYYZ_N30");

        for wp in &airport.entry_waypoints {
            let d = airport.distance_to_field_nm(wp.lat, wp.lon);
            assert!((d - 30.0).abs() < 0.5, "{} at {} NM", wp.name, d);
        }
    }

    #[test]
    fn test_nearest_entry_waypoint() {
        let airport = AirportData::cyyz();
        // A point due north of the field should resolve to the north waypoint
        let nearest = airport
            .nearest_entry_waypoint(airport.lat + 0.6, airport.lon)
            .unwrap();
        assert_eq!(nearest.name, "CYYZ_N30");
    }

    #[test]
    fn test_runway_heading() {
        assert_eq!(AirportData::runway_heading("05L"), Some(50.0));
        assert_eq!(AirportData::runway_heading("23R"), Some(230.0));
        assert_eq!(AirportData::runway_heading("5"), Some(50.0));
        assert_eq!(AirportData::runway_heading("west"), None);
    }
}
