//! File-based loading of the airport and airspace reference data.

use std::fs;
use std::path::PathBuf;

use atc_engine::airport::AirportData;
use atc_engine::airspace::Airspace;

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("atc-engine-{}-{}", std::process::id(), name));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_airport_loads_runways_from_geojson() {
    let path = temp_file(
        "airport.json",
        r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "properties": {"aeroway": "runway", "name": "06L/24R", "ref": "06L/24R", "length": 2956, "width": 61},
                    "geometry": {"type": "LineString", "coordinates": [[-79.6306, 43.6839], [-79.5966, 43.6682]]}
                },
                {
                    "properties": {"aeroway": "runway", "name": "05/23", "ref": "05/23"},
                    "geometry": {"type": "LineString", "coordinates": [[-79.6496, 43.6669], [-79.6187, 43.6525]]}
                },
                {
                    "properties": {"aeroway": "apron", "name": "Cargo"},
                    "geometry": {"type": "Polygon", "coordinates": []}
                }
            ]
        }"#,
    );

    let airport = AirportData::load(Some(&path));
    assert_eq!(airport.runways.len(), 2);
    assert_eq!(airport.runways[0].ref_designator, "06L/24R");
    assert_eq!(AirportData::runway_heading("06L/24R"), Some(60.0));

    // The field reference is unchanged by runway data
    assert_eq!(airport.icao, "CYYZ");
    assert_eq!(airport.elevation_ft, 569.0);

    fs::remove_file(path).ok();
}

#[test]
fn test_airport_malformed_file_falls_back() {
    let path = temp_file("airport-bad.json", "{ not geojson");

    let airport = AirportData::load(Some(&path));
    assert!(airport.runways.is_empty());
    assert_eq!(airport.icao, "CYYZ");
    assert_eq!(airport.entry_waypoints.len(), 8);

    fs::remove_file(path).ok();
}

#[test]
fn test_airspace_loads_sectors_from_json() {
    let path = temp_file(
        "airspace.json",
        r#"{
            "airport": {"center": {"lat": 43.6777, "lon": -79.6248}},
            "sectors": [
                {
                    "name": "TERMINAL",
                    "type": "APPROACH_DEPARTURE",
                    "radius_nm_inner": 0.0,
                    "radius_nm_outer": 15.0,
                    "altitude_ft_min": 0,
                    "altitude_ft_max": 18000,
                    "controller_hint": "APPROACH_ATC",
                    "hysteresis_nm": 1.5
                },
                {
                    "name": "FEEDER",
                    "type": "ENROUTE",
                    "radius_nm_inner": 15.0,
                    "radius_nm_outer": 45.0,
                    "altitude_ft_min": 0,
                    "altitude_ft_max": 40000,
                    "controller_hint": "ENROUTE_ATC"
                }
            ],
            "entry_fixes": [{"name": "IMEBA", "lat": 44.3, "lon": -79.2}],
            "spawn_zones": {
                "arrivals": {
                    "sector": "FEEDER",
                    "radius_nm_min": 35.0,
                    "radius_nm_max": 45.0,
                    "altitude_ft_min": 20000,
                    "altitude_ft_max": 30000,
                    "speed_kts_min": 300,
                    "speed_kts_max": 340,
                    "random_bearing": true
                }
            }
        }"#,
    );

    let airspace = Airspace::load(Some(&path));
    assert_eq!(airspace.sectors().len(), 2);
    assert_eq!(airspace.sector_for(10.0, 9000.0).unwrap().name, "TERMINAL");
    assert_eq!(airspace.sector_for(30.0, 22000.0).unwrap().name, "FEEDER");
    assert_eq!(airspace.entry_fixes.len(), 1);

    let zone = airspace.spawn_zone("ARRIVAL");
    assert_eq!(zone.sector, "FEEDER");
    assert_eq!(zone.radius_nm_min, 35.0);

    fs::remove_file(path).ok();
}

#[test]
fn test_airspace_missing_file_uses_defaults() {
    let airspace = Airspace::load(Some(std::path::Path::new("/nonexistent/sectors.json")));
    assert_eq!(airspace.sectors().len(), 4);
    assert_eq!(airspace.sector_for(45.0, 30000.0).unwrap().name, "ENTRY");
}
