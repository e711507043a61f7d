use serde::{Deserialize, Serialize};

use super::{FiredEvents, FlightPhase};

/// Kinematic state stored in the `position` JSON column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: f64,
    pub speed_kts: f64,
    pub heading: f64,
}

/// Per-channel autopilot targets. A `None` channel means "no command";
/// the kinematics step applies bounded drift instead.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Targets {
    pub speed_kts: Option<f64>,
    pub heading_deg: Option<f64>,
    pub altitude_ft: Option<f64>,
}

/// Reference-table enrichment joined onto an aircraft row.
#[derive(Debug, Clone)]
pub struct AircraftTypeInfo {
    pub icao_type: String,
    pub cruise_speed_kts: Option<f64>,
    pub max_speed_kts: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct AirlineInfo {
    pub icao: String,
    pub name: String,
}

/// One decoded arrival under engine control.
#[derive(Debug, Clone)]
pub struct Aircraft {
    pub id: i32,
    pub icao24: String,
    pub callsign: String,
    pub registration: Option<String>,
    pub flight_type: String,
    pub status: String,
    pub controller: String,
    pub position: Position,
    /// Opaque to the engine; carried through untouched.
    pub flight_plan: Option<serde_json::Value>,
    pub targets: Targets,
    pub vertical_speed_fpm: f64,
    pub phase: FlightPhase,
    pub fired_events: FiredEvents,
    pub distance_to_airport_nm: Option<f64>,
    pub aircraft_type: Option<AircraftTypeInfo>,
    pub airline: Option<AirlineInfo>,
}
