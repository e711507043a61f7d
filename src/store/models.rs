use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use super::schema::{aircraft_instances, events};
use super::StoreError;
use crate::aircraft::{
    Aircraft, AircraftTypeInfo, AirlineInfo, FiredEvents, FlightPhase, Position, Targets,
};

/// Raw `aircraft_instances` row as stored.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = aircraft_instances)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AircraftInstanceRow {
    pub id: i32,
    pub icao24: String,
    pub callsign: String,
    pub registration: Option<String>,
    pub flight_type: String,
    pub status: String,
    pub controller: String,
    pub position: Value,
    pub flight_plan: Option<Value>,
    pub target_speed_kts: Option<f64>,
    pub target_heading_deg: Option<f64>,
    pub target_altitude_ft: Option<f64>,
    pub vertical_speed_fpm: Option<f64>,
    pub phase: Option<String>,
    pub last_event_fired: Option<String>,
    pub aircraft_type_id: Option<i32>,
    pub airline_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Nullable columns joined from the reference tables.
pub type EnrichmentColumns = (
    Option<String>,
    Option<f64>,
    Option<f64>,
    Option<String>,
    Option<String>,
);

impl AircraftInstanceRow {
    /// Decode the stored row into the engine's aircraft model.
    ///
    /// JSON decoding failures are per-aircraft errors; the caller skips the
    /// row and carries on with the rest of the batch.
    pub fn decode(self, enrichment: EnrichmentColumns) -> Result<Aircraft, StoreError> {
        let id = self.id;
        let position: Position =
            serde_json::from_value(self.position).map_err(|source| StoreError::MalformedRow {
                id,
                field: "position",
                source,
            })?;

        let (icao_type, cruise_speed_kts, max_speed_kts, airline_icao, airline_name) = enrichment;

        Ok(Aircraft {
            id,
            icao24: self.icao24,
            callsign: self.callsign,
            registration: self.registration,
            flight_type: self.flight_type,
            status: self.status,
            controller: self.controller,
            position,
            flight_plan: self.flight_plan,
            targets: Targets {
                speed_kts: self.target_speed_kts,
                heading_deg: self.target_heading_deg,
                altitude_ft: self.target_altitude_ft,
            },
            vertical_speed_fpm: self.vertical_speed_fpm.unwrap_or(0.0),
            phase: self
                .phase
                .as_deref()
                .and_then(FlightPhase::parse)
                .unwrap_or(FlightPhase::Cruise),
            fired_events: FiredEvents::parse(self.last_event_fired.as_deref().unwrap_or("")),
            distance_to_airport_nm: None,
            aircraft_type: icao_type.map(|icao_type| AircraftTypeInfo {
                icao_type,
                cruise_speed_kts,
                max_speed_kts,
            }),
            airline: match (airline_icao, airline_name) {
                (Some(icao), Some(name)) => Some(AirlineInfo { icao, name }),
                _ => None,
            },
        })
    }
}

/// Partial update over the writable aircraft fields. `None` fields are left
/// untouched; `updated_at` is stamped by the store on every write.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = aircraft_instances)]
pub struct AircraftStateUpdate {
    pub position: Option<Value>,
    pub target_speed_kts: Option<f64>,
    pub target_heading_deg: Option<f64>,
    pub target_altitude_ft: Option<f64>,
    pub vertical_speed_fpm: Option<f64>,
    pub phase: Option<String>,
    pub last_event_fired: Option<String>,
    pub controller: Option<String>,
    pub status: Option<String>,
}

impl AircraftStateUpdate {
    pub fn is_empty(&self) -> bool {
        self.position.is_none()
            && self.target_speed_kts.is_none()
            && self.target_heading_deg.is_none()
            && self.target_altitude_ft.is_none()
            && self.vertical_speed_fpm.is_none()
            && self.phase.is_none()
            && self.last_event_fired.is_none()
            && self.controller.is_none()
            && self.status.is_none()
    }
}

/// One row for the append-only event log.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = events)]
pub struct NewEvent {
    pub level: String,
    pub event_type: String,
    pub message: String,
    pub details: Option<Value>,
    pub aircraft_id: Option<i32>,
    pub sector: Option<String>,
    pub frequency: Option<String>,
    pub direction: String,
}

impl NewEvent {
    /// INFO-level system event; the defaults every engine event starts from.
    pub fn new(event_type: &str, message: impl Into<String>) -> Self {
        Self {
            level: "INFO".to_string(),
            event_type: event_type.to_string(),
            message: message.into(),
            details: None,
            aircraft_id: None,
            sector: None,
            frequency: None,
            direction: "SYS".to_string(),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_aircraft(mut self, aircraft_id: i32) -> Self {
        self.aircraft_id = Some(aircraft_id);
        self
    }

    pub fn with_sector(mut self, sector: &str) -> Self {
        self.sector = Some(sector.to_string());
        self
    }

    pub fn with_direction(mut self, direction: &str) -> Self {
        self.direction = direction.to_string();
        self
    }
}
