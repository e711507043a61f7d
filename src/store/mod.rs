//! Typed view over the aircraft table and the append-only event log.
//!
//! Queries run on an r2d2 connection pool; callers treat the database as the
//! authoritative copy of all aircraft state.

pub mod models;
pub mod schema;

use anyhow::{Context, Result};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use thiserror::Error;
use tracing::{info, warn};

use crate::aircraft::{Aircraft, FlightPhase, ENGINE_CONTROLLER, FLIGHT_TYPE_ARRIVAL, GROUND_CONTROLLER};
use crate::config::DbConfig;
use models::{AircraftInstanceRow, AircraftStateUpdate, EnrichmentColumns, NewEvent};
use schema::{aircraft_instances, aircraft_types, airlines, events};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

/// Roster fetches are capped; a terminal area never holds more than this.
pub const MAX_ACTIVE_AIRCRAFT: i64 = 100;

const POOL_MIN_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("aircraft {id}: malformed {field} column: {source}")]
    MalformedRow {
        id: i32,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone)]
pub struct StateStore {
    pool: PgPool,
}

impl StateStore {
    /// Build the connection pool. Failure here is fatal: the engine cannot
    /// run without its authoritative store.
    pub fn connect(config: &DbConfig) -> Result<Self> {
        let manager = ConnectionManager::<PgConnection>::new(config.url());
        let pool = Pool::builder()
            .min_idle(Some(POOL_MIN_CONNECTIONS))
            .max_size(config.pool_size)
            .build(manager)
            .with_context(|| {
                format!(
                    "failed to open database pool to {}:{}/{}",
                    config.host, config.port, config.name
                )
            })?;

        info!(
            "StateStore: database pool ready ({}..{} connections)",
            POOL_MIN_CONNECTIONS, config.pool_size
        );
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PgPooledConnection, StoreError> {
        Ok(self.pool.get()?)
    }

    /// Active arrivals owned by the given controller, most recent first.
    ///
    /// Rows are enriched from the aircraft-type and airline reference
    /// tables. A row whose JSON columns fail to decode is logged and
    /// skipped; one bad aircraft never sinks the batch.
    pub async fn get_active_arrivals(&self, controller: &str) -> Result<Vec<Aircraft>, StoreError> {
        let mut conn = self.conn()?;

        let rows: Vec<(AircraftInstanceRow, EnrichmentColumns)> = aircraft_instances::table
            .left_join(aircraft_types::table)
            .left_join(airlines::table)
            .filter(aircraft_instances::status.eq("active"))
            .filter(aircraft_instances::controller.eq(controller))
            .filter(aircraft_instances::flight_type.eq(FLIGHT_TYPE_ARRIVAL))
            .order(aircraft_instances::created_at.desc())
            .limit(MAX_ACTIVE_AIRCRAFT)
            .select((
                AircraftInstanceRow::as_select(),
                (
                    aircraft_types::icao_type.nullable(),
                    aircraft_types::cruise_speed_kts.nullable(),
                    aircraft_types::max_speed_kts.nullable(),
                    airlines::icao.nullable(),
                    airlines::name.nullable(),
                ),
            ))
            .load(&mut conn)?;

        let mut aircraft = Vec::with_capacity(rows.len());
        for (row, enrichment) in rows {
            match row.decode(enrichment) {
                Ok(decoded) => aircraft.push(decoded),
                Err(e) => warn!("Skipping undecodable aircraft row: {e}"),
            }
        }
        Ok(aircraft)
    }

    /// Partial update of the writable aircraft fields. An empty update is a
    /// no-op success; any write stamps `updated_at`.
    pub async fn update_aircraft_state(
        &self,
        aircraft_id: i32,
        update: AircraftStateUpdate,
    ) -> Result<(), StoreError> {
        if update.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn()?;
        diesel::update(aircraft_instances::table.find(aircraft_id))
            .set((update, aircraft_instances::updated_at.eq(diesel::dsl::now)))
            .execute(&mut conn)?;
        Ok(())
    }

    /// Land an aircraft: it leaves the active roster for good.
    pub async fn mark_touchdown(&self, aircraft_id: i32) -> Result<(), StoreError> {
        self.update_aircraft_state(
            aircraft_id,
            AircraftStateUpdate {
                status: Some("landed".to_string()),
                controller: Some(GROUND_CONTROLLER.to_string()),
                phase: Some(FlightPhase::Touchdown.as_str().to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Take ownership of a freshly spawned arrival.
    pub async fn assign_to_engine(&self, aircraft_id: i32) -> Result<(), StoreError> {
        self.update_aircraft_state(
            aircraft_id,
            AircraftStateUpdate {
                controller: Some(ENGINE_CONTROLLER.to_string()),
                phase: Some(FlightPhase::Cruise.as_str().to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Transfer control to another controller tag.
    pub async fn handoff_to(&self, aircraft_id: i32, controller: &str) -> Result<(), StoreError> {
        self.update_aircraft_state(
            aircraft_id,
            AircraftStateUpdate {
                controller: Some(controller.to_string()),
                ..Default::default()
            },
        )
        .await
    }

    /// Append one row to the event log.
    pub async fn create_event(&self, event: NewEvent) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        diesel::insert_into(events::table)
            .values(&event)
            .execute(&mut conn)?;
        Ok(())
    }
}
