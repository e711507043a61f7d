//! Engine orchestrator: drives the per-aircraft update pipeline once per
//! second and couples it to the store, the bus, and the telemetry stream.

mod telemetry;
mod ticker;

pub use telemetry::{TelemetryBuffer, TelemetrySnapshot, FLUSH_THRESHOLD};
pub use ticker::{TickClock, TICK_INTERVAL, TICK_WARNING_THRESHOLD};

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::aircraft::{
    next_threshold, Aircraft, FlightPhase, Threshold, ENGINE_CONTROLLER, GROUND_CONTROLLER,
};
use crate::airport::AirportData;
use crate::airspace::Airspace;
use crate::bus::EventBus;
use crate::config::EngineConfig;
use crate::geo;
use crate::kinematics::{self, Drift};
use crate::spawn::SpawnIngestor;
use crate::store::models::{AircraftStateUpdate, NewEvent};
use crate::store::{StateStore, StoreError};

/// State snapshots go out on the bus every Nth tick.
const SNAPSHOT_EVERY_TICKS: u64 = 10;

/// Running totals, reported at shutdown and in periodic status events.
#[derive(Debug, Default, Clone, Serialize)]
pub struct EngineStats {
    pub aircraft_processed: u64,
    pub events_fired: u64,
    pub total_ticks: u64,
    pub avg_tick_duration_ms: f64,
}

impl EngineStats {
    fn record_tick(&mut self, duration: Duration) {
        self.total_ticks += 1;
        let ms = duration.as_secs_f64() * 1000.0;
        self.avg_tick_duration_ms += (ms - self.avg_tick_duration_ms) / self.total_ticks as f64;
    }
}

/// Last observed range and sector for one aircraft, for inbound-transition
/// detection.
struct TrackMemory {
    distance_nm: f64,
    sector: Option<String>,
}

/// Event row for a non-terminal threshold crossing.
fn threshold_db_event(threshold: Threshold, aircraft: &Aircraft, distance_nm: f64) -> NewEvent {
    let verb = match threshold {
        Threshold::HandoffReady => "ready for handoff",
        Threshold::EnteredEntryZone => "entered entry zone",
        Threshold::Touchdown => "touchdown",
    };

    NewEvent::new(
        threshold.event_type(),
        format!("{} {} at {:.1} NM", aircraft.callsign, verb, distance_nm),
    )
    .with_details(json!({
        "callsign": aircraft.callsign,
        "distance_nm": distance_nm,
        "position": aircraft.position,
        "event_type": threshold.tag(),
    }))
    .with_aircraft(aircraft.id)
    .with_sector(threshold.sector())
}

pub struct Engine {
    config: EngineConfig,
    store: StateStore,
    bus: EventBus,
    airport: AirportData,
    airspace: Airspace,
    drift: Drift,
    telemetry: TelemetryBuffer,
    running: Arc<AtomicBool>,
    clock: TickClock,
    tracks: HashMap<i32, TrackMemory>,
    stats: EngineStats,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: EngineConfig,
        store: StateStore,
        bus: EventBus,
        airport: AirportData,
        airspace: Airspace,
        drift: Drift,
        running: Arc<AtomicBool>,
    ) -> Self {
        let telemetry = TelemetryBuffer::new(&config.telemetry_dir);
        Self {
            config,
            store,
            bus,
            airport,
            airspace,
            drift,
            telemetry,
            running,
            clock: TickClock::new(TICK_INTERVAL),
            tracks: HashMap::new(),
            stats: EngineStats::default(),
        }
    }

    /// Run the phase-locked tick loop until shutdown or the duration bound.
    pub async fn run(mut self, duration_seconds: u64) -> Result<()> {
        self.telemetry.ensure_dir()?;

        info!(
            "Engine starting: airport {} ({} entry waypoints), tick {:?}",
            self.airport.icao,
            self.airport.entry_waypoints.len(),
            TICK_INTERVAL
        );
        if duration_seconds > 0 {
            info!("Running for {duration_seconds}s");
        } else {
            info!("Running until interrupted");
        }

        self.bus.publish_engine_started().await;
        self.bus
            .publish_system_status(json!({ "state": "running" }))
            .await;

        let ingestor = SpawnIngestor::new(
            self.store.clone(),
            self.config.bus.clone(),
            self.running.clone(),
        );
        let ingestor_handle = tokio::spawn(ingestor.run());

        let started = Instant::now();
        while self.running.load(Ordering::SeqCst) {
            let (tick, tick_started) = self.clock.begin();

            if let Err(e) = self.tick(tick).await {
                error!("Tick {tick} failed: {e}");
            }
            self.stats.record_tick(tick_started.elapsed());

            if duration_seconds > 0
                && started.elapsed() >= Duration::from_secs(duration_seconds)
            {
                info!("Reached duration limit ({duration_seconds}s)");
                break;
            }

            // Re-check the flag before committing to a sleep
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            self.clock.pace(tick, tick_started).await;
        }

        self.running.store(false, Ordering::SeqCst);
        if let Err(e) = ingestor_handle.await {
            warn!("Spawn ingestor task failed: {e}");
        }
        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&mut self) {
        match self.telemetry.flush() {
            Ok(Some(path)) => info!("Telemetry flushed to {}", path.display()),
            Ok(None) => {}
            Err(e) => warn!("Failed to flush telemetry: {e}"),
        }

        let stats = serde_json::to_value(&self.stats).unwrap_or(serde_json::Value::Null);
        self.bus.publish_engine_stopped(stats).await;
        self.bus
            .publish_system_status(json!({ "state": "stopped" }))
            .await;

        info!(
            "Engine stopped: {} ticks, {} aircraft updates, {} events, {:.2}ms mean tick",
            self.stats.total_ticks,
            self.stats.aircraft_processed,
            self.stats.events_fired,
            self.stats.avg_tick_duration_ms
        );
    }

    /// One engine tick: fetch the roster, advance every aircraft in order,
    /// then emit the periodic snapshot.
    async fn tick(&mut self, tick: u64) -> Result<(), StoreError> {
        let roster = self.store.get_active_arrivals(ENGINE_CONTROLLER).await?;
        if roster.is_empty() {
            return Ok(());
        }

        let roster_size = roster.len();
        let mut processed = Vec::with_capacity(roster_size);

        for aircraft in roster {
            let id = aircraft.id;
            let callsign = aircraft.callsign.clone();
            match self.process_aircraft(aircraft, tick).await {
                Ok(Some(updated)) => processed.push(updated),
                Ok(None) => {} // landed, out of the roster for good
                Err(e) => warn!("Error processing {callsign} (id {id}): {e}"),
            }
        }
        self.stats.aircraft_processed += roster_size as u64;

        if tick % SNAPSHOT_EVERY_TICKS == 0 {
            self.bus.publish_state_snapshot(tick, &processed).await;

            let status = NewEvent::new(
                "engine.status",
                format!("Engine tick {tick}: processing {roster_size} aircraft"),
            )
            .with_details(json!({
                "tick_count": tick,
                "aircraft_count": roster_size,
                "stats": &self.stats,
            }))
            .with_sector(ENGINE_CONTROLLER);

            if let Err(e) = self.store.create_event(status).await {
                warn!("Failed to record engine status: {e}");
            }
        }

        Ok(())
    }

    /// Advance one aircraft: kinematics, phase, threshold machine,
    /// persistence, publishes, telemetry. Returns `None` once it has landed.
    ///
    /// A threshold only counts as fired after its tag is persisted; if the
    /// state write fails the whole update is dropped and next tick retries
    /// from the stored state.
    async fn process_aircraft(
        &mut self,
        mut aircraft: Aircraft,
        tick: u64,
    ) -> Result<Option<Aircraft>, StoreError> {
        let result = kinematics::step(
            &aircraft.position,
            &aircraft.targets,
            &self.airport,
            &mut self.drift,
            kinematics::DT_SECS,
        );

        let distance_nm = result.distance_to_airport_nm;
        let altitude_agl = geo::altitude_agl(result.position.altitude_ft, self.airport.elevation_ft);

        aircraft.position = result.position;
        aircraft.vertical_speed_fpm = result.vertical_speed_fpm;
        aircraft.distance_to_airport_nm = Some(distance_nm);
        aircraft.phase = FlightPhase::classify(distance_nm, altitude_agl);

        let threshold = next_threshold(&aircraft.fired_events, distance_nm, altitude_agl);

        if threshold == Some(Threshold::Touchdown) {
            info!(
                "TOUCHDOWN: {} at {:.0} ft AGL",
                aircraft.callsign, altitude_agl
            );

            self.store.mark_touchdown(aircraft.id).await?;
            aircraft.fired_events.insert(Threshold::Touchdown);
            aircraft.phase = FlightPhase::Touchdown;
            aircraft.controller = GROUND_CONTROLLER.to_string();
            aircraft.status = "landed".to_string();

            let event = NewEvent::new(
                "aircraft.touchdown",
                format!(
                    "{} touchdown at {:.0} ft AGL",
                    aircraft.callsign, altitude_agl
                ),
            )
            .with_details(json!({
                "callsign": aircraft.callsign,
                "altitude_agl": altitude_agl,
                "position": aircraft.position,
                "event_type": Threshold::Touchdown.tag(),
            }))
            .with_aircraft(aircraft.id)
            .with_sector(Threshold::Touchdown.sector());

            if let Err(e) = self.store.create_event(event).await {
                warn!("Failed to record touchdown of {}: {e}", aircraft.callsign);
            }

            self.bus
                .publish_threshold_event(Threshold::Touchdown, &aircraft)
                .await;
            self.stats.events_fired += 1;
            self.tracks.remove(&aircraft.id);

            return Ok(None);
        }

        if let Some(threshold) = threshold {
            aircraft.fired_events.insert(threshold);
        }

        let position_json = serde_json::to_value(&aircraft.position).map_err(|source| {
            StoreError::MalformedRow {
                id: aircraft.id,
                field: "position",
                source,
            }
        })?;

        self.store
            .update_aircraft_state(
                aircraft.id,
                AircraftStateUpdate {
                    position: Some(position_json),
                    vertical_speed_fpm: Some(aircraft.vertical_speed_fpm),
                    phase: Some(aircraft.phase.as_str().to_string()),
                    last_event_fired: threshold.map(|_| aircraft.fired_events.to_column()),
                    ..Default::default()
                },
            )
            .await?;

        if let Some(threshold) = threshold {
            info!(
                "{}: {} at {:.1} NM",
                threshold.tag(),
                aircraft.callsign,
                distance_nm
            );

            let event = threshold_db_event(threshold, &aircraft, distance_nm);
            if let Err(e) = self.store.create_event(event).await {
                warn!(
                    "Failed to record {} for {}: {e}",
                    threshold.tag(),
                    aircraft.callsign
                );
            }

            self.bus.publish_threshold_event(threshold, &aircraft).await;
            self.stats.events_fired += 1;
        }

        self.bus.publish_position_updated(&aircraft).await;
        self.observe_sector(&aircraft, distance_nm).await;

        self.telemetry.push(TelemetrySnapshot::of(tick, &aircraft));
        if self.telemetry.is_full() {
            match self.telemetry.flush() {
                Ok(Some(path)) => info!("Telemetry flushed to {}", path.display()),
                Ok(None) => {}
                Err(e) => warn!("Failed to flush telemetry: {e}"),
            }
        }

        Ok(Some(aircraft))
    }

    /// Track the aircraft's sector and report inbound handoff boundaries.
    async fn observe_sector(&mut self, aircraft: &Aircraft, distance_nm: f64) {
        let sector = self
            .airspace
            .sector_for(distance_nm, aircraft.position.altitude_ft)
            .map(|s| s.name.clone());

        let prev = self.tracks.insert(
            aircraft.id,
            TrackMemory {
                distance_nm,
                sector: sector.clone(),
            },
        );

        let Some(TrackMemory {
            distance_nm: prev_distance,
            sector: Some(prev_sector),
        }) = prev
        else {
            return;
        };

        if let Some((from, to)) = self.airspace.check_transition(
            &prev_sector,
            distance_nm,
            aircraft.position.altitude_ft,
            prev_distance,
        ) {
            info!("{} crossed from {from} into {to}", aircraft.callsign);

            let event = NewEvent::new(
                "aircraft.sector_transition",
                format!("{} entered sector {to}", aircraft.callsign),
            )
            .with_details(json!({
                "from": from,
                "to": to,
                "distance_nm": distance_nm,
            }))
            .with_aircraft(aircraft.id)
            .with_sector(&to)
            .with_direction("XFER");

            if let Err(e) = self.store.create_event(event).await {
                warn!("Failed to record sector transition: {e}");
            }
        }
    }
}
