//! Takes ownership of newly spawned arrivals.
//!
//! Runs alongside the tick loop as its own task with its own bus
//! subscription. It only ever touches aircraft not yet owned by the engine,
//! so the two tasks never write the same row.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::aircraft::{FlightPhase, ENGINE_CONTROLLER, FLIGHT_TYPE_ARRIVAL};
use crate::config::BusConfig;
use crate::store::models::NewEvent;
use crate::store::StateStore;

/// Short read deadline keeps the loop responsive to shutdown.
const READ_DEADLINE: Duration = Duration::from_millis(100);

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// The fields of an `aircraft.created` notification the ingestor acts on.
#[derive(Debug, PartialEq, Eq)]
pub struct SpawnedAircraft {
    pub id: i32,
    pub callsign: String,
    pub flight_type: String,
}

/// Decode a raw bus message into a spawn notification. Anything that is not
/// a well-formed `aircraft.created` message yields `None`; undecodable
/// payloads are dropped without ceremony.
pub fn parse_created(raw: &str) -> Option<SpawnedAircraft> {
    let envelope: Envelope = serde_json::from_str(raw).ok()?;
    if envelope.kind != "aircraft.created" {
        return None;
    }

    let aircraft = envelope.data.get("aircraft")?;
    Some(SpawnedAircraft {
        id: i32::try_from(aircraft.get("id")?.as_i64()?).ok()?,
        callsign: aircraft
            .get("callsign")
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN")
            .to_string(),
        flight_type: aircraft.get("flight_type")?.as_str()?.to_string(),
    })
}

pub struct SpawnIngestor {
    store: StateStore,
    bus: BusConfig,
    running: Arc<AtomicBool>,
}

impl SpawnIngestor {
    pub fn new(store: StateStore, bus: BusConfig, running: Arc<AtomicBool>) -> Self {
        Self { store, bus, running }
    }

    /// Consume spawn notifications until shutdown.
    pub async fn run(self) {
        let client = match redis::Client::open(self.bus.url()) {
            Ok(client) => client,
            Err(e) => {
                error!("SpawnIngestor: invalid bus address ({e}); no spawns will be ingested");
                return;
            }
        };

        let mut pubsub = match client.get_async_pubsub().await {
            Ok(pubsub) => pubsub,
            Err(e) => {
                error!("SpawnIngestor: connection failed ({e}); no spawns will be ingested");
                return;
            }
        };

        if let Err(e) = pubsub.subscribe(&self.bus.channel).await {
            error!("SpawnIngestor: subscribe failed ({e}); no spawns will be ingested");
            return;
        }
        info!("SpawnIngestor: listening on '{}'", self.bus.channel);

        let mut stream = pubsub.on_message();
        while self.running.load(Ordering::SeqCst) {
            match tokio::time::timeout(READ_DEADLINE, stream.next()).await {
                Ok(Some(message)) => {
                    let payload: String = match message.get_payload() {
                        Ok(payload) => payload,
                        Err(_) => continue,
                    };
                    if let Some(spawned) = parse_created(&payload) {
                        self.ingest(spawned).await;
                    }
                }
                Ok(None) => {
                    warn!("SpawnIngestor: subscription closed");
                    break;
                }
                // Deadline passed with no message; re-check the running flag
                Err(_) => continue,
            }
        }

        info!("SpawnIngestor: stopped");
    }

    /// Assign a new arrival to the engine and record the handover.
    async fn ingest(&self, spawned: SpawnedAircraft) {
        if spawned.flight_type != FLIGHT_TYPE_ARRIVAL {
            return;
        }

        info!(
            "SpawnIngestor: new arrival {} (id {})",
            spawned.callsign, spawned.id
        );

        if let Err(e) = self.store.assign_to_engine(spawned.id).await {
            warn!(
                "SpawnIngestor: failed to assign {} to engine: {e}",
                spawned.callsign
            );
            return;
        }

        let event = NewEvent::new(
            "aircraft.engine_assigned",
            format!("ENGINE assigned control of {}", spawned.callsign),
        )
        .with_details(json!({
            "callsign": spawned.callsign,
            "controller": ENGINE_CONTROLLER,
            "phase": FlightPhase::Cruise.as_str(),
        }))
        .with_aircraft(spawned.id)
        .with_sector(ENGINE_CONTROLLER);

        if let Err(e) = self.store.create_event(event).await {
            warn!(
                "SpawnIngestor: failed to record assignment of {}: {e}",
                spawned.callsign
            );
        }
    }
}
