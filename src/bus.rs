//! Pub/sub transport for engine events.
//!
//! Delivery is best-effort by contract: the database is the authoritative
//! record, so a lost message is logged and forgotten. Publish failures are
//! never retried and never block the tick loop.

use chrono::{SecondsFormat, Utc};
use redis::AsyncCommands;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::aircraft::{Aircraft, Threshold};
use crate::config::BusConfig;

/// UTC timestamp in the wire format every message carries (ISO8601, Z).
pub fn utc_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Wrap a payload in the shared message envelope.
pub fn envelope(event_type: &str, data: Value) -> Value {
    json!({
        "type": event_type,
        "timestamp": utc_timestamp(),
        "data": data,
    })
}

pub fn position_updated_payload(aircraft: &Aircraft) -> Value {
    json!({
        "aircraft": {
            "id": aircraft.id,
            "icao24": aircraft.icao24,
            "callsign": aircraft.callsign,
            "registration": aircraft.registration,
            "position": aircraft.position,
            "controller": aircraft.controller,
            "phase": aircraft.phase.as_str(),
            "vertical_speed_fpm": aircraft.vertical_speed_fpm,
            "distance_to_airport_nm": aircraft.distance_to_airport_nm,
        },
        "position": aircraft.position,
    })
}

pub fn threshold_event_payload(threshold: Threshold, aircraft: &Aircraft) -> Value {
    json!({
        "event_type": threshold.tag(),
        "aircraft": {
            "id": aircraft.id,
            "icao24": aircraft.icao24,
            "callsign": aircraft.callsign,
            "lat": aircraft.position.lat,
            "lon": aircraft.position.lon,
            "altitude_ft": aircraft.position.altitude_ft,
            "speed_kts": aircraft.position.speed_kts,
            "heading": aircraft.position.heading,
            "controller": aircraft.controller,
            "phase": aircraft.phase.as_str(),
            "distance_to_airport_nm": aircraft.distance_to_airport_nm,
        },
    })
}

pub fn state_snapshot_payload(tick: u64, roster: &[Aircraft]) -> Value {
    json!({
        "tick": tick,
        "timestamp": utc_timestamp(),
        "aircraft_count": roster.len(),
        "aircraft": roster
            .iter()
            .map(|ac| {
                json!({
                    "id": ac.id,
                    "callsign": ac.callsign,
                    "position": ac.position,
                    "controller": ac.controller,
                    "phase": ac.phase.as_str(),
                    "distance_to_airport_nm": ac.distance_to_airport_nm,
                })
            })
            .collect::<Vec<_>>(),
    })
}

/// Publisher over the single shared channel.
pub struct EventBus {
    connection: Option<redis::aio::MultiplexedConnection>,
    channel: String,
}

impl EventBus {
    /// Connect to the bus. A failed connection leaves the publisher
    /// disabled rather than failing startup; events simply do not go out.
    pub async fn connect(config: &BusConfig) -> Self {
        let channel = config.channel.clone();

        let connection = match redis::Client::open(config.url()) {
            Ok(client) => match client.get_multiplexed_tokio_connection().await {
                Ok(connection) => {
                    info!("EventBus: connected, publishing on '{channel}'");
                    Some(connection)
                }
                Err(e) => {
                    warn!("EventBus: connection failed ({e}); events will not be published");
                    None
                }
            },
            Err(e) => {
                warn!("EventBus: invalid bus address ({e}); events will not be published");
                None
            }
        };

        Self { connection, channel }
    }

    #[cfg(test)]
    pub fn disabled() -> Self {
        Self {
            connection: None,
            channel: "atc:events".to_string(),
        }
    }

    pub async fn publish(&mut self, event_type: &str, data: Value) {
        let Some(connection) = self.connection.as_mut() else {
            return;
        };

        let message = envelope(event_type, data).to_string();
        if let Err(e) = connection
            .publish::<_, _, i64>(&self.channel, message)
            .await
        {
            warn!("EventBus: failed to publish {event_type}: {e}");
        }
    }

    pub async fn publish_position_updated(&mut self, aircraft: &Aircraft) {
        self.publish("aircraft.position_updated", position_updated_payload(aircraft))
            .await;
    }

    pub async fn publish_threshold_event(&mut self, threshold: Threshold, aircraft: &Aircraft) {
        self.publish(
            "aircraft.threshold_event",
            threshold_event_payload(threshold, aircraft),
        )
        .await;
    }

    pub async fn publish_state_snapshot(&mut self, tick: u64, roster: &[Aircraft]) {
        self.publish("engine.state_snapshot", state_snapshot_payload(tick, roster))
            .await;
    }

    pub async fn publish_system_status(&mut self, status: Value) {
        self.publish("system.status", json!({ "status": status })).await;
    }

    pub async fn publish_engine_started(&mut self) {
        self.publish("atc_brain:started", json!({})).await;
    }

    pub async fn publish_engine_stopped(&mut self, stats: Value) {
        self.publish("atc_brain:stopped", json!({ "stats": stats })).await;
    }
}
