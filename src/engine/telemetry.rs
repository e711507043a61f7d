use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::aircraft::Aircraft;
use crate::bus;

/// Snapshots buffered before each file write.
pub const FLUSH_THRESHOLD: usize = 100;

/// One aircraft-tick record in the telemetry stream.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    pub tick: u64,
    pub timestamp: String,
    pub id: i32,
    pub callsign: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: f64,
    pub speed_kts: f64,
    pub heading: f64,
    pub vertical_speed_fpm: f64,
    pub distance_to_airport_nm: Option<f64>,
    pub controller: String,
    pub phase: String,
}

impl TelemetrySnapshot {
    pub fn of(tick: u64, aircraft: &Aircraft) -> Self {
        Self {
            tick,
            timestamp: bus::utc_timestamp(),
            id: aircraft.id,
            callsign: aircraft.callsign.clone(),
            lat: aircraft.position.lat,
            lon: aircraft.position.lon,
            altitude_ft: aircraft.position.altitude_ft,
            speed_kts: aircraft.position.speed_kts,
            heading: aircraft.position.heading,
            vertical_speed_fpm: aircraft.vertical_speed_fpm,
            distance_to_airport_nm: aircraft.distance_to_airport_nm,
            controller: aircraft.controller.clone(),
            phase: aircraft.phase.as_str().to_string(),
        }
    }
}

/// Single-writer telemetry buffer, flushed to timestamped jsonl files.
pub struct TelemetryBuffer {
    dir: PathBuf,
    buffer: Vec<TelemetrySnapshot>,
}

impl TelemetryBuffer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            buffer: Vec::new(),
        }
    }

    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create telemetry directory {}", self.dir.display()))
    }

    pub fn push(&mut self, snapshot: TelemetrySnapshot) {
        self.buffer.push(snapshot);
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() >= FLUSH_THRESHOLD
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Write the buffered snapshots to a new timestamped file and clear the
    /// buffer. On a write error the snapshots stay buffered for the next
    /// attempt.
    pub fn flush(&mut self) -> Result<Option<PathBuf>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let taken = std::mem::take(&mut self.buffer);
        let path = self
            .dir
            .join(format!("engine_{}.jsonl", Utc::now().format("%Y%m%d_%H%M%S")));

        match Self::write_lines(&path, &taken) {
            Ok(()) => Ok(Some(path)),
            Err(e) => {
                self.buffer = taken;
                Err(e)
            }
        }
    }

    fn write_lines(path: &Path, snapshots: &[TelemetrySnapshot]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open telemetry file {}", path.display()))?;

        for snapshot in snapshots {
            let line = serde_json::to_string(snapshot).context("failed to encode snapshot")?;
            writeln!(file, "{line}")
                .with_context(|| format!("failed to write telemetry file {}", path.display()))?;
        }
        Ok(())
    }
}
