//! Per-tick aircraft motion under bank-angle and acceleration limits.
//!
//! The step is a pure function of its inputs plus an explicit drift PRNG, so
//! a fixed seed reproduces a run bit-for-bit.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::error;

use crate::aircraft::{Position, Targets};
use crate::airport::AirportData;
use crate::geo;

pub const DT_SECS: f64 = 1.0;

pub const ACCEL_MAX_KT_PER_S: f64 = 0.6;
pub const DECEL_MAX_KT_PER_S: f64 = 0.8;

pub const MAX_BANK_ANGLE_DEG: f64 = 25.0;
pub const GRAVITY_M_PER_S2: f64 = 9.80665;
const KT_TO_M_PER_S: f64 = 0.514444;

pub const MAX_CLIMB_FPM: f64 = 2500.0;
pub const MAX_DESCENT_FPM: f64 = 3000.0;
pub const MAX_VERTICAL_RATE_APPROACH_FPM: f64 = 1800.0;

pub const MIN_SPEED_KTS: f64 = 140.0;
pub const MAX_SPEED_KTS: f64 = 550.0;

pub const DRIFT_SPEED_KT: f64 = 5.0;
pub const DRIFT_HEADING_DEG: f64 = 2.0;

/// Inside this range the approach vertical-rate caps apply.
pub const APPROACH_DISTANCE_NM: f64 = 20.0;
/// Inside this range an uncommanded aircraft tracks the glideslope.
pub const GLIDESLOPE_CAPTURE_NM: f64 = 30.0;
pub const GLIDESLOPE_ANGLE_DEG: f64 = 3.0;

/// Bounded random drift applied to uncommanded channels.
///
/// Seeded explicitly by the caller; `Disabled` turns drift off entirely for
/// deterministic property tests.
#[derive(Debug)]
pub enum Drift {
    Disabled,
    Seeded(StdRng),
}

impl Drift {
    pub fn seeded(seed: u64) -> Self {
        Drift::Seeded(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Drift::Seeded(StdRng::from_entropy())
    }

    /// Uniform sample in [-span, +span]; always 0 when disabled.
    pub fn sample(&mut self, span: f64) -> f64 {
        match self {
            Drift::Disabled => 0.0,
            Drift::Seeded(rng) => rng.gen_range(-span..=span),
        }
    }
}

/// Output of one kinematics step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub position: Position,
    pub vertical_speed_fpm: f64,
    /// Distance from the post-update position to the field.
    pub distance_to_airport_nm: f64,
}

/// Track a speed target under the acceleration/deceleration limits.
pub fn update_speed(current_kts: f64, target_kts: f64, dt: f64) -> f64 {
    let delta = (target_kts - current_kts).clamp(-DECEL_MAX_KT_PER_S * dt, ACCEL_MAX_KT_PER_S * dt);
    (current_kts + delta).clamp(MIN_SPEED_KTS, MAX_SPEED_KTS)
}

/// Maximum turn rate at the bank limit, in degrees per second.
/// ω = g·tan(φ) / V
pub fn max_turn_rate_deg_per_s(speed_kts: f64) -> f64 {
    let speed_ms = speed_kts * KT_TO_M_PER_S;
    if speed_ms < 1.0 {
        return 0.0;
    }

    let omega_rad = (GRAVITY_M_PER_S2 * MAX_BANK_ANGLE_DEG.to_radians().tan()) / speed_ms;
    omega_rad.to_degrees()
}

/// Turn radius at the bank limit, in nautical miles.
pub fn turn_radius_nm(speed_kts: f64) -> f64 {
    let tan_bank = MAX_BANK_ANGLE_DEG.to_radians().tan();
    if tan_bank < 1e-3 {
        return 999_999.0;
    }

    let speed_ms = speed_kts * KT_TO_M_PER_S;
    let radius_m = (speed_ms * speed_ms) / (GRAVITY_M_PER_S2 * tan_bank);
    radius_m / 1852.0
}

/// Turn toward a heading target, limited by the bank-angle turn rate.
/// The sign of the shortest-path error picks the turn direction.
pub fn update_heading(current_deg: f64, target_deg: f64, speed_kts: f64, dt: f64) -> f64 {
    let error = geo::heading_difference(current_deg, target_deg);
    let max_change = max_turn_rate_deg_per_s(speed_kts) * dt;
    let delta = error.clamp(-max_change, max_change);

    geo::normalize_heading(current_deg + delta)
}

/// Track an altitude target under the vertical-rate caps.
/// Returns the new altitude and the implied vertical speed in fpm.
pub fn update_altitude(
    current_ft: f64,
    target_ft: f64,
    distance_nm: f64,
    on_approach: bool,
    dt: f64,
) -> (f64, f64) {
    let (climb_cap_fpm, descent_cap_fpm) = if on_approach || distance_nm < APPROACH_DISTANCE_NM {
        (
            MAX_VERTICAL_RATE_APPROACH_FPM,
            MAX_VERTICAL_RATE_APPROACH_FPM,
        )
    } else {
        (MAX_CLIMB_FPM, MAX_DESCENT_FPM)
    };

    let delta = (target_ft - current_ft).clamp(
        -(descent_cap_fpm / 60.0) * dt,
        (climb_cap_fpm / 60.0) * dt,
    );

    (current_ft + delta, (delta / dt) * 60.0)
}

/// Target altitude on the 3° glideslope at the given distance from the
/// threshold: h*(D) = THR + 6076·tan(3°)·D.
pub fn glideslope_altitude(distance_nm: f64, field_elevation_ft: f64) -> f64 {
    field_elevation_ft + geo::FT_PER_NM * GLIDESLOPE_ANGLE_DEG.to_radians().tan() * distance_nm
}

/// Advance one aircraft by one tick.
///
/// Each channel resolves independently: a present target is tracked under
/// its rate limit, an absent one drifts within bounds — except altitude,
/// which captures the glideslope inside 30 NM and holds outside it. The
/// distance reported in the result is measured from the post-update
/// position; control decisions inside the step use the pre-update distance.
pub fn step(
    position: &Position,
    targets: &Targets,
    airport: &AirportData,
    drift: &mut Drift,
    dt: f64,
) -> StepResult {
    let distance_before_nm = airport.distance_to_field_nm(position.lat, position.lon);
    let on_approach = distance_before_nm < APPROACH_DISTANCE_NM;

    let new_speed = match targets.speed_kts {
        Some(target) => update_speed(position.speed_kts, target, dt),
        None => (position.speed_kts + drift.sample(DRIFT_SPEED_KT))
            .clamp(MIN_SPEED_KTS, MAX_SPEED_KTS),
    };

    let new_heading = match targets.heading_deg {
        Some(target) => update_heading(position.heading, target, position.speed_kts, dt),
        None => geo::normalize_heading(position.heading + drift.sample(DRIFT_HEADING_DEG)),
    };

    let (new_altitude, vertical_speed_fpm) = match targets.altitude_ft {
        Some(target) => update_altitude(
            position.altitude_ft,
            target,
            distance_before_nm,
            on_approach,
            dt,
        ),
        None if distance_before_nm < GLIDESLOPE_CAPTURE_NM => {
            let target = glideslope_altitude(distance_before_nm, airport.elevation_ft);
            update_altitude(position.altitude_ft, target, distance_before_nm, true, dt)
        }
        None => (position.altitude_ft, 0.0),
    };

    let new_altitude = if new_altitude < 0.0 {
        error!(
            "Altitude clamped to 0 ft (was {:.1} ft) at {:.4}, {:.4}",
            new_altitude, position.lat, position.lon
        );
        0.0
    } else {
        new_altitude
    };

    let (new_lat, new_lon) =
        geo::advance_position(position.lat, position.lon, new_heading, new_speed, dt);

    StepResult {
        position: Position {
            lat: new_lat,
            lon: new_lon,
            altitude_ft: new_altitude,
            speed_kts: new_speed,
            heading: new_heading,
        },
        vertical_speed_fpm,
        distance_to_airport_nm: airport.distance_to_field_nm(new_lat, new_lon),
    }
}
