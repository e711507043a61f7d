mod events;
mod phase;
mod state;

pub use events::{next_threshold, FiredEvents, Threshold};
pub use events::{ENTRY_ZONE_DISTANCE_NM, HANDOFF_READY_DISTANCE_NM, TOUCHDOWN_ALTITUDE_AGL_FT};
pub use phase::FlightPhase;
pub use state::{Aircraft, AircraftTypeInfo, AirlineInfo, Position, Targets};

/// Controller tag for aircraft owned by the kinematics engine.
pub const ENGINE_CONTROLLER: &str = "ENGINE";

/// Controller tag applied when an aircraft touches down.
pub const GROUND_CONTROLLER: &str = "GROUND";

pub const FLIGHT_TYPE_ARRIVAL: &str = "ARRIVAL";
