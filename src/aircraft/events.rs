use std::fmt;

/// Touchdown fires strictly below 50 ft AGL; an aircraft spawned at exactly
/// 50 ft has not touched down.
pub const TOUCHDOWN_ALTITUDE_AGL_FT: f64 = 50.0;
pub const HANDOFF_READY_DISTANCE_NM: f64 = 20.0;
pub const ENTRY_ZONE_DISTANCE_NM: f64 = 30.0;

/// Threshold crossings, listed in firing priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Threshold {
    Touchdown,
    HandoffReady,
    EnteredEntryZone,
}

impl Threshold {
    /// Tag latched into `last_event_fired`.
    pub fn tag(&self) -> &'static str {
        match self {
            Threshold::Touchdown => "TOUCHDOWN",
            Threshold::HandoffReady => "HANDOFF_READY",
            Threshold::EnteredEntryZone => "ENTERED_ENTRY_ZONE",
        }
    }

    /// Event-log type string.
    pub fn event_type(&self) -> &'static str {
        match self {
            Threshold::Touchdown => "aircraft.touchdown",
            Threshold::HandoffReady => "aircraft.handoff_ready",
            Threshold::EnteredEntryZone => "aircraft.entered_entry_zone",
        }
    }

    /// Sector tag recorded on the event row.
    pub fn sector(&self) -> &'static str {
        match self {
            Threshold::Touchdown => "TWR",
            Threshold::HandoffReady => "APP",
            Threshold::EnteredEntryZone => "CTR",
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Threshold tags already emitted for an aircraft.
///
/// Stored as a comma-joined string in the aircraft table; in memory it is a
/// set with stable insertion order. Tags are matched exactly, never by
/// substring, and are never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiredEvents(Vec<String>);

impl FiredEvents {
    pub fn parse(raw: &str) -> Self {
        let mut fired = FiredEvents::default();
        for tag in raw.split(',') {
            let tag = tag.trim();
            if !tag.is_empty() && !fired.0.iter().any(|t| t == tag) {
                fired.0.push(tag.to_string());
            }
        }
        fired
    }

    pub fn contains(&self, threshold: Threshold) -> bool {
        self.0.iter().any(|t| t == threshold.tag())
    }

    /// Latch a threshold. Returns false if it was already present.
    pub fn insert(&mut self, threshold: Threshold) -> bool {
        if self.contains(threshold) {
            return false;
        }
        self.0.push(threshold.tag().to_string());
        true
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wire form for the `last_event_fired` column.
    pub fn to_column(&self) -> String {
        self.0.join(",")
    }
}

/// Pick the threshold to fire this tick, if any.
///
/// At most one fires per tick, evaluated in priority order TOUCHDOWN >
/// HANDOFF_READY > ENTERED_ENTRY_ZONE. Once a threshold has latched, every
/// lower-priority threshold is suppressed for the rest of the aircraft's
/// life, so HANDOFF_READY firing first means ENTERED_ENTRY_ZONE never fires.
/// Distance checks are non-strict so an aircraft spawned exactly on a
/// boundary still fires.
pub fn next_threshold(
    fired: &FiredEvents,
    distance_nm: f64,
    altitude_agl_ft: f64,
) -> Option<Threshold> {
    if !fired.contains(Threshold::Touchdown) {
        if altitude_agl_ft < TOUCHDOWN_ALTITUDE_AGL_FT {
            return Some(Threshold::Touchdown);
        }
    } else {
        return None;
    }

    if !fired.contains(Threshold::HandoffReady) {
        if distance_nm <= HANDOFF_READY_DISTANCE_NM {
            return Some(Threshold::HandoffReady);
        }
    } else {
        return None;
    }

    if !fired.contains(Threshold::EnteredEntryZone) && distance_nm <= ENTRY_ZONE_DISTANCE_NM {
        return Some(Threshold::EnteredEntryZone);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize() {
        let fired = FiredEvents::parse("ENTERED_ENTRY_ZONE,HANDOFF_READY");
        assert!(fired.contains(Threshold::EnteredEntryZone));
        assert!(fired.contains(Threshold::HandoffReady));
        assert!(!fired.contains(Threshold::Touchdown));
        assert_eq!(fired.to_column(), "ENTERED_ENTRY_ZONE,HANDOFF_READY");
    }

    #[test]
    fn test_parse_is_tolerant() {
        let fired = FiredEvents::parse(" HANDOFF_READY , ,HANDOFF_READY,");
        assert_eq!(fired.to_column(), "HANDOFF_READY");

        assert!(FiredEvents::parse("").is_empty());
    }

    #[test]
    fn test_tags_match_exactly_not_by_substring() {
        let fired = FiredEvents::parse("ENTERED_ENTRY_ZONE_NORTH");
        assert!(!fired.contains(Threshold::EnteredEntryZone));
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut fired = FiredEvents::default();
        assert!(fired.insert(Threshold::EnteredEntryZone));
        assert!(!fired.insert(Threshold::EnteredEntryZone));
        assert_eq!(fired.to_column(), "ENTERED_ENTRY_ZONE");
    }

    #[test]
    fn test_entry_zone_fires_at_exact_boundary() {
        let fired = FiredEvents::default();
        assert_eq!(
            next_threshold(&fired, 30.0, 20000.0),
            Some(Threshold::EnteredEntryZone)
        );
    }

    #[test]
    fn test_handoff_outranks_entry_zone() {
        let fired = FiredEvents::default();
        assert_eq!(
            next_threshold(&fired, 19.4, 15000.0),
            Some(Threshold::HandoffReady)
        );
    }

    #[test]
    fn test_entry_zone_suppressed_after_handoff() {
        let mut fired = FiredEvents::default();
        fired.insert(Threshold::HandoffReady);
        assert_eq!(next_threshold(&fired, 19.0, 15000.0), None);
        assert_eq!(next_threshold(&fired, 25.0, 15000.0), None);
    }

    #[test]
    fn test_entry_then_handoff_in_order() {
        let mut fired = FiredEvents::default();
        assert_eq!(
            next_threshold(&fired, 29.5, 25000.0),
            Some(Threshold::EnteredEntryZone)
        );
        fired.insert(Threshold::EnteredEntryZone);

        assert_eq!(next_threshold(&fired, 25.0, 20000.0), None);
        assert_eq!(
            next_threshold(&fired, 20.0, 12000.0),
            Some(Threshold::HandoffReady)
        );
        fired.insert(Threshold::HandoffReady);
        assert_eq!(fired.to_column(), "ENTERED_ENTRY_ZONE,HANDOFF_READY");
    }

    #[test]
    fn test_touchdown_boundary_is_strict() {
        let fired = FiredEvents::default();
        assert_eq!(next_threshold(&fired, 0.5, 50.0), None);
        assert_eq!(
            next_threshold(&fired, 0.5, 49.9),
            Some(Threshold::Touchdown)
        );
    }

    #[test]
    fn test_touchdown_outranks_everything() {
        let fired = FiredEvents::default();
        assert_eq!(
            next_threshold(&fired, 0.5, 10.0),
            Some(Threshold::Touchdown)
        );
    }

    #[test]
    fn test_touchdown_fires_once() {
        let mut fired = FiredEvents::default();
        fired.insert(Threshold::Touchdown);
        assert_eq!(next_threshold(&fired, 0.5, 10.0), None);
    }
}
