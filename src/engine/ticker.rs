use std::time::{Duration, Instant};

use tracing::warn;

/// Target tick period for the phase-locked loop.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Tick bodies slower than this get a warning in the log.
pub const TICK_WARNING_THRESHOLD: Duration = Duration::from_millis(100);

/// Phase-locked pacing for the engine loop.
///
/// Each tick sleeps out the remainder of the period after the tick body
/// runs. An overrun never queues catch-up work; the next tick simply starts
/// immediately.
pub struct TickClock {
    period: Duration,
    tick: u64,
}

impl TickClock {
    pub fn new(period: Duration) -> Self {
        Self { period, tick: 0 }
    }

    /// Start the next tick: bump the counter and take the start instant.
    pub fn begin(&mut self) -> (u64, Instant) {
        self.tick += 1;
        (self.tick, Instant::now())
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Sleep out the rest of the period, warning on slow tick bodies.
    pub async fn pace(&self, tick: u64, started: Instant) {
        let elapsed = started.elapsed();

        if elapsed > TICK_WARNING_THRESHOLD {
            warn!(
                "Tick {tick} took {:.3}s (threshold {:.1}s)",
                elapsed.as_secs_f64(),
                TICK_WARNING_THRESHOLD.as_secs_f64()
            );
        }

        if let Some(remaining) = self.period.checked_sub(elapsed) {
            tokio::time::sleep(remaining).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_counts_ticks() {
        let mut clock = TickClock::new(TICK_INTERVAL);
        assert_eq!(clock.tick_count(), 0);
        let (first, _) = clock.begin();
        let (second, _) = clock.begin();
        assert_eq!((first, second), (1, 2));
        assert_eq!(clock.tick_count(), 2);
    }

    #[tokio::test]
    async fn test_pace_returns_immediately_after_overrun() {
        let clock = TickClock::new(Duration::from_millis(20));
        let started = Instant::now() - Duration::from_millis(50);

        let before = Instant::now();
        clock.pace(1, started).await;
        assert!(before.elapsed() < Duration::from_millis(15));
    }

    #[tokio::test]
    async fn test_pace_sleeps_out_the_period() {
        let clock = TickClock::new(Duration::from_millis(40));
        let started = Instant::now();

        clock.pace(1, started).await;
        assert!(started.elapsed() >= Duration::from_millis(35));
    }
}
