use std::time::Instant;

use crate::constants::DEBOUNCE_FLOOR;

// Counts "message received" events and converts the count into a rounded
// events/second figure once per sampling window. Passive: the UI loop owns
// the 1s cadence, this struct just does the arithmetic.
pub struct RateEstimator {
    event_count: u64,
    window_start: Instant,
    last_counted: Option<Instant>,
}

impl RateEstimator {
    pub fn new(now: Instant) -> Self {
        Self {
            event_count: 0,
            window_start: now,
            last_counted: None,
        }
    }

    /// Counts one event, unless the previous counted event was less than the
    /// debounce floor ago. Bursts faster than 60Hz collapse into one count.
    pub fn record_event(&mut self, now: Instant) {
        if let Some(prev) = self.last_counted {
            if now.saturating_duration_since(prev) < DEBOUNCE_FLOOR {
                return;
            }
        }
        self.event_count += 1;
        self.last_counted = Some(now);
    }

    /// Returns the rounded rate over the window since the last sample and
    /// starts a fresh window. A zero-length window yields 0, not a panic.
    pub fn sample(&mut self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.window_start).as_secs_f64();
        // Sub-millisecond windows produce garbage rates, treat them as empty.
        let rate = if elapsed >= 1e-3 {
            (self.event_count as f64 / elapsed).round() as u64
        } else {
            0
        };
        self.event_count = 0;
        self.window_start = now;
        rate
    }
}
