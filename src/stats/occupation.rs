//! Occupation tracking: fraction of wall-clock an entity spent busy.

use std::time::{Duration, Instant};

/// Tracks toggling between occupied and idle.
pub struct OccupationTracker {
    started_at: Instant,
    occupied_since: Option<Instant>,
    accumulated: Duration,
}

impl OccupationTracker {
    /// Starts tracking at `now`, initially idle.
    pub fn new(now: Instant) -> Self {
        OccupationTracker {
            started_at: now,
            occupied_since: None,
            accumulated: Duration::ZERO,
        }
    }

    /// Toggles the occupied state at `now`. Redundant toggles are no-ops.
    pub fn set_occupied(&mut self, occupied: bool, now: Instant) {
        match (occupied, self.occupied_since) {
            (true, None) => self.occupied_since = Some(now),
            (false, Some(since)) => {
                self.accumulated += now.saturating_duration_since(since);
                self.occupied_since = None;
            }
            _ => {}
        }
    }

    /// Total occupied time as of `now`.
    pub fn occupied_time(&self, now: Instant) -> Duration {
        match self.occupied_since {
            Some(since) => self.accumulated + now.saturating_duration_since(since),
            None => self.accumulated,
        }
    }

    /// Fraction of the tracking window spent occupied.
    pub fn fraction(&self, now: Instant) -> f64 {
        let window = now.saturating_duration_since(self.started_at);
        if window.is_zero() {
            return 0.0;
        }
        self.occupied_time(now).as_secs_f64() / window.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupation_accumulates_across_toggles() {
        let start = Instant::now();
        let mut tracker = OccupationTracker::new(start);
        tracker.set_occupied(true, start);
        tracker.set_occupied(false, start + Duration::from_secs(2));
        tracker.set_occupied(true, start + Duration::from_secs(6));

        let now = start + Duration::from_secs(8);
        assert_eq!(tracker.occupied_time(now), Duration::from_secs(4));
        assert!((tracker.fraction(now) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_redundant_toggles_are_ignored() {
        let start = Instant::now();
        let mut tracker = OccupationTracker::new(start);
        tracker.set_occupied(true, start);
        tracker.set_occupied(true, start + Duration::from_secs(1));
        tracker.set_occupied(false, start + Duration::from_secs(3));
        tracker.set_occupied(false, start + Duration::from_secs(5));
        assert_eq!(
            tracker.occupied_time(start + Duration::from_secs(5)),
            Duration::from_secs(3)
        );
    }
}
