//! Function-of-time trackers: piecewise-constant and linearly-interpolated.

use std::time::Instant;

/// Summary of a tracked function of time.
#[derive(Clone, Debug, Default)]
pub struct TimeFunctionSummary {
    /// Smallest observed value.
    pub min: f64,
    /// Largest observed value.
    pub max: f64,
    /// Time-weighted average over the whole tracking window.
    pub average: f64,
    /// Number of recorded updates or samples.
    pub updates: u64,
}

/// Tracks a piecewise-constant function: the value holds between updates.
///
/// Suits counters that jump at discrete events (worker counts, queue
/// lengths).
pub struct StepFunctionTracker {
    started_at: Instant,
    last_update: Instant,
    current: f64,
    weighted_sum: f64,
    min: f64,
    max: f64,
    updates: u64,
}

impl StepFunctionTracker {
    /// Starts tracking with an initial value.
    pub fn new(initial: f64, now: Instant) -> Self {
        StepFunctionTracker {
            started_at: now,
            last_update: now,
            current: initial,
            weighted_sum: 0.0,
            min: initial,
            max: initial,
            updates: 0,
        }
    }

    /// Records a new value taking effect at `now`.
    pub fn record(&mut self, value: f64, now: Instant) {
        let held = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.weighted_sum += self.current * held;
        self.last_update = now;
        self.current = value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.updates += 1;
    }

    /// Summarizes the function over `[start, now]`.
    pub fn summary(&self, now: Instant) -> TimeFunctionSummary {
        let total = now.saturating_duration_since(self.started_at).as_secs_f64();
        let held = now.saturating_duration_since(self.last_update).as_secs_f64();
        let weighted = self.weighted_sum + self.current * held;
        TimeFunctionSummary {
            min: self.min,
            max: self.max,
            average: if total > 0.0 { weighted / total } else { self.current },
            updates: self.updates,
        }
    }
}

/// Tracks a sampled function with linear interpolation between samples.
///
/// Suits continuously-varying quantities observed at discrete moments
/// (per-worker wait times).
pub struct InterpolatedFunctionTracker {
    started_at: Instant,
    last_sample: Option<(Instant, f64)>,
    weighted_sum: f64,
    min: f64,
    max: f64,
    samples: u64,
}

impl InterpolatedFunctionTracker {
    /// Starts tracking at `now` with no samples yet.
    pub fn new(now: Instant) -> Self {
        InterpolatedFunctionTracker {
            started_at: now,
            last_sample: None,
            weighted_sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            samples: 0,
        }
    }

    /// Records a sample observed at `now`.
    pub fn sample(&mut self, value: f64, now: Instant) {
        if let Some((last_at, last_value)) = self.last_sample {
            let span = now.saturating_duration_since(last_at).as_secs_f64();
            // Trapezoid between consecutive samples.
            self.weighted_sum += span * (last_value + value) / 2.0;
        }
        self.last_sample = Some((now, value));
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.samples += 1;
    }

    /// Summarizes the sampled function.
    pub fn summary(&self, now: Instant) -> TimeFunctionSummary {
        match self.last_sample {
            None => TimeFunctionSummary::default(),
            Some((last_at, last_value)) => {
                // The last sample extends flat to `now`.
                let tail = now.saturating_duration_since(last_at).as_secs_f64();
                let weighted = self.weighted_sum + last_value * tail;
                let total = now.saturating_duration_since(self.started_at).as_secs_f64();
                TimeFunctionSummary {
                    min: self.min,
                    max: self.max,
                    average: if total > 0.0 { weighted / total } else { last_value },
                    updates: self.samples,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_step_function_time_weighted_average() {
        let start = Instant::now();
        let mut tracker = StepFunctionTracker::new(0.0, start);
        tracker.record(4.0, start + Duration::from_secs(2));
        // 0 for 2s, then 4 for 2s → average 2 over 4s.
        let summary = tracker.summary(start + Duration::from_secs(4));
        assert!((summary.average - 2.0).abs() < 1e-9);
        assert_eq!(summary.min, 0.0);
        assert_eq!(summary.max, 4.0);
        assert_eq!(summary.updates, 1);
    }

    #[test]
    fn test_step_function_holds_last_value() {
        let start = Instant::now();
        let mut tracker = StepFunctionTracker::new(3.0, start);
        tracker.record(3.0, start + Duration::from_secs(1));
        let summary = tracker.summary(start + Duration::from_secs(10));
        assert!((summary.average - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolated_function_trapezoids() {
        let start = Instant::now();
        let mut tracker = InterpolatedFunctionTracker::new(start);
        tracker.sample(0.0, start);
        tracker.sample(2.0, start + Duration::from_secs(2));
        // Ramp from 0 to 2 over 2s → average 1 over the ramp.
        let summary = tracker.summary(start + Duration::from_secs(2));
        assert!((summary.average - 1.0).abs() < 1e-9);
        assert_eq!(summary.updates, 2);
    }

    #[test]
    fn test_interpolated_function_empty() {
        let start = Instant::now();
        let tracker = InterpolatedFunctionTracker::new(start);
        let summary = tracker.summary(start + Duration::from_secs(1));
        assert_eq!(summary.updates, 0);
        assert_eq!(summary.average, 0.0);
    }
}
