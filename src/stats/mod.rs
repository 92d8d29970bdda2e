//! Run statistics: metadata about how an exploration went.
//!
//! Everything here is observational; nothing feeds back into scheduling
//! decisions. Trackers take explicit [`Instant`]s so they can be exercised
//! in tests without sleeping.

mod ewma;
mod function;
mod measurement;
mod occupation;

pub use ewma::{ExponentiallyDecayingSum, ExponentiallyWeightedAverage};
pub use function::{InterpolatedFunctionTracker, StepFunctionTracker, TimeFunctionSummary};
pub use measurement::{MeasurementAccumulator, MeasurementSummary};
pub use occupation::OccupationTracker;

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Time constant for the instantaneous-rate and steal-time estimators.
pub const INSTANTANEOUS_TIME_CONSTANT: Duration = Duration::from_secs(1);

/// A point-in-time summary of a run's statistics, attached to every
/// supervisor outcome.
#[derive(Clone, Debug)]
pub struct RunStatistics {
    /// Wall-clock duration of the run so far.
    pub wall_clock: Duration,
    /// Known-worker count over time.
    pub worker_count: TimeFunctionSummary,
    /// Waiting-worker count over time.
    pub waiting_worker_count: TimeFunctionSummary,
    /// Available-workload count over time.
    pub available_workload_count: TimeFunctionSummary,
    /// Instantaneous workload-request rate (requests per second,
    /// exponentially decaying with a one-second time constant).
    pub workload_request_rate: f64,
    /// Exponentially-weighted moving average of steal completion time.
    pub instantaneous_steal_time: Option<Duration>,
    /// Independent measurements of steal completion times.
    pub steal_completion_times: MeasurementSummary,
    /// Per-worker wait-time samples, linearly interpolated over time.
    pub worker_wait_times: TimeFunctionSummary,
    /// Number of steal requests answered empty-handed.
    pub failed_steals: u64,
    /// Fraction of wall-clock the supervisor spent inside its handlers.
    pub supervisor_occupation: f64,
    /// Mean over workers of the fraction of wall-clock spent holding a
    /// workload.
    pub aggregate_worker_occupation: f64,
    /// Total worker-seconds spent holding workloads; the run's CPU-time
    /// contribution for checkpoint files.
    pub total_worker_busy: Duration,
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wall={:.1}s workers(avg={:.1} max={:.0}) waiting(avg={:.2}) \
             queue(avg={:.2}) requests/s={:.2} steals(n={} mean={:.1}ms failed={}) \
             occupation(supervisor={:.0}% workers={:.0}%)",
            self.wall_clock.as_secs_f64(),
            self.worker_count.average,
            self.worker_count.max,
            self.waiting_worker_count.average,
            self.available_workload_count.average,
            self.workload_request_rate,
            self.steal_completion_times.count,
            self.steal_completion_times.mean * 1000.0,
            self.failed_steals,
            self.supervisor_occupation * 100.0,
            self.aggregate_worker_occupation * 100.0,
        )
    }
}

/// The supervisor's live statistics state.
pub struct SupervisorStatistics<I> {
    started_at: Instant,
    worker_count: StepFunctionTracker,
    waiting_worker_count: StepFunctionTracker,
    available_workload_count: StepFunctionTracker,
    workload_request_rate: ExponentiallyDecayingSum,
    instantaneous_steal_time: ExponentiallyWeightedAverage,
    steal_completion_times: MeasurementAccumulator,
    worker_wait_times: InterpolatedFunctionTracker,
    failed_steals: u64,
    supervisor_busy: Duration,
    worker_occupation: HashMap<I, OccupationTracker>,
    /// Busy time of workers already retired, so removals don't lose their
    /// contribution.
    retired_worker_busy: Duration,
    retired_worker_fractions: Vec<f64>,
}

impl<I: Clone + Eq + Hash> SupervisorStatistics<I> {
    /// Starts tracking at `now`.
    pub fn new(now: Instant) -> Self {
        SupervisorStatistics {
            started_at: now,
            worker_count: StepFunctionTracker::new(0.0, now),
            waiting_worker_count: StepFunctionTracker::new(0.0, now),
            available_workload_count: StepFunctionTracker::new(0.0, now),
            workload_request_rate: ExponentiallyDecayingSum::new(INSTANTANEOUS_TIME_CONSTANT),
            instantaneous_steal_time: ExponentiallyWeightedAverage::new(
                INSTANTANEOUS_TIME_CONSTANT,
            ),
            steal_completion_times: MeasurementAccumulator::new(),
            worker_wait_times: InterpolatedFunctionTracker::new(now),
            failed_steals: 0,
            supervisor_busy: Duration::ZERO,
            worker_occupation: HashMap::new(),
            retired_worker_busy: Duration::ZERO,
            retired_worker_fractions: Vec::new(),
        }
    }

    /// Records the known-worker count after a change.
    pub fn record_worker_count(&mut self, count: usize, now: Instant) {
        self.worker_count.record(count as f64, now);
    }

    /// Records the waiting-worker count after a change.
    pub fn record_waiting_count(&mut self, count: usize, now: Instant) {
        self.waiting_worker_count.record(count as f64, now);
    }

    /// Records the available-workload count after a change.
    pub fn record_available_count(&mut self, count: usize, now: Instant) {
        self.available_workload_count.record(count as f64, now);
    }

    /// Records one workload request (a worker became idle and asked for
    /// work).
    pub fn record_workload_request(&mut self, now: Instant) {
        self.workload_request_rate.add(1.0, now);
    }

    /// Records a completed steal round trip.
    pub fn record_steal_completed(&mut self, elapsed: Duration, now: Instant) {
        self.steal_completion_times.record(elapsed.as_secs_f64());
        self.instantaneous_steal_time
            .record(elapsed.as_secs_f64(), now);
    }

    /// Records a steal request that found nothing to steal.
    pub fn record_steal_failed(&mut self) {
        self.failed_steals += 1;
    }

    /// Records how long a worker waited before receiving a workload.
    pub fn record_wait_time(&mut self, waited: Duration, now: Instant) {
        self.worker_wait_times.sample(waited.as_secs_f64(), now);
    }

    /// Accumulates time spent inside a supervisor handler.
    pub fn record_supervisor_busy(&mut self, elapsed: Duration) {
        self.supervisor_busy += elapsed;
    }

    /// Registers a worker for occupation tracking.
    pub fn worker_added(&mut self, id: I, now: Instant) {
        self.worker_occupation.insert(id, OccupationTracker::new(now));
    }

    /// Marks a worker occupied (holding a workload) or idle.
    pub fn worker_occupied(&mut self, id: &I, occupied: bool, now: Instant) {
        if let Some(tracker) = self.worker_occupation.get_mut(id) {
            tracker.set_occupied(occupied, now);
        }
    }

    /// Retires a worker's occupation record, preserving its totals.
    pub fn worker_removed(&mut self, id: &I, now: Instant) {
        if let Some(mut tracker) = self.worker_occupation.remove(id) {
            tracker.set_occupied(false, now);
            self.retired_worker_busy += tracker.occupied_time(now);
            self.retired_worker_fractions.push(tracker.fraction(now));
        }
    }

    /// Snapshots everything into a [`RunStatistics`].
    pub fn snapshot(&self, now: Instant) -> RunStatistics {
        let wall_clock = now.duration_since(self.started_at);

        let live_busy: Duration = self
            .worker_occupation
            .values()
            .map(|tracker| tracker.occupied_time(now))
            .sum();

        let fractions: Vec<f64> = self
            .retired_worker_fractions
            .iter()
            .copied()
            .chain(self.worker_occupation.values().map(|t| t.fraction(now)))
            .collect();
        let aggregate_worker_occupation = if fractions.is_empty() {
            0.0
        } else {
            fractions.iter().sum::<f64>() / fractions.len() as f64
        };

        let supervisor_occupation = if wall_clock.is_zero() {
            0.0
        } else {
            self.supervisor_busy.as_secs_f64() / wall_clock.as_secs_f64()
        };

        RunStatistics {
            wall_clock,
            worker_count: self.worker_count.summary(now),
            waiting_worker_count: self.waiting_worker_count.summary(now),
            available_workload_count: self.available_workload_count.summary(now),
            workload_request_rate: self.workload_request_rate.current(now),
            instantaneous_steal_time: self
                .instantaneous_steal_time
                .current()
                .map(Duration::from_secs_f64),
            steal_completion_times: self.steal_completion_times.summary(),
            worker_wait_times: self.worker_wait_times.summary(now),
            failed_steals: self.failed_steals,
            supervisor_occupation,
            aggregate_worker_occupation,
            total_worker_busy: self.retired_worker_busy + live_busy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_on_idle_run() {
        let start = Instant::now();
        let stats: SupervisorStatistics<usize> = SupervisorStatistics::new(start);
        let snapshot = stats.snapshot(start + Duration::from_secs(2));
        assert_eq!(snapshot.wall_clock, Duration::from_secs(2));
        assert_eq!(snapshot.steal_completion_times.count, 0);
        assert_eq!(snapshot.failed_steals, 0);
        assert_eq!(snapshot.aggregate_worker_occupation, 0.0);
    }

    #[test]
    fn test_worker_occupation_aggregates() {
        let start = Instant::now();
        let mut stats: SupervisorStatistics<usize> = SupervisorStatistics::new(start);
        stats.worker_added(1, start);
        stats.worker_added(2, start);

        // Worker 1 busy the whole window, worker 2 idle throughout.
        stats.worker_occupied(&1, true, start);
        let end = start + Duration::from_secs(10);
        let snapshot = stats.snapshot(end);

        assert!((snapshot.aggregate_worker_occupation - 0.5).abs() < 1e-9);
        assert_eq!(snapshot.total_worker_busy, Duration::from_secs(10));
    }

    #[test]
    fn test_retired_worker_keeps_contribution() {
        let start = Instant::now();
        let mut stats: SupervisorStatistics<usize> = SupervisorStatistics::new(start);
        stats.worker_added(1, start);
        stats.worker_occupied(&1, true, start);
        stats.worker_removed(&1, start + Duration::from_secs(4));

        let snapshot = stats.snapshot(start + Duration::from_secs(8));
        assert_eq!(snapshot.total_worker_busy, Duration::from_secs(4));
    }

    #[test]
    fn test_steal_measurements() {
        let start = Instant::now();
        let mut stats: SupervisorStatistics<usize> = SupervisorStatistics::new(start);
        stats.record_steal_completed(Duration::from_millis(100), start);
        stats.record_steal_completed(Duration::from_millis(300), start + Duration::from_millis(10));
        stats.record_steal_failed();

        let snapshot = stats.snapshot(start + Duration::from_secs(1));
        assert_eq!(snapshot.steal_completion_times.count, 2);
        assert_eq!(snapshot.failed_steals, 1);
        assert!((snapshot.steal_completion_times.mean - 0.2).abs() < 1e-9);
        assert!(snapshot.instantaneous_steal_time.is_some());
    }
}
