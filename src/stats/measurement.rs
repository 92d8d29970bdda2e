//! Independent-measurement accumulation (count, min, max, mean, stddev).

/// Summary of a set of independent measurements.
#[derive(Clone, Debug, Default)]
pub struct MeasurementSummary {
    /// Number of measurements.
    pub count: u64,
    /// Smallest measurement.
    pub min: f64,
    /// Largest measurement.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation.
    pub stddev: f64,
}

/// Online accumulator over independent measurements, using Welford's
/// recurrence so variance stays numerically stable over long runs.
pub struct MeasurementAccumulator {
    count: u64,
    min: f64,
    max: f64,
    mean: f64,
    sum_of_squared_deltas: f64,
}

impl MeasurementAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        MeasurementAccumulator {
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: 0.0,
            sum_of_squared_deltas: 0.0,
        }
    }

    /// Folds in one measurement.
    pub fn record(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.sum_of_squared_deltas += delta * (value - self.mean);
    }

    /// Number of measurements recorded.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Summarizes the measurements so far.
    pub fn summary(&self) -> MeasurementSummary {
        if self.count == 0 {
            return MeasurementSummary::default();
        }
        MeasurementSummary {
            count: self.count,
            min: self.min,
            max: self.max,
            mean: self.mean,
            stddev: (self.sum_of_squared_deltas / self.count as f64).sqrt(),
        }
    }
}

impl Default for MeasurementAccumulator {
    fn default() -> Self {
        MeasurementAccumulator::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary() {
        let summary = MeasurementAccumulator::new().summary();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.mean, 0.0);
    }

    #[test]
    fn test_mean_min_max() {
        let mut acc = MeasurementAccumulator::new();
        for value in [2.0, 4.0, 6.0] {
            acc.record(value);
        }
        let summary = acc.summary();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 6.0);
        assert!((summary.mean - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_stddev_matches_direct_computation() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let mut acc = MeasurementAccumulator::new();
        for value in values {
            acc.record(value);
        }
        let mean: f64 = values.iter().sum::<f64>() / values.len() as f64;
        let variance: f64 =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        let summary = acc.summary();
        assert!((summary.stddev - variance.sqrt()).abs() < 1e-12);
    }
}
