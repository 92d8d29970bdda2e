//! Exponentially-decaying estimators for "instantaneous" quantities.

use std::time::{Duration, Instant};

/// A sum whose contributions decay exponentially with age.
///
/// Adding `1.0` per event makes [`current`](Self::current) an
/// instantaneous event rate in events per time constant; dividing by the
/// time constant (done here, with a one-second constant the division is
/// the identity) yields events per second.
pub struct ExponentiallyDecayingSum {
    time_constant: Duration,
    sum: f64,
    last_update: Option<Instant>,
}

impl ExponentiallyDecayingSum {
    /// Creates a decaying sum with the given time constant.
    pub fn new(time_constant: Duration) -> Self {
        ExponentiallyDecayingSum {
            time_constant,
            sum: 0.0,
            last_update: None,
        }
    }

    fn decay_to(&mut self, now: Instant) {
        if let Some(last) = self.last_update {
            let age = now.saturating_duration_since(last).as_secs_f64();
            self.sum *= (-age / self.time_constant.as_secs_f64()).exp();
        }
        self.last_update = Some(now);
    }

    /// Adds a contribution at `now`.
    pub fn add(&mut self, amount: f64, now: Instant) {
        self.decay_to(now);
        self.sum += amount;
    }

    /// The decayed sum as of `now`, divided by the time constant.
    pub fn current(&self, now: Instant) -> f64 {
        let decayed = match self.last_update {
            None => 0.0,
            Some(last) => {
                let age = now.saturating_duration_since(last).as_secs_f64();
                self.sum * (-age / self.time_constant.as_secs_f64()).exp()
            }
        };
        decayed / self.time_constant.as_secs_f64()
    }
}

/// An exponentially-weighted moving average over irregularly-timed samples.
///
/// The weight of the previous average decays with the time elapsed since
/// the last sample, so bursts converge quickly and stale values fade.
pub struct ExponentiallyWeightedAverage {
    time_constant: Duration,
    average: Option<f64>,
    last_update: Option<Instant>,
}

impl ExponentiallyWeightedAverage {
    /// Creates an EWMA with the given time constant.
    pub fn new(time_constant: Duration) -> Self {
        ExponentiallyWeightedAverage {
            time_constant,
            average: None,
            last_update: None,
        }
    }

    /// Folds in a sample observed at `now`.
    pub fn record(&mut self, value: f64, now: Instant) {
        match (self.average, self.last_update) {
            (Some(average), Some(last)) => {
                let age = now.saturating_duration_since(last).as_secs_f64();
                let alpha = 1.0 - (-age / self.time_constant.as_secs_f64()).exp();
                self.average = Some(average + alpha * (value - average));
            }
            _ => self.average = Some(value),
        }
        self.last_update = Some(now);
    }

    /// The current average, if any sample has been recorded.
    pub fn current(&self) -> Option<f64> {
        self.average
    }
}
