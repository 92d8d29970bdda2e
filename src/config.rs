//! Settings for exploration runs.
//!
//! Pure data types with defaults; no parsing lives here.

use std::path::PathBuf;
use std::time::Duration;

/// Default interval between global progress updates.
pub const DEFAULT_PROGRESS_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

/// Default interval between checkpoint file writes.
pub const DEFAULT_CHECKPOINT_INTERVAL: Duration = Duration::from_secs(10);

/// Settings for an in-process exploration run.
#[derive(Clone, Debug)]
pub struct ExplorationSettings {
    /// Number of worker actors to spawn.
    /// Default: available parallelism.
    pub worker_count: usize,

    /// Steps a worker takes between request-queue drains.
    pub steps_between_polls: usize,

    /// How many workloads the supervisor keeps queued ahead of demand.
    pub workload_buffer_size: usize,

    /// Interval between global progress updates (which also drive
    /// checkpoint writes when checkpointing is enabled).
    pub progress_update_interval: Duration,

    /// Validate the workload partition after every supervisor operation.
    /// Expensive; meant for tests and debugging.
    pub debug_validation: bool,
}

impl Default for ExplorationSettings {
    fn default() -> Self {
        ExplorationSettings {
            worker_count: std::thread::available_parallelism()
                .map(|count| count.get())
                .unwrap_or(1),
            steps_between_polls: crate::worker::DEFAULT_STEPS_BETWEEN_POLLS,
            workload_buffer_size: crate::supervisor::DEFAULT_WORKLOAD_BUFFER_SIZE,
            progress_update_interval: DEFAULT_PROGRESS_UPDATE_INTERVAL,
            debug_validation: false,
        }
    }
}

impl ExplorationSettings {
    /// Settings with an explicit worker count.
    pub fn with_workers(worker_count: usize) -> Self {
        ExplorationSettings {
            worker_count: worker_count.max(1),
            ..ExplorationSettings::default()
        }
    }
}

/// Settings for durable checkpointing.
#[derive(Clone, Debug)]
pub struct CheckpointSettings {
    /// Where the checkpoint file lives.
    pub path: PathBuf,

    /// Minimum interval between checkpoint writes.
    pub interval: Duration,
}

impl CheckpointSettings {
    /// Checkpointing at the default interval.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        CheckpointSettings {
            path: path.into(),
            interval: DEFAULT_CHECKPOINT_INTERVAL,
        }
    }
}
