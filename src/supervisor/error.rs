//! Supervisor error taxonomy.

use crate::checkpoint::{Checkpoint, CheckpointError};
use std::fmt::Debug;
use thiserror::Error;

/// Contract violations and internal inconsistencies.
///
/// All of these are fatal to the run: they mean the caller broke the
/// supervisor protocol or the exploration state stopped being a partition
/// of the tree. User-program failures are not errors; they arrive as
/// worker messages and terminate the run through
/// [`TerminationReason::Failure`](super::TerminationReason).
#[derive(Debug, Error)]
pub enum SupervisorError<I: Debug> {
    /// `add_worker` for an id that is already registered.
    #[error("worker {0:?} is already known")]
    WorkerAlreadyKnown(I),

    /// An operation referenced an unregistered worker.
    #[error("worker {0:?} is not known")]
    WorkerNotKnown(I),

    /// An operation required an active workload the worker does not have.
    #[error("worker {0:?} is not active")]
    WorkerNotActive(I),

    /// A workload was sent to a worker that already holds one.
    #[error("worker {0:?} already has a workload")]
    WorkerAlreadyHasWorkload(I),

    /// The space is fully explored but workers still hold unexplored
    /// workloads.
    #[error("workers remained active after the space was fully explored")]
    ActiveWorkersRemainedAfterSpaceFullyExplored,

    /// Two outstanding workloads claim overlapping regions.
    #[error("outstanding workloads overlap")]
    ConflictingWorkloads,

    /// Workers are waiting but there is nothing to steal from.
    #[error("workers are waiting but no source of new workloads exists")]
    OutOfSourcesForNewWorkloads,

    /// Progress folding produced a fully-explored checkpoint while the
    /// search was still running.
    #[error("space is fully explored but the search has not terminated")]
    SpaceFullyExploredButSearchNotTerminated,

    /// The space is fully explored but queued workloads remain.
    #[error("space is fully explored but unassigned workloads remain")]
    SpaceFullyExploredButWorkloadsRemain,

    /// Workspace validation found a region nobody owns.
    #[error("workspace is incomplete: {0:?}")]
    IncompleteWorkspace(Checkpoint),

    /// Checkpoints failed to combine.
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}
