//! Wire message shapes between the supervisor and its workers.
//!
//! These are the only types that cross a transport. They are serde-derived
//! and generic over the result monoid, so any transport that can move
//! bytes (or just move the values in process) can carry them. Channels
//! must be reliable and FIFO per direction; nothing else is assumed.

use crate::progress::Progress;
use crate::workload::Workload;
use serde::{Deserialize, Serialize};

/// Requests sent from the supervisor to a worker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SupervisorRequest {
    /// Report current progress and reset the result accumulator.
    RequestProgressUpdate,
    /// Give up an unexplored sibling sub-tree, if any.
    RequestWorkloadSteal,
    /// Begin exploring a workload. Only ever sent to an idle worker.
    StartWorkload(Workload),
    /// Stop stepping and shut down.
    QuitWorker,
}

/// A worker's answer to a progress-update request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate<R> {
    /// Progress claimed since the exploration began, in whole-tree
    /// coordinates; the supervisor folds this into the global progress.
    pub delta: Progress<R>,
    /// What this worker still holds, replacing its recorded workload.
    pub remaining_workload: Workload,
}

/// A worker's successful answer to a steal request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StolenWorkload<R> {
    /// Progress update for the part the worker keeps.
    pub delta: Progress<R>,
    /// The worker's shrunken workload.
    pub remaining_workload: Workload,
    /// The sub-tree handed over for reassignment.
    pub stolen_workload: Workload,
}

/// Messages sent from a worker to the supervisor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum WorkerMessage<R> {
    /// Answer to [`SupervisorRequest::RequestProgressUpdate`].
    ProgressUpdate(ProgressUpdate<R>),
    /// Answer to [`SupervisorRequest::RequestWorkloadSteal`]; `None` when
    /// the worker had nothing to give up.
    StolenWorkload(Option<StolenWorkload<R>>),
    /// The workload is finished (or the mode completed early); carries the
    /// final claimed progress.
    Finished(Progress<R>),
    /// User code failed; the run is over.
    Failed(String),
    /// Answer to [`SupervisorRequest::QuitWorker`].
    WorkerQuit,
}
