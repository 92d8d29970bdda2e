//! The central scheduler.
//!
//! The [`Supervisor`] owns the authoritative exploration state: the set of
//! known workers, their workloads, the queue of available workloads, the
//! global progress, and the run statistics. It is strictly serial — every
//! public operation is one atomic event, handlers never block, and all
//! outbound effects go through the [`SupervisorController`] callbacks — so
//! it can sit behind any event loop or transport.
//!
//! Operations that can end the run return
//! [`SupervisorFlow::Terminated`](outcome::SupervisorFlow) with a
//! [`SupervisorOutcome`](outcome::SupervisorOutcome) instead of raising;
//! contract violations (unknown workers, double assignment, inconsistent
//! checkpoints) are [`SupervisorError`]s and indicate a bug in the caller
//! or in this crate, never a user-program failure.
//!
//! Module layout mirrors the event groups:
//! - [`core`]: state, construction, accessors, workspace validation
//! - [`lifecycle`]: worker registration, removal, finish, failure, abort
//! - [`progress`]: progress folding, steal responses, the global
//!   progress-update protocol
//! - [`stealing`]: workload assignment and the work-stealing policy

mod core;
mod error;
mod lifecycle;
mod outcome;
mod progress;
mod stealing;

pub use self::core::{Supervisor, DEFAULT_WORKLOAD_BUFFER_SIZE};
pub use error::SupervisorError;
pub use outcome::{
    SupervisorFlow, SupervisorFlowOf, SupervisorOutcome, SupervisorOutcomeOf, TerminationReason,
};

use crate::progress::Progress;
use crate::workload::Workload;
use std::fmt::Debug;
use std::hash::Hash;

/// Identifier for a worker.
///
/// Ordering ties ordering-sensitive decisions (steal victim selection,
/// outcome reporting) to a deterministic worker order.
pub trait WorkerId: Clone + Ord + Eq + Hash + Debug + Send + 'static {}

impl<T: Clone + Ord + Eq + Hash + Debug + Send + 'static> WorkerId for T {}

/// Outbound effects of the supervisor.
///
/// The supervisor never talks to a transport directly; it calls these
/// callbacks from inside its handlers. Implementations must not block.
pub trait SupervisorController<I, R> {
    /// Fans a progress-update request out to the given workers.
    fn broadcast_progress_update_to_workers(&mut self, workers: &[I]);

    /// Fans a steal request out to the given workers.
    fn broadcast_workload_steal_to_workers(&mut self, workers: &[I]);

    /// Sends a workload to one idle worker.
    fn send_workload_to_worker(&mut self, workload: Workload, worker: &I);

    /// Delivers the result of a global progress update, exactly once per
    /// [`Supervisor::perform_global_progress_update`] call.
    fn receive_current_progress(&mut self, progress: Progress<R>);
}
