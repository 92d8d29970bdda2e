//! Termination values.

use crate::mode::ExplorationMode;
use crate::progress::Progress;
use crate::stats::RunStatistics;

/// Why and how a run ended, with the run's metadata.
#[derive(Debug)]
pub struct SupervisorOutcome<F, R, I> {
    /// How the run ended.
    pub reason: TerminationReason<F, R, I>,
    /// Statistics collected over the run.
    pub statistics: RunStatistics,
    /// Workers still registered at termination; the driver owes them a
    /// quit request.
    pub remaining_workers: Vec<I>,
}

/// The three ways a run ends.
#[derive(Debug)]
pub enum TerminationReason<F, R, I> {
    /// The mode's completion condition was met: the space was exhausted,
    /// a first value was found, or the found-predicate held.
    Completed(F),
    /// The run was aborted; carries the progress accumulated so far.
    Aborted {
        /// Progress at the moment of the abort.
        progress: Progress<R>,
        /// Caller-supplied reason, if any.
        reason: Option<String>,
    },
    /// A worker reported a failure; carries partial progress.
    Failure {
        /// Progress at the moment of the failure.
        progress: Progress<R>,
        /// The failing worker.
        worker: I,
        /// The worker's failure message.
        message: String,
    },
}

/// What a supervisor operation did to the run.
#[derive(Debug)]
pub enum SupervisorFlow<F, R, I> {
    /// The run continues.
    Continue,
    /// The run is over; no further operations may be issued.
    Terminated(SupervisorOutcome<F, R, I>),
}

impl<F, R, I> SupervisorFlow<F, R, I> {
    /// Extracts the outcome, if this flow terminated the run.
    pub fn into_outcome(self) -> Option<SupervisorOutcome<F, R, I>> {
        match self {
            SupervisorFlow::Continue => None,
            SupervisorFlow::Terminated(outcome) => Some(outcome),
        }
    }

    /// Whether the run terminated.
    pub fn is_terminated(&self) -> bool {
        matches!(self, SupervisorFlow::Terminated(_))
    }
}

/// Outcome type of a supervisor parameterized by its mode.
pub type SupervisorOutcomeOf<M, I> = SupervisorOutcome<
    <M as ExplorationMode>::Final,
    <M as ExplorationMode>::Result,
    I,
>;

/// Flow type of a supervisor parameterized by its mode.
pub type SupervisorFlowOf<M, I> =
    SupervisorFlow<<M as ExplorationMode>::Final, <M as ExplorationMode>::Result, I>;
