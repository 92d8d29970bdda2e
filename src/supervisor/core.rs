//! Supervisor state, construction, and workspace validation.

use super::outcome::{SupervisorOutcomeOf, TerminationReason};
use super::{SupervisorController, SupervisorError, WorkerId};
use crate::checkpoint::{
    checkpoint_from_initial_path, invert, union_disjoint, CheckpointError,
};
use crate::mode::ExplorationMode;
use crate::progress::Progress;
use crate::stats::{RunStatistics, SupervisorStatistics};
use crate::workload::Workload;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::time::Instant;

/// Default number of workloads kept queued ahead of demand, so newly added
/// or newly idle workers do not wait for a steal round trip.
pub const DEFAULT_WORKLOAD_BUFFER_SIZE: usize = 4;

/// Supervisor-side record of one known worker.
pub(super) struct WorkerRecord {
    /// The workload the worker holds, as of its last report.
    pub(super) workload: Option<Workload>,
    /// When the worker entered the waiting set, if it is waiting.
    pub(super) waiting_since: Option<Instant>,
}

/// The central scheduler state machine. See the [module
/// docs](super) for the operation groups.
pub struct Supervisor<M, I, C>
where
    M: ExplorationMode,
    I: WorkerId,
    C: SupervisorController<I, M::Result>,
{
    pub(super) mode: M,
    pub(super) controller: C,
    pub(super) workers: HashMap<I, WorkerRecord>,
    /// Waiting workers in arrival order. Non-empty only while
    /// `available_workloads` is empty, and vice versa.
    pub(super) waiting_workers: VecDeque<I>,
    pub(super) available_workloads: VecDeque<Workload>,
    /// Active workers indexed by workload depth; shallower workloads are
    /// preferred steal victims because they surrender more of the tree.
    pub(super) steal_candidates: BTreeMap<usize, BTreeSet<I>>,
    /// Workers with an outstanding steal request, with the request time.
    pub(super) pending_steals: HashMap<I, Instant>,
    /// Workers with an outstanding progress-update request.
    pub(super) pending_updates: HashSet<I>,
    /// Whether a global progress update is waiting for responses.
    pub(super) global_update_in_flight: bool,
    pub(super) current_progress: Progress<M::Result>,
    pub(super) workload_buffer_size: usize,
    pub(super) debug_validation: bool,
    pub(super) stats: SupervisorStatistics<I>,
}

impl<M, I, C> Supervisor<M, I, C>
where
    M: ExplorationMode,
    I: WorkerId,
    C: SupervisorController<I, M::Result>,
{
    /// Creates a supervisor over a fresh exploration: the entire tree is
    /// one available workload.
    pub fn new(mode: M, controller: C) -> Self {
        Self::with_starting_progress(mode, controller, Progress::empty())
    }

    /// Creates a supervisor resuming from previously recorded progress:
    /// the explored regions of the starting checkpoint are skipped.
    pub fn with_starting_progress(
        mode: M,
        controller: C,
        starting_progress: Progress<M::Result>,
    ) -> Self {
        let now = Instant::now();
        let initial_workload = Workload::resuming_from(starting_progress.checkpoint.clone());
        let mut available_workloads = VecDeque::new();
        if !initial_workload.is_exhausted() {
            available_workloads.push_back(initial_workload);
        }
        let mut stats = SupervisorStatistics::new(now);
        stats.record_available_count(available_workloads.len(), now);
        Supervisor {
            mode,
            controller,
            workers: HashMap::new(),
            waiting_workers: VecDeque::new(),
            available_workloads,
            steal_candidates: BTreeMap::new(),
            pending_steals: HashMap::new(),
            pending_updates: HashSet::new(),
            global_update_in_flight: false,
            current_progress: starting_progress,
            workload_buffer_size: DEFAULT_WORKLOAD_BUFFER_SIZE,
            debug_validation: false,
            stats,
        }
    }

    /// The global progress accumulated so far.
    pub fn current_progress(&self) -> &Progress<M::Result> {
        &self.current_progress
    }

    /// Number of registered workers.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of workers currently holding a workload.
    pub fn active_worker_count(&self) -> usize {
        self.workers
            .values()
            .filter(|record| record.workload.is_some())
            .count()
    }

    /// Number of queued, unassigned workloads.
    pub fn available_workload_count(&self) -> usize {
        self.available_workloads.len()
    }

    /// Peeks the earliest-waiting worker, if any.
    pub fn try_get_waiting_worker(&self) -> Option<&I> {
        self.waiting_workers.front()
    }

    /// Sets how many workloads to keep buffered ahead of demand, and
    /// immediately rebalances against the new target.
    pub fn set_workload_buffer_size(&mut self, size: usize) -> Result<(), SupervisorError<I>> {
        self.workload_buffer_size = size;
        self.rebalance_workloads(Instant::now())
    }

    /// Enables or disables workspace validation after every operation.
    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.debug_validation = enabled;
    }

    /// A snapshot of the run statistics.
    pub fn statistics(&self) -> RunStatistics {
        self.stats.snapshot(Instant::now())
    }

    /// Looks up a known worker's record.
    pub(super) fn record(&self, id: &I) -> Result<&WorkerRecord, SupervisorError<I>> {
        self.workers
            .get(id)
            .ok_or_else(|| SupervisorError::WorkerNotKnown(id.clone()))
    }

    /// Builds the termination value for a reason.
    pub(super) fn terminate(
        &mut self,
        reason: TerminationReason<M::Final, M::Result, I>,
    ) -> SupervisorOutcomeOf<M, I> {
        let mut remaining_workers: Vec<I> = self.workers.keys().cloned().collect();
        remaining_workers.sort();
        SupervisorOutcomeOf::<M, I> {
            reason,
            statistics: self.stats.snapshot(Instant::now()),
            remaining_workers,
        }
    }

    /// Terminates the run as completed, finalizing the current progress
    /// through the mode.
    pub(super) fn complete(&mut self) -> SupervisorOutcomeOf<M, I> {
        let final_value = self.mode.finalize(self.current_progress.clone());
        self.terminate(TerminationReason::Completed(final_value))
    }

    /// Common tail of every state-changing operation: rebalance the
    /// workload buffer, optionally validate the workspace, account the
    /// handler time.
    pub(super) fn finish_operation(
        &mut self,
        started: Instant,
    ) -> Result<(), SupervisorError<I>> {
        self.rebalance_workloads(Instant::now())?;
        if self.debug_validation {
            self.validate_workspace()?;
        }
        self.stats.record_supervisor_busy(started.elapsed());
        Ok(())
    }

    /// Checks that the global progress plus the outstanding workloads
    /// partition the whole tree: no gaps, no double claims.
    pub fn validate_workspace(&self) -> Result<(), SupervisorError<I>> {
        let mut territory = self.current_progress.checkpoint.clone();

        let outstanding = self
            .workers
            .values()
            .filter_map(|record| record.workload.as_ref())
            .chain(self.available_workloads.iter());
        for workload in outstanding {
            let claim = checkpoint_from_initial_path(
                &workload.path,
                invert(workload.checkpoint.clone()),
            );
            territory = union_disjoint(territory, claim).map_err(|err| match err {
                CheckpointError::DoubleClaimedRegion => SupervisorError::ConflictingWorkloads,
                other => SupervisorError::Checkpoint(other),
            })?;
        }

        if !territory.is_fully_explored() {
            return Err(SupervisorError::IncompleteWorkspace(territory));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::outcome::TerminationReason;
    use super::*;
    use crate::checkpoint::Checkpoint;
    use crate::mode::AllMode;
    use crate::progress::Sum;

    /// Controller that records every outbound effect.
    #[derive(Default)]
    struct RecordingController {
        update_requests: Vec<Vec<usize>>,
        steal_requests: Vec<Vec<usize>>,
        sent_workloads: Vec<(usize, Workload)>,
        progress_reports: Vec<Progress<Sum>>,
    }

    impl SupervisorController<usize, Sum> for RecordingController {
        fn broadcast_progress_update_to_workers(&mut self, workers: &[usize]) {
            self.update_requests.push(workers.to_vec());
        }

        fn broadcast_workload_steal_to_workers(&mut self, workers: &[usize]) {
            self.steal_requests.push(workers.to_vec());
        }

        fn send_workload_to_worker(&mut self, workload: Workload, worker: &usize) {
            self.sent_workloads.push((*worker, workload));
        }

        fn receive_current_progress(&mut self, progress: Progress<Sum>) {
            self.progress_reports.push(progress);
        }
    }

    type TestSupervisor = Supervisor<AllMode<Sum>, usize, RecordingController>;

    fn supervisor() -> TestSupervisor {
        Supervisor::new(AllMode::new(), RecordingController::default())
    }

    #[test]
    fn test_first_worker_gets_the_entire_tree() {
        let mut sup = supervisor();
        let flow = sup.add_worker(1).unwrap();
        assert!(!flow.is_terminated());
        assert_eq!(
            sup.controller.sent_workloads,
            vec![(1, Workload::entire_tree())]
        );
        assert_eq!(sup.active_worker_count(), 1);
    }

    #[test]
    fn test_duplicate_worker_is_rejected() {
        let mut sup = supervisor();
        sup.add_worker(1).unwrap();
        assert!(matches!(
            sup.add_worker(1),
            Err(SupervisorError::WorkerAlreadyKnown(1))
        ));
    }

    #[test]
    fn test_second_worker_triggers_a_steal_request() {
        let mut sup = supervisor();
        sup.add_worker(1).unwrap();
        sup.add_worker(2).unwrap();
        assert_eq!(sup.try_get_waiting_worker(), Some(&2));
        // Worker 1 is the only steal source.
        assert!(sup
            .controller
            .steal_requests
            .iter()
            .flatten()
            .all(|id| *id == 1));
        assert!(!sup.controller.steal_requests.is_empty());
    }

    #[test]
    fn test_finished_whole_space_completes_the_run() {
        let mut sup = supervisor();
        sup.add_worker(1).unwrap();
        let flow = sup
            .receive_worker_finished(
                1,
                Progress {
                    checkpoint: Checkpoint::Explored,
                    result: Sum(7),
                },
                false,
            )
            .unwrap();
        match flow.into_outcome().expect("run completed").reason {
            TerminationReason::Completed(result) => assert_eq!(result, Sum(7)),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn test_finished_from_inactive_worker_is_an_error() {
        let mut sup = supervisor();
        sup.add_worker(1).unwrap();
        sup.add_worker(2).unwrap(); // waits: no workload
        let result = sup.receive_worker_finished(
            2,
            Progress {
                checkpoint: Checkpoint::Explored,
                result: Sum(0),
            },
            false,
        );
        assert!(matches!(result, Err(SupervisorError::WorkerNotActive(2))));
    }

    #[test]
    fn test_global_update_without_workers_fires_immediately() {
        let mut sup = supervisor();
        sup.perform_global_progress_update().unwrap();
        assert_eq!(sup.controller.progress_reports.len(), 1);
    }

    #[test]
    fn test_remove_worker_requeues_its_workload() {
        let mut sup = supervisor();
        sup.add_worker(1).unwrap();
        sup.remove_worker(1).unwrap();
        assert_eq!(sup.worker_count(), 0);
        assert_eq!(sup.available_workload_count(), 1);

        // The next worker picks it up again.
        sup.add_worker(2).unwrap();
        assert_eq!(sup.available_workload_count(), 0);
        assert_eq!(sup.active_worker_count(), 1);
    }

    #[test]
    fn test_out_of_sources_is_detected() {
        let mut sup = supervisor();
        sup.add_worker(1).unwrap();
        // Worker 1 holds the whole tree; drain it to nothing by removing
        // the workload through a worker failure-free path: directly finish
        // with a non-explored checkpoint, which would leave worker 2
        // waiting with no sources.
        sup.add_worker(2).unwrap();
        let result = sup.receive_worker_finished(
            1,
            Progress {
                checkpoint: Checkpoint::choice(Checkpoint::Explored, Checkpoint::Unexplored),
                result: Sum(1),
            },
            true,
        );
        assert!(matches!(
            result,
            Err(SupervisorError::OutOfSourcesForNewWorkloads)
        ));
    }

    #[test]
    fn test_workspace_validation_accepts_initial_state() {
        let mut sup = supervisor();
        sup.set_debug_mode(true);
        sup.add_worker(1).unwrap();
        sup.validate_workspace().unwrap();
    }
}

