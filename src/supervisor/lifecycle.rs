//! Worker registration, removal, completion, failure, and abort.

use super::core::WorkerRecord;
use super::outcome::{SupervisorFlowOf, SupervisorOutcomeOf, TerminationReason};
use super::{Supervisor, SupervisorController, SupervisorError, WorkerId};
use crate::mode::ExplorationMode;
use crate::progress::Progress;
use std::time::Instant;
use tracing::{debug, info};

impl<M, I, C> Supervisor<M, I, C>
where
    M: ExplorationMode,
    I: WorkerId,
    C: SupervisorController<I, M::Result>,
{
    /// Registers a new worker and immediately assigns it a workload if one
    /// is available, otherwise records it as waiting.
    pub fn add_worker(&mut self, id: I) -> Result<SupervisorFlowOf<M, I>, SupervisorError<I>> {
        let started = Instant::now();
        if self.workers.contains_key(&id) {
            return Err(SupervisorError::WorkerAlreadyKnown(id));
        }
        debug!(worker = ?id, "worker added");
        self.workers.insert(
            id.clone(),
            WorkerRecord {
                workload: None,
                waiting_since: None,
            },
        );
        self.stats.worker_added(id.clone(), started);
        self.stats.record_worker_count(self.workers.len(), started);
        self.stats.record_workload_request(started);
        self.assign_or_wait(id, started)?;
        self.finish_operation(started)?;
        Ok(SupervisorFlowOf::<M, I>::Continue)
    }

    /// Unregisters a worker. An active worker's workload is re-enqueued;
    /// a worker frozen in a global progress update stops being awaited.
    pub fn remove_worker(&mut self, id: I) -> Result<SupervisorFlowOf<M, I>, SupervisorError<I>> {
        let started = Instant::now();
        let record = self
            .workers
            .remove(&id)
            .ok_or_else(|| SupervisorError::WorkerNotKnown(id.clone()))?;
        debug!(worker = ?id, "worker removed");

        if let Some(waiting_since) = record.waiting_since {
            self.waiting_workers.retain(|waiting| waiting != &id);
            self.stats
                .record_wait_time(started.duration_since(waiting_since), started);
            self.stats
                .record_waiting_count(self.waiting_workers.len(), started);
        }

        self.pending_steals.remove(&id);
        self.pending_updates.remove(&id);

        if let Some(workload) = record.workload {
            self.remove_steal_candidate(&id, workload.depth());
            self.enqueue_or_assign(workload, started)?;
        }

        self.stats.worker_removed(&id, started);
        self.stats.record_worker_count(self.workers.len(), started);

        self.maybe_finish_global_update();
        self.finish_operation(started)?;
        Ok(SupervisorFlowOf::<M, I>::Continue)
    }

    /// Like [`remove_worker`](Self::remove_worker) but a no-op for unknown
    /// ids.
    pub fn remove_worker_if_present(
        &mut self,
        id: I,
    ) -> Result<SupervisorFlowOf<M, I>, SupervisorError<I>> {
        if self.workers.contains_key(&id) {
            self.remove_worker(id)
        } else {
            Ok(SupervisorFlowOf::<M, I>::Continue)
        }
    }

    /// Handles a worker's final progress for its workload.
    ///
    /// Folds the progress in and decides: complete the whole run (space
    /// exhausted, or the mode's condition met), or return the worker to
    /// the pool (`remove` unregisters it instead).
    pub fn receive_worker_finished(
        &mut self,
        id: I,
        final_progress: Progress<M::Result>,
        remove: bool,
    ) -> Result<SupervisorFlowOf<M, I>, SupervisorError<I>> {
        let started = Instant::now();
        let record = self
            .workers
            .get_mut(&id)
            .ok_or_else(|| SupervisorError::WorkerNotKnown(id.clone()))?;
        let workload = record
            .workload
            .take()
            .ok_or_else(|| SupervisorError::WorkerNotActive(id.clone()))?;
        self.remove_steal_candidate(&id, workload.depth());
        self.stats.worker_occupied(&id, false, started);
        self.pending_updates.remove(&id);

        self.fold_progress(final_progress)?;

        if self.mode.is_complete(&self.current_progress.result) {
            info!(worker = ?id, "exploration completed by result");
            return Ok(SupervisorFlowOf::<M, I>::Terminated(self.complete()));
        }

        if self.current_progress.checkpoint.is_fully_explored() {
            self.ensure_nothing_outstanding()?;
            info!(worker = ?id, "exploration completed; space fully explored");
            return Ok(SupervisorFlowOf::<M, I>::Terminated(self.complete()));
        }

        if remove {
            let flow = self.remove_worker(id)?;
            debug_assert!(!flow.is_terminated());
        } else {
            self.stats.record_workload_request(started);
            self.assign_or_wait(id, started)?;
        }

        self.maybe_finish_global_update();
        self.finish_operation(started)?;
        Ok(SupervisorFlowOf::<M, I>::Continue)
    }

    /// Handles a worker failure: the run terminates with partial progress.
    pub fn receive_worker_failure(
        &mut self,
        id: I,
        message: String,
    ) -> Result<SupervisorFlowOf<M, I>, SupervisorError<I>> {
        self.record(&id)?;
        info!(worker = ?id, error = %message, "worker failed; terminating run");
        let progress = self.current_progress.clone();
        Ok(SupervisorFlowOf::<M, I>::Terminated(self.terminate(
            TerminationReason::Failure {
                progress,
                worker: id,
                message,
            },
        )))
    }

    /// Aborts the run, reporting the progress accumulated so far.
    pub fn abort_supervisor(&mut self) -> SupervisorOutcomeOf<M, I> {
        self.abort_with_reason_option(None)
    }

    /// Aborts the run with a caller-supplied reason.
    pub fn abort_supervisor_with_reason(&mut self, reason: String) -> SupervisorOutcomeOf<M, I> {
        self.abort_with_reason_option(Some(reason))
    }

    fn abort_with_reason_option(&mut self, reason: Option<String>) -> SupervisorOutcomeOf<M, I> {
        info!(reason = ?reason, "supervisor aborted");
        let progress = self.current_progress.clone();
        self.terminate(TerminationReason::Aborted { progress, reason })
    }

    /// After the checkpoint reaches `Explored`, nothing may remain
    /// assigned or queued except exhausted husks.
    fn ensure_nothing_outstanding(&self) -> Result<(), SupervisorError<I>> {
        let workers_clear = self.workers.values().all(|record| {
            record
                .workload
                .as_ref()
                .map_or(true, |workload| workload.is_exhausted())
        });
        if !workers_clear {
            return Err(SupervisorError::ActiveWorkersRemainedAfterSpaceFullyExplored);
        }
        let queue_clear = self
            .available_workloads
            .iter()
            .all(|workload| workload.is_exhausted());
        if !queue_clear {
            return Err(SupervisorError::SpaceFullyExploredButWorkloadsRemain);
        }
        Ok(())
    }
}
