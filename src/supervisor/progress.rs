//! Progress folding, steal responses, and the global update protocol.

use super::outcome::SupervisorFlowOf;
use super::{Supervisor, SupervisorController, SupervisorError, WorkerId};
use crate::message::{ProgressUpdate, StolenWorkload};
use crate::mode::ExplorationMode;
use crate::progress::Progress;
use std::time::Instant;
use tracing::{debug, trace};

impl<M, I, C> Supervisor<M, I, C>
where
    M: ExplorationMode,
    I: WorkerId,
    C: SupervisorController<I, M::Result>,
{
    /// Handles a progress update from an active worker: folds the delta
    /// into the global progress and replaces the worker's recorded
    /// workload with what it reports remaining.
    ///
    /// Also accepts unsolicited updates (push-mode workers stream results
    /// without being asked).
    pub fn receive_progress_update(
        &mut self,
        id: I,
        update: ProgressUpdate<M::Result>,
    ) -> Result<SupervisorFlowOf<M, I>, SupervisorError<I>> {
        let started = Instant::now();
        if self.record(&id)?.workload.is_none() {
            return Err(SupervisorError::WorkerNotActive(id));
        }
        trace!(worker = ?id, "progress update received");

        self.replace_worker_workload(&id, update.remaining_workload)?;
        self.fold_progress(update.delta)?;
        self.pending_updates.remove(&id);

        if self.mode.is_complete(&self.current_progress.result) {
            debug!(worker = ?id, "found-condition satisfied by progress update");
            return Ok(SupervisorFlowOf::<M, I>::Terminated(self.complete()));
        }
        self.ensure_not_silently_complete()?;

        self.maybe_finish_global_update();
        self.finish_operation(started)?;
        Ok(SupervisorFlowOf::<M, I>::Continue)
    }

    /// Handles a worker's answer to a steal request.
    ///
    /// `None` means the worker had nothing to give up; `Some` carries the
    /// update for the kept part and the workload to hand out.
    pub fn receive_stolen_workload(
        &mut self,
        id: I,
        response: Option<StolenWorkload<M::Result>>,
    ) -> Result<SupervisorFlowOf<M, I>, SupervisorError<I>> {
        let started = Instant::now();
        self.record(&id)?;
        let requested_at = self
            .pending_steals
            .remove(&id)
            .ok_or_else(|| SupervisorError::WorkerNotActive(id.clone()))?;

        match response {
            None => {
                trace!(worker = ?id, "steal came back empty");
                self.stats.record_steal_failed();
                // Nothing to give at its reported state; delist until its
                // next report, so the policy does not hammer it with
                // back-to-back requests.
                let depth = self.record(&id)?.workload.as_ref().map(crate::workload::Workload::depth);
                if let Some(depth) = depth {
                    self.remove_steal_candidate(&id, depth);
                }
            }
            Some(stolen) => {
                if self.record(&id)?.workload.is_none() {
                    return Err(SupervisorError::WorkerNotActive(id));
                }
                debug!(
                    worker = ?id,
                    stolen_depth = stolen.stolen_workload.depth(),
                    "workload stolen"
                );
                self.stats
                    .record_steal_completed(started.duration_since(requested_at), started);

                self.replace_worker_workload(&id, stolen.remaining_workload)?;
                self.fold_progress(stolen.delta)?;
                self.pending_updates.remove(&id);

                if self.mode.is_complete(&self.current_progress.result) {
                    return Ok(SupervisorFlowOf::<M, I>::Terminated(self.complete()));
                }
                self.ensure_not_silently_complete()?;

                self.enqueue_or_assign(stolen.stolen_workload, started)?;
            }
        }

        self.maybe_finish_global_update();
        self.finish_operation(started)?;
        Ok(SupervisorFlowOf::<M, I>::Continue)
    }

    /// Requests a progress update from every active worker and fires the
    /// controller's `receive_current_progress` once the last of them has
    /// answered (by update, finish, failure, or removal). With no active
    /// workers the callback fires immediately.
    ///
    /// At most one global update is in flight; further requests while one
    /// is pending are no-ops.
    pub fn perform_global_progress_update(
        &mut self,
    ) -> Result<SupervisorFlowOf<M, I>, SupervisorError<I>> {
        let started = Instant::now();
        if self.global_update_in_flight {
            return Ok(SupervisorFlowOf::<M, I>::Continue);
        }

        let mut active: Vec<I> = self
            .workers
            .iter()
            .filter(|(_, record)| record.workload.is_some())
            .map(|(id, _)| id.clone())
            .collect();
        active.sort();

        if active.is_empty() {
            trace!("global progress update with no active workers");
            let progress = self.current_progress.clone();
            self.controller.receive_current_progress(progress);
        } else {
            debug!(workers = active.len(), "global progress update started");
            self.global_update_in_flight = true;
            self.pending_updates = active.iter().cloned().collect();
            self.controller.broadcast_progress_update_to_workers(&active);
        }

        self.finish_operation(started)?;
        Ok(SupervisorFlowOf::<M, I>::Continue)
    }

    /// Terminates as completed when the current progress already satisfies
    /// the mode's condition or covers the whole tree. Drivers call this
    /// once after construction so a resumed-but-already-done run does not
    /// wait on workers.
    pub fn complete_if_finished(&mut self) -> Option<super::outcome::SupervisorOutcomeOf<M, I>> {
        if self.mode.is_complete(&self.current_progress.result)
            || self.current_progress.checkpoint.is_fully_explored()
        {
            Some(self.complete())
        } else {
            None
        }
    }

    /// Folds a delta into the global progress.
    pub(super) fn fold_progress(
        &mut self,
        delta: Progress<M::Result>,
    ) -> Result<(), SupervisorError<I>> {
        let progress = std::mem::replace(&mut self.current_progress, Progress::empty());
        self.current_progress = progress.fold(delta)?;
        Ok(())
    }

    /// A fully-explored checkpoint outside the completion paths is only
    /// tolerable when every outstanding workload is itself exhausted (its
    /// `Finished` is in flight); anything else means the partition broke.
    pub(super) fn ensure_not_silently_complete(&self) -> Result<(), SupervisorError<I>> {
        if !self.current_progress.checkpoint.is_fully_explored() {
            return Ok(());
        }
        let benign = self
            .workers
            .values()
            .filter_map(|record| record.workload.as_ref())
            .chain(self.available_workloads.iter())
            .all(|workload| workload.is_exhausted());
        if benign {
            Ok(())
        } else {
            Err(SupervisorError::SpaceFullyExploredButSearchNotTerminated)
        }
    }

    /// Fires the global-update callback once the frozen set has drained.
    pub(super) fn maybe_finish_global_update(&mut self) {
        if self.global_update_in_flight && self.pending_updates.is_empty() {
            debug!("global progress update finished");
            self.global_update_in_flight = false;
            let progress = self.current_progress.clone();
            self.controller.receive_current_progress(progress);
        }
    }
}
