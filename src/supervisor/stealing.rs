//! Workload assignment and the work-stealing policy.

use super::{Supervisor, SupervisorController, SupervisorError, WorkerId};
use crate::mode::ExplorationMode;
use crate::workload::Workload;
use std::time::Instant;
use tracing::{debug, trace};

impl<M, I, C> Supervisor<M, I, C>
where
    M: ExplorationMode,
    I: WorkerId,
    C: SupervisorController<I, M::Result>,
{
    /// Gives an idle worker a queued workload, or records it as waiting.
    pub(super) fn assign_or_wait(&mut self, id: I, now: Instant) -> Result<(), SupervisorError<I>> {
        if let Some(workload) = self.available_workloads.pop_front() {
            self.stats
                .record_available_count(self.available_workloads.len(), now);
            self.assign_workload(id, workload, now)
        } else {
            let record = self
                .workers
                .get_mut(&id)
                .ok_or_else(|| SupervisorError::WorkerNotKnown(id.clone()))?;
            record.waiting_since = Some(now);
            self.waiting_workers.push_back(id);
            self.stats
                .record_waiting_count(self.waiting_workers.len(), now);
            Ok(())
        }
    }

    /// Hands a freed workload to the earliest-waiting worker, or queues it.
    pub(super) fn enqueue_or_assign(
        &mut self,
        workload: Workload,
        now: Instant,
    ) -> Result<(), SupervisorError<I>> {
        match self.pop_waiting_worker(now) {
            Some(id) => self.assign_workload(id, workload, now),
            None => {
                self.available_workloads.push_back(workload);
                self.stats
                    .record_available_count(self.available_workloads.len(), now);
                Ok(())
            }
        }
    }

    /// Sends a workload to a specific idle worker and indexes it for
    /// stealing.
    pub(super) fn assign_workload(
        &mut self,
        id: I,
        workload: Workload,
        now: Instant,
    ) -> Result<(), SupervisorError<I>> {
        let record = self
            .workers
            .get_mut(&id)
            .ok_or_else(|| SupervisorError::WorkerNotKnown(id.clone()))?;
        if record.workload.is_some() {
            return Err(SupervisorError::WorkerAlreadyHasWorkload(id));
        }
        trace!(worker = ?id, depth = workload.depth(), "workload assigned");
        let depth = workload.depth();
        record.workload = Some(workload.clone());
        record.waiting_since = None;
        self.steal_candidates
            .entry(depth)
            .or_default()
            .insert(id.clone());
        self.stats.worker_occupied(&id, true, now);
        self.controller.send_workload_to_worker(workload, &id);
        Ok(())
    }

    /// Replaces an active worker's recorded workload (after a progress
    /// update or steal shrank it), keeping the steal index in step.
    ///
    /// A fresh report also restores a worker that a failed steal had
    /// delisted: its state has moved, so it may have something to give
    /// again.
    pub(super) fn replace_worker_workload(
        &mut self,
        id: &I,
        workload: Workload,
    ) -> Result<(), SupervisorError<I>> {
        let record = self
            .workers
            .get_mut(id)
            .ok_or_else(|| SupervisorError::WorkerNotKnown(id.clone()))?;
        let new_depth = workload.depth();
        let previous = record
            .workload
            .replace(workload)
            .ok_or_else(|| SupervisorError::WorkerNotActive(id.clone()))?;
        self.remove_steal_candidate(id, previous.depth());
        self.steal_candidates
            .entry(new_depth)
            .or_default()
            .insert(id.clone());
        Ok(())
    }

    /// Pops the earliest-waiting worker and records its wait time.
    fn pop_waiting_worker(&mut self, now: Instant) -> Option<I> {
        let id = self.waiting_workers.pop_front()?;
        self.stats
            .record_waiting_count(self.waiting_workers.len(), now);
        if let Some(record) = self.workers.get_mut(&id) {
            if let Some(waiting_since) = record.waiting_since.take() {
                self.stats
                    .record_wait_time(now.duration_since(waiting_since), now);
            }
        }
        Some(id)
    }

    /// Drops a worker from the steal index.
    pub(super) fn remove_steal_candidate(&mut self, id: &I, depth: usize) {
        if let Some(ids) = self.steal_candidates.get_mut(&depth) {
            ids.remove(id);
            if ids.is_empty() {
                self.steal_candidates.remove(&depth);
            }
        }
    }

    /// The stealing policy, run after every state change.
    ///
    /// Keeps `buffer + waiting` workloads in sight: whatever the queue and
    /// the already-pending steals do not cover is requested from active
    /// workers, shallowest workload first (ties broken by id). Raises
    /// [`SupervisorError::OutOfSourcesForNewWorkloads`] when workers are
    /// waiting but no possible source of work exists.
    pub(super) fn rebalance_workloads(&mut self, now: Instant) -> Result<(), SupervisorError<I>> {
        let target = self.workload_buffer_size + self.waiting_workers.len();
        let covered = self.available_workloads.len() + self.pending_steals.len();
        let needed = target.saturating_sub(covered);
        if needed == 0 {
            return Ok(());
        }

        let mut chosen: Vec<I> = Vec::with_capacity(needed);
        'scan: for ids in self.steal_candidates.values() {
            for id in ids {
                if self.pending_steals.contains_key(id) {
                    continue;
                }
                chosen.push(id.clone());
                if chosen.len() == needed {
                    break 'scan;
                }
            }
        }

        if chosen.is_empty() {
            // Delisted-but-active workers are still a future source (their
            // next report re-lists them); only a total absence of active
            // workers strands the waiting ones.
            let no_sources = self.active_worker_count() == 0
                && self.pending_steals.is_empty()
                && self.available_workloads.is_empty();
            if !self.waiting_workers.is_empty() && no_sources {
                return Err(SupervisorError::OutOfSourcesForNewWorkloads);
            }
            return Ok(());
        }

        debug!(requests = chosen.len(), "requesting workload steals");
        for id in &chosen {
            self.pending_steals.insert(id.clone(), now);
        }
        self.controller.broadcast_workload_steal_to_workers(&chosen);
        Ok(())
    }
}
