//! Channel-backed driver for a supervisor and its worker actors.

use crate::config::{CheckpointSettings, ExplorationSettings};
use crate::checkpoint::simplify;
use crate::message::{SupervisorRequest, WorkerMessage};
use crate::mode::ExplorationMode;
use crate::persist::{self, CheckpointDocument};
use crate::progress::Progress;
use crate::supervisor::{
    Supervisor, SupervisorController, SupervisorError, SupervisorFlow, SupervisorFlowOf,
    SupervisorOutcomeOf, TerminationReason,
};
use crate::tree::TreeSource;
use crate::worker::WorkerActor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of an in-process run.
pub type LocalOutcome<M> = SupervisorOutcomeOf<M, usize>;

/// Errors from the in-process driver.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The supervisor hit a contract violation or inconsistency.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError<usize>),

    /// A checkpoint file failed to load at startup.
    #[error(transparent)]
    CheckpointFile(#[from] crate::persist::CheckpointFileError),

    /// Every worker channel closed while the run was still going.
    #[error("worker channels closed before the run terminated")]
    ChannelClosed,
}

/// Controller that forwards everything over per-worker channels.
struct ChannelController<R> {
    requests: HashMap<usize, mpsc::UnboundedSender<SupervisorRequest>>,
    progress_snapshots: mpsc::UnboundedSender<Progress<R>>,
}

impl<R> SupervisorController<usize, R> for ChannelController<R> {
    fn broadcast_progress_update_to_workers(&mut self, workers: &[usize]) {
        for worker in workers {
            self.request(worker, SupervisorRequest::RequestProgressUpdate);
        }
    }

    fn broadcast_workload_steal_to_workers(&mut self, workers: &[usize]) {
        for worker in workers {
            self.request(worker, SupervisorRequest::RequestWorkloadSteal);
        }
    }

    fn send_workload_to_worker(&mut self, workload: crate::workload::Workload, worker: &usize) {
        self.request(worker, SupervisorRequest::StartWorkload(workload));
    }

    fn receive_current_progress(&mut self, progress: Progress<R>) {
        let _ = self.progress_snapshots.send(progress);
    }
}

impl<R> ChannelController<R> {
    fn request(&mut self, worker: &usize, request: SupervisorRequest) {
        // A dropped worker shows up through the message channel; a failed
        // send here is not an event on its own.
        if let Some(sender) = self.requests.get(worker) {
            let _ = sender.send(request);
        }
    }
}

/// Explores a tree to completion on a pool of in-process workers.
pub async fn explore<M, S>(
    mode: M,
    source: S,
    settings: ExplorationSettings,
) -> Result<LocalOutcome<M>, RuntimeError>
where
    M: ExplorationMode,
    S: TreeSource<Value = M::Value>,
{
    run(
        mode,
        source,
        settings,
        Progress::empty(),
        CancellationToken::new(),
        &mut no_snapshots,
    )
    .await
}

/// Explores a tree; cancelling `abort` aborts the run and reports the
/// progress accumulated so far.
pub async fn explore_with_abort<M, S>(
    mode: M,
    source: S,
    settings: ExplorationSettings,
    abort: CancellationToken,
) -> Result<LocalOutcome<M>, RuntimeError>
where
    M: ExplorationMode,
    S: TreeSource<Value = M::Value>,
{
    run(mode, source, settings, Progress::empty(), abort, &mut no_snapshots).await
}

/// Explores a tree with durable checkpointing.
///
/// An existing checkpoint file resumes the run (explored regions are
/// skipped and the recorded result and CPU time are carried forward). The
/// file is rewritten after every global progress update that lands at
/// least `checkpoint.interval` after the previous write, removed on
/// completion, and given one final write when the run aborts or fails.
/// Write failures are logged and retried at the next interval; they never
/// abort the run.
pub async fn explore_with_checkpoint_file<M, S>(
    mode: M,
    source: S,
    settings: ExplorationSettings,
    checkpoint: CheckpointSettings,
    abort: CancellationToken,
) -> Result<LocalOutcome<M>, RuntimeError>
where
    M: ExplorationMode,
    M::Result: Serialize + DeserializeOwned,
    S: TreeSource<Value = M::Value>,
{
    let (starting_progress, base_cpu_time) =
        match persist::read_checkpoint::<M::Result>(&checkpoint.path)? {
            Some(document) => {
                info!(path = %checkpoint.path.display(), "resuming from checkpoint file");
                let mut progress = document.progress;
                progress.checkpoint = simplify(progress.checkpoint);
                (progress, document.cpu_time)
            }
            None => (Progress::empty(), Duration::ZERO),
        };

    let mut last_write: Option<Instant> = None;
    let path = checkpoint.path.clone();
    let interval = checkpoint.interval;
    let mut write_snapshot = move |progress: &Progress<M::Result>, cpu_time: Duration| {
        let due = last_write.map_or(true, |at| at.elapsed() >= interval);
        if !due {
            return;
        }
        let document = CheckpointDocument {
            progress: progress.clone(),
            cpu_time: base_cpu_time + cpu_time,
        };
        match persist::write_checkpoint(&path, &document) {
            Ok(()) => last_write = Some(Instant::now()),
            Err(err) => warn!(error = %err, "checkpoint write failed; will retry"),
        }
    };

    let outcome = run(
        mode,
        source,
        settings,
        starting_progress,
        abort,
        &mut write_snapshot,
    )
    .await?;

    finalize_checkpoint_file::<M>(&checkpoint.path, &outcome, base_cpu_time);
    Ok(outcome)
}

/// On completion the checkpoint file is deleted; on abort or failure the
/// final progress is written out once more.
fn finalize_checkpoint_file<M: ExplorationMode>(
    path: &std::path::Path,
    outcome: &LocalOutcome<M>,
    base_cpu_time: Duration,
) where
    M::Result: Serialize,
{
    match &outcome.reason {
        TerminationReason::Completed(_) => {
            if let Err(err) = persist::remove_checkpoint(path) {
                warn!(error = %err, "failed to remove checkpoint file after completion");
            }
        }
        TerminationReason::Aborted { progress, .. }
        | TerminationReason::Failure { progress, .. } => {
            let document = CheckpointDocument {
                progress: progress.clone(),
                cpu_time: base_cpu_time + outcome.statistics.total_worker_busy,
            };
            if let Err(err) = persist::write_checkpoint(path, &document) {
                warn!(error = %err, "final checkpoint write failed");
            }
        }
    }
}

fn no_snapshots<R>(_progress: &Progress<R>, _cpu_time: Duration) {}

async fn run<M, S>(
    mode: M,
    source: S,
    settings: ExplorationSettings,
    starting_progress: Progress<M::Result>,
    abort: CancellationToken,
    on_snapshot: &mut dyn FnMut(&Progress<M::Result>, Duration),
) -> Result<LocalOutcome<M>, RuntimeError>
where
    M: ExplorationMode,
    S: TreeSource<Value = M::Value>,
{
    let worker_count = settings.worker_count.max(1);
    info!(workers = worker_count, "exploration starting");

    let shutdown = CancellationToken::new();
    let source = Arc::new(source);
    let (message_tx, mut message_rx) = mpsc::unbounded_channel();
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();

    let mut request_senders = HashMap::new();
    let mut worker_handles = Vec::with_capacity(worker_count);
    for id in 0..worker_count {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        request_senders.insert(id, request_tx);
        let actor = WorkerActor::new(
            id,
            mode.clone(),
            Arc::clone(&source),
            request_rx,
            message_tx.clone(),
            shutdown.child_token(),
            settings.steps_between_polls,
        );
        worker_handles.push(tokio::spawn(actor.run()));
    }
    drop(message_tx);

    let controller = ChannelController {
        requests: request_senders.clone(),
        progress_snapshots: progress_tx,
    };
    let mut supervisor = Supervisor::with_starting_progress(mode, controller, starting_progress);
    supervisor.set_debug_mode(settings.debug_validation);
    supervisor.set_workload_buffer_size(settings.workload_buffer_size)?;

    // A resumed run may already satisfy its completion condition.
    let outcome = if let Some(outcome) = supervisor.complete_if_finished() {
        outcome
    } else {
        for id in 0..worker_count {
            let flow = supervisor.add_worker(id)?;
            debug_assert!(!flow.is_terminated());
        }

        let mut update_interval = tokio::time::interval_at(
            tokio::time::Instant::now() + settings.progress_update_interval,
            settings.progress_update_interval,
        );
        update_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = abort.cancelled() => {
                    break supervisor.abort_supervisor();
                }

                message = message_rx.recv() => {
                    let (id, message) = message.ok_or(RuntimeError::ChannelClosed)?;
                    match dispatch(&mut supervisor, id, message)? {
                        SupervisorFlow::Continue => {}
                        SupervisorFlow::Terminated(outcome) => break outcome,
                    }
                }

                Some(progress) = progress_rx.recv() => {
                    let cpu_time = supervisor.statistics().total_worker_busy;
                    on_snapshot(&progress, cpu_time);
                }

                _ = update_interval.tick() => {
                    match supervisor.perform_global_progress_update()? {
                        SupervisorFlow::Continue => {}
                        SupervisorFlow::Terminated(outcome) => break outcome,
                    }
                }
            }
        }
    };

    debug!("run terminated; quitting workers");
    for sender in request_senders.values() {
        let _ = sender.send(SupervisorRequest::QuitWorker);
    }
    shutdown.cancel();
    for handle in worker_handles {
        let _ = handle.await;
    }

    // Drain any snapshot produced by the last global update.
    while let Ok(progress) = progress_rx.try_recv() {
        let cpu_time = outcome.statistics.total_worker_busy;
        on_snapshot(&progress, cpu_time);
    }

    info!(statistics = %outcome.statistics, "exploration finished");
    Ok(outcome)
}

fn dispatch<M, C>(
    supervisor: &mut Supervisor<M, usize, C>,
    id: usize,
    message: WorkerMessage<M::Result>,
) -> Result<SupervisorFlowOf<M, usize>, SupervisorError<usize>>
where
    M: ExplorationMode,
    C: SupervisorController<usize, M::Result>,
{
    match message {
        WorkerMessage::ProgressUpdate(update) => supervisor.receive_progress_update(id, update),
        WorkerMessage::StolenWorkload(response) => {
            supervisor.receive_stolen_workload(id, response)
        }
        WorkerMessage::Finished(progress) => {
            supervisor.receive_worker_finished(id, progress, false)
        }
        WorkerMessage::Failed(message) => supervisor.receive_worker_failure(id, message),
        WorkerMessage::WorkerQuit => supervisor.remove_worker_if_present(id),
    }
}
