//! The asynchronous worker actor.
//!
//! One actor per worker: it owns a [`WorkerCore`], receives
//! [`SupervisorRequest`]s over an unbounded FIFO channel, and reports
//! [`WorkerMessage`]s tagged with its id. Stepping happens in bounded
//! batches; between batches (and at every yield instruction) the request
//! queue is drained, so control latency is bounded by the batch size.

use super::core::{WorkerCore, WorkerStep};
use crate::message::{SupervisorRequest, WorkerMessage};
use crate::mode::ExplorationMode;
use crate::progress::Progress;
use crate::tree::TreeSource;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of steps taken between request-queue drains.
pub const DEFAULT_STEPS_BETWEEN_POLLS: usize = 100;

/// How a step batch ended.
enum BatchEnd<R> {
    /// Batch exhausted its budget or hit a yield; keep going.
    Continue,
    /// The workload finished with this progress.
    Finished(Progress<R>),
    /// Stepping failed (walk error or user panic).
    Failed(String),
}

/// A worker running as a tokio task.
pub struct WorkerActor<M: ExplorationMode, S: TreeSource<Value = M::Value>> {
    id: usize,
    core: WorkerCore<M>,
    source: Arc<S>,
    requests: mpsc::UnboundedReceiver<SupervisorRequest>,
    outbound: mpsc::UnboundedSender<(usize, WorkerMessage<M::Result>)>,
    shutdown: CancellationToken,
    steps_between_polls: usize,
}

impl<M, S> WorkerActor<M, S>
where
    M: ExplorationMode,
    S: TreeSource<Value = M::Value>,
{
    /// Creates a worker actor.
    pub fn new(
        id: usize,
        mode: M,
        source: Arc<S>,
        requests: mpsc::UnboundedReceiver<SupervisorRequest>,
        outbound: mpsc::UnboundedSender<(usize, WorkerMessage<M::Result>)>,
        shutdown: CancellationToken,
        steps_between_polls: usize,
    ) -> Self {
        WorkerActor {
            id,
            core: WorkerCore::new(mode),
            source,
            requests,
            outbound,
            shutdown,
            steps_between_polls: steps_between_polls.max(1),
        }
    }

    /// Runs until quit, shutdown, or channel closure.
    pub async fn run(mut self) {
        debug!(worker = self.id, "worker started");
        loop {
            if self.core.has_workload() {
                match self.run_step_batch() {
                    BatchEnd::Continue => {}
                    BatchEnd::Finished(progress) => {
                        debug!(worker = self.id, "workload finished");
                        self.send(WorkerMessage::Finished(progress));
                    }
                    BatchEnd::Failed(message) => {
                        warn!(worker = self.id, error = %message, "workload failed");
                        self.core.abort();
                        self.send(WorkerMessage::Failed(message));
                    }
                }
                if self.drain_requests() {
                    break;
                }
                if self.shutdown.is_cancelled() {
                    break;
                }
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    biased;

                    _ = self.shutdown.cancelled() => break,

                    request = self.requests.recv() => match request {
                        None => break,
                        Some(request) => {
                            if self.handle_request(request) {
                                break;
                            }
                        }
                    }
                }
            }
        }
        debug!(worker = self.id, "worker stopped");
    }

    /// Steps until the poll budget, a yield instruction, completion, or
    /// failure. User panics are caught here and become failures.
    fn run_step_batch(&mut self) -> BatchEnd<M::Result> {
        let budget = self.steps_between_polls;
        let core = &mut self.core;
        let mut push_updates = Vec::new();

        let batch = catch_unwind(AssertUnwindSafe(|| {
            for _ in 0..budget {
                match core.step() {
                    Ok(WorkerStep::Idle) => return BatchEnd::Continue,
                    Ok(WorkerStep::Finished(progress)) => return BatchEnd::Finished(progress),
                    Ok(WorkerStep::Progressed {
                        yielded,
                        recorded_leaf,
                    }) => {
                        if recorded_leaf && core.mode().pushes_results() {
                            if let Some(update) = core.progress_update() {
                                push_updates.push(update);
                            }
                        }
                        if yielded {
                            return BatchEnd::Continue;
                        }
                    }
                    Err(err) => return BatchEnd::Failed(err.to_string()),
                }
            }
            BatchEnd::Continue
        }));

        for update in push_updates {
            self.send(WorkerMessage::ProgressUpdate(update));
        }

        match batch {
            Ok(end) => end,
            Err(payload) => BatchEnd::Failed(panic_message(payload)),
        }
    }

    /// Drains every pending request without blocking. Returns `true` when
    /// the actor should stop.
    fn drain_requests(&mut self) -> bool {
        while let Ok(request) = self.requests.try_recv() {
            if self.handle_request(request) {
                return true;
            }
        }
        false
    }

    /// Handles one request. Returns `true` on quit.
    fn handle_request(&mut self, request: SupervisorRequest) -> bool {
        match request {
            SupervisorRequest::RequestProgressUpdate => {
                // An idle worker's in-flight Finished already answers this.
                if let Some(update) = self.core.progress_update() {
                    self.send(WorkerMessage::ProgressUpdate(update));
                }
            }
            SupervisorRequest::RequestWorkloadSteal => {
                let stolen = self.core.try_steal();
                self.send(WorkerMessage::StolenWorkload(stolen));
            }
            SupervisorRequest::StartWorkload(workload) => {
                if self.core.has_workload() {
                    self.send(WorkerMessage::Failed(
                        "worker received a workload while already holding one".to_string(),
                    ));
                    return false;
                }
                info!(worker = self.id, depth = workload.depth(), "workload received");
                let core = &mut self.core;
                let source = Arc::clone(&self.source);
                let started = catch_unwind(AssertUnwindSafe(|| {
                    core.start(workload, source.build())
                }));
                match started {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => self.send(WorkerMessage::Failed(err.to_string())),
                    Err(payload) => self.send(WorkerMessage::Failed(panic_message(payload))),
                }
            }
            SupervisorRequest::QuitWorker => {
                self.core.abort();
                self.send(WorkerMessage::WorkerQuit);
                return true;
            }
        }
        false
    }

    fn send(&self, message: WorkerMessage<M::Result>) {
        // A closed channel means the run is over; the shutdown token will
        // stop this actor shortly.
        let _ = self.outbound.send((self.id, message));
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
