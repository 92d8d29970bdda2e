//! The synchronous worker state machine.

use super::WorkerError;
use crate::checkpoint::{
    checkpoint_from_context, checkpoint_from_cursor, checkpoint_from_initial_path,
    path_from_context, path_from_cursor, Checkpoint, ContextFrame, Cursor, CursorFrame,
};
use crate::message::{ProgressUpdate, StolenWorkload};
use crate::mode::ExplorationMode;
use crate::path::{Branch, Location, Path, Step};
use crate::progress::{Monoid, Progress};
use crate::stepper::{self, ExplorationState};
use crate::tree::{descend, Tree};
use crate::workload::Workload;

/// One active exploration.
///
/// The worker's position in the whole tree is the composition
/// `initial path · cursor · context`: the initial path locates the
/// workload root, the cursor records regions surrendered to steals, and
/// the context is the live zipper below the current purview root.
struct ActiveExploration<M: ExplorationMode> {
    initial_path: Path,
    cursor: Cursor,
    state: Option<ExplorationState<M::Value>>,
    accumulated: M::Result,
}

impl<M: ExplorationMode> ActiveExploration<M> {
    /// Path from the tree root to the current purview root.
    fn purview_path(&self) -> Path {
        self.initial_path.join(&path_from_cursor(&self.cursor))
    }

    /// The workload still held by this worker.
    fn remaining_workload(&self) -> Workload {
        let state = self.state.as_ref().expect("active exploration has a state");
        Workload {
            path: self.purview_path(),
            checkpoint: checkpoint_from_context(&state.context, state.checkpoint.clone()),
        }
    }

    /// Everything this worker can vouch for, in whole-tree coordinates:
    /// explored regions of the purview are `Explored`, everything outside
    /// the purview is `Unexplored` (no claim).
    fn claimed_checkpoint(&self) -> Checkpoint {
        let within_purview = match &self.state {
            Some(state) => checkpoint_from_context(&state.context, state.checkpoint.clone()),
            None => Checkpoint::Explored,
        };
        checkpoint_from_initial_path(
            &self.initial_path,
            checkpoint_from_cursor(&self.cursor, within_purview),
        )
    }

    /// Location of the node the stepper is about to dispatch on.
    fn current_location(&self) -> Location {
        let state = self.state.as_ref().expect("active exploration has a state");
        self.purview_path()
            .location()
            .append(&path_from_context(&state.context).location())
    }

    fn take_accumulated(&mut self) -> M::Result {
        std::mem::replace(&mut self.accumulated, M::Result::empty())
    }
}

/// Result of one [`WorkerCore::step`].
pub enum WorkerStep<R> {
    /// No workload is active.
    Idle,
    /// One step happened; exploration continues.
    Progressed {
        /// The step crossed a yield instruction: drain requests now.
        yielded: bool,
        /// The step produced a leaf that was folded into the accumulator.
        recorded_leaf: bool,
    },
    /// The workload is done (exhausted, or the mode completed early);
    /// carries the final claimed progress. The core is idle afterwards.
    Finished(Progress<R>),
}

/// The synchronous worker engine: one workload at a time, one step at a
/// time.
pub struct WorkerCore<M: ExplorationMode> {
    mode: M,
    active: Option<ActiveExploration<M>>,
}

impl<M: ExplorationMode> WorkerCore<M> {
    /// Creates an idle worker core.
    pub fn new(mode: M) -> Self {
        WorkerCore { mode, active: None }
    }

    /// The mode this worker runs under.
    pub fn mode(&self) -> &M {
        &self.mode
    }

    /// Whether a workload is active.
    pub fn has_workload(&self) -> bool {
        self.active.is_some()
    }

    /// Starts a workload: replays its path against a freshly built tree
    /// and positions the stepper at the workload root.
    pub fn start(&mut self, workload: Workload, tree: Tree<M::Value>) -> Result<(), WorkerError> {
        if self.active.is_some() {
            return Err(WorkerError::AlreadyHasWorkload);
        }
        let tree_at_root = descend(tree, &workload.path)?;
        self.active = Some(ActiveExploration {
            initial_path: workload.path,
            cursor: Cursor::new(),
            state: Some(ExplorationState::new(workload.checkpoint, tree_at_root)),
            accumulated: M::Result::empty(),
        });
        Ok(())
    }

    /// Drops the active workload, if any.
    pub fn abort(&mut self) {
        self.active = None;
    }

    /// Performs one semantic step.
    ///
    /// On a walk error the workload is dropped; the caller reports the
    /// failure and the core is idle again.
    pub fn step(&mut self) -> Result<WorkerStep<M::Result>, WorkerError> {
        let Some(active) = self.active.as_mut() else {
            return Ok(WorkerStep::Idle);
        };

        // Leaf locations are only computable before the step consumes the
        // zipper, and only Return instructions can produce one.
        let leaf_location = match &active.state {
            Some(state) if matches!(state.tree, Tree::Return(_)) => Some(active.current_location()),
            _ => None,
        };

        let state = active.state.take().expect("active exploration has a state");
        let outcome = match stepper::step(state) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.active = None;
                return Err(err.into());
            }
        };
        active.state = outcome.next;

        let mut recorded_leaf = false;
        if let Some(value) = outcome.leaf {
            let location = leaf_location.expect("leaves only come from Return instructions");
            let accumulated = active.take_accumulated();
            active.accumulated = self.mode.record_leaf(accumulated, value, &location);
            recorded_leaf = true;
        }

        let exhausted = active.state.is_none();
        let completed_early = recorded_leaf && self.mode.is_complete(&active.accumulated);
        if exhausted || completed_early {
            let mut finished = self.active.take().expect("checked active above");
            let progress = Progress {
                checkpoint: finished.claimed_checkpoint(),
                result: finished.take_accumulated(),
            };
            return Ok(WorkerStep::Finished(progress));
        }

        Ok(WorkerStep::Progressed {
            yielded: outcome.yielded,
            recorded_leaf,
        })
    }

    /// Computes a progress update: the claim since the last update and the
    /// remaining workload. Resets the result accumulator. `None` when
    /// idle.
    pub fn progress_update(&mut self) -> Option<ProgressUpdate<M::Result>> {
        let active = self.active.as_mut()?;
        let remaining_workload = active.remaining_workload();
        let delta = Progress {
            checkpoint: active.claimed_checkpoint(),
            result: active.take_accumulated(),
        };
        Some(ProgressUpdate {
            delta,
            remaining_workload,
        })
    }

    /// Tries to carve the shallowest unexplored sibling out of the context.
    ///
    /// On success the worker's purview shrinks to the left branch of the
    /// stolen choice (the context prefix becomes cursor frames) and the
    /// right branch is returned as a self-contained workload, bundled with
    /// a progress update for the part the worker keeps. `None` when idle
    /// or when no left-branch frame exists.
    pub fn try_steal(&mut self) -> Option<StolenWorkload<M::Result>> {
        let stolen_workload = {
            let active = self.active.as_mut()?;
            let state = active.state.as_mut().expect("active exploration has a state");
            let stolen = state.context.split_at_shallowest_left_branch()?;

            for frame in stolen.preceding {
                active.cursor.push(match frame {
                    ContextFrame::Cache(bytes) => CursorFrame::Cache(bytes),
                    ContextFrame::RightBranch => CursorFrame::Choice {
                        branch: Branch::Right,
                        other: Checkpoint::Explored,
                    },
                    ContextFrame::LeftBranch { .. } => {
                        unreachable!("prefix before the shallowest left branch has no left-branch frames")
                    }
                });
            }

            let stolen_path = active
                .initial_path
                .join(&path_from_cursor(&active.cursor))
                .child(Step::Choice(Branch::Right));
            active.cursor.push(CursorFrame::Choice {
                branch: Branch::Left,
                other: stolen.right_checkpoint.clone(),
            });

            // The thief rebuilds the sub-tree by replaying the stolen path;
            // the live sub-tree is dropped here.
            drop(stolen.right_tree);

            Workload {
                path: stolen_path,
                checkpoint: stolen.right_checkpoint,
            }
        };

        let update = self
            .progress_update()
            .expect("steal only happens on an active workload");
        Some(StolenWorkload {
            delta: update.delta,
            remaining_workload: update.remaining_workload,
            stolen_workload,
        })
    }
}
