//! The exploration zipper: where we are in the tree, with live siblings.
//!
//! A [`Context`] is the stack of frames between the root of a workload and
//! the stepper's current position. Left-branch frames keep the un-visited
//! right sub-tree alive so backtracking (and work-stealing) can hand it out
//! without re-walking the tree from the root.

use super::Checkpoint;
use crate::path::{Branch, CacheBytes, Path, Step};
use crate::tree::Lazy;

/// One frame of the exploration zipper.
pub enum ContextFrame<V> {
    /// A cache node was crossed; its encoded value replays on resume.
    Cache(CacheBytes),
    /// We are inside the left branch of a choice; the right branch's
    /// checkpoint and un-forced sub-tree wait here until backtracking.
    LeftBranch {
        /// Checkpoint of the right branch as known when the frame was pushed.
        other: Checkpoint,
        /// The right sub-tree, still unevaluated.
        right: Lazy<V>,
    },
    /// We are inside the right branch of a choice; the left branch is
    /// fully explored.
    RightBranch,
}

/// The branch stolen out of a context by
/// [`Context::split_at_shallowest_left_branch`].
pub struct StolenBranch<V> {
    /// Frames that preceded the stolen choice, outermost first. None of
    /// them is a left-branch frame.
    pub preceding: Vec<ContextFrame<V>>,
    /// Checkpoint of the stolen right branch.
    pub right_checkpoint: Checkpoint,
    /// The stolen right sub-tree.
    pub right_tree: Lazy<V>,
}

/// LIFO stack of context frames; the top of the stack is the innermost
/// frame (closest to the current position).
pub struct Context<V> {
    frames: Vec<ContextFrame<V>>,
}

impl<V> Context<V> {
    /// An empty context, positioned at the workload root.
    pub fn new() -> Self {
        Context { frames: Vec::new() }
    }

    /// Pushes a frame when descending one node.
    pub fn push(&mut self, frame: ContextFrame<V>) {
        self.frames.push(frame);
    }

    /// Pops the innermost frame when backtracking.
    pub fn pop(&mut self) -> Option<ContextFrame<V>> {
        self.frames.pop()
    }

    /// Whether the context is at the workload root.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Current depth below the workload root.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The frames, outermost first.
    pub fn frames(&self) -> &[ContextFrame<V>] {
        &self.frames
    }

    /// Cuts the context at its shallowest left-branch frame.
    ///
    /// Removes that frame and everything above it (toward the root) from
    /// the context, leaving the deeper frames in place, and returns the
    /// removed prefix together with the right branch's checkpoint and
    /// sub-tree. Returns `None` (leaving the context untouched) when no
    /// left-branch frame exists, i.e. nothing can be stolen.
    pub fn split_at_shallowest_left_branch(&mut self) -> Option<StolenBranch<V>> {
        let index = self
            .frames
            .iter()
            .position(|frame| matches!(frame, ContextFrame::LeftBranch { .. }))?;

        let mut removed: Vec<ContextFrame<V>> = self.frames.drain(0..=index).collect();
        let stolen = removed.pop().expect("drain includes the left-branch frame");
        match stolen {
            ContextFrame::LeftBranch { other, right } => Some(StolenBranch {
                preceding: removed,
                right_checkpoint: other,
                right_tree: right,
            }),
            _ => unreachable!("split index points at a left-branch frame"),
        }
    }
}

impl<V> Default for Context<V> {
    fn default() -> Self {
        Context::new()
    }
}

/// Replays the context outside-in over a sub-checkpoint, producing the
/// checkpoint of the whole workload region.
///
/// Left-branch frames contribute their recorded right-branch checkpoint;
/// right-branch frames mark the finished left branch `Explored`; cache
/// frames re-wrap their bytes. Simplification happens at every layer via
/// the smart constructors.
pub fn checkpoint_from_context<V>(context: &Context<V>, sub: Checkpoint) -> Checkpoint {
    let mut acc = sub;
    for frame in context.frames.iter().rev() {
        acc = match frame {
            ContextFrame::Cache(bytes) => Checkpoint::cache(bytes.clone(), acc),
            ContextFrame::LeftBranch { other, .. } => Checkpoint::choice(acc, other.clone()),
            ContextFrame::RightBranch => Checkpoint::choice(Checkpoint::Explored, acc),
        };
    }
    acc
}

/// The lossy path projection of a context: the steps from the workload
/// root to the current position, forgetting sibling checkpoints.
pub fn path_from_context<V>(context: &Context<V>) -> Path {
    let mut path = Path::root();
    for frame in &context.frames {
        match frame {
            ContextFrame::Cache(bytes) => path.push(Step::Cache(bytes.clone())),
            ContextFrame::LeftBranch { .. } => path.push(Step::Choice(Branch::Left)),
            ContextFrame::RightBranch => path.push(Step::Choice(Branch::Right)),
        }
    }
    path
}
