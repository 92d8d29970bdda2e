//! The steal-scarred zipper: context frames that have lost their sub-trees.
//!
//! When a sibling sub-tree is stolen, the frames between the workload root
//! and the stolen choice stop being backtracking targets for this worker.
//! They are converted into [`CursorFrame`]s, which remember only enough to
//! project paths and checkpoints: the branch taken and the other branch's
//! checkpoint. A worker's full position is `initial path · cursor · context`.

use super::Checkpoint;
use crate::path::{Branch, CacheBytes, Path, Step};

/// One frame of the cursor.
#[derive(Clone, Debug, PartialEq)]
pub enum CursorFrame {
    /// A crossed cache node.
    Cache(CacheBytes),
    /// A crossed choice node: which branch we took and what is known about
    /// the other branch. Right-branch frames carry the explored left
    /// checkpoint; left-branch frames (created by steals) carry the right
    /// checkpoint as known when the steal happened.
    Choice {
        /// The branch this worker descended into.
        branch: Branch,
        /// Checkpoint of the sibling branch.
        other: Checkpoint,
    },
}

/// Stack of cursor frames, outermost first. Grows at every steal and never
/// shrinks: the region above the cursor is permanently out of this
/// worker's purview.
#[derive(Default)]
pub struct Cursor {
    frames: Vec<CursorFrame>,
}

impl Cursor {
    /// An empty cursor: no steal has happened yet.
    pub fn new() -> Self {
        Cursor::default()
    }

    /// Appends one frame below the current innermost frame.
    pub fn push(&mut self, frame: CursorFrame) {
        self.frames.push(frame);
    }

    /// Appends a run of frames, outermost first.
    pub fn extend<I: IntoIterator<Item = CursorFrame>>(&mut self, frames: I) {
        self.frames.extend(frames);
    }

    /// Whether any steal has shrunk the purview yet.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of frames.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The frames, outermost first.
    pub fn frames(&self) -> &[CursorFrame] {
        &self.frames
    }
}

/// Replays the cursor outside-in over a sub-checkpoint, mirroring
/// [`checkpoint_from_context`](super::checkpoint_from_context) for frames
/// without live sub-trees.
pub fn checkpoint_from_cursor(cursor: &Cursor, sub: Checkpoint) -> Checkpoint {
    let mut acc = sub;
    for frame in cursor.frames.iter().rev() {
        acc = match frame {
            CursorFrame::Cache(bytes) => Checkpoint::cache(bytes.clone(), acc),
            CursorFrame::Choice {
                branch: Branch::Left,
                other,
            } => Checkpoint::choice(acc, other.clone()),
            CursorFrame::Choice {
                branch: Branch::Right,
                other,
            } => Checkpoint::choice(other.clone(), acc),
        };
    }
    acc
}

/// The lossy path projection of a cursor.
pub fn path_from_cursor(cursor: &Cursor) -> Path {
    let mut path = Path::root();
    for frame in &cursor.frames {
        match frame {
            CursorFrame::Cache(bytes) => path.push(Step::Cache(bytes.clone())),
            CursorFrame::Choice { branch, .. } => path.push(Step::Choice(*branch)),
        }
    }
    path
}
