//! The unit of assignable work.

use crate::checkpoint::Checkpoint;
use crate::path::Path;
use serde::{Deserialize, Serialize};

/// A slice of the search space assigned to one worker: the path to its
/// root node and the checkpoint of what remains below that node.
///
/// A worker starts a workload by replaying the path against a freshly
/// built tree and then exploring the checkpoint's unexplored regions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    /// Path from the tree root to the workload root.
    pub path: Path,
    /// What remains to explore below the workload root; `Explored` regions
    /// are skipped.
    pub checkpoint: Checkpoint,
}

impl Workload {
    /// The workload covering the entire tree.
    pub fn entire_tree() -> Self {
        Workload {
            path: Path::root(),
            checkpoint: Checkpoint::Unexplored,
        }
    }

    /// A workload resuming a previous run: everything the recorded
    /// progress marks explored is skipped.
    pub fn resuming_from(progress_checkpoint: Checkpoint) -> Self {
        Workload {
            path: Path::root(),
            checkpoint: progress_checkpoint,
        }
    }

    /// Depth of the workload root; shallower workloads cover more of the
    /// tree and are preferred steal victims.
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Whether nothing remains to explore in this workload.
    pub fn is_exhausted(&self) -> bool {
        self.checkpoint.is_fully_explored()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entire_tree_workload() {
        let workload = Workload::entire_tree();
        assert_eq!(workload.depth(), 0);
        assert!(!workload.is_exhausted());
    }

    #[test]
    fn test_exhausted_workload() {
        let workload = Workload::resuming_from(Checkpoint::Explored);
        assert!(workload.is_exhausted());
    }
}
