//! Path replay against a freshly built tree.

use super::Tree;
use crate::path::{Branch, Path, Step};
use thiserror::Error;

/// Errors raised while walking or stepping a tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WalkError {
    /// The recorded past (checkpoint or path bytes) no longer matches the
    /// instructions the present tree produces.
    #[error("recorded exploration no longer matches the present tree")]
    PastTreeInconsistentWithPresentTree,

    /// The tree ended (leaf or dead branch) before the walk consumed the
    /// whole path.
    #[error("tree terminated before the end of the walk")]
    VisitorTerminatedBeforeEndOfWalk,

    /// A cached value failed to encode.
    #[error("cached value could not be encoded: {0}")]
    CacheCodec(String),
}

/// Advances a tree along a path, replaying cached bytes and skipping yield
/// points, and returns the sub-tree at the path's end.
///
/// Workers call this once per workload to resurrect the exploration state
/// at the workload root.
pub fn descend<V>(mut tree: Tree<V>, path: &Path) -> Result<Tree<V>, WalkError> {
    'steps: for step in path.steps() {
        loop {
            match tree {
                // Yield points are transparent to paths.
                Tree::Yield(continuation) => tree = continuation.force(),
                Tree::Return(_) | Tree::Null => {
                    return Err(WalkError::VisitorTerminatedBeforeEndOfWalk)
                }
                Tree::Choice(left, right) => match step {
                    Step::Choice(Branch::Left) => {
                        tree = left.force();
                        continue 'steps;
                    }
                    Step::Choice(Branch::Right) => {
                        tree = right.force();
                        continue 'steps;
                    }
                    Step::Cache(_) => return Err(WalkError::PastTreeInconsistentWithPresentTree),
                },
                Tree::Cache(node) => match step {
                    Step::Cache(bytes) => {
                        tree = node.replay(bytes)?;
                        continue 'steps;
                    }
                    Step::Choice(_) => return Err(WalkError::PastTreeInconsistentWithPresentTree),
                },
            }
        }
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::CacheBytes;
    use crate::tree::{cached, choice, leaf, null, yield_then};

    fn sample_tree() -> Tree<i64> {
        choice(choice(leaf(1), leaf(2)), yield_then(|| leaf(3)))
    }

    fn path(steps: Vec<Step>) -> Path {
        Path::from_steps(steps)
    }

    #[test]
    fn test_descend_empty_path_is_identity() {
        let tree = descend(sample_tree(), &Path::root()).unwrap();
        assert!(matches!(tree, Tree::Choice(..)));
    }

    #[test]
    fn test_descend_choice_steps() {
        let tree = descend(
            sample_tree(),
            &path(vec![
                Step::Choice(Branch::Left),
                Step::Choice(Branch::Right),
            ]),
        )
        .unwrap();
        assert!(matches!(tree, Tree::Return(2)));
    }

    #[test]
    fn test_descend_skips_yield_points() {
        let tree = descend(
            choice(yield_then(|| choice(leaf(1), leaf(2))), null()),
            &path(vec![Step::Choice(Branch::Left), Step::Choice(Branch::Left)]),
        )
        .unwrap();
        assert!(matches!(tree, Tree::Return(1)));
    }

    #[test]
    fn test_descend_replays_cache_bytes() {
        let tree: Tree<i64> = cached(|| Some(5i64), |v| choice(leaf(v), leaf(v + 1)));
        let bytes = CacheBytes::new(rmp_serde::to_vec(&5i64).unwrap());
        let at = descend(
            tree,
            &path(vec![Step::Cache(bytes), Step::Choice(Branch::Right)]),
        )
        .unwrap();
        assert!(matches!(at, Tree::Return(6)));
    }

    #[test]
    fn test_descend_past_leaf_fails() {
        let result = descend(
            leaf(1i64),
            &path(vec![Step::Choice(Branch::Left)]),
        );
        assert_eq!(result.err(), Some(WalkError::VisitorTerminatedBeforeEndOfWalk));
    }

    #[test]
    fn test_descend_structure_mismatch_fails() {
        let result = descend(
            sample_tree(),
            &path(vec![Step::Cache(CacheBytes::new(vec![1]))]),
        );
        assert_eq!(
            result.err(),
            Some(WalkError::PastTreeInconsistentWithPresentTree)
        );
    }
}
