//! The incremental tree interpreter.
//!
//! One [`step`] crosses exactly one node of the tree (or backtracks out of
//! a finished region), producing at most one leaf value and the next
//! exploration state. Iterating from `(empty context, Unexplored, tree)`
//! enumerates every leaf of the tree exactly once, left to right; starting
//! from a checkpoint skips its `Explored` regions and replays its recorded
//! cache values without re-running effects.
//!
//! The interpreter never recurses: descent pushes context frames onto a
//! stack and backtracking pops them, so arbitrarily deep spines are walked
//! in constant stack space.

use crate::checkpoint::{Checkpoint, Context, ContextFrame};
use crate::tree::{CacheOutcome, Tree, WalkError};

/// A suspended exploration: the zipper position, what remains to explore
/// below it, and the instruction the stepper is about to dispatch on.
pub struct ExplorationState<V> {
    /// Frames between the workload root and the current node.
    pub context: Context<V>,
    /// Checkpoint of the region below the current node.
    pub checkpoint: Checkpoint,
    /// The instruction at the current node.
    pub tree: Tree<V>,
}

impl<V> ExplorationState<V> {
    /// The initial state for exploring a tree under a checkpoint.
    pub fn new(checkpoint: Checkpoint, tree: Tree<V>) -> Self {
        ExplorationState {
            context: Context::new(),
            checkpoint,
            tree,
        }
    }
}

/// The result of one step.
pub struct StepOutcome<V> {
    /// A leaf value, if this step crossed one.
    pub leaf: Option<V>,
    /// The next state, or `None` when the whole region is explored.
    pub next: Option<ExplorationState<V>>,
    /// Whether this step crossed a yield instruction; the worker drains
    /// its request queue when set.
    pub yielded: bool,
}

impl<V> StepOutcome<V> {
    fn advance(context: Context<V>, checkpoint: Checkpoint, tree: Tree<V>) -> Self {
        StepOutcome {
            leaf: None,
            next: Some(ExplorationState {
                context,
                checkpoint,
                tree,
            }),
            yielded: false,
        }
    }

    fn backtrack(context: Context<V>) -> Self {
        StepOutcome {
            leaf: None,
            next: backtrack(context),
            yielded: false,
        }
    }
}

/// Performs one semantic step.
pub fn step<V>(state: ExplorationState<V>) -> Result<StepOutcome<V>, WalkError> {
    let ExplorationState {
        mut context,
        checkpoint,
        tree,
    } = state;

    match checkpoint {
        // Everything below here is already done; skip the sub-tree without
        // evaluating it.
        Checkpoint::Explored => Ok(StepOutcome::backtrack(context)),

        Checkpoint::Unexplored => match tree {
            Tree::Return(value) => Ok(StepOutcome {
                leaf: Some(value),
                next: backtrack(context),
                yielded: false,
            }),
            Tree::Null => Ok(StepOutcome::backtrack(context)),
            Tree::Cache(node) => match node.run()? {
                CacheOutcome::Dead => Ok(StepOutcome::backtrack(context)),
                CacheOutcome::Cached(bytes, continuation) => {
                    context.push(ContextFrame::Cache(bytes));
                    Ok(StepOutcome::advance(
                        context,
                        Checkpoint::Unexplored,
                        continuation,
                    ))
                }
            },
            Tree::Choice(left, right) => {
                context.push(ContextFrame::LeftBranch {
                    other: Checkpoint::Unexplored,
                    right,
                });
                Ok(StepOutcome::advance(
                    context,
                    Checkpoint::Unexplored,
                    left.force(),
                ))
            }
            Tree::Yield(continuation) => Ok(StepOutcome {
                yielded: true,
                ..StepOutcome::advance(context, Checkpoint::Unexplored, continuation.force())
            }),
        },

        Checkpoint::Cache { bytes, inner } => match tree {
            Tree::Cache(node) => {
                let continuation = node.replay(&bytes)?;
                context.push(ContextFrame::Cache(bytes));
                Ok(StepOutcome::advance(context, *inner, continuation))
            }
            // Yield instructions are transparent to checkpoints.
            Tree::Yield(continuation) => Ok(StepOutcome {
                yielded: true,
                ..StepOutcome::advance(
                    context,
                    Checkpoint::Cache { bytes, inner },
                    continuation.force(),
                )
            }),
            _ => Err(WalkError::PastTreeInconsistentWithPresentTree),
        },

        Checkpoint::Choice { left, right } => match tree {
            Tree::Choice(left_tree, right_tree) => {
                context.push(ContextFrame::LeftBranch {
                    other: *right,
                    right: right_tree,
                });
                Ok(StepOutcome::advance(context, *left, left_tree.force()))
            }
            Tree::Yield(continuation) => Ok(StepOutcome {
                yielded: true,
                ..StepOutcome::advance(
                    context,
                    Checkpoint::Choice { left, right },
                    continuation.force(),
                )
            }),
            _ => Err(WalkError::PastTreeInconsistentWithPresentTree),
        },
    }
}

/// Pops finished frames until an unexplored right branch turns up.
///
/// Cache and right-branch frames are discarded; the first left-branch frame
/// flips into a right-branch frame and its stored sub-tree becomes the new
/// position. An emptied context means the whole workload region is done.
fn backtrack<V>(mut context: Context<V>) -> Option<ExplorationState<V>> {
    while let Some(frame) = context.pop() {
        match frame {
            ContextFrame::Cache(_) | ContextFrame::RightBranch => {}
            ContextFrame::LeftBranch { other, right } => {
                context.push(ContextFrame::RightBranch);
                return Some(ExplorationState {
                    context,
                    checkpoint: other,
                    tree: right.force(),
                });
            }
        }
    }
    None
}

/// Runs the stepper to completion under a checkpoint, collecting the
/// leaves in exploration order.
pub fn explore_with_checkpoint<V>(
    checkpoint: Checkpoint,
    tree: Tree<V>,
) -> Result<Vec<V>, WalkError> {
    let mut leaves = Vec::new();
    let mut state = Some(ExplorationState::new(checkpoint, tree));
    while let Some(current) = state.take() {
        let outcome = step(current)?;
        if let Some(value) = outcome.leaf {
            leaves.push(value);
        }
        state = outcome.next;
    }
    Ok(leaves)
}

/// Runs the stepper over the whole tree, collecting every leaf in order.
pub fn explore_whole<V>(tree: Tree<V>) -> Result<Vec<V>, WalkError> {
    explore_with_checkpoint(Checkpoint::Unexplored, tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::checkpoint_from_context;
    use crate::tree::{cached, choice, choice_with, leaf, null, yield_then};

    #[test]
    fn test_explore_whole_in_order() {
        let tree = choice(choice(leaf(1), leaf(2)), choice(leaf(3), leaf(4)));
        assert_eq!(explore_whole(tree).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_explore_empty_tree() {
        assert_eq!(explore_whole(null::<i64>()).unwrap(), Vec::<i64>::new());
    }

    #[test]
    fn test_explore_skips_explored_regions() {
        let tree = choice(choice(leaf(1), leaf(2)), choice(leaf(3), leaf(4)));
        let checkpoint = Checkpoint::choice(Checkpoint::Explored, Checkpoint::Unexplored);
        assert_eq!(
            explore_with_checkpoint(checkpoint, tree).unwrap(),
            vec![3, 4]
        );
    }

    #[test]
    fn test_explore_unexplored_checkpoint_is_whole_walk() {
        let make = || choice(leaf(1), choice(null(), leaf(2)));
        assert_eq!(
            explore_with_checkpoint(Checkpoint::Unexplored, make()).unwrap(),
            explore_whole(make()).unwrap(),
        );
    }

    #[test]
    fn test_cache_effect_runs_once_and_replays() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let runs = Arc::new(AtomicUsize::new(0));
        let make = {
            let runs = Arc::clone(&runs);
            move || {
                let runs = Arc::clone(&runs);
                cached(
                    move || {
                        runs.fetch_add(1, Ordering::SeqCst);
                        Some(10i64)
                    },
                    |v| choice(leaf(v), leaf(v + 1)),
                )
            }
        };

        // First visit runs the effect.
        let mut state = Some(ExplorationState::new(Checkpoint::Unexplored, make()));
        let mut leaves = Vec::new();
        let mut suspended_checkpoint = None;
        for _ in 0..2 {
            let outcome = step(state.take().unwrap()).unwrap();
            if let Some(v) = outcome.leaf {
                leaves.push(v);
            }
            if let Some(next) = outcome.next {
                suspended_checkpoint =
                    Some(checkpoint_from_context(&next.context, next.checkpoint.clone()));
                state = Some(next);
            }
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // Resuming from the suspended checkpoint replays the bytes instead
        // of re-running the effect.
        let resumed =
            explore_with_checkpoint(suspended_checkpoint.unwrap(), make()).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(resumed, vec![10, 11]);
    }

    #[test]
    fn test_dead_cache_is_null() {
        let tree: Tree<i64> = choice_with(
            || cached(|| None::<i64>, leaf),
            || leaf(9),
        );
        assert_eq!(explore_whole(tree).unwrap(), vec![9]);
    }

    #[test]
    fn test_yield_is_reported_and_transparent() {
        let tree = choice(yield_then(|| leaf(1)), leaf(2));
        let mut state = Some(ExplorationState::new(Checkpoint::Unexplored, tree));
        let mut leaves = Vec::new();
        let mut yields = 0;
        while let Some(current) = state.take() {
            let outcome = step(current).unwrap();
            if outcome.yielded {
                yields += 1;
            }
            if let Some(v) = outcome.leaf {
                leaves.push(v);
            }
            state = outcome.next;
        }
        assert_eq!(leaves, vec![1, 2]);
        assert_eq!(yields, 1);
    }

    #[test]
    fn test_checkpoint_mismatch_is_detected() {
        // A checkpoint recorded for a choice node replayed against a leaf.
        let checkpoint = Checkpoint::Choice {
            left: Box::new(Checkpoint::Explored),
            right: Box::new(Checkpoint::Unexplored),
        };
        let result = explore_with_checkpoint(checkpoint, leaf(1i64));
        assert_eq!(
            result.err(),
            Some(WalkError::PastTreeInconsistentWithPresentTree)
        );
    }

    #[test]
    fn test_deep_spine_steps_in_constant_stack() {
        // One million alternating choice levels; the stepper must not
        // recurse over depth.
        fn spine(depth: u32) -> Tree<i64> {
            if depth == 0 {
                leaf(1)
            } else {
                choice_with(|| null(), move || spine(depth - 1))
            }
        }
        assert_eq!(explore_whole(spine(1_000_000)).unwrap(), vec![1]);
    }
}
