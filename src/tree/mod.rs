//! The lazy search-tree instruction type.
//!
//! A user program describes its search space as a [`Tree`]: a program of
//! instructions whose children are unevaluated thunks, so nothing exists in
//! memory until the stepper walks it. Five instructions cover the model:
//! leaves, dead branches, binary choices, cacheable effects, and
//! cooperative yield points.
//!
//! Trees are rebuilt per workload from a shared [`TreeSource`]; workers
//! never share a tree value. Deterministic construction is a contract, not
//! a type-level guarantee: replaying a path against a freshly built tree
//! must reach the same instructions, and re-running a cache effect must
//! produce the same encoded bytes, otherwise the walk errors of
//! [`walk`] are raised.

pub mod walk;

pub use walk::{descend, WalkError};

use crate::path::CacheBytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// An unevaluated sub-tree.
pub struct Lazy<V>(Box<dyn FnOnce() -> Tree<V> + Send>);

impl<V> Lazy<V> {
    /// Wraps a thunk producing a sub-tree.
    pub fn new(thunk: impl FnOnce() -> Tree<V> + Send + 'static) -> Self {
        Lazy(Box::new(thunk))
    }

    /// Evaluates the thunk.
    pub fn force(self) -> Tree<V> {
        (self.0)()
    }
}

/// One instruction of a search-tree program.
pub enum Tree<V> {
    /// A leaf carrying a user value.
    Return(V),
    /// A dead branch: no value here or below.
    Null,
    /// A binary branch. The left sub-tree is always explored first.
    Choice(Lazy<V>, Lazy<V>),
    /// An effect whose optional result is cached in checkpoints; `None`
    /// behaves like [`Tree::Null`].
    Cache(Box<dyn CacheNode<V>>),
    /// A cooperative yield point: the worker drains pending control
    /// requests here before continuing.
    Yield(Lazy<V>),
}

/// Outcome of running a cache effect.
pub enum CacheOutcome<V> {
    /// The effect produced nothing; the branch is dead.
    Dead,
    /// The effect produced a value: its encoding and the continuation
    /// applied to it.
    Cached(CacheBytes, Tree<V>),
}

/// A cache instruction: either run the effect (first visit) or replay the
/// bytes recorded by an earlier visit.
pub trait CacheNode<V>: Send {
    /// Evaluates the effect, encodes its value, and applies the
    /// continuation. Called at most once per node visit.
    fn run(self: Box<Self>) -> Result<CacheOutcome<V>, WalkError>;

    /// Skips the effect: decodes previously recorded bytes and applies the
    /// continuation to the decoded value.
    fn replay(self: Box<Self>, bytes: &CacheBytes) -> Result<Tree<V>, WalkError>;
}

/// The stock [`CacheNode`] over any serde-encodable cached value.
///
/// Encoding uses MessagePack; the framework only relies on the encoded
/// bytes round-tripping bit-exactly.
struct CachedEffect<C, E, K> {
    effect: E,
    continuation: K,
    _cached: PhantomData<fn() -> C>,
}

impl<V, C, E, K> CacheNode<V> for CachedEffect<C, E, K>
where
    C: Serialize + DeserializeOwned,
    E: FnOnce() -> Option<C> + Send,
    K: FnOnce(C) -> Tree<V> + Send,
{
    fn run(self: Box<Self>) -> Result<CacheOutcome<V>, WalkError> {
        let this = *self;
        match (this.effect)() {
            None => Ok(CacheOutcome::Dead),
            Some(value) => {
                let encoded = rmp_serde::to_vec(&value)
                    .map_err(|err| WalkError::CacheCodec(err.to_string()))?;
                Ok(CacheOutcome::Cached(
                    CacheBytes::new(encoded),
                    (this.continuation)(value),
                ))
            }
        }
    }

    fn replay(self: Box<Self>, bytes: &CacheBytes) -> Result<Tree<V>, WalkError> {
        let this = *self;
        // Bytes that no longer decode mean the recorded past and the
        // present tree have diverged.
        let value: C = rmp_serde::from_slice(bytes.as_slice())
            .map_err(|_| WalkError::PastTreeInconsistentWithPresentTree)?;
        Ok((this.continuation)(value))
    }
}

/// A leaf.
pub fn leaf<V>(value: V) -> Tree<V> {
    Tree::Return(value)
}

/// A dead branch.
pub fn null<V>() -> Tree<V> {
    Tree::Null
}

/// A binary choice between two already-built sub-trees.
pub fn choice<V: Send + 'static>(left: Tree<V>, right: Tree<V>) -> Tree<V> {
    Tree::Choice(Lazy::new(move || left), Lazy::new(move || right))
}

/// A binary choice between two sub-tree thunks.
pub fn choice_with<V>(
    left: impl FnOnce() -> Tree<V> + Send + 'static,
    right: impl FnOnce() -> Tree<V> + Send + 'static,
) -> Tree<V> {
    Tree::Choice(Lazy::new(left), Lazy::new(right))
}

/// A cacheable effect followed by its continuation.
///
/// The effect runs at most once per visit; on checkpoint replay it is
/// skipped and the continuation receives the decoded recorded value.
pub fn cached<V, C, E, K>(effect: E, continuation: K) -> Tree<V>
where
    C: Serialize + DeserializeOwned + 'static,
    E: FnOnce() -> Option<C> + Send + 'static,
    K: FnOnce(C) -> Tree<V> + Send + 'static,
    V: 'static,
{
    Tree::Cache(Box::new(CachedEffect {
        effect,
        continuation,
        _cached: PhantomData,
    }))
}

/// A cooperative yield point followed by its continuation.
pub fn yield_then<V>(continuation: impl FnOnce() -> Tree<V> + Send + 'static) -> Tree<V> {
    Tree::Yield(Lazy::new(continuation))
}

/// A balanced choice tree over a list of leaf values.
///
/// An empty list is a dead branch; a singleton is a leaf. Useful for tests
/// and small enumerations.
pub fn balanced_choice<V: Send + 'static>(mut values: Vec<V>) -> Tree<V> {
    match values.len() {
        0 => Tree::Null,
        1 => Tree::Return(values.pop().expect("length checked")),
        n => {
            let right_half = values.split_off(n / 2);
            choice_with(
                move || balanced_choice(values),
                move || balanced_choice(right_half),
            )
        }
    }
}

/// A balanced choice over an integer range, built lazily.
///
/// Unlike [`balanced_choice`] nothing is materialized up front, so huge
/// ranges cost nothing until explored; halves appear as they are entered.
/// `low > high` is a dead branch.
pub fn between(low: i64, high: i64) -> Tree<i64> {
    if low > high {
        return Tree::Null;
    }
    if low == high {
        return Tree::Return(low);
    }
    let mid = low + (high - low) / 2;
    choice_with(move || between(low, mid), move || between(mid + 1, high))
}

/// A balanced choice over an integer range, mapped through a continuation.
///
/// The building block for hand-rolled enumerations: pick a number, then
/// continue the search with it. The continuation must be cloneable since
/// it is planted in every leaf of the range.
pub fn between_then<V, K>(low: i64, high: i64, continuation: K) -> Tree<V>
where
    V: 'static,
    K: Fn(i64) -> Tree<V> + Clone + Send + 'static,
{
    if low > high {
        return Tree::Null;
    }
    if low == high {
        return continuation(low);
    }
    let mid = low + (high - low) / 2;
    let right_continuation = continuation.clone();
    choice_with(
        move || between_then(low, mid, continuation),
        move || between_then(mid + 1, high, right_continuation),
    )
}

/// Shared factory building one fresh tree per workload.
///
/// Every worker rebuilds the tree from the source at the start of each
/// workload and replays the workload path against it, so the source must
/// be deterministic.
pub trait TreeSource: Send + Sync + 'static {
    /// The leaf value type.
    type Value: Send + 'static;

    /// Builds a fresh tree.
    fn build(&self) -> Tree<Self::Value>;
}

impl<V, F> TreeSource for F
where
    V: Send + 'static,
    F: Fn() -> Tree<V> + Send + Sync + 'static,
{
    type Value = V;

    fn build(&self) -> Tree<V> {
        (self)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_effect_encodes_and_continues() {
        let tree: Tree<i64> = cached(|| Some(21i64), |v| leaf(v * 2));
        let node = match tree {
            Tree::Cache(node) => node,
            _ => panic!("expected a cache instruction"),
        };
        match node.run().unwrap() {
            CacheOutcome::Cached(bytes, continuation) => {
                let decoded: i64 = rmp_serde::from_slice(bytes.as_slice()).unwrap();
                assert_eq!(decoded, 21);
                assert!(matches!(continuation, Tree::Return(42)));
            }
            CacheOutcome::Dead => panic!("effect produced a value"),
        }
    }

    #[test]
    fn test_cached_effect_none_is_dead() {
        let tree: Tree<i64> = cached(|| None::<i64>, |v| leaf(v));
        let node = match tree {
            Tree::Cache(node) => node,
            _ => panic!("expected a cache instruction"),
        };
        assert!(matches!(node.run().unwrap(), CacheOutcome::Dead));
    }

    #[test]
    fn test_cached_replay_skips_effect() {
        // The effect would panic if evaluated; replay must not touch it.
        let tree: Tree<i64> = cached(
            || -> Option<i64> { panic!("effect must not run on replay") },
            leaf,
        );
        let node = match tree {
            Tree::Cache(node) => node,
            _ => panic!("expected a cache instruction"),
        };
        let bytes = CacheBytes::new(rmp_serde::to_vec(&7i64).unwrap());
        let continuation = node.replay(&bytes).unwrap();
        assert!(matches!(continuation, Tree::Return(7)));
    }

    #[test]
    fn test_cached_replay_rejects_stale_bytes() {
        let tree: Tree<i64> = cached(|| Some(1i64), leaf);
        let node = match tree {
            Tree::Cache(node) => node,
            _ => panic!("expected a cache instruction"),
        };
        let stale = CacheBytes::new(vec![0xc1]); // never-valid msgpack
        assert!(matches!(
            node.replay(&stale),
            Err(WalkError::PastTreeInconsistentWithPresentTree)
        ));
    }

    #[test]
    fn test_between_covers_the_range() {
        let tree = between(3, 9);
        let leaves = crate::stepper::explore_whole(tree).unwrap();
        assert_eq!(leaves, vec![3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_between_empty_range_is_dead() {
        assert!(matches!(between(5, 4), Tree::Null));
        assert!(matches!(between(5, 5), Tree::Return(5)));
    }

    #[test]
    fn test_between_then_plants_the_continuation() {
        let tree = between_then(1, 3, |n| leaf(n * 10));
        let leaves = crate::stepper::explore_whole(tree).unwrap();
        assert_eq!(leaves, vec![10, 20, 30]);
    }

    #[test]
    fn test_balanced_choice_shapes() {
        assert!(matches!(balanced_choice(Vec::<i64>::new()), Tree::Null));
        assert!(matches!(balanced_choice(vec![5i64]), Tree::Return(5)));
        match balanced_choice(vec![1i64, 2, 3]) {
            Tree::Choice(left, right) => {
                assert!(matches!(left.force(), Tree::Return(1)));
                assert!(matches!(right.force(), Tree::Choice(..)));
            }
            _ => panic!("expected a choice"),
        }
    }
}
