//! Aggregated exploration progress and the result monoid.

use crate::checkpoint::{merge, Checkpoint, CheckpointError};
use crate::path::Location;
use serde::{Deserialize, Serialize};

/// A user result that combines associatively with an identity element.
///
/// Workers fold leaf values into a monoid accumulator and the supervisor
/// folds worker deltas into the global result; associativity (and, for the
/// checkpoint inversion law, commutativity) of `combine` is the user's
/// contract.
pub trait Monoid: Clone + Send + 'static {
    /// The identity element.
    fn empty() -> Self;

    /// Associative combination.
    fn combine(self, other: Self) -> Self;
}

impl Monoid for () {
    fn empty() -> Self {}

    fn combine(self, _other: Self) -> Self {}
}

impl<T: Clone + Send + 'static> Monoid for Vec<T> {
    fn empty() -> Self {
        Vec::new()
    }

    fn combine(mut self, mut other: Self) -> Self {
        self.append(&mut other);
        self
    }
}

/// Integer sum monoid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sum(pub i64);

impl Monoid for Sum {
    fn empty() -> Self {
        Sum(0)
    }

    fn combine(self, other: Self) -> Self {
        Sum(self.0 + other.0)
    }
}

/// Leaf-count monoid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Count(pub u64);

impl Monoid for Count {
    fn empty() -> Self {
        Count(0)
    }

    fn combine(self, other: Self) -> Self {
        Count(self.0 + other.0)
    }
}

/// A leaf value tagged with the location where it was found.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Located<V> {
    /// Branch-only coordinate of the leaf.
    pub location: Location,
    /// The leaf value.
    pub value: V,
}

/// First-found monoid: keeps the earliest witnessed value.
///
/// "Earliest" is in fold order, which across workers is scheduling
/// dependent; first-found exploration promises some witness, not the
/// leftmost one.
impl<V: Clone + Send + 'static> Monoid for Option<Located<V>> {
    fn empty() -> Self {
        None
    }

    fn combine(self, other: Self) -> Self {
        self.or(other)
    }
}

/// Accumulated exploration: which regions are done and what they produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Progress<R> {
    /// Union of all explored regions.
    pub checkpoint: Checkpoint,
    /// Combined result over those regions.
    pub result: R,
}

impl<R: Monoid> Progress<R> {
    /// No progress: nothing explored, identity result.
    pub fn empty() -> Self {
        Progress {
            checkpoint: Checkpoint::Unexplored,
            result: R::empty(),
        }
    }

    /// Folds another progress into this one: checkpoints merge
    /// structurally, results combine through the monoid.
    pub fn fold(self, delta: Progress<R>) -> Result<Progress<R>, CheckpointError> {
        Ok(Progress {
            checkpoint: merge(self.checkpoint, delta.checkpoint)?,
            result: self.result.combine(delta.result),
        })
    }

    /// Whether the whole space is explored.
    pub fn is_complete(&self) -> bool {
        self.checkpoint.is_fully_explored()
    }
}

impl<R: Monoid> Default for Progress<R> {
    fn default() -> Self {
        Progress::empty()
    }
}
