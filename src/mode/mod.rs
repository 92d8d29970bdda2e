//! Exploration modes: what leaves mean and when a run is done.
//!
//! A mode ties together the leaf value type, the accumulated result type,
//! and the termination policy. Four policies are provided: sum everything
//! ([`AllMode`]), stop at the first value ([`FirstMode`]), and sum until a
//! predicate holds, with results delivered on request
//! ([`FoundModePull`]) or streamed as they appear ([`FoundModePush`]).

use crate::path::Location;
use crate::progress::{Located, Monoid, Progress};
use std::marker::PhantomData;

/// A result policy for an exploration run.
///
/// Implementations are cheap handles: every worker and the supervisor hold
/// a clone.
pub trait ExplorationMode: Clone + Send + Sync + 'static {
    /// Leaf values produced by the tree.
    type Value: Send + 'static;

    /// Accumulated result; folded worker-side per leaf and
    /// supervisor-side per delta.
    type Result: Monoid;

    /// What a finished run reports.
    type Final: Send + 'static;

    /// Folds one leaf into an accumulator.
    fn record_leaf(
        &self,
        accumulated: Self::Result,
        value: Self::Value,
        location: &Location,
    ) -> Self::Result;

    /// Whether an accumulated result already completes the run. Checked
    /// worker-side after every leaf and supervisor-side after every fold,
    /// so early termination does not wait for the space to be exhausted.
    fn is_complete(&self, accumulated: &Self::Result) -> bool;

    /// Whether workers should send results the moment they appear instead
    /// of buffering until a progress update is requested.
    fn pushes_results(&self) -> bool {
        false
    }

    /// Converts final progress into the run's reported value.
    fn finalize(&self, progress: Progress<Self::Result>) -> Self::Final;
}

/// Explore everything; combine every leaf through the monoid.
pub struct AllMode<R> {
    _result: PhantomData<fn() -> R>,
}

impl<R> AllMode<R> {
    /// Creates the sum-all mode.
    pub fn new() -> Self {
        AllMode {
            _result: PhantomData,
        }
    }
}

impl<R> Default for AllMode<R> {
    fn default() -> Self {
        AllMode::new()
    }
}

impl<R> Clone for AllMode<R> {
    fn clone(&self) -> Self {
        AllMode::new()
    }
}

impl<R: Monoid> ExplorationMode for AllMode<R> {
    type Value = R;
    type Result = R;
    type Final = R;

    fn record_leaf(&self, accumulated: R, value: R, _location: &Location) -> R {
        accumulated.combine(value)
    }

    fn is_complete(&self, _accumulated: &R) -> bool {
        false
    }

    fn finalize(&self, progress: Progress<R>) -> R {
        progress.result
    }
}

/// Stop at the first leaf found anywhere in the tree.
pub struct FirstMode<V> {
    _value: PhantomData<fn() -> V>,
}

impl<V> FirstMode<V> {
    /// Creates the first-found mode.
    pub fn new() -> Self {
        FirstMode {
            _value: PhantomData,
        }
    }
}

impl<V> Default for FirstMode<V> {
    fn default() -> Self {
        FirstMode::new()
    }
}

impl<V> Clone for FirstMode<V> {
    fn clone(&self) -> Self {
        FirstMode::new()
    }
}

impl<V: Clone + Send + 'static> ExplorationMode for FirstMode<V> {
    type Value = V;
    type Result = Option<Located<V>>;
    type Final = Option<Located<V>>;

    fn record_leaf(
        &self,
        accumulated: Self::Result,
        value: V,
        location: &Location,
    ) -> Self::Result {
        accumulated.or(Some(Located {
            location: location.clone(),
            value,
        }))
    }

    fn is_complete(&self, accumulated: &Self::Result) -> bool {
        accumulated.is_some()
    }

    fn finalize(&self, progress: Progress<Self::Result>) -> Self::Final {
        progress.result
    }
}

/// The reported value of a found-mode run: the accumulated result and
/// whether the predicate was satisfied (as opposed to the space simply
/// running out).
#[derive(Clone, Debug, PartialEq)]
pub struct FoundOutcome<R> {
    /// The accumulated result.
    pub result: R,
    /// Whether the predicate held when the run finished.
    pub satisfied: bool,
}

/// Sum leaves until a predicate over the accumulated result holds;
/// workers buffer results until progress updates are requested.
pub struct FoundModePull<R, P> {
    predicate: P,
    _result: PhantomData<fn() -> R>,
}

impl<R, P> FoundModePull<R, P> {
    /// Creates the pull-variant found mode with its predicate.
    pub fn new(predicate: P) -> Self {
        FoundModePull {
            predicate,
            _result: PhantomData,
        }
    }
}

impl<R, P: Clone> Clone for FoundModePull<R, P> {
    fn clone(&self) -> Self {
        FoundModePull {
            predicate: self.predicate.clone(),
            _result: PhantomData,
        }
    }
}

impl<R, P> ExplorationMode for FoundModePull<R, P>
where
    R: Monoid + Sync,
    P: Fn(&R) -> bool + Clone + Send + Sync + 'static,
{
    type Value = R;
    type Result = R;
    type Final = FoundOutcome<R>;

    fn record_leaf(&self, accumulated: R, value: R, _location: &Location) -> R {
        accumulated.combine(value)
    }

    fn is_complete(&self, accumulated: &R) -> bool {
        (self.predicate)(accumulated)
    }

    fn finalize(&self, progress: Progress<R>) -> FoundOutcome<R> {
        let satisfied = (self.predicate)(&progress.result);
        FoundOutcome {
            result: progress.result,
            satisfied,
        }
    }
}

/// Sum leaves until a predicate holds; workers send partial results the
/// moment they appear. The supervisor treats this identically to
/// [`FoundModePull`]; the difference is worker-side delivery latency.
pub struct FoundModePush<R, P> {
    inner: FoundModePull<R, P>,
}

impl<R, P> FoundModePush<R, P> {
    /// Creates the push-variant found mode with its predicate.
    pub fn new(predicate: P) -> Self {
        FoundModePush {
            inner: FoundModePull::new(predicate),
        }
    }
}

impl<R, P: Clone> Clone for FoundModePush<R, P> {
    fn clone(&self) -> Self {
        FoundModePush {
            inner: self.inner.clone(),
        }
    }
}

impl<R, P> ExplorationMode for FoundModePush<R, P>
where
    R: Monoid + Sync,
    P: Fn(&R) -> bool + Clone + Send + Sync + 'static,
{
    type Value = R;
    type Result = R;
    type Final = FoundOutcome<R>;

    fn record_leaf(&self, accumulated: R, value: R, location: &Location) -> R {
        self.inner.record_leaf(accumulated, value, location)
    }

    fn is_complete(&self, accumulated: &R) -> bool {
        self.inner.is_complete(accumulated)
    }

    fn pushes_results(&self) -> bool {
        true
    }

    fn finalize(&self, progress: Progress<R>) -> FoundOutcome<R> {
        self.inner.finalize(progress)
    }
}
