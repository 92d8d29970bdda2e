//! The partially-explored-tree data type and its algebra.
//!
//! A [`Checkpoint`] maps regions of a search tree to explored / unexplored,
//! recording consumed cache values along the way. The same structure serves
//! two roles with one polarity: as accumulated progress, `Explored` marks
//! regions that are done; as a workload, `Explored` marks regions a worker
//! must skip. Merging progress and extracting workloads are therefore the
//! same structural operations.
//!
//! All combinators run on explicit work/result stacks rather than recursing
//! over checkpoint depth, so partially-explored million-deep spines do not
//! overflow the stack. (Ownership teardown of a deep checkpoint still walks
//! the structure; the simplifying constructors keep finished regions
//! collapsed to single `Explored` nodes, which is what bounds depth in
//! practice.)

pub mod context;
pub mod cursor;

pub use context::{checkpoint_from_context, path_from_context, Context, ContextFrame};
pub use cursor::{checkpoint_from_cursor, path_from_cursor, Cursor, CursorFrame};

use crate::path::{Branch, CacheBytes, Path, Step};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by checkpoint combination.
#[derive(Debug, Error, PartialEq)]
pub enum CheckpointError {
    /// Two checkpoints disagree on the shape of the tree or on cached bytes.
    #[error("checkpoints disagree on tree structure and cannot be combined")]
    InconsistentCheckpoints {
        /// The offending sub-checkpoint from the left operand.
        left: Box<Checkpoint>,
        /// The offending sub-checkpoint from the right operand.
        right: Box<Checkpoint>,
    },

    /// Two supposedly disjoint checkpoints both claim the same region.
    #[error("two checkpoints claim the same region of the tree as explored")]
    DoubleClaimedRegion,
}

/// A map from regions of the tree to explored / unexplored.
///
/// Values built through [`Checkpoint::cache`] and [`Checkpoint::choice`] are
/// always kept in simplified form; apply [`simplify`] to checkpoints that
/// arrive raw (e.g. freshly deserialized) before relying on
/// [`Checkpoint::is_fully_explored`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Checkpoint {
    /// Nothing below this node has been explored.
    Unexplored,
    /// Everything below this node has been explored.
    Explored,
    /// A cache node whose value has been consumed; `inner` continues below it.
    Cache {
        /// Encoded cached value, replayed on resume.
        bytes: CacheBytes,
        /// Checkpoint of the continuation.
        inner: Box<Checkpoint>,
    },
    /// A choice node with checkpoints for both branches.
    Choice {
        /// Checkpoint of the left branch.
        left: Box<Checkpoint>,
        /// Checkpoint of the right branch.
        right: Box<Checkpoint>,
    },
}

impl Checkpoint {
    /// Simplifying cache constructor: a fully-explored continuation makes the
    /// whole cache region explored.
    pub fn cache(bytes: CacheBytes, inner: Checkpoint) -> Checkpoint {
        match inner {
            Checkpoint::Explored => Checkpoint::Explored,
            inner => Checkpoint::Cache {
                bytes,
                inner: Box::new(inner),
            },
        }
    }

    /// Simplifying choice constructor: two untouched branches collapse to
    /// `Unexplored`, two finished branches to `Explored`.
    pub fn choice(left: Checkpoint, right: Checkpoint) -> Checkpoint {
        match (left, right) {
            (Checkpoint::Unexplored, Checkpoint::Unexplored) => Checkpoint::Unexplored,
            (Checkpoint::Explored, Checkpoint::Explored) => Checkpoint::Explored,
            (left, right) => Checkpoint::Choice {
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    /// Whether this checkpoint is the fully-explored atom.
    ///
    /// Meaningful on simplified checkpoints, where "no unexplored region"
    /// and "is the `Explored` atom" coincide.
    pub fn is_fully_explored(&self) -> bool {
        matches!(self, Checkpoint::Explored)
    }

    /// Whether any region below this node is marked explored.
    pub fn claims_any_region(&self) -> bool {
        let mut stack = vec![self];
        while let Some(cp) = stack.pop() {
            match cp {
                Checkpoint::Explored => return true,
                Checkpoint::Unexplored => {}
                Checkpoint::Cache { inner, .. } => stack.push(inner),
                Checkpoint::Choice { left, right } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        false
    }
}

impl fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Checkpoint::Unexplored => write!(f, "U"),
            Checkpoint::Explored => write!(f, "E"),
            Checkpoint::Cache { inner, .. } => write!(f, "#({inner:?})"),
            Checkpoint::Choice { left, right } => write!(f, "({left:?}|{right:?})"),
        }
    }
}

/// A rebuild instruction for the explicit-stack combinators.
enum BuildFrame {
    Cache(CacheBytes),
    Choice,
}

/// Work items for the unary explicit-stack combinators.
enum UnaryWork {
    Visit(Checkpoint),
    Build(BuildFrame),
}

/// Rewrites the leaves of a checkpoint bottom-up through the simplifying
/// constructors. `map_leaf` decides what `Unexplored` and `Explored` become.
fn rewrite_leaves(checkpoint: Checkpoint, map_leaf: impl Fn(Checkpoint) -> Checkpoint) -> Checkpoint {
    let mut work = vec![UnaryWork::Visit(checkpoint)];
    let mut results: Vec<Checkpoint> = Vec::new();

    while let Some(item) = work.pop() {
        match item {
            UnaryWork::Visit(cp) => match cp {
                Checkpoint::Unexplored | Checkpoint::Explored => results.push(map_leaf(cp)),
                Checkpoint::Cache { bytes, inner } => {
                    work.push(UnaryWork::Build(BuildFrame::Cache(bytes)));
                    work.push(UnaryWork::Visit(*inner));
                }
                Checkpoint::Choice { left, right } => {
                    work.push(UnaryWork::Build(BuildFrame::Choice));
                    work.push(UnaryWork::Visit(*right));
                    work.push(UnaryWork::Visit(*left));
                }
            },
            UnaryWork::Build(BuildFrame::Cache(bytes)) => {
                let inner = results.pop().expect("cache rebuild requires one result");
                results.push(Checkpoint::cache(bytes, inner));
            }
            UnaryWork::Build(BuildFrame::Choice) => {
                let right = results.pop().expect("choice rebuild requires two results");
                let left = results.pop().expect("choice rebuild requires two results");
                results.push(Checkpoint::choice(left, right));
            }
        }
    }

    results.pop().expect("rewrite leaves exactly one result")
}

/// Swaps `Explored` and `Unexplored` throughout, leaving caches and shape.
///
/// Exploring a checkpoint and its inversion over the same tree together
/// covers exactly the whole tree, each leaf once.
pub fn invert(checkpoint: Checkpoint) -> Checkpoint {
    rewrite_leaves(checkpoint, |leaf| match leaf {
        Checkpoint::Unexplored => Checkpoint::Explored,
        Checkpoint::Explored => Checkpoint::Unexplored,
        other => other,
    })
}

/// Re-applies the simplifying constructors bottom-up.
///
/// Idempotent, and the identity on checkpoints built through the smart
/// constructors; useful for values that arrive raw from deserialization.
pub fn simplify(checkpoint: Checkpoint) -> Checkpoint {
    rewrite_leaves(checkpoint, |leaf| leaf)
}

/// Work items for the binary explicit-stack combinators.
enum BinaryWork {
    Visit(Checkpoint, Checkpoint),
    Build(BuildFrame),
}

/// How [`combine`] treats regions claimed explored by both operands.
#[derive(Clone, Copy, PartialEq)]
enum OverlapPolicy {
    /// Explored dominates: structural union of knowledge.
    Union,
    /// Both operands claiming one region is an error.
    Exclusive,
}

fn combine(
    a: Checkpoint,
    b: Checkpoint,
    policy: OverlapPolicy,
) -> Result<Checkpoint, CheckpointError> {
    let mut work = vec![BinaryWork::Visit(a, b)];
    let mut results: Vec<Checkpoint> = Vec::new();

    while let Some(item) = work.pop() {
        match item {
            BinaryWork::Visit(a, b) => match (a, b) {
                (Checkpoint::Unexplored, other) | (other, Checkpoint::Unexplored) => {
                    results.push(other);
                }
                (Checkpoint::Explored, other) | (other, Checkpoint::Explored) => {
                    if policy == OverlapPolicy::Exclusive && other.claims_any_region() {
                        return Err(CheckpointError::DoubleClaimedRegion);
                    }
                    results.push(Checkpoint::Explored);
                }
                (
                    Checkpoint::Cache { bytes: bytes_a, inner: inner_a },
                    Checkpoint::Cache { bytes: bytes_b, inner: inner_b },
                ) => {
                    if bytes_a != bytes_b {
                        return Err(CheckpointError::InconsistentCheckpoints {
                            left: Box::new(Checkpoint::Cache { bytes: bytes_a, inner: inner_a }),
                            right: Box::new(Checkpoint::Cache { bytes: bytes_b, inner: inner_b }),
                        });
                    }
                    work.push(BinaryWork::Build(BuildFrame::Cache(bytes_a)));
                    work.push(BinaryWork::Visit(*inner_a, *inner_b));
                }
                (
                    Checkpoint::Choice { left: left_a, right: right_a },
                    Checkpoint::Choice { left: left_b, right: right_b },
                ) => {
                    work.push(BinaryWork::Build(BuildFrame::Choice));
                    work.push(BinaryWork::Visit(*right_a, *right_b));
                    work.push(BinaryWork::Visit(*left_a, *left_b));
                }
                (a, b) => {
                    return Err(CheckpointError::InconsistentCheckpoints {
                        left: Box::new(a),
                        right: Box::new(b),
                    });
                }
            },
            BinaryWork::Build(BuildFrame::Cache(bytes)) => {
                let inner = results.pop().expect("cache rebuild requires one result");
                results.push(Checkpoint::cache(bytes, inner));
            }
            BinaryWork::Build(BuildFrame::Choice) => {
                let right = results.pop().expect("choice rebuild requires two results");
                let left = results.pop().expect("choice rebuild requires two results");
                results.push(Checkpoint::choice(left, right));
            }
        }
    }

    Ok(results.pop().expect("combine leaves exactly one result"))
}

/// Structural union of two checkpoints of the same tree.
///
/// `Unexplored` is the identity, `Explored` absorbs, congruent cache and
/// choice nodes recurse. Incongruent shapes or diverging cache bytes raise
/// [`CheckpointError::InconsistentCheckpoints`]. Associative, and
/// commutative on mutually-consistent arguments.
pub fn merge(a: Checkpoint, b: Checkpoint) -> Result<Checkpoint, CheckpointError> {
    combine(a, b, OverlapPolicy::Union)
}

/// Like [`merge`], but raises [`CheckpointError::DoubleClaimedRegion`] when
/// both operands claim the same region explored. Used to validate that
/// outstanding workloads partition the remaining space.
pub fn union_disjoint(a: Checkpoint, b: Checkpoint) -> Result<Checkpoint, CheckpointError> {
    combine(a, b, OverlapPolicy::Exclusive)
}

/// Lifts a sub-checkpoint at the end of a path into root coordinates,
/// marking the untaken siblings `Unexplored`.
///
/// This is the "no claim elsewhere" lift: merging the result into global
/// progress asserts knowledge only inside the path's sub-tree.
pub fn checkpoint_from_initial_path(path: &Path, sub: Checkpoint) -> Checkpoint {
    let mut acc = sub;
    for step in path.steps().rev() {
        acc = match step {
            Step::Cache(bytes) => Checkpoint::cache(bytes.clone(), acc),
            Step::Choice(Branch::Left) => Checkpoint::choice(acc, Checkpoint::Unexplored),
            Step::Choice(Branch::Right) => Checkpoint::choice(Checkpoint::Unexplored, acc),
        };
    }
    acc
}

/// Lifts the node at the end of a path into root coordinates, marking the
/// untaken siblings `Explored`.
///
/// The result is the workload-view checkpoint "everything outside this
/// sub-tree is already handled"; exploring it visits exactly the sub-tree.
pub fn checkpoint_from_unexplored_path(path: &Path) -> Checkpoint {
    let mut acc = Checkpoint::Unexplored;
    for step in path.steps().rev() {
        acc = match step {
            Step::Cache(bytes) => Checkpoint::cache(bytes.clone(), acc),
            Step::Choice(Branch::Left) => Checkpoint::choice(acc, Checkpoint::Explored),
            Step::Choice(Branch::Right) => Checkpoint::choice(Checkpoint::Explored, acc),
        };
    }
    acc
}
