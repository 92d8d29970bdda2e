//! Tree addressing: branch choices, path steps, and full paths.
//!
//! A [`Path`] identifies a unique node in a search tree by replay: each
//! [`Step`] either picks a branch of a choice node or supplies the encoded
//! bytes of a cached value so the cache effect can be skipped. The
//! branch-only abstraction of a path is a [`Location`] (see the
//! [`location`] submodule).

pub mod location;

pub use location::Location;

use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of a binary choice node.
///
/// Ordered `Left < Right` so that derived orderings over branch sequences
/// match the left-to-right exploration order of the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Branch {
    /// The left sub-tree, always explored first.
    Left,
    /// The right sub-tree.
    Right,
}

impl Branch {
    /// Returns the opposite branch.
    pub fn sibling(self) -> Branch {
        match self {
            Branch::Left => Branch::Right,
            Branch::Right => Branch::Left,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Left => write!(f, "L"),
            Branch::Right => write!(f, "R"),
        }
    }
}

/// Opaque encoded bytes of a cached value.
///
/// Produced by a cache node's effect and replayed verbatim when resuming
/// from a checkpoint. The framework never interprets the contents; it only
/// requires bit-exact round-trips.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheBytes(Vec<u8>);

impl CacheBytes {
    /// Wraps encoded bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        CacheBytes(bytes)
    }

    /// Borrows the encoded bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Length of the encoded bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the encoding is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for CacheBytes {
    fn from(bytes: Vec<u8>) -> Self {
        CacheBytes(bytes)
    }
}

impl fmt::Debug for CacheBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full dumps of cached values drown logs; show length and a short prefix.
        let prefix: Vec<u8> = self.0.iter().take(8).copied().collect();
        write!(f, "CacheBytes({} bytes, {:02x?}..)", self.0.len(), prefix)
    }
}

/// One step of a [`Path`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Step {
    /// Descend into the given branch of a choice node.
    Choice(Branch),
    /// Skip a cache node, resuming its continuation from the stored bytes.
    Cache(CacheBytes),
}

impl Step {
    /// The branch taken by this step, if it is a choice step.
    pub fn branch(&self) -> Option<Branch> {
        match self {
            Step::Choice(branch) => Some(*branch),
            Step::Cache(_) => None,
        }
    }
}

/// A sequence of steps identifying one node of the tree by replay.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Step>);

impl Path {
    /// The empty path, addressing the root of the tree.
    pub fn root() -> Self {
        Path(Vec::new())
    }

    /// Builds a path from explicit steps.
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Path(steps)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the root path.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends one step.
    pub fn push(&mut self, step: Step) {
        self.0.push(step);
    }

    /// Returns this path extended by one step.
    pub fn child(&self, step: Step) -> Path {
        let mut steps = self.0.clone();
        steps.push(step);
        Path(steps)
    }

    /// Concatenates two paths.
    pub fn join(&self, suffix: &Path) -> Path {
        let mut steps = self.0.clone();
        steps.extend_from_slice(&suffix.0);
        Path(steps)
    }

    /// Iterates over the steps from the root outward.
    pub fn steps(&self) -> std::slice::Iter<'_, Step> {
        self.0.iter()
    }

    /// The branch-only projection of this path.
    pub fn location(&self) -> Location {
        Location::from_branches(self.0.iter().filter_map(Step::branch))
    }
}

// Paths print as a compact trail ("L.R.#") rather than a vector dump.
impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path[")?;
        for (i, step) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            match step {
                Step::Choice(branch) => write!(f, "{branch}")?,
                Step::Cache(_) => write!(f, "#")?,
            }
        }
        write!(f, "]")
    }
}
