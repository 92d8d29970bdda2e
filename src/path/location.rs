//! Branch-only tree coordinates.
//!
//! A [`Location`] is the address of a node as the sequence of left/right
//! turns taken from the root, forgetting cache steps. Locations carry a
//! total order matching the left-to-right exploration order: an ancestor
//! sorts before its descendants, and everything in a left sub-tree sorts
//! before anything in the corresponding right sub-tree.

use super::Branch;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The branch-only coordinate of one node of the tree.
///
/// The root is the empty (identity) location; [`Location::append`] composes
/// coordinates, so `root.append(x) == x` and appending a child coordinate
/// to a sub-tree location addresses the node inside the sub-tree.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    branches: Vec<Branch>,
}

impl Location {
    /// The root coordinate.
    pub fn root() -> Self {
        Location::default()
    }

    /// Builds a location from a branch sequence.
    pub fn from_branches<I: IntoIterator<Item = Branch>>(branches: I) -> Self {
        Location {
            branches: branches.into_iter().collect(),
        }
    }

    /// The branch sequence, root outward.
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Whether this is the root.
    pub fn is_root(&self) -> bool {
        self.branches.is_empty()
    }

    /// Number of branches below the root.
    pub fn depth(&self) -> usize {
        self.branches.len()
    }

    /// Composes two coordinates: `self` then `child` inside it.
    pub fn append(&self, child: &Location) -> Location {
        let mut branches = self.branches.clone();
        branches.extend_from_slice(&child.branches);
        Location { branches }
    }

    /// The left child of this node.
    pub fn left_child(&self) -> Location {
        self.child(Branch::Left)
    }

    /// The right child of this node.
    pub fn right_child(&self) -> Location {
        self.child(Branch::Right)
    }

    /// The child of this node down the given branch.
    pub fn child(&self, branch: Branch) -> Location {
        let mut branches = self.branches.clone();
        branches.push(branch);
        Location { branches }
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location[")?;
        for branch in &self.branches {
            write!(f, "{branch}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_identity_for_append() {
        let root = Location::root();
        let node = Location::from_branches([Branch::Left, Branch::Right]);
        assert_eq!(root.append(&node), node);
        assert_eq!(node.append(&root), node);
    }

    #[test]
    fn test_append_is_associative() {
        let a = Location::from_branches([Branch::Left]);
        let b = Location::from_branches([Branch::Right, Branch::Right]);
        let c = Location::from_branches([Branch::Left, Branch::Left]);
        assert_eq!(a.append(&b).append(&c), a.append(&b.append(&c)));
    }

    #[test]
    fn test_order_matches_exploration_order() {
        let root = Location::root();
        let left = root.left_child();
        let left_left = left.left_child();
        let left_right = left.right_child();
        let right = root.right_child();

        // Ancestors come first, then everything under left, then right.
        let mut locations = vec![right.clone(), left_right.clone(), left_left.clone(), left.clone(), root.clone()];
        locations.sort();
        assert_eq!(locations, vec![root, left, left_left, left_right, right]);
    }

    #[test]
    fn test_branch_round_trip() {
        let branches = vec![Branch::Left, Branch::Right, Branch::Right, Branch::Left];
        let location = Location::from_branches(branches.clone());
        assert_eq!(location.branches(), branches.as_slice());
        assert_eq!(Location::from_branches(location.branches().iter().copied()), location);
    }

    #[test]
    fn test_children_extend_depth() {
        let node = Location::root().left_child().right_child();
        assert_eq!(node.depth(), 2);
        assert_eq!(node.branches(), &[Branch::Left, Branch::Right]);
    }
}
