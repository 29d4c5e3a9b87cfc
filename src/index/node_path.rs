//! Node paths: addresses of nodes inside the tree embedded in a document.
//!
//! A path is the sequence of child ordinals from the (virtual) root down to
//! the node, e.g. `[0, 2]` is the third child of the first top-level node.
//! Paths order lexicographically with a prefix sorting before any of its
//! extensions, so all descendants of a node form one contiguous run right
//! after it.
//!
//! Levels are component indices: `[0]` sits at level 0, `[0, 2]` at level 1.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Location of a node inside a document's tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodePath(Vec<u32>);

impl NodePath {
    /// The virtual root, `[]`.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    #[inline]
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Level of the node, `None` for the virtual root.
    #[inline]
    pub fn level(&self) -> Option<u32> {
        (self.0.len() as u32).checked_sub(1)
    }

    /// Component at `level`, if the path is deep enough.
    #[inline]
    pub fn component(&self, level: u32) -> Option<u32> {
        self.0.get(level as usize).copied()
    }

    /// True iff `self` is a proper prefix of `other`.
    #[inline]
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// True iff one of the two paths is a prefix of the other (or they are equal).
    #[inline]
    pub fn is_related_to(&self, other: &NodePath) -> bool {
        let shared = self.0.len().min(other.0.len());
        self.0[..shared] == other.0[..shared]
    }

    /// Ancestor (or self) truncated to `level`, `None` when the path is shallower.
    pub fn ancestor_at(&self, level: u32) -> Option<NodePath> {
        let len = level as usize + 1;
        (self.0.len() >= len).then(|| NodePath(self.0[..len].to_vec()))
    }

    /// Number of leading components shared with `other`.
    pub fn common_prefix_len(&self, other: &NodePath) -> usize {
        self.0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count()
    }

    pub fn push(&mut self, component: u32) {
        self.0.push(component);
    }

    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }
}

impl From<Vec<u32>> for NodePath {
    fn from(components: Vec<u32>) -> Self {
        Self(components)
    }
}

impl From<&[u32]> for NodePath {
    fn from(components: &[u32]) -> Self {
        Self(components.to_vec())
    }
}

impl<const N: usize> From<[u32; N]> for NodePath {
    fn from(components: [u32; N]) -> Self {
        Self(components.to_vec())
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, "]")
    }
}

/// Structural comparison used by twig evaluation.
///
/// Returns `Equal` when `ancestor` is a proper ancestor of `descendant`,
/// `Greater` when the descendant side sorts at or before the ancestor without
/// being below it (the descendant must advance), and `Less` when the
/// descendant is already past the ancestor's subtree (the ancestor must
/// advance).
pub fn compare_ancestor(ancestor: &NodePath, descendant: &NodePath) -> Ordering {
    if ancestor.is_ancestor_of(descendant) {
        Ordering::Equal
    } else if descendant <= ancestor {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

/// Exact-depth restriction: only nodes at `level` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelConstraint(pub u32);

impl LevelConstraint {
    #[inline]
    pub fn accepts(&self, path: &NodePath) -> bool {
        path.level() == Some(self.0)
    }
}

/// Range restriction on the component found at `level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntervalConstraint {
    pub level: u32,
    pub lower: u32,
    pub upper: u32,
}

impl IntervalConstraint {
    pub fn new(level: u32, lower: u32, upper: u32) -> Self {
        Self {
            level,
            lower,
            upper,
        }
    }

    #[inline]
    pub fn accepts(&self, path: &NodePath) -> bool {
        path.component(self.level)
            .is_some_and(|c| c >= self.lower && c <= self.upper)
    }
}

/// Constraints attached to a query node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeConstraints {
    pub level: Option<LevelConstraint>,
    pub interval: Option<IntervalConstraint>,
}

impl NodeConstraints {
    pub fn is_empty(&self) -> bool {
        self.level.is_none() && self.interval.is_none()
    }

    pub fn accepts(&self, path: &NodePath) -> bool {
        self.level.is_none_or(|l| l.accepts(path)) && self.interval.is_none_or(|i| i.accepts(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p<const N: usize>(c: [u32; N]) -> NodePath {
        NodePath::from(c)
    }

    #[test]
    fn test_ordering_prefix_first() {
        let mut paths = vec![p([1]), p([0, 1]), p([0]), p([0, 0, 5]), p([0, 0])];
        paths.sort();
        assert_eq!(paths, vec![p([0]), p([0, 0]), p([0, 0, 5]), p([0, 1]), p([1])]);
        assert!(NodePath::root() < p([0]));
    }

    #[test]
    fn test_ancestor_law() {
        let cases = [
            (p([0]), p([0, 1]), true),
            (p([0]), p([0, 1, 3]), true),
            (NodePath::root(), p([4]), true),
            (p([0, 1]), p([0, 1]), false),
            (p([0, 1]), p([0]), false),
            (p([1]), p([0, 1]), false),
            (p([0, 2]), p([0, 1, 2]), false),
        ];
        for (a, b, expected) in cases {
            assert_eq!(a.is_ancestor_of(&b), expected, "{} / {}", a, b);
            let proper_prefix = a.len() < b.len() && b.components()[..a.len()] == *a.components();
            assert_eq!(a.is_ancestor_of(&b), proper_prefix);
        }
        assert_eq!(p([3, 4]).cmp(&p([3, 4])), Ordering::Equal);
    }

    #[test]
    fn test_compare_ancestor() {
        assert_eq!(compare_ancestor(&p([0]), &p([0, 0])), Ordering::Equal);
        // descendant behind: equal path, ancestor path, earlier sibling subtree
        assert_eq!(compare_ancestor(&p([1]), &p([1])), Ordering::Greater);
        assert_eq!(compare_ancestor(&p([1]), &p([0, 5])), Ordering::Greater);
        assert_eq!(compare_ancestor(&p([1, 2]), &p([1])), Ordering::Greater);
        // ancestor behind
        assert_eq!(compare_ancestor(&p([1]), &p([2, 0])), Ordering::Less);
    }

    #[test]
    fn test_ancestor_at() {
        let path = p([2, 7, 1]);
        assert_eq!(path.ancestor_at(0), Some(p([2])));
        assert_eq!(path.ancestor_at(2), Some(path.clone()));
        assert_eq!(path.ancestor_at(3), None);
        assert_eq!(path.level(), Some(2));
        assert_eq!(NodePath::root().level(), None);
    }

    #[test]
    fn test_constraints() {
        let constraints = NodeConstraints {
            level: Some(LevelConstraint(1)),
            interval: Some(IntervalConstraint::new(1, 1, 2)),
        };
        assert!(!constraints.accepts(&p([0, 0])));
        assert!(constraints.accepts(&p([0, 1])));
        assert!(constraints.accepts(&p([5, 2])));
        assert!(!constraints.accepts(&p([0, 1, 0])));
        assert!(!constraints.accepts(&p([1])));
    }

    #[test]
    fn test_related() {
        assert!(p([0]).is_related_to(&p([0, 3])));
        assert!(p([0, 3]).is_related_to(&p([0])));
        assert!(p([0, 3]).is_related_to(&p([0, 3])));
        assert!(!p([0, 3]).is_related_to(&p([0, 4])));
    }
}
