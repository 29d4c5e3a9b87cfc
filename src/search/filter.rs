//! Structural filters over a cursor's nodes.
//!
//! Filters never reject documents themselves: a candidate whose nodes are
//! all filtered out simply yields no node.

use crate::error::Result;
use crate::index::node_path::{IntervalConstraint, LevelConstraint, NodeConstraints, NodePath};
use crate::index::types::{DocId, DocPosition, NodePosition, Position};
use crate::search::cursor::{BoxedCursor, NodeCursor, require_node};

/// Keeps the inner nodes accepted by a set of level / interval constraints.
pub struct NodeFilter {
    inner: BoxedCursor,
    constraints: NodeConstraints,
}

impl NodeFilter {
    pub fn new(inner: BoxedCursor, constraints: NodeConstraints) -> Self {
        Self { inner, constraints }
    }

    /// Only nodes at exactly `level`
    pub fn level(inner: BoxedCursor, level: LevelConstraint) -> Self {
        Self::new(
            inner,
            NodeConstraints {
                level: Some(level),
                interval: None,
            },
        )
    }

    /// Only nodes whose component at the interval's level is in range
    pub fn interval(inner: BoxedCursor, interval: IntervalConstraint) -> Self {
        Self::new(
            inner,
            NodeConstraints {
                level: None,
                interval: Some(interval),
            },
        )
    }
}

impl NodeCursor for NodeFilter {
    fn next_candidate(&mut self) -> Result<bool> {
        self.inner.next_candidate()
    }

    fn skip_to_candidate(&mut self, target: DocId) -> Result<bool> {
        self.inner.skip_to_candidate(target)
    }

    fn next_node(&mut self) -> Result<bool> {
        while self.inner.next_node()? {
            if let Position::At(node) = self.inner.node() {
                if self.constraints.accepts(node) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn doc(&self) -> DocPosition {
        self.inner.doc()
    }

    fn node(&self) -> &NodePosition {
        self.inner.node()
    }

    fn freq_in_node(&self) -> Result<u32> {
        self.inner.freq_in_node()
    }

    fn score_in_node(&mut self) -> Result<f32> {
        self.inner.score_in_node()
    }

    fn cost(&self) -> u64 {
        self.inner.cost()
    }
}

/// Reports, for every inner node deep enough, its ancestor at `level`.
///
/// Consecutive inner nodes under the same ancestor are merged into a single
/// reported node whose freq and score are the sums over the group.
pub struct AncestorProjection {
    inner: BoxedCursor,
    level: u32,
    node: NodePosition,
    freq: u32,
    score: f32,
    /// The inner cursor already sits on the first node of the next group
    pending: bool,
}

impl AncestorProjection {
    pub fn new(inner: BoxedCursor, level: u32) -> Self {
        Self {
            inner,
            level,
            node: Position::NotStarted,
            freq: 0,
            score: 0.0,
            pending: false,
        }
    }

    fn reset_doc(&mut self) {
        self.node = Position::NotStarted;
        self.pending = false;
    }

    /// Advance the inner cursor to its next node that has an ancestor at `level`.
    fn advance_inner(&mut self) -> Result<bool> {
        while self.inner.next_node()? {
            if let Position::At(node) = self.inner.node() {
                if node.len() > self.level as usize {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn inner_projection(&self) -> Option<NodePath> {
        self.inner.node().at().and_then(|n| n.ancestor_at(self.level))
    }
}

impl NodeCursor for AncestorProjection {
    fn next_candidate(&mut self) -> Result<bool> {
        self.reset_doc();
        self.inner.next_candidate()
    }

    fn skip_to_candidate(&mut self, target: DocId) -> Result<bool> {
        if self.inner.doc().value().is_some_and(|doc| doc >= target) {
            return Ok(true);
        }
        self.reset_doc();
        self.inner.skip_to_candidate(target)
    }

    fn next_node(&mut self) -> Result<bool> {
        if !self.inner.doc().is_at() || self.node.is_exhausted() {
            return Ok(false);
        }
        if !self.pending && !self.advance_inner()? {
            self.node = Position::Exhausted;
            return Ok(false);
        }
        let Some(head) = self.inner_projection() else {
            self.node = Position::Exhausted;
            return Ok(false);
        };

        self.freq = self.inner.freq_in_node()?;
        self.score = self.inner.score_in_node()?;
        self.pending = false;
        while self.advance_inner()? {
            if self.inner_projection().as_ref() == Some(&head) {
                self.freq += self.inner.freq_in_node()?;
                self.score += self.inner.score_in_node()?;
            } else {
                self.pending = true;
                break;
            }
        }
        self.node = Position::At(head);
        Ok(true)
    }

    fn doc(&self) -> DocPosition {
        self.inner.doc()
    }

    fn node(&self) -> &NodePosition {
        &self.node
    }

    fn freq_in_node(&self) -> Result<u32> {
        require_node(&self.node)?;
        Ok(self.freq)
    }

    fn score_in_node(&mut self) -> Result<f32> {
        require_node(&self.node)?;
        Ok(self.score)
    }

    fn cost(&self) -> u64 {
        self.inner.cost()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::cursor::testing::*;

    #[test]
    fn test_level_filter() {
        let inner = VecCursor::new(docs(&[
            (0, &[&[0], &[0, 0], &[0, 1], &[1, 0, 0]]),
            (1, &[&[2]]),
        ]));
        let mut filter = NodeFilter::level(inner.boxed(), LevelConstraint(1));
        assert_eq!(
            collect(&mut filter).unwrap(),
            hits(&[(0, &[0, 0]), (0, &[0, 1])])
        );
    }

    #[test]
    fn test_interval_filter() {
        let inner = VecCursor::new(docs(&[(3, &[&[0, 0], &[0, 1], &[0, 2], &[0, 3], &[1]])]));
        let mut filter = NodeFilter::interval(inner.boxed(), IntervalConstraint::new(1, 1, 2));
        assert_eq!(collect(&mut filter).unwrap(), hits(&[(3, &[0, 1]), (3, &[0, 2])]));
    }

    #[test]
    fn test_ancestor_projection_merges_siblings() {
        let inner = VecCursor::new(docs(&[
            (0, &[&[0], &[0, 0, 1], &[0, 1], &[2, 4]]),
            (5, &[&[1]]),
        ]));
        let mut projection = AncestorProjection::new(inner.boxed(), 0);
        assert!(projection.next_candidate().unwrap());
        assert!(projection.next_node().unwrap());
        assert_eq!(projection.node().at(), Some(&NodePath::from([0])));
        // [0], [0,0,1] and [0,1] all project onto [0]
        assert_eq!(projection.freq_in_node().unwrap(), 3);
        assert!(projection.next_node().unwrap());
        assert_eq!(projection.node().at(), Some(&NodePath::from([2])));
        assert!(!projection.next_node().unwrap());
        assert!(projection.next_candidate().unwrap());
        assert!(projection.next_node().unwrap());
        assert!(!projection.next_candidate().unwrap());
    }

    #[test]
    fn test_ancestor_projection_skips_shallow_nodes() {
        let inner = VecCursor::new(docs(&[(0, &[&[0], &[0, 2, 1], &[1]])]));
        let mut projection = AncestorProjection::new(inner.boxed(), 1);
        assert_eq!(collect(&mut projection).unwrap(), hits(&[(0, &[0, 2])]));
    }
}
