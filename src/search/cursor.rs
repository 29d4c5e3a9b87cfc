//! The three-level cursor protocol: document, then node, then position.
//!
//! A cursor first moves over candidate documents. Once positioned on a
//! document it can enumerate the nodes of that document that satisfy its
//! constraints, in strictly increasing [`NodePath`] order. Term cursors can
//! additionally enumerate token positions inside the current node.
//!
//! Invariants every implementation keeps:
//!
//! - documents are strictly increasing, and a skip never moves backwards;
//! - entering a document resets the node position to `NotStarted`;
//! - once exhausted, a cursor stays exhausted and keeps returning `false`;
//! - `freq_in_node` and `score_in_node` require a current node.
//!
//! [`NodePath`]: crate::index::NodePath

use crate::error::{Error, Result};
use crate::index::types::{DocId, DocPosition, NodePosition, Position, TokenPosition};

/// A cursor over the nodes matched by a (sub)query.
pub trait NodeCursor: Send {
    /// Move to the next candidate document. Returns false once exhausted.
    fn next_candidate(&mut self) -> Result<bool>;

    /// Move to the first candidate `>= target`. A target at or behind the
    /// current document keeps the current document.
    fn skip_to_candidate(&mut self, target: DocId) -> Result<bool>;

    /// Move to the next matching node of the current document.
    fn next_node(&mut self) -> Result<bool>;

    fn doc(&self) -> DocPosition;

    fn node(&self) -> &NodePosition;

    /// Occurrences backing the current node.
    fn freq_in_node(&self) -> Result<u32>;

    /// Score of the current node. Takes `&mut self` because optional clauses
    /// are only advanced when a score is requested.
    fn score_in_node(&mut self) -> Result<f32>;

    /// Estimated number of candidate documents, used to order conjunctions.
    fn cost(&self) -> u64;
}

/// A cursor that also exposes token positions inside the current node.
pub trait PositionCursor: NodeCursor {
    fn next_position(&mut self) -> Result<bool>;

    fn position(&self) -> Position<TokenPosition>;
}

pub type BoxedCursor = Box<dyn NodeCursor>;

#[inline]
pub(crate) fn not_on_node() -> Error {
    Error::UnsupportedOperation("cursor is not positioned on a node")
}

/// Fails unless `node` is a real node.
#[inline]
pub(crate) fn require_node(node: &NodePosition) -> Result<()> {
    if node.is_at() { Ok(()) } else { Err(not_on_node()) }
}

/// Cursor that never matches.
#[derive(Debug, Default)]
pub struct EmptyCursor {
    doc: DocPosition,
    node: NodePosition,
}

impl EmptyCursor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NodeCursor for EmptyCursor {
    fn next_candidate(&mut self) -> Result<bool> {
        self.doc = Position::Exhausted;
        Ok(false)
    }

    fn skip_to_candidate(&mut self, _target: DocId) -> Result<bool> {
        self.doc = Position::Exhausted;
        Ok(false)
    }

    fn next_node(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn doc(&self) -> DocPosition {
        self.doc
    }

    fn node(&self) -> &NodePosition {
        &self.node
    }

    fn freq_in_node(&self) -> Result<u32> {
        Err(not_on_node())
    }

    fn score_in_node(&mut self) -> Result<f32> {
        Err(not_on_node())
    }

    fn cost(&self) -> u64 {
        0
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory cursor over literal postings, used to exercise combinators
    //! without building a segment.

    use super::*;
    use crate::index::node_path::NodePath;

    /// One document: its id and `(node, freq)` pairs in path order.
    pub type Doc = (DocId, Vec<(NodePath, u32)>);

    pub struct VecCursor {
        docs: Vec<Doc>,
        index: Option<usize>,
        node_index: Option<usize>,
        doc: DocPosition,
        node: NodePosition,
        weight: f32,
    }

    impl VecCursor {
        pub fn new(docs: Vec<Doc>) -> Self {
            Self {
                docs,
                index: None,
                node_index: None,
                doc: Position::NotStarted,
                node: Position::NotStarted,
                weight: 1.0,
            }
        }

        pub fn with_weight(mut self, weight: f32) -> Self {
            self.weight = weight;
            self
        }

        pub fn boxed(self) -> BoxedCursor {
            Box::new(self)
        }

        fn enter(&mut self, index: usize) -> bool {
            if index >= self.docs.len() {
                self.index = Some(self.docs.len());
                self.doc = Position::Exhausted;
                self.node = Position::NotStarted;
                return false;
            }
            self.index = Some(index);
            self.doc = Position::At(self.docs[index].0);
            self.node = Position::NotStarted;
            self.node_index = None;
            true
        }
    }

    /// Shorthand: documents where each node has frequency one.
    pub fn docs(layout: &[(DocId, &[&[u32]])]) -> Vec<Doc> {
        layout.iter()
            .map(|(doc, nodes)| (*doc, nodes.iter().map(|n| (NodePath::from(*n), 1)).collect()))
            .collect()
    }

    impl NodeCursor for VecCursor {
        fn next_candidate(&mut self) -> Result<bool> {
            if self.doc.is_exhausted() {
                return Ok(false);
            }
            let next = self.index.map_or(0, |i| i + 1);
            Ok(self.enter(next))
        }

        fn skip_to_candidate(&mut self, target: DocId) -> Result<bool> {
            match self.doc {
                Position::Exhausted => return Ok(false),
                Position::At(doc) if doc >= target => return Ok(true),
                _ => {}
            }
            let start = self.index.map_or(0, |i| i + 1);
            let offset = self.docs[start.min(self.docs.len())..]
                .iter()
                .position(|(doc, _)| *doc >= target)
                .unwrap_or(self.docs.len());
            Ok(self.enter(start + offset))
        }

        fn next_node(&mut self) -> Result<bool> {
            let Some(index) = self.index.filter(|_| self.doc.is_at()) else {
                return Ok(false);
            };
            if self.node.is_exhausted() {
                return Ok(false);
            }
            let next = self.node_index.map_or(0, |i| i + 1);
            let nodes = &self.docs[index].1;
            if next < nodes.len() {
                self.node_index = Some(next);
                self.node = Position::At(nodes[next].0.clone());
                Ok(true)
            } else {
                self.node_index = Some(nodes.len());
                self.node = Position::Exhausted;
                Ok(false)
            }
        }

        fn doc(&self) -> DocPosition {
            self.doc
        }

        fn node(&self) -> &NodePosition {
            &self.node
        }

        fn freq_in_node(&self) -> Result<u32> {
            require_node(&self.node)?;
            match (self.index, self.node_index) {
                (Some(d), Some(n)) => Ok(self.docs[d].1[n].1),
                _ => Err(not_on_node()),
            }
        }

        fn score_in_node(&mut self) -> Result<f32> {
            Ok(self.freq_in_node()? as f32 * self.weight)
        }

        fn cost(&self) -> u64 {
            self.docs.len() as u64
        }
    }

    /// Drain a cursor into `(doc, node)` pairs.
    pub fn collect(cursor: &mut dyn NodeCursor) -> Result<Vec<(DocId, NodePath)>> {
        let mut out = Vec::new();
        while cursor.next_candidate()? {
            let Position::At(doc) = cursor.doc() else {
                break;
            };
            while cursor.next_node()? {
                if let Position::At(node) = cursor.node() {
                    out.push((doc, node.clone()));
                }
            }
        }
        Ok(out)
    }

    /// `(doc, node)` shorthand for expected results.
    pub fn hits(layout: &[(DocId, &[u32])]) -> Vec<(DocId, NodePath)> {
        layout.iter().map(|(d, n)| (*d, NodePath::from(*n))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_empty_cursor_is_idempotent() {
        let mut cursor = EmptyCursor::new();
        for _ in 0..3 {
            assert!(!cursor.next_candidate().unwrap());
            assert_eq!(cursor.doc(), Position::Exhausted);
        }
        assert!(!cursor.skip_to_candidate(4).unwrap());
        assert!(matches!(cursor.score_in_node(), Err(Error::UnsupportedOperation(_))));
    }

    #[test]
    fn test_vec_cursor_skip_never_regresses() {
        let mut cursor = VecCursor::new(docs(&[(1, &[&[0]]), (4, &[&[0]]), (9, &[&[0]])]));
        assert!(cursor.skip_to_candidate(3).unwrap());
        assert_eq!(cursor.doc(), Position::At(4));
        assert!(cursor.skip_to_candidate(2).unwrap());
        assert_eq!(cursor.doc(), Position::At(4));
        assert!(!cursor.skip_to_candidate(10).unwrap());
        assert!(!cursor.next_candidate().unwrap());
        assert_eq!(cursor.doc(), Position::Exhausted);
    }

    #[test]
    fn test_score_requires_node() {
        let mut cursor = VecCursor::new(docs(&[(1, &[&[0]])]));
        assert!(cursor.next_candidate().unwrap());
        assert!(matches!(cursor.freq_in_node(), Err(Error::UnsupportedOperation(_))));
        assert!(cursor.next_node().unwrap());
        assert_eq!(cursor.freq_in_node().unwrap(), 1);
        assert!(!cursor.next_node().unwrap());
        assert!(cursor.score_in_node().is_err());
    }
}
