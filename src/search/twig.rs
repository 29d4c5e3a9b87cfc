use crate::error::Result;
use crate::index::node_path::compare_ancestor;
use crate::index::types::{DocId, DocPosition, NodePosition, Position};
use crate::search::conjunction::{align_docs, skip_all, start_all};
use crate::search::cursor::{BoxedCursor, NodeCursor, require_node};
use std::cmp::Ordering;

/// Matches root nodes that are an ancestor of a node of every descendant
/// cursor. The reported node is the root's, and its freq and score add up
/// every descendant node inside the root's subtree.
///
/// Root nodes must not nest (the planner pins them to one level): descendant
/// nodes consumed by one root are not revisited for the next.
pub struct TwigConjunction {
    /// Index 0 is the root, the rest are descendants
    cursors: Vec<BoxedCursor>,
    doc: DocPosition,
    node: NodePosition,
    freq: u32,
    score: f32,
}

impl TwigConjunction {
    pub fn new(root: BoxedCursor, descendants: Vec<BoxedCursor>) -> Self {
        let mut cursors = Vec::with_capacity(descendants.len() + 1);
        cursors.push(root);
        cursors.extend(descendants);
        Self {
            cursors,
            doc: Position::NotStarted,
            node: Position::NotStarted,
            freq: 0,
            score: 0.0,
        }
    }

    fn settle(&mut self, doc: Option<DocId>) -> bool {
        self.node = Position::NotStarted;
        match doc {
            Some(doc) => {
                self.doc = Position::At(doc);
                true
            }
            None => {
                self.doc = Position::Exhausted;
                false
            }
        }
    }

    /// Where descendant `i` stands relative to the current root node.
    /// `Greater` means the descendant must advance.
    fn compare(&self, i: usize) -> Option<Ordering> {
        let root = self.cursors[0].node().at()?;
        match self.cursors[i].node() {
            Position::NotStarted => Some(Ordering::Greater),
            Position::At(node) => Some(compare_ancestor(root, node)),
            Position::Exhausted => None,
        }
    }

    /// Sum freq and score of the root node and of every descendant node in
    /// its subtree, leaving each descendant past the subtree.
    fn collect_match(&mut self) -> Result<()> {
        self.freq = self.cursors[0].freq_in_node()?;
        self.score = self.cursors[0].score_in_node()?;
        for i in 1..self.cursors.len() {
            loop {
                self.freq += self.cursors[i].freq_in_node()?;
                self.score += self.cursors[i].score_in_node()?;
                if !self.cursors[i].next_node()? || self.compare(i) != Some(Ordering::Equal) {
                    break;
                }
            }
        }
        Ok(())
    }
}

impl NodeCursor for TwigConjunction {
    fn next_candidate(&mut self) -> Result<bool> {
        let advanced = match self.doc {
            Position::Exhausted => return Ok(false),
            Position::At(_) => self.cursors[0].next_candidate()?,
            Position::NotStarted => start_all(&mut self.cursors)?,
        };
        let doc = if advanced { align_docs(&mut self.cursors)? } else { None };
        Ok(self.settle(doc))
    }

    fn skip_to_candidate(&mut self, target: DocId) -> Result<bool> {
        match self.doc {
            Position::Exhausted => return Ok(false),
            Position::At(doc) if doc >= target => return Ok(true),
            _ => {}
        }
        let doc = if skip_all(&mut self.cursors, target)? {
            align_docs(&mut self.cursors)?
        } else {
            None
        };
        Ok(self.settle(doc))
    }

    fn next_node(&mut self) -> Result<bool> {
        if !self.doc.is_at() || self.node.is_exhausted() {
            return Ok(false);
        }
        'root: while self.cursors[0].next_node()? {
            for i in 1..self.cursors.len() {
                loop {
                    match self.compare(i) {
                        Some(Ordering::Greater) => {
                            if !self.cursors[i].next_node()? {
                                self.node = Position::Exhausted;
                                return Ok(false);
                            }
                        }
                        // root behind: move to its next node
                        Some(Ordering::Less) => continue 'root,
                        Some(Ordering::Equal) => break,
                        None => {
                            self.node = Position::Exhausted;
                            return Ok(false);
                        }
                    }
                }
            }
            self.collect_match()?;
            self.node = self.cursors[0].node().clone();
            return Ok(true);
        }
        self.node = Position::Exhausted;
        Ok(false)
    }

    fn doc(&self) -> DocPosition {
        self.doc
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
        self.cursors.iter().map(|c| c.cost()).min().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::cursor::testing::*;

    #[test]
    fn test_root_must_contain_every_descendant() {
        let root = VecCursor::new(docs(&[(0, &[&[0], &[1], &[2]]), (1, &[&[0]])]));
        let a = VecCursor::new(docs(&[(0, &[&[0, 3], &[2, 0]]), (1, &[&[0, 0]])]));
        let b = VecCursor::new(docs(&[(0, &[&[1, 1], &[2, 5, 1]]), (1, &[&[1, 0]])]));
        let mut twig = TwigConjunction::new(root.boxed(), vec![a.boxed(), b.boxed()]);
        // only [2] has both descendants in doc 0; doc 1 has b outside [0]
        assert_eq!(collect(&mut twig).unwrap(), hits(&[(0, &[2])]));
    }

    #[test]
    fn test_descendant_exhaustion_ends_node_iteration() {
        let root = VecCursor::new(docs(&[(4, &[&[0], &[1]])]));
        let child = VecCursor::new(docs(&[(4, &[&[0, 1]])]));
        let mut twig = TwigConjunction::new(root.boxed(), vec![child.boxed()]);
        assert!(twig.next_candidate().unwrap());
        assert!(twig.next_node().unwrap());
        assert_eq!(twig.node(), &Position::At(crate::index::NodePath::from([0])));
        assert_eq!(twig.freq_in_node().unwrap(), 2);
        assert!(!twig.next_node().unwrap());
        assert!(!twig.next_node().unwrap());
    }

    #[test]
    fn test_every_descendant_node_in_subtree_counts() {
        let root = VecCursor::new(docs(&[(0, &[&[0], &[1]])]));
        let child = VecCursor::new(docs(&[(0, &[&[0, 0], &[0, 1], &[0, 4, 2], &[1, 3]])]));
        let mut twig = TwigConjunction::new(root.boxed(), vec![child.boxed()]);
        assert!(twig.next_candidate().unwrap());

        assert!(twig.next_node().unwrap());
        assert_eq!(twig.node(), &Position::At(crate::index::NodePath::from([0])));
        assert_eq!(twig.freq_in_node().unwrap(), 4);
        assert!(twig.next_node().unwrap());
        assert_eq!(twig.node(), &Position::At(crate::index::NodePath::from([1])));
        assert_eq!(twig.freq_in_node().unwrap(), 2);
        assert!(!twig.next_node().unwrap());
    }

    #[test]
    fn test_root_equal_to_descendant_is_not_a_match() {
        let root = VecCursor::new(docs(&[(0, &[&[0, 1]])]));
        let child = VecCursor::new(docs(&[(0, &[&[0, 1]])]));
        let mut twig = TwigConjunction::new(root.boxed(), vec![child.boxed()]);
        assert!(collect(&mut twig).unwrap().is_empty());
    }
}
