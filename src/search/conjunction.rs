use crate::error::Result;
use crate::index::types::{DocId, DocPosition, NodePosition, Position};
use crate::search::cursor::{BoxedCursor, NodeCursor, require_node};

/// Skip every cursor to the largest current doc until they all agree.
/// Returns the agreed doc, or `None` once any cursor is exhausted.
pub(crate) fn align_docs(cursors: &mut [BoxedCursor]) -> Result<Option<DocId>> {
    loop {
        let mut target = 0;
        for cursor in cursors.iter() {
            match cursor.doc() {
                Position::At(doc) => target = target.max(doc),
                _ => return Ok(None),
            }
        }
        let mut aligned = true;
        for cursor in cursors.iter_mut() {
            if !cursor.skip_to_candidate(target)? {
                return Ok(None);
            }
            aligned &= cursor.doc() == Position::At(target);
        }
        if aligned {
            return Ok(Some(target));
        }
    }
}

/// Move every cursor to its first candidate. False if any is empty.
pub(crate) fn start_all(cursors: &mut [BoxedCursor]) -> Result<bool> {
    for cursor in cursors.iter_mut() {
        if !cursor.next_candidate()? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Skip every cursor to `target`. False if any runs out.
pub(crate) fn skip_all(cursors: &mut [BoxedCursor], target: DocId) -> Result<bool> {
    for cursor in cursors.iter_mut() {
        if !cursor.skip_to_candidate(target)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Matches the nodes every child matches.
///
/// Documents are intersected by skipping laggards to the furthest child;
/// inside a document the child with the smallest node is advanced until all
/// children agree.
pub struct NodeConjunction {
    children: Vec<BoxedCursor>,
    doc: DocPosition,
    node: NodePosition,
}

impl NodeConjunction {
    pub fn new(mut children: Vec<BoxedCursor>) -> Self {
        // cheapest child leads
        children.sort_by_key(|c| c.cost());
        Self {
            children,
            doc: Position::NotStarted,
            node: Position::NotStarted,
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

    fn align_nodes(&mut self) -> Result<bool> {
        loop {
            let Some(max) = self.children.iter().filter_map(|c| c.node().at()).max().cloned() else {
                return Ok(false);
            };
            let mut aligned = true;
            for child in self.children.iter_mut() {
                while child.node().at().is_some_and(|node| *node < max) {
                    if !child.next_node()? {
                        return Ok(false);
                    }
                }
                aligned &= child.node().at() == Some(&max);
            }
            if aligned {
                self.node = Position::At(max);
                return Ok(true);
            }
        }
    }
}

impl NodeCursor for NodeConjunction {
    fn next_candidate(&mut self) -> Result<bool> {
        let advanced = match self.doc {
            Position::Exhausted => return Ok(false),
            _ if self.children.is_empty() => false,
            Position::At(_) => self.children[0].next_candidate()?,
            Position::NotStarted => start_all(&mut self.children)?,
        };
        let doc = if advanced { align_docs(&mut self.children)? } else { None };
        Ok(self.settle(doc))
    }

    fn skip_to_candidate(&mut self, target: DocId) -> Result<bool> {
        match self.doc {
            Position::Exhausted => return Ok(false),
            Position::At(doc) if doc >= target => return Ok(true),
            _ => {}
        }
        let doc = if !self.children.is_empty() && skip_all(&mut self.children, target)? {
            align_docs(&mut self.children)?
        } else {
            None
        };
        Ok(self.settle(doc))
    }

    fn next_node(&mut self) -> Result<bool> {
        if !self.doc.is_at() || self.node.is_exhausted() {
            return Ok(false);
        }
        let advanced = if self.node.is_at() {
            self.children[0].next_node()?
        } else {
            let mut all = true;
            for child in self.children.iter_mut() {
                all &= child.next_node()?;
            }
            all
        };
        if advanced && self.align_nodes()? {
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
        let mut freq = 0;
        for child in &self.children {
            freq += child.freq_in_node()?;
        }
        Ok(freq)
    }

    fn score_in_node(&mut self) -> Result<f32> {
        require_node(&self.node)?;
        let mut score = 0.0;
        for child in self.children.iter_mut() {
            score += child.score_in_node()?;
        }
        Ok(score)
    }

    fn cost(&self) -> u64 {
        self.children.iter().map(|c| c.cost()).min().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::cursor::testing::*;

    #[test]
    fn test_intersects_docs_and_nodes() {
        let a = VecCursor::new(docs(&[
            (0, &[&[0], &[1]]),
            (2, &[&[0, 1], &[3]]),
            (5, &[&[0]]),
            (7, &[&[4]]),
        ]));
        let b = VecCursor::new(docs(&[
            (1, &[&[0]]),
            (2, &[&[0], &[0, 1], &[3]]),
            (5, &[&[1]]),
            (7, &[&[4]]),
        ]));
        let mut conj = NodeConjunction::new(vec![a.boxed(), b.boxed()]);
        assert_eq!(
            collect(&mut conj).unwrap(),
            hits(&[(2, &[0, 1]), (2, &[3]), (7, &[4])])
        );
        assert!(!conj.next_candidate().unwrap());
        assert_eq!(conj.doc(), Position::Exhausted);
    }

    #[test]
    fn test_doc_candidate_without_common_node() {
        let a = VecCursor::new(docs(&[(3, &[&[0]])]));
        let b = VecCursor::new(docs(&[(3, &[&[1]])]));
        let mut conj = NodeConjunction::new(vec![a.boxed(), b.boxed()]);
        assert!(conj.next_candidate().unwrap());
        assert_eq!(conj.doc(), Position::At(3));
        assert!(!conj.next_node().unwrap());
        assert!(conj.node().is_exhausted());
    }

    #[test]
    fn test_scores_and_freqs_are_summed() {
        let a = VecCursor::new(docs(&[(1, &[&[0]])])).with_weight(2.0);
        let b = VecCursor::new(docs(&[(1, &[&[0]])])).with_weight(0.5);
        let mut conj = NodeConjunction::new(vec![a.boxed(), b.boxed()]);
        assert!(conj.next_candidate().unwrap());
        assert!(conj.score_in_node().is_err());
        assert!(conj.next_node().unwrap());
        assert_eq!(conj.freq_in_node().unwrap(), 2);
        assert_eq!(conj.score_in_node().unwrap(), 2.5);
    }

    #[test]
    fn test_skip_to_candidate() {
        let a = VecCursor::new(docs(&[(1, &[&[0]]), (4, &[&[0]]), (8, &[&[0]]), (9, &[&[0]])]));
        let b = VecCursor::new(docs(&[(4, &[&[0]]), (6, &[&[0]]), (9, &[&[0]])]));
        let mut conj = NodeConjunction::new(vec![a.boxed(), b.boxed()]);
        assert!(conj.skip_to_candidate(5).unwrap());
        assert_eq!(conj.doc(), Position::At(9));
        assert!(conj.skip_to_candidate(2).unwrap());
        assert_eq!(conj.doc(), Position::At(9));
        assert!(!conj.next_candidate().unwrap());
    }
}
