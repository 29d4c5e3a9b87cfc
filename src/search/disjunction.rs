use crate::error::Result;
use crate::index::node_path::NodePath;
use crate::index::types::{DocId, DocPosition, NodePosition, Position};
use crate::search::cursor::{BoxedCursor, NodeCursor, require_node};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Matches the nodes any child matches.
///
/// Children are merged through a min-heap on doc id, then, inside the
/// current document, through a second min-heap on node path. All children
/// sitting on the smallest node form the current match.
pub struct NodeDisjunction {
    children: Vec<BoxedCursor>,
    doc_heap: BinaryHeap<Reverse<(DocId, usize)>>,
    node_heap: BinaryHeap<Reverse<(NodePath, usize)>>,
    /// Children positioned on the current node
    matching: Vec<usize>,
    doc: DocPosition,
    node: NodePosition,
}

impl NodeDisjunction {
    pub fn new(children: Vec<BoxedCursor>) -> Self {
        let capacity = children.len();
        Self {
            children,
            doc_heap: BinaryHeap::with_capacity(capacity),
            node_heap: BinaryHeap::with_capacity(capacity),
            matching: Vec::with_capacity(capacity),
            doc: Position::NotStarted,
            node: Position::NotStarted,
        }
    }

    fn push_doc(&mut self, index: usize) {
        if let Position::At(doc) = self.children[index].doc() {
            self.doc_heap.push(Reverse((doc, index)));
        }
    }

    fn push_node(&mut self, index: usize) {
        if let Position::At(node) = self.children[index].node() {
            self.node_heap.push(Reverse((node.clone(), index)));
        }
    }

    fn settle_doc(&mut self) -> bool {
        self.node = Position::NotStarted;
        self.node_heap.clear();
        self.matching.clear();
        match self.doc_heap.peek() {
            Some(Reverse((doc, _))) => {
                self.doc = Position::At(*doc);
                true
            }
            None => {
                self.doc = Position::Exhausted;
                false
            }
        }
    }

    /// Children whose current doc is `doc`
    fn children_on(&self, doc: DocId) -> Vec<usize> {
        self.doc_heap
            .iter()
            .filter(|Reverse((d, _))| *d == doc)
            .map(|Reverse((_, i))| *i)
            .collect()
    }
}

impl NodeCursor for NodeDisjunction {
    fn next_candidate(&mut self) -> Result<bool> {
        match self.doc {
            Position::Exhausted => return Ok(false),
            Position::NotStarted => {
                for i in 0..self.children.len() {
                    self.children[i].next_candidate()?;
                    self.push_doc(i);
                }
            }
            Position::At(current) => {
                while let Some(Reverse((doc, i))) = self.doc_heap.peek().copied() {
                    if doc != current {
                        break;
                    }
                    self.doc_heap.pop();
                    self.children[i].next_candidate()?;
                    self.push_doc(i);
                }
            }
        }
        Ok(self.settle_doc())
    }

    fn skip_to_candidate(&mut self, target: DocId) -> Result<bool> {
        match self.doc {
            Position::Exhausted => return Ok(false),
            Position::At(doc) if doc >= target => return Ok(true),
            Position::NotStarted => {
                for i in 0..self.children.len() {
                    self.children[i].skip_to_candidate(target)?;
                    self.push_doc(i);
                }
            }
            Position::At(_) => {
                while let Some(Reverse((doc, i))) = self.doc_heap.peek().copied() {
                    if doc >= target {
                        break;
                    }
                    self.doc_heap.pop();
                    self.children[i].skip_to_candidate(target)?;
                    self.push_doc(i);
                }
            }
        }
        Ok(self.settle_doc())
    }

    fn next_node(&mut self) -> Result<bool> {
        let Position::At(doc) = self.doc else {
            return Ok(false);
        };
        let advance = match self.node {
            Position::Exhausted => return Ok(false),
            Position::NotStarted => self.children_on(doc),
            Position::At(_) => std::mem::take(&mut self.matching),
        };
        for i in advance {
            if self.children[i].next_node()? {
                self.push_node(i);
            }
        }

        self.matching.clear();
        let Some(Reverse((min, first))) = self.node_heap.pop() else {
            self.node = Position::Exhausted;
            return Ok(false);
        };
        self.matching.push(first);
        while self
            .node_heap
            .peek()
            .is_some_and(|Reverse((node, _))| *node == min)
        {
            if let Some(Reverse((_, i))) = self.node_heap.pop() {
                self.matching.push(i);
            }
        }
        self.node = Position::At(min);
        Ok(true)
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
        for &i in &self.matching {
            freq += self.children[i].freq_in_node()?;
        }
        Ok(freq)
    }

    fn score_in_node(&mut self) -> Result<f32> {
        require_node(&self.node)?;
        let mut score = 0.0;
        for &i in &self.matching {
            score += self.children[i].score_in_node()?;
        }
        Ok(score)
    }

    fn cost(&self) -> u64 {
        self.children.iter().map(|c| c.cost()).sum()
    }
}
