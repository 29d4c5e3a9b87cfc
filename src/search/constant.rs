use crate::error::Result;
use crate::index::types::{DocId, DocPosition, NodePosition};
use crate::search::cursor::{BoxedCursor, NodeCursor, require_node};

/// Reports a fixed score for every node of the wrapped cursor.
pub struct ConstantScore {
    inner: BoxedCursor,
    score: f32,
}

impl ConstantScore {
    pub fn new(inner: BoxedCursor, score: f32) -> Self {
        Self { inner, score }
    }
}

impl NodeCursor for ConstantScore {
    fn next_candidate(&mut self) -> Result<bool> {
        self.inner.next_candidate()
    }

    fn skip_to_candidate(&mut self, target: DocId) -> Result<bool> {
        self.inner.skip_to_candidate(target)
    }

    fn next_node(&mut self) -> Result<bool> {
        self.inner.next_node()
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
        require_node(self.inner.node())?;
        Ok(self.score)
    }

    fn cost(&self) -> u64 {
        self.inner.cost()
    }
}
