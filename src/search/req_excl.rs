use crate::error::Result;
use crate::index::types::{DocId, DocPosition, NodePosition, Position};
use crate::search::cursor::{BoxedCursor, NodeCursor};

/// Nodes of the required cursor that have no structural relation with any
/// node of the excluded cursor in the same document.
///
/// A required node is dropped when an excluded node is equal to it, one of
/// its ancestors, or one of its descendants.
pub struct ReqExcl {
    req: BoxedCursor,
    excl: BoxedCursor,
    /// `excl` sits on the same doc as `req`
    excl_in_doc: bool,
}

impl ReqExcl {
    pub fn new(req: BoxedCursor, excl: BoxedCursor) -> Self {
        Self {
            req,
            excl,
            excl_in_doc: false,
        }
    }

    fn sync_excl(&mut self) -> Result<bool> {
        self.excl_in_doc = false;
        let Position::At(doc) = self.req.doc() else {
            return Ok(false);
        };
        if !self.excl.doc().is_exhausted() && self.excl.skip_to_candidate(doc)? {
            self.excl_in_doc = self.excl.doc() == Position::At(doc);
        }
        Ok(true)
    }

    /// Whether the excluded cursor has a node related to the current required node.
    fn excluded(&mut self) -> Result<bool> {
        let Position::At(req) = self.req.node() else {
            return Ok(false);
        };
        loop {
            let behind = match self.excl.node() {
                Position::NotStarted => true,
                Position::At(excl) if excl < req && !excl.is_ancestor_of(req) => true,
                Position::At(excl) => return Ok(excl.is_related_to(req)),
                Position::Exhausted => return Ok(false),
            };
            if behind && !self.excl.next_node()? {
                return Ok(false);
            }
        }
    }
}

impl NodeCursor for ReqExcl {
    fn next_candidate(&mut self) -> Result<bool> {
        self.req.next_candidate()?;
        self.sync_excl()
    }

    fn skip_to_candidate(&mut self, target: DocId) -> Result<bool> {
        if self.req.doc().value().is_some_and(|doc| doc >= target) {
            return Ok(true);
        }
        self.req.skip_to_candidate(target)?;
        self.sync_excl()
    }

    fn next_node(&mut self) -> Result<bool> {
        while self.req.next_node()? {
            if !self.excl_in_doc || !self.excluded()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn doc(&self) -> DocPosition {
        self.req.doc()
    }

    fn node(&self) -> &NodePosition {
        self.req.node()
    }

    fn freq_in_node(&self) -> Result<u32> {
        self.req.freq_in_node()
    }

    fn score_in_node(&mut self) -> Result<f32> {
        self.req.score_in_node()
    }

    fn cost(&self) -> u64 {
        self.req.cost()
    }
}
