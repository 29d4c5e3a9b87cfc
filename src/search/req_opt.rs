use crate::error::Result;
use crate::index::types::{DocId, DocPosition, NodePosition, Position};
use crate::search::cursor::{BoxedCursor, NodeCursor, require_node};
use std::cmp::Ordering;

/// Nodes of the required cursor, with the optional cursor adding its score
/// where it matches the same (doc, node).
///
/// The optional cursor is only moved when a score is requested. Once it
/// cannot reach the required document it is dropped for good.
pub struct ReqOpt {
    req: BoxedCursor,
    opt: Option<BoxedCursor>,
    /// `opt` was already skipped to the current doc
    opt_synced: bool,
}

impl ReqOpt {
    pub fn new(req: BoxedCursor, opt: BoxedCursor) -> Self {
        Self {
            req,
            opt: Some(opt),
            opt_synced: false,
        }
    }

    /// Score the optional cursor contributes to the current required node.
    fn opt_score(&mut self) -> Result<f32> {
        let (Position::At(doc), Position::At(node)) = (self.req.doc(), self.req.node()) else {
            return Ok(0.0);
        };
        let Some(opt) = self.opt.as_mut() else {
            return Ok(0.0);
        };
        if !self.opt_synced {
            self.opt_synced = true;
            if !opt.skip_to_candidate(doc)? {
                self.opt = None;
                return Ok(0.0);
            }
        }
        if opt.doc() != Position::At(doc) {
            return Ok(0.0);
        }
        loop {
            let order = match opt.node() {
                Position::NotStarted => Ordering::Less,
                Position::At(current) => current.cmp(node),
                Position::Exhausted => Ordering::Greater,
            };
            match order {
                Ordering::Less => {
                    if !opt.next_node()? {
                        return Ok(0.0);
                    }
                }
                Ordering::Equal => return opt.score_in_node(),
                Ordering::Greater => return Ok(0.0),
            }
        }
    }
}

impl NodeCursor for ReqOpt {
    fn next_candidate(&mut self) -> Result<bool> {
        self.opt_synced = false;
        self.req.next_candidate()
    }

    fn skip_to_candidate(&mut self, target: DocId) -> Result<bool> {
        if self.req.doc().value().is_some_and(|doc| doc >= target) {
            return Ok(true);
        }
        self.opt_synced = false;
        self.req.skip_to_candidate(target)
    }

    fn next_node(&mut self) -> Result<bool> {
        self.req.next_node()
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
        require_node(self.req.node())?;
        let score = self.req.score_in_node()?;
        Ok(score + self.opt_score()?)
    }

    fn cost(&self) -> u64 {
        self.req.cost()
    }
}
