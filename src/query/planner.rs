use crate::error::Result;
use crate::index::node_path::NodeConstraints;
use crate::index::reader::SegmentReader;
use crate::query::node_query::{BooleanClause, NodeQuery, Occur, QueryKind, TwigQuery};
use crate::query::rewrite::{expand_fuzzy, expand_prefix, expand_range, expand_regexp, rewrite};
use crate::search::{
    AncestorProjection, BoxedCursor, ConstantScore, EmptyCursor, NodeConjunction, NodeDisjunction,
    NodeFilter, PhraseCursor, ReqExcl, ReqOpt, Scorer, TwigConjunction,
};
use log::debug;

/// Compiled query execution plan
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPlan {
    root: PlanNode,
}

/// Individual plan node; each becomes one cursor
#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    /// Matches nothing
    Empty,
    /// Postings of one term, scores multiplied by `weight`
    Term { term: String, weight: f32 },
    /// Exact phrase inside a node
    Phrase { terms: Vec<(String, u32)>, weight: f32 },
    Conjunction(Vec<PlanNode>),
    Disjunction(Vec<PlanNode>),
    ReqExcl { req: Box<PlanNode>, excl: Box<PlanNode> },
    ReqOpt { req: Box<PlanNode>, opt: Box<PlanNode> },
    /// Root nodes that contain a match of every descendant
    Twig { root: Box<PlanNode>, descendants: Vec<PlanNode> },
    /// Level / interval constraints on the inner nodes
    Filter { inner: Box<PlanNode>, constraints: NodeConstraints },
    /// Inner nodes reported as their ancestor at `level`
    Projection { inner: Box<PlanNode>, level: u32 },
    ConstantScore { inner: Box<PlanNode>, score: f32 },
}

impl CompiledPlan {
    /// Rewrite `query` and compile it against `reader`.
    pub fn compile(query: &NodeQuery, reader: &SegmentReader, scorer: &Scorer) -> Result<Self> {
        let rewritten = rewrite(query)?;
        let planner = QueryPlanner { reader, scorer };
        let root = planner.plan(&rewritten, 1.0)?;
        debug!("Compiled plan: {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &PlanNode {
        &self.root
    }

    /// Whether the plan can never match
    pub fn is_empty(&self) -> bool {
        self.root == PlanNode::Empty
    }

    /// Instantiate a fresh cursor tree; every execution owns its own.
    pub fn cursor(&self, reader: &SegmentReader) -> BoxedCursor {
        self.root.cursor(reader)
    }
}

impl PlanNode {
    fn cursor(&self, reader: &SegmentReader) -> BoxedCursor {
        match self {
            PlanNode::Empty => Box::new(EmptyCursor::new()),
            PlanNode::Term { term, weight } => Box::new(reader.postings(term).with_weight(*weight)),
            PlanNode::Phrase { terms, weight } => {
                let cursors = terms
                    .iter()
                    .map(|(term, offset)| (reader.postings(term), *offset))
                    .collect();
                Box::new(PhraseCursor::new(cursors, *weight))
            }
            PlanNode::Conjunction(children) => {
                Box::new(NodeConjunction::new(children.iter().map(|c| c.cursor(reader)).collect()))
            }
            PlanNode::Disjunction(children) => {
                Box::new(NodeDisjunction::new(children.iter().map(|c| c.cursor(reader)).collect()))
            }
            PlanNode::ReqExcl { req, excl } => {
                Box::new(ReqExcl::new(req.cursor(reader), excl.cursor(reader)))
            }
            PlanNode::ReqOpt { req, opt } => Box::new(ReqOpt::new(req.cursor(reader), opt.cursor(reader))),
            PlanNode::Twig { root, descendants } => Box::new(TwigConjunction::new(
                root.cursor(reader),
                descendants.iter().map(|d| d.cursor(reader)).collect(),
            )),
            PlanNode::Filter { inner, constraints } => {
                Box::new(NodeFilter::new(inner.cursor(reader), *constraints))
            }
            PlanNode::Projection { inner, level } => {
                Box::new(AncestorProjection::new(inner.cursor(reader), *level))
            }
            PlanNode::ConstantScore { inner, score } => {
                Box::new(ConstantScore::new(inner.cursor(reader), *score))
            }
        }
    }

    fn conjunction(mut children: Vec<PlanNode>) -> PlanNode {
        match children.len() {
            0 => PlanNode::Empty,
            1 => children.remove(0),
            _ => PlanNode::Conjunction(children),
        }
    }

    fn disjunction(mut children: Vec<PlanNode>) -> PlanNode {
        children.retain(|c| *c != PlanNode::Empty);
        match children.len() {
            0 => PlanNode::Empty,
            1 => children.remove(0),
            _ => PlanNode::Disjunction(children),
        }
    }

    /// Required part with optional and prohibited parts folded around it
    fn combine(req: PlanNode, optional: Vec<PlanNode>, prohibited: Vec<PlanNode>) -> PlanNode {
        if req == PlanNode::Empty {
            return PlanNode::Empty;
        }
        let node = match PlanNode::disjunction(optional) {
            PlanNode::Empty => req,
            opt => PlanNode::ReqOpt {
                req: Box::new(req),
                opt: Box::new(opt),
            },
        };
        match PlanNode::disjunction(prohibited) {
            PlanNode::Empty => node,
            excl => PlanNode::ReqExcl {
                req: Box::new(node),
                excl: Box::new(excl),
            },
        }
    }

    fn filtered(self, constraints: NodeConstraints) -> PlanNode {
        if constraints.is_empty() || self == PlanNode::Empty {
            self
        } else {
            PlanNode::Filter {
                inner: Box::new(self),
                constraints,
            }
        }
    }

    fn projected(self, level: u32) -> PlanNode {
        if self == PlanNode::Empty {
            self
        } else {
            PlanNode::Projection {
                inner: Box::new(self),
                level,
            }
        }
    }
}

/// Query planner
struct QueryPlanner<'a> {
    reader: &'a SegmentReader,
    scorer: &'a Scorer,
}

impl QueryPlanner<'_> {
    /// Plan a rewritten query. `boost` is the product of the ancestors' boosts.
    fn plan(&self, query: &NodeQuery, boost: f32) -> Result<PlanNode> {
        let boost = boost * query.boost;
        let node = match &query.kind {
            QueryKind::Term(term) => self.term(term, boost),

            QueryKind::Phrase(terms) => match terms.as_slice() {
                [] => PlanNode::Empty,
                [(term, _)] => self.term(term, boost),
                _ => self.phrase(terms, boost),
            },

            QueryKind::Range(range) => self.constant_terms(expand_range(self.reader, range), boost),
            QueryKind::Prefix(prefix) => self.constant_terms(expand_prefix(self.reader, prefix), boost),
            QueryKind::Regexp(pattern) => {
                self.constant_terms(expand_regexp(self.reader, pattern)?, boost)
            }

            QueryKind::Fuzzy(fuzzy) => {
                let terms = expand_fuzzy(self.reader, fuzzy)?
                    .into_iter()
                    .map(|(term, term_boost)| self.term(&term, boost * term_boost))
                    .collect();
                PlanNode::disjunction(terms)
            }

            // children already carry the propagated constraints
            QueryKind::Boolean(boolean) => return self.boolean(&boolean.clauses, boost),
            QueryKind::Twig(twig) => return self.twig(twig, boost),

            QueryKind::ConstantScore(inner) => {
                return Ok(match self.plan(inner, 1.0)? {
                    PlanNode::Empty => PlanNode::Empty,
                    inner => PlanNode::ConstantScore {
                        inner: Box::new(inner),
                        score: boost,
                    },
                });
            }
        };
        Ok(node.filtered(query.constraints))
    }

    fn term(&self, term: &str, boost: f32) -> PlanNode {
        let doc_freq = self.reader.doc_freq(term);
        if doc_freq == 0 {
            return PlanNode::Empty;
        }
        PlanNode::Term {
            term: term.to_string(),
            weight: self.scorer.term_weight(boost, doc_freq),
        }
    }

    fn phrase(&self, terms: &[(String, u32)], boost: f32) -> PlanNode {
        let mut weight = 0.0;
        for (term, _) in terms {
            let doc_freq = self.reader.doc_freq(term);
            if doc_freq == 0 {
                return PlanNode::Empty;
            }
            weight += self.scorer.term_weight(boost, doc_freq);
        }
        PlanNode::Phrase {
            terms: terms.to_vec(),
            weight,
        }
    }

    /// Disjunction of expanded terms, every node scored `boost`
    fn constant_terms(&self, terms: Vec<String>, boost: f32) -> PlanNode {
        let children = terms
            .into_iter()
            .map(|term| PlanNode::Term { term, weight: 1.0 })
            .collect();
        match PlanNode::disjunction(children) {
            PlanNode::Empty => PlanNode::Empty,
            inner => PlanNode::ConstantScore {
                inner: Box::new(inner),
                score: boost,
            },
        }
    }

    fn boolean(&self, clauses: &[BooleanClause], boost: f32) -> Result<PlanNode> {
        let mut required = Vec::new();
        let mut optional = Vec::new();
        let mut prohibited = Vec::new();
        for clause in clauses {
            let node = self.plan(&clause.query, boost)?;
            match clause.occur {
                Occur::Must if node == PlanNode::Empty => return Ok(PlanNode::Empty),
                Occur::Must => required.push(node),
                Occur::Should => optional.push(node),
                Occur::MustNot => prohibited.push(node),
            }
        }

        if required.is_empty() {
            // optional clauses become the required part
            let req = PlanNode::disjunction(optional);
            return Ok(PlanNode::combine(req, Vec::new(), prohibited));
        }
        Ok(PlanNode::combine(PlanNode::conjunction(required), optional, prohibited))
    }

    fn twig(&self, twig: &TwigQuery, boost: f32) -> Result<PlanNode> {
        let mut descendants = Vec::new();
        let mut optional = Vec::new();
        let mut prohibited = Vec::new();
        for clause in &twig.clauses {
            let node = self.plan(&clause.query, boost)?;
            match clause.occur {
                Occur::Must if node == PlanNode::Empty => return Ok(PlanNode::Empty),
                Occur::Must => descendants.push(node),
                Occur::Should => optional.push(node.projected(twig.level)),
                Occur::MustNot => prohibited.push(node.projected(twig.level)),
            }
        }

        let req = match &twig.root {
            Some(root) => match self.plan(root, boost)? {
                PlanNode::Empty => return Ok(PlanNode::Empty),
                root if descendants.is_empty() => root,
                root => PlanNode::Twig {
                    root: Box::new(root),
                    descendants,
                },
            },
            None if descendants.is_empty() => {
                let req = PlanNode::disjunction(optional);
                return Ok(PlanNode::combine(req, Vec::new(), prohibited));
            }
            None => PlanNode::conjunction(
                descendants
                    .into_iter()
                    .map(|d| d.projected(twig.level))
                    .collect(),
            ),
        };
        Ok(PlanNode::combine(req, optional, prohibited))
    }
}
