//! Query tree built by callers and compiled against a segment.
//!
//! ```
//! use arbor::query::{BooleanQuery, NodeQuery, TwigQuery};
//!
//! // nodes holding "aaa", scored higher where "bbb" also occurs
//! let flat: NodeQuery = BooleanQuery::new()
//!     .must(NodeQuery::term("aaa"))
//!     .should(NodeQuery::term("bbb"))
//!     .into();
//!
//! // top-level nodes containing "x" with a child node holding "y"
//! let twig: NodeQuery = TwigQuery::new(0)
//!     .with_root(NodeQuery::term("x"))
//!     .child(NodeQuery::term("y"), arbor::query::Occur::Must)
//!     .into();
//! # let _ = (flat, twig);
//! ```

use crate::error::{Error, Result};
use crate::index::node_path::{IntervalConstraint, LevelConstraint, NodeConstraints};
use std::ops::Bound;

/// How a clause takes part in its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occur {
    Must,
    Should,
    MustNot,
}

/// A query node with its structural constraints and boost
#[derive(Debug, Clone, PartialEq)]
pub struct NodeQuery {
    pub kind: QueryKind,
    pub constraints: NodeConstraints,
    pub boost: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    Term(String),
    /// Terms with their relative positions inside one node
    Phrase(Vec<(String, u32)>),
    Range(RangeQuery),
    Prefix(String),
    /// Pattern that must match the whole term
    Regexp(String),
    Fuzzy(FuzzyQuery),
    Boolean(BooleanQuery),
    Twig(TwigQuery),
    ConstantScore(Box<NodeQuery>),
}

/// Term range over the dictionary; unbounded sides are open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    pub lower: Option<String>,
    pub upper: Option<String>,
    pub include_lower: bool,
    pub include_upper: bool,
}

impl RangeQuery {
    pub fn lower_bound(&self) -> Bound<&str> {
        match (&self.lower, self.include_lower) {
            (None, _) => Bound::Unbounded,
            (Some(term), true) => Bound::Included(term.as_str()),
            (Some(term), false) => Bound::Excluded(term.as_str()),
        }
    }

    pub fn upper_bound(&self) -> Bound<&str> {
        match (&self.upper, self.include_upper) {
            (None, _) => Bound::Unbounded,
            (Some(term), true) => Bound::Included(term.as_str()),
            (Some(term), false) => Bound::Excluded(term.as_str()),
        }
    }
}

/// Largest edit distance a fuzzy query may ask for
pub const MAX_EDITS: u32 = 2;

/// Dictionary terms within an edit distance of `term`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyQuery {
    pub term: String,
    pub max_edits: u32,
    /// Leading characters that must match exactly
    pub prefix_length: usize,
    /// Keep at most this many terms, closest first
    pub max_expansions: usize,
    pub transpositions: bool,
}

impl FuzzyQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            max_edits: MAX_EDITS,
            prefix_length: 0,
            max_expansions: 50,
            transpositions: true,
        }
    }

    pub fn max_edits(mut self, max_edits: u32) -> Self {
        self.max_edits = max_edits;
        self
    }

    pub fn prefix_length(mut self, prefix_length: usize) -> Self {
        self.prefix_length = prefix_length;
        self
    }

    pub fn max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = max_expansions;
        self
    }

    pub fn transpositions(mut self, transpositions: bool) -> Self {
        self.transpositions = transpositions;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanClause {
    pub query: NodeQuery,
    pub occur: Occur,
}

/// Clauses evaluated against the same node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BooleanQuery {
    pub clauses: Vec<BooleanClause>,
}

impl BooleanQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, query: NodeQuery, occur: Occur) -> Self {
        self.clauses.push(BooleanClause { query, occur });
        self
    }

    pub fn must(self, query: NodeQuery) -> Self {
        self.add(query, Occur::Must)
    }

    pub fn should(self, query: NodeQuery) -> Self {
        self.add(query, Occur::Should)
    }

    pub fn must_not(self, query: NodeQuery) -> Self {
        self.add(query, Occur::MustNot)
    }

    /// Build from parallel arrays, as a query parser front-end produces them.
    pub fn from_parts(queries: Vec<NodeQuery>, occurs: Vec<Occur>) -> Result<Self> {
        if queries.len() != occurs.len() {
            return Err(Error::config(format!(
                "boolean query has {} clauses but {} occurs",
                queries.len(),
                occurs.len()
            )));
        }
        let clauses = queries
            .into_iter()
            .zip(occurs)
            .map(|(query, occur)| BooleanClause { query, occur })
            .collect();
        Ok(Self { clauses })
    }
}

/// A clause of a twig, `depth` levels below the twig root
#[derive(Debug, Clone, PartialEq)]
pub struct TwigClause {
    pub query: NodeQuery,
    pub occur: Occur,
    pub depth: u32,
}

/// Root pattern at `level` plus child and descendant patterns below it.
#[derive(Debug, Clone, PartialEq)]
pub struct TwigQuery {
    pub level: u32,
    pub root: Option<Box<NodeQuery>>,
    pub clauses: Vec<TwigClause>,
}

impl TwigQuery {
    pub fn new(level: u32) -> Self {
        Self {
            level,
            root: None,
            clauses: Vec::new(),
        }
    }

    pub fn with_root(mut self, root: NodeQuery) -> Self {
        self.root = Some(Box::new(root));
        self
    }

    /// Clause on the direct children of the root
    pub fn child(self, query: NodeQuery, occur: Occur) -> Self {
        self.descendant(1, query, occur)
    }

    /// Clause on the nodes `depth` levels below the root
    pub fn descendant(mut self, depth: u32, query: NodeQuery, occur: Occur) -> Self {
        self.clauses.push(TwigClause { query, occur, depth });
        self
    }

    /// Build from parallel arrays of clause queries, occurs and depths.
    pub fn from_parts(
        level: u32,
        root: Option<NodeQuery>,
        queries: Vec<NodeQuery>,
        occurs: Vec<Occur>,
        depths: Vec<u32>,
    ) -> Result<Self> {
        if queries.len() != occurs.len() || queries.len() != depths.len() {
            return Err(Error::config(format!(
                "twig query has {} clauses, {} occurs and {} depths",
                queries.len(),
                occurs.len(),
                depths.len()
            )));
        }
        if let Some(depth) = depths.iter().find(|&&d| d == 0) {
            return Err(Error::config(format!("twig clause depth must be positive, got {}", depth)));
        }
        let clauses = queries
            .into_iter()
            .zip(occurs)
            .zip(depths)
            .map(|((query, occur), depth)| TwigClause { query, occur, depth })
            .collect();
        Ok(Self {
            level,
            root: root.map(Box::new),
            clauses,
        })
    }
}

impl NodeQuery {
    pub fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            constraints: NodeConstraints::default(),
            boost: 1.0,
        }
    }

    pub fn term(term: impl Into<String>) -> Self {
        Self::new(QueryKind::Term(term.into()))
    }

    /// Consecutive terms
    pub fn phrase<S: AsRef<str>>(terms: &[S]) -> Self {
        let terms = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.as_ref().to_string(), i as u32))
            .collect();
        Self::new(QueryKind::Phrase(terms))
    }

    /// Terms at explicit relative positions
    pub fn phrase_with_positions(terms: Vec<(String, u32)>) -> Self {
        Self::new(QueryKind::Phrase(terms))
    }

    pub fn range(
        lower: Option<&str>,
        upper: Option<&str>,
        include_lower: bool,
        include_upper: bool,
    ) -> Self {
        Self::new(QueryKind::Range(RangeQuery {
            lower: lower.map(str::to_string),
            upper: upper.map(str::to_string),
            include_lower,
            include_upper,
        }))
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::new(QueryKind::Prefix(prefix.into()))
    }

    pub fn regexp(pattern: impl Into<String>) -> Self {
        Self::new(QueryKind::Regexp(pattern.into()))
    }

    pub fn fuzzy(query: FuzzyQuery) -> Self {
        Self::new(QueryKind::Fuzzy(query))
    }

    pub fn constant_score(inner: NodeQuery) -> Self {
        Self::new(QueryKind::ConstantScore(Box::new(inner)))
    }

    /// Only match nodes at `level`
    pub fn with_level(mut self, level: u32) -> Self {
        self.constraints.level = Some(LevelConstraint(level));
        self
    }

    /// Only match nodes whose component at `level` lies in `[lower, upper]`
    pub fn with_interval(mut self, level: u32, lower: u32, upper: u32) -> Self {
        self.constraints.interval = Some(IntervalConstraint::new(level, lower, upper));
        self
    }

    pub fn with_constraints(mut self, constraints: NodeConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

impl From<BooleanQuery> for NodeQuery {
    fn from(query: BooleanQuery) -> Self {
        NodeQuery::new(QueryKind::Boolean(query))
    }
}

impl From<TwigQuery> for NodeQuery {
    fn from(query: TwigQuery) -> Self {
        NodeQuery::new(QueryKind::Twig(query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_from_parts_checks_lengths() {
        let ok = BooleanQuery::from_parts(
            vec![NodeQuery::term("a"), NodeQuery::term("b")],
            vec![Occur::Must, Occur::Should],
        )
        .unwrap();
        assert_eq!(ok.clauses.len(), 2);
        assert_eq!(ok.clauses[1].occur, Occur::Should);

        let err = BooleanQuery::from_parts(vec![NodeQuery::term("a")], vec![]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_twig_from_parts_checks_lengths() {
        let err = TwigQuery::from_parts(
            0,
            None,
            vec![NodeQuery::term("a")],
            vec![Occur::Must],
            vec![1, 2],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let zero_depth =
            TwigQuery::from_parts(0, None, vec![NodeQuery::term("a")], vec![Occur::Must], vec![0]);
        assert!(zero_depth.is_err());
    }

    #[test]
    fn test_phrase_offsets() {
        let query = NodeQuery::phrase(&["a", "b", "c"]);
        assert_eq!(
            query.kind,
            QueryKind::Phrase(vec![("a".into(), 0), ("b".into(), 1), ("c".into(), 2)])
        );
    }

    #[test]
    fn test_range_bounds() {
        let query = RangeQuery {
            lower: Some("b".into()),
            upper: None,
            include_lower: false,
            include_upper: true,
        };
        assert_eq!(query.lower_bound(), Bound::Excluded("b"));
        assert_eq!(query.upper_bound(), Bound::Unbounded);
    }
}
