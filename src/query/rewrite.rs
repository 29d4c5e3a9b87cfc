//! Compile-time rewrites applied once before planning.
//!
//! Constraints flow from composite queries down to their clauses, a boolean
//! with a single non-prohibited clause collapses into that clause, and
//! multi-term queries are expanded against the term dictionary.

use crate::error::{Error, Result};
use crate::index::node_path::{LevelConstraint, NodeConstraints};
use crate::index::reader::SegmentReader;
use crate::query::node_query::{
    BooleanClause, BooleanQuery, FuzzyQuery, MAX_EDITS, NodeQuery, Occur, QueryKind, RangeQuery,
    TwigClause, TwigQuery,
};
use crate::utils::levenshtein::bounded_distance;
use log::trace;
use regex::Regex;

/// Combine inherited constraints with the ones a query already carries.
pub fn merge_constraints(parent: NodeConstraints, child: NodeConstraints) -> Result<NodeConstraints> {
    let level = match (parent.level, child.level) {
        (Some(p), Some(c)) if p != c => {
            return Err(Error::config(format!(
                "level constraint {} conflicts with inherited level {}",
                c.0, p.0
            )));
        }
        (Some(p), _) => Some(p),
        (None, c) => c,
    };
    let interval = match (parent.interval, child.interval) {
        (Some(p), Some(c)) if p != c => {
            return Err(Error::config(format!(
                "interval constraint {}:[{}, {}] conflicts with inherited {}:[{}, {}]",
                c.level, c.lower, c.upper, p.level, p.lower, p.upper
            )));
        }
        (Some(p), _) => Some(p),
        (None, c) => c,
    };
    Ok(NodeConstraints { level, interval })
}

/// Propagate constraints through the tree and collapse single-clause booleans.
pub fn rewrite(query: &NodeQuery) -> Result<NodeQuery> {
    rewrite_with(query, NodeConstraints::default())
}

fn rewrite_with(query: &NodeQuery, inherited: NodeConstraints) -> Result<NodeQuery> {
    let constraints = merge_constraints(inherited, query.constraints)?;
    let kind = match &query.kind {
        QueryKind::Boolean(boolean) => {
            let mut clauses = Vec::with_capacity(boolean.clauses.len());
            for clause in &boolean.clauses {
                clauses.push(BooleanClause {
                    query: rewrite_with(&clause.query, constraints)?,
                    occur: clause.occur,
                });
            }
            if let [single] = clauses.as_slice() {
                if single.occur != Occur::MustNot {
                    let mut collapsed = single.query.clone();
                    collapsed.boost *= query.boost;
                    return Ok(collapsed);
                }
            }
            QueryKind::Boolean(BooleanQuery { clauses })
        }
        QueryKind::Twig(twig) => return rewrite_twig(query, twig, constraints),
        QueryKind::ConstantScore(inner) => {
            QueryKind::ConstantScore(Box::new(rewrite_with(inner, constraints)?))
        }
        other => other.clone(),
    };
    Ok(NodeQuery {
        kind,
        constraints,
        boost: query.boost,
    })
}

fn rewrite_twig(query: &NodeQuery, twig: &TwigQuery, constraints: NodeConstraints) -> Result<NodeQuery> {
    if let Some(level) = constraints.level {
        if level.0 != twig.level {
            return Err(Error::config(format!(
                "level constraint {} conflicts with twig level {}",
                level.0, twig.level
            )));
        }
    }
    let at_depth = |depth: u32| NodeConstraints {
        level: Some(LevelConstraint(twig.level + depth)),
        interval: constraints.interval,
    };

    let root = match &twig.root {
        Some(root) => Some(Box::new(rewrite_with(root, at_depth(0))?)),
        None => None,
    };
    let mut clauses = Vec::with_capacity(twig.clauses.len());
    for clause in &twig.clauses {
        if clause.depth == 0 {
            return Err(Error::config("twig clause depth must be positive"));
        }
        clauses.push(TwigClause {
            query: rewrite_with(&clause.query, at_depth(clause.depth))?,
            occur: clause.occur,
            depth: clause.depth,
        });
    }

    Ok(NodeQuery {
        kind: QueryKind::Twig(TwigQuery {
            level: twig.level,
            root,
            clauses,
        }),
        constraints: at_depth(0),
        boost: query.boost,
    })
}

/// Dictionary terms inside the range.
pub fn expand_range(reader: &SegmentReader, range: &RangeQuery) -> Vec<String> {
    let terms: Vec<String> = reader
        .terms_in_range(range.lower_bound(), range.upper_bound())
        .map(str::to_string)
        .collect();
    trace!("Range {:?} expanded to {} terms", range, terms.len());
    terms
}

pub fn expand_prefix(reader: &SegmentReader, prefix: &str) -> Vec<String> {
    reader.terms_with_prefix(prefix).map(str::to_string).collect()
}

/// Dictionary terms fully matched by `pattern`.
pub fn expand_regexp(reader: &SegmentReader, pattern: &str) -> Result<Vec<String>> {
    let regex = Regex::new(&format!("^(?:{})$", pattern))
        .map_err(|e| Error::config(format!("invalid regexp '{}': {}", pattern, e)))?;
    let terms: Vec<String> = reader.terms_matching(&regex).map(str::to_string).collect();
    trace!("Regexp '{}' expanded to {} terms", pattern, terms.len());
    Ok(terms)
}

/// Closest dictionary terms with their boosts, at most `max_expansions`.
pub fn expand_fuzzy(reader: &SegmentReader, fuzzy: &FuzzyQuery) -> Result<Vec<(String, f32)>> {
    if fuzzy.max_edits > MAX_EDITS {
        return Err(Error::config(format!(
            "fuzzy max_edits must be at most {}, got {}",
            MAX_EDITS, fuzzy.max_edits
        )));
    }
    let target: Vec<char> = fuzzy.term.chars().collect();
    let prefix: String = target.iter().take(fuzzy.prefix_length).collect();

    let mut candidates: Vec<(u32, &str)> = Vec::new();
    let mut chars = Vec::new();
    for term in reader.terms_with_prefix(&prefix) {
        chars.clear();
        chars.extend(term.chars());
        if let Some(distance) = bounded_distance(&target, &chars, fuzzy.max_edits, fuzzy.transpositions) {
            candidates.push((distance, term));
        }
    }
    trace!("Fuzzy '{}' found {} candidates", fuzzy.term, candidates.len());
    candidates.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    candidates.truncate(fuzzy.max_expansions);

    Ok(candidates
        .into_iter()
        .map(|(distance, term)| {
            let min_len = target.len().min(term.chars().count()).max(1) as f32;
            let boost = (1.0 - distance as f32 / min_len).max(0.0);
            (term.to_string(), boost)
        })
        .collect())
}
