use crate::error::Result;
use crate::index::node_path::NodePath;
use crate::index::reader::SegmentReader;
use crate::index::types::{DocId, Position};
use crate::query::node_query::NodeQuery;
use crate::query::planner::CompiledPlan;
use crate::search::{NodeCursor, Scorer, ScoringWeights};
use log::debug;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A matching document with its score and matched nodes
#[derive(Debug, Clone, PartialEq)]
pub struct DocMatch {
    pub doc: DocId,
    pub score: f32,
    /// Matched nodes in path order
    pub nodes: Vec<NodeMatch>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeMatch {
    pub node: NodePath,
    pub score: f32,
    pub freq: u32,
}

/// Min-heap entry: the worst kept match sorts greatest.
struct TopKEntry(DocMatch);

impl TopKEntry {
    /// Ranking order: score descending, then doc id ascending
    fn rank(&self, other: &Self) -> Ordering {
        other
            .0
            .score
            .total_cmp(&self.0.score)
            .then_with(|| self.0.doc.cmp(&other.0.doc))
    }
}

impl PartialEq for TopKEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.doc == other.0.doc
    }
}

impl Eq for TopKEntry {}

impl PartialOrd for TopKEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TopKEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank(other)
    }
}

/// Top-K heap keeping the best matches seen so far.
pub(crate) struct TopKHeap {
    heap: BinaryHeap<TopKEntry>,
    capacity: usize,
}

impl TopKHeap {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(k.saturating_add(1).min(1024)),
            capacity: k,
        }
    }

    /// Try to insert a match. Returns true if it was kept.
    pub(crate) fn try_insert(&mut self, entry: DocMatch) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let entry = TopKEntry(entry);
        if self.heap.len() < self.capacity {
            self.heap.push(entry);
            return true;
        }
        match self.heap.peek() {
            // peek is the worst kept match
            Some(worst) if entry.rank(worst) == Ordering::Less => {
                self.heap.pop();
                self.heap.push(entry);
                true
            }
            _ => false,
        }
    }

    /// Matches sorted by score descending, then doc id
    pub(crate) fn into_sorted_vec(self) -> Vec<DocMatch> {
        let mut entries = self.heap.into_vec();
        entries.sort_by(|a, b| a.rank(b));
        entries.into_iter().map(|e| e.0).collect()
    }
}

/// Runs node queries against one segment
pub struct Searcher<'a> {
    reader: &'a SegmentReader,
    scorer: Scorer,
}

impl<'a> Searcher<'a> {
    /// Searcher using the scoring weights stored in the segment config
    pub fn new(reader: &'a SegmentReader) -> Self {
        Self::with_scoring_weights(reader, reader.config().scoring_weights.clone())
    }

    pub fn with_scoring_weights(reader: &'a SegmentReader, weights: ScoringWeights) -> Self {
        Self {
            reader,
            scorer: Scorer::new(weights, reader.doc_count()),
        }
    }

    pub fn reader(&self) -> &SegmentReader {
        self.reader
    }

    pub fn compile(&self, query: &NodeQuery) -> Result<CompiledPlan> {
        CompiledPlan::compile(query, self.reader, &self.scorer)
    }

    /// Best `limit` documents, by score descending then doc id.
    pub fn search(&self, query: &NodeQuery, limit: usize) -> Result<Vec<DocMatch>> {
        let plan = self.compile(query)?;
        self.search_plan(&plan, limit)
    }

    pub fn search_plan(&self, plan: &CompiledPlan, limit: usize) -> Result<Vec<DocMatch>> {
        let mut top_k = TopKHeap::new(limit);
        if limit == 0 || plan.is_empty() {
            return Ok(Vec::new());
        }
        let mut cursor = plan.cursor(self.reader);
        let mut matched = 0usize;
        while let Some(doc_match) = self.next_match(cursor.as_mut())? {
            matched += 1;
            top_k.try_insert(doc_match);
        }
        debug!("Search matched {} documents, keeping at most {}", matched, limit);
        Ok(top_k.into_sorted_vec())
    }

    /// Number of documents with at least one matching node
    pub fn count(&self, query: &NodeQuery) -> Result<usize> {
        let plan = self.compile(query)?;
        if plan.is_empty() {
            return Ok(0);
        }
        let mut cursor = plan.cursor(self.reader);
        let mut count = 0;
        while cursor.next_candidate()? {
            if cursor.next_node()? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Run independent queries in parallel, each with its own cursor tree.
    pub fn search_batch(&self, queries: &[NodeQuery], limit: usize) -> Result<Vec<Vec<DocMatch>>> {
        queries.par_iter().map(|query| self.search(query, limit)).collect()
    }

    /// Next candidate document that has at least one node, fully scored.
    fn next_match(&self, cursor: &mut dyn NodeCursor) -> Result<Option<DocMatch>> {
        while cursor.next_candidate()? {
            let Position::At(doc) = cursor.doc() else {
                break;
            };
            let mut score = 0.0;
            let mut nodes = Vec::new();
            while cursor.next_node()? {
                let Position::At(node) = cursor.node() else {
                    break;
                };
                let node = node.clone();
                let freq = cursor.freq_in_node()?;
                let node_score = cursor.score_in_node()?;
                score = self.scorer.accumulate(score, node_score);
                nodes.push(NodeMatch {
                    node,
                    score: node_score,
                    freq,
                });
            }
            if !nodes.is_empty() {
                return Ok(Some(DocMatch { doc, score, nodes }));
            }
        }
        Ok(None)
    }
}
