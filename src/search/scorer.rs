//! Frequency-derived scoring for node matches.
//!
//! A term cursor scores the node it sits on as
//! `boost * idf * tf_weight * log2(1 + freq)`; combinators add up the scores
//! of the children that agree on the node.

use serde::{Deserialize, Serialize};

/// How node scores are folded into a document score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocScoreMode {
    /// Sum over every matching node
    #[default]
    Sum,
    /// Best matching node only
    Max,
}

/// Configurable weights for scoring factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Multiplier on the term frequency component
    pub tf_weight: f32,
    pub doc_score_mode: DocScoreMode,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            tf_weight: 1.0,
            doc_score_mode: DocScoreMode::Sum,
        }
    }
}

/// Scorer turns term statistics into per-cursor weights
#[derive(Debug, Clone)]
pub struct Scorer {
    weights: ScoringWeights,
    doc_count: u32,
}

impl Scorer {
    pub fn new(weights: ScoringWeights, doc_count: u32) -> Self {
        Self { weights, doc_count }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// BM25-style inverse document frequency, always positive
    pub fn idf(&self, doc_freq: u32) -> f32 {
        let n = self.doc_count.max(doc_freq) as f32;
        let df = doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Weight a term cursor multiplies into every node score
    pub fn term_weight(&self, boost: f32, doc_freq: u32) -> f32 {
        boost * self.idf(doc_freq) * self.weights.tf_weight
    }

    /// Fold a node score into a running document score
    pub fn accumulate(&self, doc_score: f32, node_score: f32) -> f32 {
        match self.weights.doc_score_mode {
            DocScoreMode::Sum => doc_score + node_score,
            DocScoreMode::Max => doc_score.max(node_score),
        }
    }
}

/// Score of a node where a term occurs `freq` times
#[inline]
pub fn node_score(weight: f32, freq: u32) -> f32 {
    weight * (1.0 + freq as f32).log2()
}
