use crate::index::node_path::NodePath;
use crate::search::scorer::ScoringWeights;
use serde::{Deserialize, Serialize};

/// Unique identifier for a document in a segment
pub type DocId = u32;

/// Token position inside its node
pub type TokenPosition = u32;

/// Iteration state of a cursor over documents or nodes.
///
/// The derived ordering puts `NotStarted` before and `Exhausted` after every
/// real value, so positions can be compared directly while merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Position<T> {
    #[default]
    NotStarted,
    At(T),
    Exhausted,
}

impl<T> Position<T> {
    #[inline]
    pub fn at(&self) -> Option<&T> {
        match self {
            Position::At(value) => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Position::Exhausted)
    }

    #[inline]
    pub fn is_at(&self) -> bool {
        matches!(self, Position::At(_))
    }
}

impl<T: Copy> Position<T> {
    #[inline]
    pub fn value(&self) -> Option<T> {
        self.at().copied()
    }
}

pub type DocPosition = Position<DocId>;
pub type NodePosition = Position<NodePath>;

/// Datatype assigned to tokens when the analysis front-end gives none
pub const DEFAULT_DATATYPE: &str = "text";

/// A term occurrence emitted by the analysis front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedToken {
    pub term: String,
    pub node: NodePath,
    pub position: TokenPosition,
    pub datatype: String,
}

impl TaggedToken {
    pub fn new(term: impl Into<String>, node: impl Into<NodePath>, position: TokenPosition) -> Self {
        Self {
            term: term.into(),
            node: node.into(),
            position,
            datatype: DEFAULT_DATATYPE.to_string(),
        }
    }

    pub fn with_datatype(mut self, datatype: impl Into<String>) -> Self {
        self.datatype = datatype.into();
        self
    }
}

/// Block compressor selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompressorKind {
    #[default]
    VarInt,
    BitPack,
}

/// Configuration for the segment writer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Maximum number of documents per postings block
    pub max_block_size: usize,
    /// Compressor used for doc and frequency streams
    pub doc_compressor: CompressorKind,
    /// Compressor used for node and position streams
    pub node_compressor: CompressorKind,
    /// Datatypes the analysis front-end may tag tokens with
    pub datatypes: Vec<String>,
    /// Scoring weights used by searches over this segment
    pub scoring_weights: ScoringWeights,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_block_size: 128,
            doc_compressor: CompressorKind::BitPack,
            node_compressor: CompressorKind::VarInt,
            datatypes: vec![DEFAULT_DATATYPE.to_string()],
            scoring_weights: ScoringWeights::default(),
        }
    }
}

/// Segment metadata stored in meta.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub version: u32,
    pub doc_count: u32,
    pub term_count: u32,
    pub config: IndexConfig,
    pub created_at: u64,
}

impl Default for SegmentMeta {
    fn default() -> Self {
        Self {
            version: 1,
            doc_count: 0,
            term_count: 0,
            config: IndexConfig::default(),
            created_at: 0,
        }
    }
}

/// Dictionary entry mapping a term to its postings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermInfo {
    pub offset: u64,
    pub length: u32,
    pub doc_freq: u32,
    pub block_count: u32,
}
