use crate::error::{Error, Result};
use crate::index::codec::{BlockReader, PostingsSlice, compressor_for};
use crate::index::node_path::NodePath;
use crate::index::types::{CompressorKind, DocId, DocPosition, NodePosition, Position, TokenPosition};
use crate::search::cursor::{NodeCursor, PositionCursor, not_on_node, require_node};
use crate::search::scorer::node_score;
use roaring::RoaringBitmap;
use std::sync::Arc;

/// Cursor over the postings of a single term.
///
/// Deleted documents are skipped. Node entries are only decoded once
/// `next_node` is called for a document, positions once `next_position` is.
pub struct TermCursor {
    blocks: BlockReader,
    deleted: Arc<RoaringBitmap>,
    doc_freq: u32,
    weight: f32,
    doc: DocPosition,
    /// Index of `doc` in the current block, valid while `in_block`
    doc_index: usize,
    in_block: bool,
    node: NodePosition,
    nodes_left: u32,
    next_node_offset: usize,
    next_pos_offset: usize,
    term_freq: u32,
    node_pos_offset: usize,
    positions: Vec<TokenPosition>,
    positions_loaded: bool,
    position_index: usize,
    position: Position<TokenPosition>,
}

impl TermCursor {
    pub fn new(blocks: BlockReader, deleted: Arc<RoaringBitmap>, doc_freq: u32) -> Self {
        Self {
            blocks,
            deleted,
            doc_freq,
            weight: 1.0,
            doc: Position::NotStarted,
            doc_index: 0,
            in_block: false,
            node: Position::NotStarted,
            nodes_left: 0,
            next_node_offset: 0,
            next_pos_offset: 0,
            term_freq: 0,
            node_pos_offset: 0,
            positions: Vec::new(),
            positions_loaded: false,
            position_index: 0,
            position: Position::NotStarted,
        }
    }

    /// Cursor for a term missing from the dictionary
    pub fn empty() -> Self {
        let blocks = BlockReader::new(
            PostingsSlice::from_vec(Vec::new()),
            1,
            compressor_for(CompressorKind::VarInt),
            compressor_for(CompressorKind::VarInt),
        );
        Self::new(blocks, Arc::new(RoaringBitmap::new()), 0)
    }

    /// Multiplier applied to `log2(1 + freq)` for every node score.
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    pub fn doc_freq(&self) -> u32 {
        self.doc_freq
    }

    fn exhaust(&mut self) -> Result<bool> {
        self.doc = Position::Exhausted;
        self.node = Position::NotStarted;
        self.in_block = false;
        Ok(false)
    }

    fn enter_doc(&mut self, doc: DocId, index: usize) -> Result<bool> {
        if let Position::At(prev) = self.doc {
            if doc <= prev {
                return Err(Error::corrupt(
                    "doc stream",
                    format!("doc id {} does not follow {}", doc, prev),
                ));
            }
        }
        self.doc = Position::At(doc);
        self.doc_index = index;
        self.node = Position::NotStarted;
        self.nodes_left = 0;
        self.position = Position::NotStarted;
        self.positions_loaded = false;
        Ok(true)
    }

    /// First live document at or after `index` in the current block.
    fn scan_block(&mut self, mut index: usize, target: DocId) -> Result<Option<(usize, DocId)>> {
        let docs = self.blocks.docs()?;
        while let Some(&doc) = docs.get(index) {
            if doc >= target && !self.deleted.contains(doc) {
                return Ok(Some((index, doc)));
            }
            index += 1;
        }
        Ok(None)
    }

    /// Scan forward from `index`, moving across blocks as needed.
    fn scan_from(&mut self, mut index: usize, target: DocId) -> Result<bool> {
        loop {
            if let Some((found, doc)) = self.scan_block(index, target)? {
                return self.enter_doc(doc, found);
            }
            if !self.blocks.advance_block()? {
                return self.exhaust();
            }
            index = 0;
        }
    }

    fn load_positions(&mut self) -> Result<()> {
        if !self.positions_loaded {
            self.blocks
                .positions(self.node_pos_offset, self.term_freq, &mut self.positions)?;
            self.positions_loaded = true;
            self.position_index = 0;
        }
        Ok(())
    }

    /// All positions of the current node, in increasing order.
    pub fn positions_in_node(&mut self) -> Result<&[TokenPosition]> {
        require_node(&self.node)?;
        self.load_positions()?;
        Ok(&self.positions)
    }
}

impl NodeCursor for TermCursor {
    fn next_candidate(&mut self) -> Result<bool> {
        match self.doc {
            Position::Exhausted => Ok(false),
            Position::At(_) if self.in_block => self.scan_from(self.doc_index + 1, 0),
            _ => {
                if !self.blocks.advance_block()? {
                    return self.exhaust();
                }
                self.in_block = true;
                self.scan_from(0, 0)
            }
        }
    }

    fn skip_to_candidate(&mut self, target: DocId) -> Result<bool> {
        match self.doc {
            Position::Exhausted => return Ok(false),
            Position::At(doc) if doc >= target => return Ok(true),
            _ => {}
        }
        let same_block = self.in_block
            && self.doc.is_at()
            && self.blocks.header().is_some_and(|h| h.last_doc >= target);
        if same_block {
            return self.scan_from(self.doc_index + 1, target);
        }
        if !self.blocks.seek_block(target)? {
            return self.exhaust();
        }
        self.in_block = true;
        self.scan_from(0, target)
    }

    fn next_node(&mut self) -> Result<bool> {
        if !self.doc.is_at() || self.node.is_exhausted() {
            return Ok(false);
        }
        let mut path = match std::mem::take(&mut self.node) {
            Position::At(path) => path,
            _ => {
                let entries = self.blocks.doc_entries(self.doc_index)?;
                self.nodes_left = entries.node_count;
                self.next_node_offset = entries.node_offset;
                self.next_pos_offset = entries.pos_offset;
                NodePath::root()
            }
        };
        if self.nodes_left == 0 {
            self.node = Position::Exhausted;
            return Ok(false);
        }

        let entry = self.blocks.read_node(self.next_node_offset, &mut path)?;
        self.nodes_left -= 1;
        self.next_node_offset = entry.next_offset;
        self.node_pos_offset = self.next_pos_offset;
        self.next_pos_offset += entry.term_freq as usize;
        self.term_freq = entry.term_freq;
        self.node = Position::At(path);
        self.position = Position::NotStarted;
        self.positions_loaded = false;
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
        Ok(self.term_freq)
    }

    fn score_in_node(&mut self) -> Result<f32> {
        require_node(&self.node)?;
        Ok(node_score(self.weight, self.term_freq))
    }

    fn cost(&self) -> u64 {
        self.doc_freq as u64
    }
}

impl PositionCursor for TermCursor {
    fn next_position(&mut self) -> Result<bool> {
        if !self.node.is_at() {
            return Err(not_on_node());
        }
        if self.position.is_exhausted() {
            return Ok(false);
        }
        self.load_positions()?;
        let next = match self.position {
            Position::NotStarted => 0,
            _ => self.position_index + 1,
        };
        match self.positions.get(next) {
            Some(&pos) => {
                self.position_index = next;
                self.position = Position::At(pos);
                Ok(true)
            }
            None => {
                self.position = Position::Exhausted;
                Ok(false)
            }
        }
    }

    fn position(&self) -> Position<TokenPosition> {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexConfig, SegmentReader, SegmentWriter, TaggedToken};
    use crate::search::cursor::testing::collect;

    fn segment(block_size: usize, docs: &[Vec<TaggedToken>]) -> SegmentReader {
        let config = IndexConfig {
            max_block_size: block_size,
            ..IndexConfig::default()
        };
        let mut writer = SegmentWriter::new(config).unwrap();
        for tokens in docs {
            writer.add_document(tokens).unwrap();
        }
        writer.finish().unwrap()
    }

    fn tok(term: &str, node: &[u32], pos: u32) -> TaggedToken {
        TaggedToken::new(term, node, pos)
    }

    #[test]
    fn test_iterates_docs_and_nodes() {
        let reader = segment(
            2,
            &[
                vec![tok("a", &[0], 0), tok("a", &[0, 1], 1), tok("b", &[1], 0)],
                vec![tok("b", &[0], 0)],
                vec![tok("a", &[2, 0], 0)],
            ],
        );
        let mut cursor = reader.postings("a");
        let hits = collect(&mut cursor).unwrap();
        assert_eq!(
            hits,
            vec![
                (0, NodePath::from([0])),
                (0, NodePath::from([0, 1])),
                (2, NodePath::from([2, 0])),
            ]
        );
        assert_eq!(cursor.doc(), Position::Exhausted);
        assert!(!cursor.next_candidate().unwrap());
        assert!(!cursor.skip_to_candidate(0).unwrap());
    }

    #[test]
    fn test_skip_across_blocks() {
        let docs: Vec<_> = (0..20).map(|i| vec![tok("t", &[i], 0)]).collect();
        let reader = segment(4, &docs);
        let mut cursor = reader.postings("t");
        assert!(cursor.skip_to_candidate(9).unwrap());
        assert_eq!(cursor.doc(), Position::At(9));
        assert!(cursor.next_node().unwrap());
        assert_eq!(cursor.node(), &Position::At(NodePath::from([9])));
        // behind the current doc: stays put
        assert!(cursor.skip_to_candidate(3).unwrap());
        assert_eq!(cursor.doc(), Position::At(9));
        assert!(cursor.skip_to_candidate(10).unwrap());
        assert_eq!(cursor.doc(), Position::At(10));
        assert!(cursor.next_candidate().unwrap());
        assert_eq!(cursor.doc(), Position::At(11));
        assert!(cursor.skip_to_candidate(19).unwrap());
        assert!(!cursor.next_candidate().unwrap());
    }

    #[test]
    fn test_positions() {
        let reader = segment(
            8,
            &[vec![tok("x", &[0], 4), tok("x", &[0], 1), tok("x", &[1], 7), tok("y", &[0], 2)]],
        );
        let mut cursor = reader.postings("x");
        assert!(cursor.next_candidate().unwrap());
        assert!(cursor.next_position().is_err());
        assert!(cursor.next_node().unwrap());
        assert_eq!(cursor.freq_in_node().unwrap(), 2);
        assert!(cursor.next_position().unwrap());
        assert_eq!(cursor.position(), Position::At(1));
        assert!(cursor.next_position().unwrap());
        assert_eq!(cursor.position(), Position::At(4));
        assert!(!cursor.next_position().unwrap());
        assert!(!cursor.next_position().unwrap());

        assert!(cursor.next_node().unwrap());
        assert_eq!(cursor.positions_in_node().unwrap(), &[7]);
        assert!(!cursor.next_node().unwrap());
        assert!(!cursor.next_node().unwrap());
    }

    #[test]
    fn test_deleted_docs_skipped() {
        let docs: Vec<_> = (0..6).map(|_| vec![tok("t", &[0], 0)]).collect();
        let mut writer = SegmentWriter::new(IndexConfig {
            max_block_size: 2,
            ..IndexConfig::default()
        })
        .unwrap();
        for tokens in &docs {
            writer.add_document(tokens).unwrap();
        }
        writer.delete_document(2).unwrap();
        writer.delete_document(3).unwrap();
        let reader = writer.finish().unwrap();

        let mut cursor = reader.postings("t");
        assert!(cursor.skip_to_candidate(2).unwrap());
        assert_eq!(cursor.doc(), Position::At(4));
    }

    #[test]
    fn test_unknown_term_is_empty() {
        let reader = segment(8, &[vec![tok("a", &[0], 0)]]);
        let mut cursor = reader.postings("nope");
        assert!(!cursor.next_candidate().unwrap());
        assert_eq!(cursor.cost(), 0);
    }

    #[test]
    fn test_score_scales_with_weight() {
        let reader = segment(8, &[vec![tok("a", &[0], 0)]]);
        let mut cursor = reader.postings("a").with_weight(2.0);
        assert!(cursor.next_candidate().unwrap());
        assert!(cursor.score_in_node().is_err());
        assert!(cursor.next_node().unwrap());
        assert_eq!(cursor.score_in_node().unwrap(), 2.0);
    }
}
