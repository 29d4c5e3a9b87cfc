use crate::error::{Error, Result};
use crate::index::codec::{
    BlockHeader, DOC_STREAM, FREQ_STREAM, NODE_STREAM, POS_STREAM, PostingsSlice, STREAM_COUNT,
    SharedCompressor,
};
use crate::index::node_path::NodePath;
use crate::index::types::{DocId, TokenPosition};
use crate::utils::VarIntReader;
use log::debug;

/// Result of decoding one node entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeEntry {
    /// Offset of the following entry in the node stream
    pub next_offset: usize,
    pub term_freq: u32,
}

/// Where a document's entries start in the node and position streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocEntries {
    pub node_offset: usize,
    pub pos_offset: usize,
    pub node_count: u32,
}

/// Incremental walk over node entries, from doc index `doc` onwards.
#[derive(Debug, Clone, Copy, Default)]
struct Walk {
    doc: usize,
    node_offset: usize,
    pos_offset: usize,
}

/// Sequential reader over the blocks of one term.
///
/// Streams are decompressed on first access and kept until the reader moves
/// to another block. Moving between blocks only parses headers.
pub struct BlockReader {
    postings: PostingsSlice,
    max_block_size: usize,
    doc_compressor: SharedCompressor,
    node_compressor: SharedCompressor,
    next_offset: usize,
    header: Option<BlockHeader>,
    payload_start: usize,
    decoded: [bool; STREAM_COUNT],
    docs: Vec<DocId>,
    node_counts: Vec<u32>,
    nodes: Vec<u32>,
    positions: Vec<u32>,
    walk: Walk,
}

impl BlockReader {
    /// `max_block_size` is the writer's limit; larger declared blocks are corrupt.
    pub fn new(
        postings: PostingsSlice,
        max_block_size: usize,
        doc_compressor: SharedCompressor,
        node_compressor: SharedCompressor,
    ) -> Self {
        Self {
            postings,
            max_block_size,
            doc_compressor,
            node_compressor,
            next_offset: 0,
            header: None,
            payload_start: 0,
            decoded: [false; STREAM_COUNT],
            docs: Vec::new(),
            node_counts: Vec::new(),
            nodes: Vec::new(),
            positions: Vec::new(),
            walk: Walk::default(),
        }
    }

    /// Header of the current block, `None` before the first block and after the last one.
    #[inline]
    pub fn header(&self) -> Option<&BlockHeader> {
        self.header.as_ref()
    }

    /// Move to the next block. Returns false once every block was visited.
    pub fn advance_block(&mut self) -> Result<bool> {
        let bytes = self.postings.bytes();
        if self.next_offset >= bytes.len() {
            self.header = None;
            self.next_offset = bytes.len();
            return Ok(false);
        }

        let mut reader = VarIntReader::new(&bytes[self.next_offset..], "block header");
        let header = BlockHeader::read(&mut reader)?;
        let payload_start = self.next_offset + reader.position();
        let payload_end = payload_start + header.payload_len();
        if header.block_size == 0 {
            return Err(Error::corrupt(
                "block header",
                format!("empty block at offset {}", self.next_offset),
            ));
        }
        if header.block_size as usize > self.max_block_size {
            return Err(Error::corrupt(
                "block header",
                format!(
                    "block of {} docs at offset {} exceeds the limit of {}",
                    header.block_size, self.next_offset, self.max_block_size
                ),
            ));
        }
        if payload_end > bytes.len() {
            return Err(Error::corrupt(
                "block header",
                format!(
                    "payload of {} bytes at offset {} exceeds postings length {}",
                    header.payload_len(),
                    payload_start,
                    bytes.len()
                ),
            ));
        }

        self.header = Some(header);
        self.payload_start = payload_start;
        self.next_offset = payload_end;
        self.decoded = [false; STREAM_COUNT];
        self.walk = Walk::default();
        Ok(true)
    }

    /// Move forward to the first block whose last doc id is `>= target`,
    /// reading headers only. Never moves backwards.
    pub fn seek_block(&mut self, target: DocId) -> Result<bool> {
        loop {
            if let Some(header) = &self.header {
                if header.last_doc >= target {
                    return Ok(true);
                }
            }
            if !self.advance_block()? {
                return Ok(false);
            }
        }
    }

    fn current_header(&self) -> Result<BlockHeader> {
        self.header
            .ok_or(Error::UnsupportedOperation("block reader is not positioned on a block"))
    }

    fn ensure_decoded(&mut self, stream: usize) -> Result<()> {
        if self.decoded[stream] {
            return Ok(());
        }
        let header = self.current_header()?;
        let range = header.stream_range(stream);
        let bytes = &self.postings.bytes()[self.payload_start + range.start..self.payload_start + range.end];
        let (compressor, count, output) = match stream {
            DOC_STREAM => (&self.doc_compressor, header.block_size, &mut self.docs),
            FREQ_STREAM => (&self.doc_compressor, header.block_size, &mut self.node_counts),
            NODE_STREAM => (&self.node_compressor, header.node_skip, &mut self.nodes),
            _ => (&self.node_compressor, header.pos_skip, &mut self.positions),
        };
        if count as usize > compressor.max_values(bytes) {
            return Err(Error::corrupt(
                "block header",
                format!(
                    "stream {} declares {} values in {} bytes",
                    stream,
                    count,
                    bytes.len()
                ),
            ));
        }
        debug!(
            "decode stream {} of block {}..={} ({} bytes, {} values)",
            stream,
            header.first_doc,
            header.last_doc,
            bytes.len(),
            count
        );
        compressor.decompress(bytes, count as usize, output)?;

        match stream {
            DOC_STREAM => Self::resolve_doc_ids(&header, &mut self.docs)?,
            FREQ_STREAM => {
                for count in self.node_counts.iter_mut() {
                    *count = count
                        .checked_add(1)
                        .ok_or_else(|| Error::corrupt("freq stream", "node count overflows"))?;
                }
            }
            _ => {}
        }
        self.decoded[stream] = true;
        Ok(())
    }

    /// Turn doc deltas into absolute ids and check them against the header.
    fn resolve_doc_ids(header: &BlockHeader, docs: &mut Vec<DocId>) -> Result<()> {
        if docs.first() != Some(&0) {
            docs.clear();
            return Err(Error::corrupt("doc stream", "first delta must be zero"));
        }
        let mut doc = header.first_doc;
        let mut overflow = false;
        for delta in docs.iter_mut() {
            match doc.checked_add(*delta) {
                Some(next) => {
                    doc = next;
                    *delta = next;
                }
                None => {
                    overflow = true;
                    break;
                }
            }
        }
        if overflow {
            docs.clear();
            return Err(Error::corrupt("doc stream", "doc id overflows"));
        }
        if doc != header.last_doc {
            docs.clear();
            return Err(Error::corrupt(
                "doc stream",
                format!("last doc {} disagrees with header {}", doc, header.last_doc),
            ));
        }
        Ok(())
    }

    /// Absolute doc ids of the current block.
    pub fn docs(&mut self) -> Result<&[DocId]> {
        self.ensure_decoded(DOC_STREAM)?;
        Ok(&self.docs)
    }

    /// Number of matching nodes of each document in the current block.
    pub fn node_counts(&mut self) -> Result<&[u32]> {
        self.ensure_decoded(FREQ_STREAM)?;
        Ok(&self.node_counts)
    }

    /// Locate the node and position entries of the document at `index` in the block.
    pub fn doc_entries(&mut self, index: usize) -> Result<DocEntries> {
        self.ensure_decoded(FREQ_STREAM)?;
        self.ensure_decoded(NODE_STREAM)?;
        if index >= self.node_counts.len() {
            return Err(Error::corrupt(
                "freq stream",
                format!("doc index {} outside block of {}", index, self.node_counts.len()),
            ));
        }
        if index < self.walk.doc {
            self.walk = Walk::default();
        }
        while self.walk.doc < index {
            for _ in 0..self.node_counts[self.walk.doc] {
                let (size, term_freq) = self.entry_shape(self.walk.node_offset)?;
                self.walk.node_offset += size;
                self.walk.pos_offset += term_freq as usize;
            }
            self.walk.doc += 1;
        }
        Ok(DocEntries {
            node_offset: self.walk.node_offset,
            pos_offset: self.walk.pos_offset,
            node_count: self.node_counts[index],
        })
    }

    /// Size in ints and term frequency of the node entry at `offset`.
    fn entry_shape(&self, offset: usize) -> Result<(usize, u32)> {
        let suffix_len = self.node_int(offset + 1)? as usize;
        let term_freq = self.node_int(offset + 2 + suffix_len)?;
        Ok((3 + suffix_len, term_freq.saturating_add(1)))
    }

    #[inline]
    fn node_int(&self, index: usize) -> Result<u32> {
        self.nodes.get(index).copied().ok_or_else(|| {
            Error::corrupt(
                "node stream",
                format!("entry at {} runs past {} ints", index, self.nodes.len()),
            )
        })
    }

    /// Decode the node entry at `offset`, rewriting `path` (the previous node
    /// of the same document, or the root for the first one) in place.
    pub fn read_node(&mut self, offset: usize, path: &mut NodePath) -> Result<NodeEntry> {
        self.ensure_decoded(NODE_STREAM)?;
        let shared = self.node_int(offset)? as usize;
        let suffix_len = self.node_int(offset + 1)? as usize;
        if shared > path.len() {
            return Err(Error::corrupt(
                "node stream",
                format!("shared prefix {} longer than previous path {}", shared, path),
            ));
        }

        let diverging = path.component(shared as u32);
        path.truncate(shared);
        for i in 0..suffix_len {
            let value = self.node_int(offset + 2 + i)?;
            let component = match diverging {
                Some(prev) if i == 0 => prev
                    .checked_add(value)
                    .ok_or_else(|| Error::corrupt("node stream", "path component overflows"))?,
                _ => value,
            };
            path.push(component);
        }
        let term_freq = self.node_int(offset + 2 + suffix_len)?.saturating_add(1);
        Ok(NodeEntry {
            next_offset: offset + 3 + suffix_len,
            term_freq,
        })
    }

    /// Absolute positions of the node whose entries start at `pos_offset`.
    pub fn positions(
        &mut self,
        pos_offset: usize,
        term_freq: u32,
        out: &mut Vec<TokenPosition>,
    ) -> Result<()> {
        self.ensure_decoded(POS_STREAM)?;
        out.clear();
        let end = pos_offset + term_freq as usize;
        let deltas = self.positions.get(pos_offset..end).ok_or_else(|| {
            Error::corrupt(
                "position stream",
                format!("range {}..{} outside {} ints", pos_offset, end, self.positions.len()),
            )
        })?;
        let mut position: TokenPosition = 0;
        for &delta in deltas {
            position = position
                .checked_add(delta)
                .ok_or_else(|| Error::corrupt("position stream", "position overflows"))?;
            out.push(position);
        }
        Ok(())
    }

    /// True once the stream at `stream` was decompressed for the current block.
    pub fn is_decoded(&self, stream: usize) -> bool {
        self.decoded[stream]
    }
}
