use crate::error::{Error, Result};
use crate::index::codec::{BlockHeader, STREAM_COUNT, SharedCompressor};
use crate::index::node_path::NodePath;
use crate::index::types::{DocId, TokenPosition};
use log::trace;

/// Occurrences of a term inside one node: the node and its sorted positions.
pub type NodeOccurrences = (NodePath, Vec<TokenPosition>);

/// Writes the postings of one term as a sequence of compressed blocks.
pub struct PostingsWriter {
    max_block_size: usize,
    doc_compressor: SharedCompressor,
    node_compressor: SharedCompressor,
    /// Raw streams of the block being filled
    docs: Vec<u32>,
    freqs: Vec<u32>,
    nodes: Vec<u32>,
    positions: Vec<u32>,
    first_doc: DocId,
    last_doc: Option<DocId>,
    /// Compressed scratch buffers, pre-sized from the compressors' worst case
    compressed: [Vec<u8>; STREAM_COUNT],
    output: Vec<u8>,
    doc_freq: u32,
    block_count: u32,
}

impl PostingsWriter {
    pub fn new(
        max_block_size: usize,
        doc_compressor: SharedCompressor,
        node_compressor: SharedCompressor,
    ) -> Result<Self> {
        if max_block_size == 0 {
            return Err(Error::config("max_block_size must be at least 1"));
        }
        let doc_capacity = doc_compressor.max_compressed_len(max_block_size);
        Ok(Self {
            max_block_size,
            docs: Vec::with_capacity(max_block_size),
            freqs: Vec::with_capacity(max_block_size),
            nodes: Vec::new(),
            positions: Vec::new(),
            first_doc: 0,
            last_doc: None,
            compressed: [
                Vec::with_capacity(doc_capacity),
                Vec::with_capacity(doc_capacity),
                Vec::new(),
                Vec::new(),
            ],
            output: Vec::new(),
            doc_compressor,
            node_compressor,
            doc_freq: 0,
            block_count: 0,
        })
    }

    /// Append one document. Doc ids must not decrease; node paths must be
    /// strictly increasing and every node needs sorted, non-empty positions.
    pub fn add_document(&mut self, doc: DocId, nodes: &[NodeOccurrences]) -> Result<()> {
        Self::validate(doc, self.last_doc, nodes)?;

        match self.last_doc {
            Some(last) if !self.docs.is_empty() => self.docs.push(doc - last),
            _ => {
                self.first_doc = doc;
                self.docs.push(0);
            }
        }
        self.last_doc = Some(doc);
        self.freqs.push(nodes.len() as u32 - 1);

        let mut prev = NodePath::root();
        for (path, positions) in nodes {
            self.encode_node(&prev, path, positions.len() as u32);
            let mut last = 0;
            for &pos in positions {
                self.positions.push(pos - last);
                last = pos;
            }
            prev = path.clone();
        }

        self.doc_freq += 1;
        if self.docs.len() >= self.max_block_size {
            self.flush_block();
        }
        Ok(())
    }

    fn validate(doc: DocId, last_doc: Option<DocId>, nodes: &[NodeOccurrences]) -> Result<()> {
        if nodes.is_empty() {
            return Err(Error::config(format!("document {} has no node occurrences", doc)));
        }
        if let Some(last) = last_doc {
            if doc < last {
                return Err(Error::config(format!(
                    "doc ids must not decrease: {} after {}",
                    doc, last
                )));
            }
        }
        for (i, (path, positions)) in nodes.iter().enumerate() {
            if i > 0 && *path <= nodes[i - 1].0 {
                return Err(Error::config(format!(
                    "node paths of doc {} are not strictly increasing: {} after {}",
                    doc,
                    path,
                    nodes[i - 1].0
                )));
            }
            if positions.is_empty() {
                return Err(Error::config(format!("node {} of doc {} has no positions", path, doc)));
            }
            if positions.windows(2).any(|w| w[1] < w[0]) {
                return Err(Error::config(format!(
                    "positions of node {} in doc {} are not sorted",
                    path, doc
                )));
            }
        }
        Ok(())
    }

    fn encode_node(&mut self, prev: &NodePath, path: &NodePath, term_freq: u32) {
        let shared = prev.common_prefix_len(path);
        let suffix = &path.components()[shared..];
        self.nodes.push(shared as u32);
        self.nodes.push(suffix.len() as u32);
        for (i, &component) in suffix.iter().enumerate() {
            if i == 0 && shared < prev.len() {
                // diverging component is strictly greater than the previous one
                self.nodes.push(component - prev.components()[shared]);
            } else {
                self.nodes.push(component);
            }
        }
        self.nodes.push(term_freq - 1);
    }

    fn flush_block(&mut self) {
        if self.docs.is_empty() {
            return;
        }

        let node_capacity = self.node_compressor.max_compressed_len(self.nodes.len());
        let pos_capacity = self.node_compressor.max_compressed_len(self.positions.len());
        for buf in self.compressed.iter_mut() {
            buf.clear();
        }
        self.compressed[2].reserve(node_capacity);
        self.compressed[3].reserve(pos_capacity);

        self.doc_compressor.compress(&self.docs, &mut self.compressed[0]);
        self.doc_compressor.compress(&self.freqs, &mut self.compressed[1]);
        self.node_compressor.compress(&self.nodes, &mut self.compressed[2]);
        self.node_compressor.compress(&self.positions, &mut self.compressed[3]);

        let header = BlockHeader {
            block_size: self.docs.len() as u32,
            stream_len: [
                self.compressed[0].len() as u32,
                self.compressed[1].len() as u32,
                self.compressed[2].len() as u32,
                self.compressed[3].len() as u32,
            ],
            node_skip: self.nodes.len() as u32,
            pos_skip: self.positions.len() as u32,
            first_doc: self.first_doc,
            last_doc: self.last_doc.unwrap_or(self.first_doc),
        };
        trace!(
            "flush block #{}: docs {}..={} ({} docs, {} payload bytes)",
            self.block_count,
            header.first_doc,
            header.last_doc,
            header.block_size,
            header.payload_len()
        );
        header.write(&mut self.output);
        for buf in &self.compressed {
            self.output.extend_from_slice(buf);
        }

        self.block_count += 1;
        self.docs.clear();
        self.freqs.clear();
        self.nodes.clear();
        self.positions.clear();
    }

    /// Flush the pending block and return the encoded postings.
    pub fn finish(mut self) -> EncodedPostings {
        self.flush_block();
        EncodedPostings {
            bytes: self.output,
            doc_freq: self.doc_freq,
            block_count: self.block_count,
        }
    }
}

/// Output of [`PostingsWriter::finish`].
#[derive(Debug, Clone)]
pub struct EncodedPostings {
    pub bytes: Vec<u8>,
    pub doc_freq: u32,
    pub block_count: u32,
}
