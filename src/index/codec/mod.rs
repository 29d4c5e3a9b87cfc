//! Block codec for node-addressed postings.
//!
//! The postings of a term are a sequence of self-describing blocks, each
//! holding up to `max_block_size` documents. A block is a varint header
//! followed by four independently compressed streams:
//!
//! | stream | one entry per | content                                   |
//! |--------|---------------|-------------------------------------------|
//! | doc    | document      | doc id delta (first entry 0)              |
//! | freq   | document      | matching nodes in the document minus one  |
//! | node   | node          | `shared, suffix_len, suffix.., tf - 1`    |
//! | pos    | occurrence    | position delta inside the node            |
//!
//! The header carries the four compressed lengths, the uncompressed sizes of
//! the node and position streams and the first/last doc id, so a reader can
//! skip whole blocks without decompressing anything.

pub mod block_reader;
pub mod block_writer;
pub mod compressor;

pub use block_reader::{BlockReader, DocEntries, NodeEntry};
pub use block_writer::{EncodedPostings, NodeOccurrences, PostingsWriter};
pub use compressor::{
    BitPackCompressor, BlockCompressor, SharedCompressor, VarIntCompressor, compressor_for,
};

use crate::error::Result;
use crate::index::types::DocId;
use crate::utils::{VarIntReader, encode_varint};
use memmap2::Mmap;
use std::ops::{Deref, Range};
use std::sync::Arc;

/// Number of compressed streams per block
pub const STREAM_COUNT: usize = 4;

pub const DOC_STREAM: usize = 0;
pub const FREQ_STREAM: usize = 1;
pub const NODE_STREAM: usize = 2;
pub const POS_STREAM: usize = 3;

/// Decoded block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHeader {
    /// Documents in the block
    pub block_size: u32,
    /// Compressed byte length of each stream
    pub stream_len: [u32; STREAM_COUNT],
    /// Uncompressed int count of the node stream
    pub node_skip: u32,
    /// Uncompressed int count of the position stream
    pub pos_skip: u32,
    pub first_doc: DocId,
    pub last_doc: DocId,
}

impl BlockHeader {
    pub fn write(&self, out: &mut Vec<u8>) {
        encode_varint(self.block_size, out);
        for len in self.stream_len {
            encode_varint(len, out);
        }
        encode_varint(self.node_skip, out);
        encode_varint(self.pos_skip, out);
        encode_varint(self.first_doc, out);
        encode_varint(self.last_doc - self.first_doc, out);
    }

    pub fn read(reader: &mut VarIntReader<'_>) -> Result<Self> {
        let block_size = reader.read()?;
        let mut stream_len = [0u32; STREAM_COUNT];
        for len in stream_len.iter_mut() {
            *len = reader.read()?;
        }
        let node_skip = reader.read()?;
        let pos_skip = reader.read()?;
        let first_doc = reader.read()?;
        let last_delta = reader.read()?;
        let last_doc = first_doc.checked_add(last_delta).ok_or_else(|| {
            crate::error::Error::corrupt("block header", "last doc id overflows")
        })?;
        Ok(Self {
            block_size,
            stream_len,
            node_skip,
            pos_skip,
            first_doc,
            last_doc,
        })
    }

    /// Total compressed payload bytes following the header.
    pub fn payload_len(&self) -> usize {
        self.stream_len.iter().map(|&l| l as usize).sum()
    }

    /// Byte range of `stream` relative to the start of the payload.
    pub fn stream_range(&self, stream: usize) -> Range<usize> {
        let start: usize = self.stream_len[..stream].iter().map(|&l| l as usize).sum();
        start..start + self.stream_len[stream] as usize
    }
}

/// Immutable bytes backing a postings file.
pub enum Storage {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Deref for Storage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Storage::Mmap(map) => map,
            Storage::Owned(bytes) => bytes,
        }
    }
}

/// A term's postings: a shared storage handle plus the byte range it occupies.
#[derive(Clone)]
pub struct PostingsSlice {
    storage: Arc<Storage>,
    range: Range<usize>,
}

impl PostingsSlice {
    pub fn new(storage: Arc<Storage>, range: Range<usize>) -> Self {
        Self { storage, range }
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        Self {
            storage: Arc::new(Storage::Owned(bytes)),
            range: 0..len,
        }
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.storage[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}
