use crate::error::{Error, Result};
use crate::index::codec::{BlockReader, PostingsSlice, SharedCompressor, Storage, compressor_for};
use crate::index::stats::SegmentStats;
use crate::index::types::*;
use crate::search::term::TermCursor;
use log::debug;
use memmap2::Mmap;
use regex::Regex;
use roaring::RoaringBitmap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

pub const META_FILE: &str = "meta.json";
pub const DICT_FILE: &str = "terms.dict";
pub const POSTINGS_FILE: &str = "postings.bin";
pub const DELETED_FILE: &str = "deleted.bin";

/// Term dictionary entry
#[derive(Debug, Clone)]
pub(crate) struct TermDictEntry {
    pub term: String,
    pub info: TermInfo,
}

/// Sorted term dictionary
#[derive(Debug, Default)]
pub(crate) struct TermDict {
    entries: Vec<TermDictEntry>,
}

impl TermDict {
    /// Build from entries that must already be strictly sorted by term.
    pub(crate) fn new(entries: Vec<TermDictEntry>, context: &str) -> Result<Self> {
        if let Some(pair) = entries.windows(2).find(|w| w[0].term >= w[1].term) {
            return Err(Error::corrupt(
                context,
                format!("terms out of order: {:?} before {:?}", pair[0].term, pair[1].term),
            ));
        }
        Ok(Self { entries })
    }

    fn lookup(&self, term: &str) -> Option<&TermDictEntry> {
        self.entries
            .binary_search_by(|e| e.term.as_str().cmp(term))
            .ok()
            .map(|i| &self.entries[i])
    }

    fn lower_index(&self, bound: Bound<&str>) -> usize {
        match bound {
            Bound::Unbounded => 0,
            Bound::Included(t) => self.entries.partition_point(|e| e.term.as_str() < t),
            Bound::Excluded(t) => self.entries.partition_point(|e| e.term.as_str() <= t),
        }
    }

    fn upper_index(&self, bound: Bound<&str>) -> usize {
        match bound {
            Bound::Unbounded => self.entries.len(),
            Bound::Included(t) => self.entries.partition_point(|e| e.term.as_str() <= t),
            Bound::Excluded(t) => self.entries.partition_point(|e| e.term.as_str() < t),
        }
    }
}

/// Read-only view over one segment: dictionary, postings bytes and deletions.
///
/// The postings bytes are shared with every cursor created from the segment,
/// so a reader can serve any number of concurrent searches.
pub struct SegmentReader {
    meta: SegmentMeta,
    dict: TermDict,
    postings: Arc<Storage>,
    deleted: Arc<RoaringBitmap>,
    doc_compressor: SharedCompressor,
    node_compressor: SharedCompressor,
}

impl SegmentReader {
    pub(crate) fn from_parts(
        meta: SegmentMeta,
        dict: TermDict,
        postings: Storage,
        deleted: RoaringBitmap,
    ) -> Result<Self> {
        if let Some(max) = deleted.max() {
            if max >= meta.doc_count {
                return Err(Error::corrupt(
                    DELETED_FILE,
                    format!("deleted doc {} outside {} documents", max, meta.doc_count),
                ));
            }
        }
        let postings_len = postings.len() as u64;
        for entry in &dict.entries {
            let end = entry.info.offset.checked_add(entry.info.length as u64);
            if end.is_none_or(|end| end > postings_len) {
                return Err(Error::corrupt(
                    DICT_FILE,
                    format!(
                        "postings of {:?} at {}+{} run beyond {} bytes",
                        entry.term, entry.info.offset, entry.info.length, postings_len
                    ),
                ));
            }
        }
        Ok(Self {
            doc_compressor: compressor_for(meta.config.doc_compressor),
            node_compressor: compressor_for(meta.config.node_compressor),
            meta,
            dict,
            postings: Arc::new(postings),
            deleted: Arc::new(deleted),
        })
    }

    /// Open a segment directory written by [`SegmentWriter::write`].
    ///
    /// [`SegmentWriter::write`]: crate::index::SegmentWriter::write
    pub fn open(dir: &Path) -> Result<Self> {
        let meta_path = dir.join(META_FILE);
        let file = File::open(&meta_path).map_err(|e| Error::io(&meta_path, e))?;
        let meta: SegmentMeta = serde_json::from_reader(BufReader::new(file))?;

        let dict = read_term_dict(&dir.join(DICT_FILE))?;

        let postings_path = dir.join(POSTINGS_FILE);
        let file = File::open(&postings_path).map_err(|e| Error::io(&postings_path, e))?;
        let len = file.metadata().map_err(|e| Error::io(&postings_path, e))?.len();
        let postings = if len == 0 {
            Storage::Owned(Vec::new())
        } else {
            // SAFETY: segment files are immutable once written
            let map = unsafe { Mmap::map(&file) }.map_err(|e| Error::io(&postings_path, e))?;
            Storage::Mmap(map)
        };

        let deleted_path = dir.join(DELETED_FILE);
        let deleted = if deleted_path.exists() {
            let bytes = fs::read(&deleted_path).map_err(|e| Error::io(&deleted_path, e))?;
            RoaringBitmap::deserialize_from(&bytes[..])
                .map_err(|e| Error::corrupt(DELETED_FILE, e.to_string()))?
        } else {
            RoaringBitmap::new()
        };

        debug!(
            "opened segment {}: {} docs, {} terms, {} postings bytes",
            dir.display(),
            meta.doc_count,
            dict.entries.len(),
            len
        );
        Self::from_parts(meta, dict, postings, deleted)
    }

    pub fn meta(&self) -> &SegmentMeta {
        &self.meta
    }

    pub fn config(&self) -> &IndexConfig {
        &self.meta.config
    }

    /// Number of documents ever added, deleted ones included
    pub fn doc_count(&self) -> u32 {
        self.meta.doc_count
    }

    pub fn live_doc_count(&self) -> u32 {
        self.meta.doc_count - self.deleted.len() as u32
    }

    pub fn term_count(&self) -> usize {
        self.dict.entries.len()
    }

    pub fn term_info(&self, term: &str) -> Option<TermInfo> {
        self.dict.lookup(term).map(|e| e.info)
    }

    /// Number of documents containing `term`
    pub fn doc_freq(&self, term: &str) -> u32 {
        self.term_info(term).map(|i| i.doc_freq).unwrap_or(0)
    }

    pub fn is_deleted(&self, doc: DocId) -> bool {
        self.deleted.contains(doc)
    }

    pub fn deleted_docs(&self) -> &RoaringBitmap {
        &self.deleted
    }

    /// All terms in dictionary order
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.dict.entries.iter().map(|e| e.term.as_str())
    }

    /// Terms between `lower` and `upper` in dictionary order.
    pub fn terms_in_range<'a>(
        &'a self,
        lower: Bound<&str>,
        upper: Bound<&str>,
    ) -> impl Iterator<Item = &'a str> + use<'a> {
        let start = self.dict.lower_index(lower);
        let end = self.dict.upper_index(upper).max(start);
        self.dict.entries[start..end].iter().map(|e| e.term.as_str())
    }

    pub fn terms_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> {
        let start = self.dict.lower_index(Bound::Included(prefix));
        self.dict.entries[start..]
            .iter()
            .map(|e| e.term.as_str())
            .take_while(move |t| t.starts_with(prefix))
    }

    /// Terms matched by `regex`, which callers anchor on both ends.
    pub fn terms_matching<'a>(&'a self, regex: &'a Regex) -> impl Iterator<Item = &'a str> {
        self.terms().filter(move |t| regex.is_match(t))
    }

    pub(crate) fn block_reader(&self, info: &TermInfo) -> BlockReader {
        let start = info.offset as usize;
        let slice = PostingsSlice::new(self.postings.clone(), start..start + info.length as usize);
        BlockReader::new(
            slice,
            self.meta.config.max_block_size,
            self.doc_compressor.clone(),
            self.node_compressor.clone(),
        )
    }

    /// Cursor over the postings of `term`; empty when the term is unknown.
    pub fn postings(&self, term: &str) -> TermCursor {
        match self.term_info(term) {
            Some(info) => TermCursor::new(self.block_reader(&info), self.deleted.clone(), info.doc_freq),
            None => TermCursor::empty(),
        }
    }

    pub fn stats(&self) -> SegmentStats {
        SegmentStats::collect(self)
    }

    pub(crate) fn term_infos(&self) -> impl Iterator<Item = &TermInfo> {
        self.dict.entries.iter().map(|e| &e.info)
    }

    pub(crate) fn postings_len(&self) -> usize {
        self.postings.len()
    }
}

fn read_array<const N: usize>(reader: &mut impl Read, path: &Path) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    read_into(reader, &mut buf, path)?;
    Ok(buf)
}

fn read_into(reader: &mut impl Read, buf: &mut [u8], path: &Path) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            Error::corrupt(path.display().to_string(), "unexpected end of file")
        }
        _ => Error::io(path, e),
    })
}

/// Read the term dictionary
fn read_term_dict(dict_path: &Path) -> Result<TermDict> {
    let file = File::open(dict_path).map_err(|e| Error::io(dict_path, e))?;
    let mut file = BufReader::new(file);

    let count = u32::from_le_bytes(read_array(&mut file, dict_path)?) as usize;
    let mut entries = Vec::with_capacity(count.min(1 << 20));

    for _ in 0..count {
        let term_len = u16::from_le_bytes(read_array(&mut file, dict_path)?) as usize;
        let mut term_bytes = vec![0u8; term_len];
        read_into(&mut file, &mut term_bytes, dict_path)?;
        let term = String::from_utf8(term_bytes)
            .map_err(|e| Error::corrupt(DICT_FILE, format!("term is not UTF-8: {}", e)))?;

        let offset = u64::from_le_bytes(read_array(&mut file, dict_path)?);
        let length = u32::from_le_bytes(read_array(&mut file, dict_path)?);
        let doc_freq = u32::from_le_bytes(read_array(&mut file, dict_path)?);
        let block_count = u32::from_le_bytes(read_array(&mut file, dict_path)?);

        entries.push(TermDictEntry {
            term,
            info: TermInfo {
                offset,
                length,
                doc_freq,
                block_count,
            },
        });
    }

    TermDict::new(entries, DICT_FILE)
}
