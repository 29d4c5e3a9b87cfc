use crate::error::{Error, Result};
use crate::index::codec::{NodeOccurrences, PostingsWriter, Storage, compressor_for};
use crate::index::node_path::NodePath;
use crate::index::reader::{
    DELETED_FILE, DICT_FILE, META_FILE, POSTINGS_FILE, SegmentReader, TermDict, TermDictEntry,
};
use crate::index::types::*;
use ahash::{AHashMap, AHashSet};
use log::{debug, trace};
use roaring::RoaringBitmap;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Postings of one term accumulated in memory, in doc id order
type TermPostings = Vec<(DocId, Vec<NodeOccurrences>)>;

/// Builds a single segment from tagged token streams.
pub struct SegmentWriter {
    config: IndexConfig,
    datatypes: AHashSet<String>,
    /// Term -> documents (accumulated during build, sorted on write)
    postings: BTreeMap<String, TermPostings>,
    doc_count: u32,
    deleted: RoaringBitmap,
}

impl SegmentWriter {
    pub fn new(config: IndexConfig) -> Result<Self> {
        if config.max_block_size == 0 {
            return Err(Error::config("max_block_size must be at least 1"));
        }
        Ok(Self {
            datatypes: config.datatypes.iter().cloned().collect(),
            config,
            postings: BTreeMap::new(),
            doc_count: 0,
            deleted: RoaringBitmap::new(),
        })
    }

    /// Add a document given as its analysed tokens. Doc ids are assigned
    /// densely from zero.
    pub fn add_document(&mut self, tokens: &[TaggedToken]) -> Result<DocId> {
        for token in tokens {
            if !self.datatypes.contains(token.datatype.as_str()) {
                return Err(Error::config(format!(
                    "token {:?} uses unregistered datatype {:?}",
                    token.term, token.datatype
                )));
            }
            if token.term.len() > u16::MAX as usize {
                return Err(Error::config(format!(
                    "term of {} bytes exceeds the dictionary limit",
                    token.term.len()
                )));
            }
        }
        let doc = self.doc_count;
        let next = doc
            .checked_add(1)
            .ok_or_else(|| Error::config("segment cannot hold more documents"))?;

        // Group occurrences by term, then by node (nodes sorted by path order)
        let mut by_term: AHashMap<&str, BTreeMap<&NodePath, Vec<TokenPosition>>> = AHashMap::new();
        for token in tokens {
            by_term
                .entry(token.term.as_str())
                .or_default()
                .entry(&token.node)
                .or_default()
                .push(token.position);
        }

        for (term, nodes) in by_term {
            let occurrences: Vec<NodeOccurrences> = nodes
                .into_iter()
                .map(|(node, mut positions)| {
                    positions.sort_unstable();
                    positions.dedup();
                    (node.clone(), positions)
                })
                .collect();
            match self.postings.get_mut(term) {
                Some(list) => list.push((doc, occurrences)),
                None => {
                    self.postings.insert(term.to_string(), vec![(doc, occurrences)]);
                }
            }
        }

        trace!("added document {} with {} tokens", doc, tokens.len());
        self.doc_count = next;
        Ok(doc)
    }

    /// Mark a document as deleted. Returns false if it already was.
    pub fn delete_document(&mut self, doc: DocId) -> Result<bool> {
        if doc >= self.doc_count {
            return Err(Error::config(format!(
                "cannot delete unknown document {} (segment has {})",
                doc, self.doc_count
            )));
        }
        Ok(self.deleted.insert(doc))
    }

    pub fn doc_count(&self) -> u32 {
        self.doc_count
    }

    /// Encode all postings into one buffer plus its dictionary.
    fn encode(&self) -> Result<(Vec<TermDictEntry>, Vec<u8>)> {
        let doc_compressor = compressor_for(self.config.doc_compressor);
        let node_compressor = compressor_for(self.config.node_compressor);

        let mut entries = Vec::with_capacity(self.postings.len());
        let mut bytes = Vec::new();
        for (term, docs) in &self.postings {
            let mut writer = PostingsWriter::new(
                self.config.max_block_size,
                doc_compressor.clone(),
                node_compressor.clone(),
            )?;
            for (doc, nodes) in docs {
                writer.add_document(*doc, nodes)?;
            }
            let encoded = writer.finish();
            entries.push(TermDictEntry {
                term: term.clone(),
                info: TermInfo {
                    offset: bytes.len() as u64,
                    length: encoded.bytes.len() as u32,
                    doc_freq: encoded.doc_freq,
                    block_count: encoded.block_count,
                },
            });
            bytes.extend_from_slice(&encoded.bytes);
        }
        debug!(
            "encoded {} terms over {} docs into {} postings bytes",
            entries.len(),
            self.doc_count,
            bytes.len()
        );
        Ok((entries, bytes))
    }

    fn meta(&self) -> SegmentMeta {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        SegmentMeta {
            version: 1,
            doc_count: self.doc_count,
            term_count: self.postings.len() as u32,
            config: self.config.clone(),
            created_at: now,
        }
    }

    /// Build an in-memory segment.
    pub fn finish(self) -> Result<SegmentReader> {
        let (entries, bytes) = self.encode()?;
        let dict = TermDict::new(entries, "segment writer")?;
        SegmentReader::from_parts(self.meta(), dict, Storage::Owned(bytes), self.deleted)
    }

    /// Write the segment files into `dir`, creating it if needed.
    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        let (entries, bytes) = self.encode()?;

        self.write_dict(&dir.join(DICT_FILE), &entries)?;

        let postings_path = dir.join(POSTINGS_FILE);
        fs::write(&postings_path, &bytes).map_err(|e| Error::io(&postings_path, e))?;

        let deleted_path = dir.join(DELETED_FILE);
        let mut file = create(&deleted_path)?;
        self.deleted
            .serialize_into(&mut file)
            .and_then(|_| file.flush())
            .map_err(|e| Error::io(&deleted_path, e))?;

        let meta_path = dir.join(META_FILE);
        let file = create(&meta_path)?;
        serde_json::to_writer_pretty(file, &self.meta())?;

        debug!("wrote segment to {}", dir.display());
        Ok(())
    }

    /// Write the term dictionary: count, then per term its length-prefixed
    /// bytes followed by offset, length, doc_freq and block_count.
    fn write_dict(&self, dict_path: &Path, entries: &[TermDictEntry]) -> Result<()> {
        let mut file = create(dict_path)?;
        let mut write = |bytes: &[u8]| file.write_all(bytes).map_err(|e| Error::io(dict_path, e));

        write(&(entries.len() as u32).to_le_bytes())?;
        for entry in entries {
            let term_bytes = entry.term.as_bytes();
            write(&(term_bytes.len() as u16).to_le_bytes())?;
            write(term_bytes)?;
            write(&entry.info.offset.to_le_bytes())?;
            write(&entry.info.length.to_le_bytes())?;
            write(&entry.info.doc_freq.to_le_bytes())?;
            write(&entry.info.block_count.to_le_bytes())?;
        }
        file.flush().map_err(|e| Error::io(dict_path, e))
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_doc_ids() {
        let mut writer = SegmentWriter::new(IndexConfig::default()).unwrap();
        assert_eq!(writer.add_document(&[TaggedToken::new("a", [0], 0)]).unwrap(), 0);
        assert_eq!(writer.add_document(&[]).unwrap(), 1);
        assert_eq!(writer.add_document(&[TaggedToken::new("a", [1], 0)]).unwrap(), 2);

        let reader = writer.finish().unwrap();
        assert_eq!(reader.doc_count(), 3);
        assert_eq!(reader.doc_freq("a"), 2);
    }

    #[test]
    fn test_unregistered_datatype_rejected() {
        let mut writer = SegmentWriter::new(IndexConfig::default()).unwrap();
        let token = TaggedToken::new("2024", [0], 0).with_datatype("date");
        let err = writer.add_document(&[token]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(writer.doc_count(), 0);

        let config = IndexConfig {
            datatypes: vec!["text".into(), "date".into()],
            ..IndexConfig::default()
        };
        let mut writer = SegmentWriter::new(config).unwrap();
        let token = TaggedToken::new("2024", [0], 0).with_datatype("date");
        assert_eq!(writer.add_document(&[token]).unwrap(), 0);
    }

    #[test]
    fn test_delete_document() {
        let mut writer = SegmentWriter::new(IndexConfig::default()).unwrap();
        writer.add_document(&[TaggedToken::new("a", [0], 0)]).unwrap();
        assert!(writer.delete_document(0).unwrap());
        assert!(!writer.delete_document(0).unwrap());
        assert!(writer.delete_document(5).is_err());

        let reader = writer.finish().unwrap();
        assert!(reader.is_deleted(0));
        assert_eq!(reader.live_doc_count(), 0);
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let config = IndexConfig {
            max_block_size: 0,
            ..IndexConfig::default()
        };
        assert!(SegmentWriter::new(config).is_err());
    }
}
