//! Shared helpers for the integration tests.

#![allow(dead_code)]

use arbor::index::types::Position;
use arbor::index::{IndexConfig, NodePath, SegmentReader, SegmentWriter};
use arbor::search::NodeCursor;
use arbor::utils::parse_tagged;
use std::path::Path;

/// The two documents used by the boolean scenarios.
pub const SCENARIO_DOCS: [&str; 2] = [
    "aaa@0.0 bbb@0.0 aaa@0.1 ccc@0.1",
    "aaa@0.0 aaa@0.1 bbb@0.1",
];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn writer_with(config: IndexConfig, docs: &[&str]) -> anyhow::Result<SegmentWriter> {
    let mut writer = SegmentWriter::new(config)?;
    for doc in docs {
        writer.add_document(&parse_tagged(doc)?)?;
    }
    Ok(writer)
}

/// In-memory segment holding `docs` in `term@path` notation.
pub fn segment(docs: &[&str]) -> SegmentReader {
    init_logging();
    writer_with(IndexConfig::default(), docs)
        .and_then(|w| Ok(w.finish()?))
        .expect("failed to build segment")
}

/// Segment written to `dir` and reopened from disk.
pub fn disk_segment(dir: &Path, config: IndexConfig, docs: &[&str]) -> SegmentReader {
    init_logging();
    let writer = writer_with(config, docs).expect("failed to index documents");
    writer.write(dir).expect("failed to write segment");
    SegmentReader::open(dir).expect("failed to open segment")
}

pub fn path(components: &[u32]) -> NodePath {
    NodePath::from(components)
}

/// Drain a cursor into `(doc, node)` pairs.
pub fn drain(cursor: &mut dyn NodeCursor) -> Vec<(u32, NodePath)> {
    let mut out = Vec::new();
    while cursor.next_candidate().expect("next_candidate failed") {
        let Position::At(doc) = cursor.doc() else {
            break;
        };
        while cursor.next_node().expect("next_node failed") {
            if let Position::At(node) = cursor.node() {
                out.push((doc, node.clone()));
            }
        }
    }
    out
}
