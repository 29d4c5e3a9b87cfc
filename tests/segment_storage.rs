//! Segments written to disk, reopened, tampered with and partially deleted.

mod fixtures;

use arbor::Error;
use arbor::index::reader::{DELETED_FILE, DICT_FILE, POSTINGS_FILE};
use arbor::index::{CompressorKind, IndexConfig, SegmentReader};
use arbor::query::{BooleanQuery, NodeQuery, Searcher};
use arbor::search::NodeCursor;
use fixtures::{SCENARIO_DOCS, disk_segment, segment, writer_with};
use roaring::RoaringBitmap;
use std::fs;
use tempfile::TempDir;

fn small_blocks() -> IndexConfig {
    IndexConfig {
        max_block_size: 2,
        ..IndexConfig::default()
    }
}

fn corpus() -> Vec<String> {
    (0..40)
        .map(|i| {
            let mut doc = format!("common@0 tag{}@0.{} ", i % 5, i % 3);
            if i % 4 == 0 {
                doc.push_str("rare@1.0 rare@1.0 common@1.0");
            } else {
                doc.push_str("filler@1");
            }
            doc
        })
        .collect()
}

#[test]
fn test_disk_round_trip_matches_memory() {
    let docs = corpus();
    let docs: Vec<&str> = docs.iter().map(String::as_str).collect();
    let dir = TempDir::new().unwrap();
    let on_disk = disk_segment(dir.path(), small_blocks(), &docs);
    let in_memory = writer_with(small_blocks(), &docs).unwrap().finish().unwrap();

    assert_eq!(on_disk.doc_count(), 40);
    assert_eq!(on_disk.stats(), in_memory.stats());
    assert_eq!(
        on_disk.terms().collect::<Vec<_>>(),
        in_memory.terms().collect::<Vec<_>>()
    );

    let queries = vec![
        NodeQuery::term("common"),
        NodeQuery::term("rare").with_level(1),
        NodeQuery::prefix("tag"),
        BooleanQuery::new()
            .must(NodeQuery::term("common"))
            .should(NodeQuery::term("rare"))
            .into(),
    ];
    for query in &queries {
        let disk = Searcher::new(&on_disk).search(query, 100).unwrap();
        let memory = Searcher::new(&in_memory).search(query, 100).unwrap();
        assert_eq!(disk, memory, "query {:?}", query);
        assert!(!disk.is_empty());
    }
    assert_eq!(Searcher::new(&on_disk).count(&NodeQuery::term("rare")).unwrap(), 10);
}

#[test]
fn test_config_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let config = IndexConfig {
        max_block_size: 3,
        doc_compressor: CompressorKind::VarInt,
        node_compressor: CompressorKind::BitPack,
        ..IndexConfig::default()
    };
    let reader = disk_segment(dir.path(), config, &SCENARIO_DOCS);
    assert_eq!(reader.config().max_block_size, 3);
    assert_eq!(reader.config().doc_compressor, CompressorKind::VarInt);
    assert_eq!(reader.config().node_compressor, CompressorKind::BitPack);

    let query: NodeQuery = BooleanQuery::new()
        .should(NodeQuery::term("bbb"))
        .must_not(NodeQuery::term("ccc"))
        .into();
    assert_eq!(Searcher::new(&reader).count(&query).unwrap(), 2);
}

#[test]
fn test_empty_segment() {
    let dir = TempDir::new().unwrap();
    let reader = disk_segment(dir.path(), IndexConfig::default(), &[]);
    assert_eq!(reader.doc_count(), 0);
    assert_eq!(reader.term_count(), 0);
    let results = Searcher::new(&reader).search(&NodeQuery::term("a"), 10).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_deleted_documents_never_returned() {
    let docs = corpus();
    let docs: Vec<&str> = docs.iter().map(String::as_str).collect();
    let mut writer = writer_with(small_blocks(), &docs).unwrap();
    assert!(writer.delete_document(4).unwrap());
    assert!(writer.delete_document(8).unwrap());
    assert!(!writer.delete_document(8).unwrap());
    assert!(matches!(writer.delete_document(99), Err(Error::Configuration(_))));

    let dir = TempDir::new().unwrap();
    writer.write(dir.path()).unwrap();
    let on_disk = SegmentReader::open(dir.path()).unwrap();
    let in_memory = writer.finish().unwrap();

    for reader in [&on_disk, &in_memory] {
        assert!(reader.is_deleted(4));
        assert_eq!(reader.live_doc_count(), 38);
        let results = Searcher::new(reader).search(&NodeQuery::term("rare"), 100).unwrap();
        let docs: Vec<u32> = results.iter().map(|m| m.doc).collect();
        assert_eq!(docs.len(), 8);
        assert!(!docs.contains(&4) && !docs.contains(&8));

        let mut cursor = reader.postings("common");
        assert!(cursor.skip_to_candidate(4).unwrap());
        assert_eq!(cursor.doc().value(), Some(5));
    }
}

#[test]
fn test_tampered_block_header_is_corruption() {
    let dir = TempDir::new().unwrap();
    let reader = disk_segment(dir.path(), IndexConfig::default(), &SCENARIO_DOCS);
    let offset = reader.term_info("bbb").unwrap().offset as usize;
    drop(reader);

    let postings_path = dir.path().join(POSTINGS_FILE);
    let mut bytes = fs::read(&postings_path).unwrap();
    // block_size varint of the first block
    bytes[offset] = 0;
    fs::write(&postings_path, &bytes).unwrap();

    let reader = SegmentReader::open(dir.path()).unwrap();
    let err = Searcher::new(&reader)
        .search(&NodeQuery::term("bbb"), 10)
        .unwrap_err();
    assert!(err.is_corruption(), "unexpected error {:?}", err);

    // other terms are untouched
    assert_eq!(Searcher::new(&reader).count(&NodeQuery::term("ccc")).unwrap(), 1);
}

#[test]
fn test_truncated_files_are_corruption() {
    let dir = TempDir::new().unwrap();
    drop(disk_segment(dir.path(), IndexConfig::default(), &SCENARIO_DOCS));

    let postings_path = dir.path().join(POSTINGS_FILE);
    let bytes = fs::read(&postings_path).unwrap();
    fs::write(&postings_path, &bytes[..bytes.len() / 2]).unwrap();
    let err = SegmentReader::open(dir.path()).err().unwrap();
    assert!(err.is_corruption(), "unexpected error {:?}", err);
    fs::write(&postings_path, &bytes).unwrap();

    let dict_path = dir.path().join(DICT_FILE);
    let dict = fs::read(&dict_path).unwrap();
    fs::write(&dict_path, &dict[..dict.len() - 3]).unwrap();
    let err = SegmentReader::open(dir.path()).err().unwrap();
    assert!(err.is_corruption(), "unexpected error {:?}", err);
}

#[test]
fn test_deleted_ids_beyond_doc_count_are_corruption() {
    let dir = TempDir::new().unwrap();
    drop(disk_segment(dir.path(), IndexConfig::default(), &SCENARIO_DOCS));

    let deleted: RoaringBitmap = [0, 7, 9].into_iter().collect();
    let mut bytes = Vec::new();
    deleted.serialize_into(&mut bytes).unwrap();
    fs::write(dir.path().join(DELETED_FILE), &bytes).unwrap();

    let err = SegmentReader::open(dir.path()).err().unwrap();
    assert!(err.is_corruption(), "unexpected error {:?}", err);
}

#[test]
fn test_overflowing_dictionary_range_is_corruption() {
    let dir = TempDir::new().unwrap();
    drop(disk_segment(dir.path(), IndexConfig::default(), &SCENARIO_DOCS));

    // count (4 bytes), term length (2), "aaa", then the u64 offset
    let dict_path = dir.path().join(DICT_FILE);
    let mut dict = fs::read(&dict_path).unwrap();
    assert_eq!(&dict[6..9], b"aaa");
    dict[9..17].copy_from_slice(&(u64::MAX - 1).to_le_bytes());
    fs::write(&dict_path, &dict).unwrap();

    let err = SegmentReader::open(dir.path()).err().unwrap();
    assert!(err.is_corruption(), "unexpected error {:?}", err);
}

#[test]
fn test_missing_segment_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = SegmentReader::open(&dir.path().join("missing")).err().unwrap();
    assert!(matches!(err, Error::Io { .. }));
}

#[test]
fn test_stats_display() {
    let reader = segment(&SCENARIO_DOCS);
    let stats = reader.stats();
    assert_eq!(stats.term_count, 3);
    assert_eq!(stats.posting_count, 5);
    let text = stats.to_string();
    assert!(text.contains("Terms"), "{}", text);
}
