#![no_main]

use arbor::index::CompressorKind;
use arbor::index::NodePath;
use arbor::index::codec::{BlockReader, PostingsSlice, compressor_for};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary postings bytes must decode or fail with an error, never panic
    let mut reader = BlockReader::new(
        PostingsSlice::from_vec(data.to_vec()),
        128,
        compressor_for(CompressorKind::BitPack),
        compressor_for(CompressorKind::VarInt),
    );
    let mut positions = Vec::new();
    while let Ok(true) = reader.advance_block() {
        let Ok(docs) = reader.docs() else { break };
        let count = docs.len();
        for index in 0..count {
            let Ok(entries) = reader.doc_entries(index) else { return };
            let mut path = NodePath::root();
            let mut node_offset = entries.node_offset;
            let mut pos_offset = entries.pos_offset;
            for _ in 0..entries.node_count {
                let Ok(entry) = reader.read_node(node_offset, &mut path) else { return };
                if reader.positions(pos_offset, entry.term_freq, &mut positions).is_err() {
                    return;
                }
                node_offset = entry.next_offset;
                pos_offset += entry.term_freq as usize;
            }
        }
    }
});
