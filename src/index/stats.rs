use crate::index::reader::SegmentReader;
use std::fmt;

/// Summary of a segment's size and shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentStats {
    pub doc_count: u32,
    pub live_doc_count: u32,
    pub term_count: usize,
    /// Sum of document frequencies over all terms
    pub posting_count: u64,
    pub block_count: u64,
    pub postings_bytes: usize,
}

impl SegmentStats {
    pub(crate) fn collect(reader: &SegmentReader) -> Self {
        let (posting_count, block_count) = reader
            .term_infos()
            .fold((0u64, 0u64), |(postings, blocks), info| {
                (postings + info.doc_freq as u64, blocks + info.block_count as u64)
            });
        Self {
            doc_count: reader.doc_count(),
            live_doc_count: reader.live_doc_count(),
            term_count: reader.term_count(),
            posting_count,
            block_count,
            postings_bytes: reader.postings_len(),
        }
    }

    /// Average number of documents per block
    pub fn avg_block_fill(&self) -> f64 {
        if self.block_count == 0 {
            0.0
        } else {
            self.posting_count as f64 / self.block_count as f64
        }
    }
}

impl fmt::Display for SegmentStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Segment Statistics")?;
        writeln!(f, "==================")?;
        writeln!(f, "Documents:        {} ({} live)", self.doc_count, self.live_doc_count)?;
        writeln!(f, "Terms:            {}", self.term_count)?;
        writeln!(f, "Postings:         {}", self.posting_count)?;
        writeln!(
            f,
            "Blocks:           {} ({:.1} docs/block)",
            self.block_count,
            self.avg_block_fill()
        )?;
        write!(f, "Postings size:    {}", format_size(self.postings_bytes as u64))
    }
}

/// Format byte size to human readable
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
