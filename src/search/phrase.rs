use crate::error::Result;
use crate::index::types::{DocId, DocPosition, NodePosition, Position, TokenPosition};
use crate::search::cursor::{NodeCursor, require_node};
use crate::search::scorer::node_score;
use crate::search::term::TermCursor;

/// Exact phrase inside a single node.
///
/// Every term must occur in the node at its offset relative to the others.
/// Nodes where the terms co-occur without forming the phrase are skipped.
pub struct PhraseCursor {
    terms: Vec<(TermCursor, u32)>,
    weight: f32,
    doc: DocPosition,
    node: NodePosition,
    freq: u32,
    scratch: Vec<Vec<TokenPosition>>,
}

impl PhraseCursor {
    /// `terms` pairs each term cursor with its position offset in the phrase.
    pub fn new(terms: Vec<(TermCursor, u32)>, weight: f32) -> Self {
        let scratch = vec![Vec::new(); terms.len()];
        Self {
            terms,
            weight,
            doc: Position::NotStarted,
            node: Position::NotStarted,
            freq: 0,
            scratch,
        }
    }

    fn exhaust(&mut self) -> Result<bool> {
        self.doc = Position::Exhausted;
        self.node = Position::NotStarted;
        Ok(false)
    }

    /// Skip every term to the largest doc among them until all agree.
    fn align_docs(&mut self) -> Result<bool> {
        loop {
            let mut target = 0;
            for (term, _) in &self.terms {
                match term.doc() {
                    Position::At(doc) => target = target.max(doc),
                    _ => return self.exhaust(),
                }
            }
            let mut aligned = true;
            for (term, _) in self.terms.iter_mut() {
                if !term.skip_to_candidate(target)? {
                    return self.exhaust();
                }
                aligned &= term.doc() == Position::At(target);
            }
            if aligned {
                self.doc = Position::At(target);
                self.node = Position::NotStarted;
                return Ok(true);
            }
        }
    }

    /// Advance lagging terms until all sit on the same node.
    fn align_nodes(&mut self) -> Result<bool> {
        loop {
            let Some(max) = self.terms.iter().filter_map(|(t, _)| t.node().at()).max().cloned() else {
                return Ok(false);
            };
            let mut aligned = true;
            for (term, _) in self.terms.iter_mut() {
                while term.node().at().is_some_and(|node| *node < max) {
                    if !term.next_node()? {
                        return Ok(false);
                    }
                }
                aligned &= term.node().at() == Some(&max);
            }
            if aligned {
                return Ok(true);
            }
        }
    }

    /// Number of phrase occurrences in the node all terms agree on.
    fn phrase_freq(&mut self) -> Result<u32> {
        for ((term, _), positions) in self.terms.iter_mut().zip(self.scratch.iter_mut()) {
            positions.clear();
            positions.extend_from_slice(term.positions_in_node()?);
        }
        let (first, rest) = self.scratch.split_at(1);
        let base_offset = self.terms[0].1 as i64;
        let freq = first[0]
            .iter()
            .filter(|&&start| {
                rest.iter().zip(&self.terms[1..]).all(|(positions, (_, offset))| {
                    let expected = start as i64 - base_offset + *offset as i64;
                    expected >= 0 && positions.binary_search(&(expected as u32)).is_ok()
                })
            })
            .count();
        Ok(freq as u32)
    }
}

impl NodeCursor for PhraseCursor {
    fn next_candidate(&mut self) -> Result<bool> {
        if self.doc.is_exhausted() || self.terms.is_empty() {
            return self.exhaust();
        }
        if self.doc.is_at() {
            if !self.terms[0].0.next_candidate()? {
                return self.exhaust();
            }
        } else {
            for (term, _) in self.terms.iter_mut() {
                if !term.next_candidate()? {
                    self.doc = Position::Exhausted;
                    return Ok(false);
                }
            }
        }
        self.align_docs()
    }

    fn skip_to_candidate(&mut self, target: DocId) -> Result<bool> {
        match self.doc {
            Position::Exhausted => return Ok(false),
            Position::At(doc) if doc >= target => return Ok(true),
            _ => {}
        }
        if self.terms.is_empty() {
            return self.exhaust();
        }
        for (term, _) in self.terms.iter_mut() {
            if !term.skip_to_candidate(target)? {
                self.doc = Position::Exhausted;
                return Ok(false);
            }
        }
        self.align_docs()
    }

    fn next_node(&mut self) -> Result<bool> {
        if !self.doc.is_at() || self.node.is_exhausted() {
            return Ok(false);
        }
        let advanced = if self.node.is_at() {
            self.terms[0].0.next_node()?
        } else {
            let mut all = true;
            for (term, _) in self.terms.iter_mut() {
                all &= term.next_node()?;
            }
            all
        };
        if !advanced {
            self.node = Position::Exhausted;
            return Ok(false);
        }

        loop {
            if !self.align_nodes()? {
                self.node = Position::Exhausted;
                return Ok(false);
            }
            let freq = self.phrase_freq()?;
            if freq > 0 {
                self.freq = freq;
                self.node = self.terms[0].0.node().clone();
                return Ok(true);
            }
            if !self.terms[0].0.next_node()? {
                self.node = Position::Exhausted;
                return Ok(false);
            }
        }
    }

    fn doc(&self) -> DocPosition {
        self.doc
    }

    fn node(&self) -> &NodePosition {
        &self.node
    }

    fn freq_in_node(&self) -> Result<u32> {
        require_node(&self.node)?;
        Ok(self.freq)
    }

    fn score_in_node(&mut self) -> Result<f32> {
        require_node(&self.node)?;
        Ok(node_score(self.weight, self.freq))
    }

    fn cost(&self) -> u64 {
        self.terms.iter().map(|(t, _)| t.cost()).min().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexConfig, NodePath, SegmentReader, SegmentWriter, TaggedToken};
    use crate::search::cursor::testing::collect;

    fn segment(docs: &[&[(&str, &[u32], u32)]]) -> SegmentReader {
        let mut writer = SegmentWriter::new(IndexConfig::default()).unwrap();
        for doc in docs {
            let tokens: Vec<_> = doc
                .iter()
                .map(|(term, node, pos)| TaggedToken::new(*term, *node, *pos))
                .collect();
            writer.add_document(&tokens).unwrap();
        }
        writer.finish().unwrap()
    }

    fn phrase(reader: &SegmentReader, terms: &[&str]) -> PhraseCursor {
        let terms = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (reader.postings(t), i as u32))
            .collect();
        PhraseCursor::new(terms, 1.0)
    }

    #[test]
    fn test_phrase_must_stay_inside_one_node() {
        let reader = segment(&[
            // "new york" inside [0]
            &[("new", &[0], 0), ("york", &[0], 1), ("new", &[1], 0)],
            // split across nodes
            &[("new", &[0], 5), ("york", &[1], 6)],
            // wrong order
            &[("york", &[0], 0), ("new", &[0], 1)],
            // twice in [2, 1]
            &[("new", &[2, 1], 0), ("york", &[2, 1], 1), ("new", &[2, 1], 4), ("york", &[2, 1], 5)],
        ]);
        let mut cursor = phrase(&reader, &["new", "york"]);
        let hits = collect(&mut cursor).unwrap();
        assert_eq!(hits, vec![(0, NodePath::from([0])), (3, NodePath::from([2, 1]))]);
    }

    #[test]
    fn test_phrase_freq_counts_occurrences() {
        let reader = segment(&[&[
            ("a", &[0], 0),
            ("b", &[0], 1),
            ("a", &[0], 2),
            ("b", &[0], 3),
            ("a", &[0], 7),
        ]]);
        let mut cursor = phrase(&reader, &["a", "b"]);
        assert!(cursor.next_candidate().unwrap());
        assert!(cursor.next_node().unwrap());
        assert_eq!(cursor.freq_in_node().unwrap(), 2);
        assert!(!cursor.next_node().unwrap());
        assert!(!cursor.next_candidate().unwrap());
    }

    #[test]
    fn test_phrase_with_gap() {
        let reader = segment(&[&[("quick", &[0], 0), ("brown", &[0], 1), ("fox", &[0], 2)]]);
        let terms = vec![(reader.postings("quick"), 0), (reader.postings("fox"), 2)];
        let mut cursor = PhraseCursor::new(terms, 1.0);
        assert_eq!(collect(&mut cursor).unwrap().len(), 1);
    }
}
