//! Record chunking with overlap and locator range tracking

use crate::types::{Chunk, ChunkSource, Document, Locator, Record};

/// Assembles extracted records into bounded-size chunks.
///
/// Records are joined with `\n` into one contiguous text; every chunk is
/// a contiguous byte span of that text. A chunk after the first starts
/// with the trailing `overlap_chars` of the previous chunk's text, and
/// `char_start..char_end` marks the chunk's own (non-overlap) content so
/// the spans of all chunks tile the joined text exactly.
pub struct Chunker {
    /// Maximum chunk size in bytes, overlap included
    max_chars: usize,
    /// Overlap carried from the previous chunk
    overlap_chars: usize,
}

impl Chunker {
    /// Create a new chunker. The overlap is clamped below `max_chars` so
    /// every chunk makes forward progress.
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        let max_chars = max_chars.max(1);
        Self {
            max_chars,
            overlap_chars: overlap_chars.min(max_chars - 1),
        }
    }

    /// Chunk a document's records. Greedy accumulation up to `max_chars`;
    /// a single record larger than `max_chars` is hard-split at char
    /// boundaries. A chunk never spans locator families (different
    /// sheets, or rows vs pages), so its locator is always a plain range.
    pub fn chunk(&self, doc: &Document, records: &[Record]) -> Vec<Chunk> {
        if records.is_empty() {
            return Vec::new();
        }

        // Joined text plus each record's byte span within it. A record's
        // span includes its preceding separator so the spans tile the
        // joined text with no gaps.
        let mut full = String::new();
        let mut spans = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let start = full.len();
            if i > 0 {
                full.push('\n');
            }
            full.push_str(&record.text);
            spans.push((start, full.len()));
        }

        let mut chunks = Vec::new();
        let mut pos = 0usize; // start of the next chunk's own content
        let mut rec = 0usize; // first record overlapping `pos`
        let mut index = 0u32;
        let mut prev_text_start = 0usize;

        while pos < full.len() {
            let seed_start = if index == 0 {
                pos
            } else {
                // Trailing overlap of the previous chunk's text, clamped
                // to that text's start.
                floor_char_boundary(&full, pos.saturating_sub(self.overlap_chars).max(prev_text_start))
            };
            let budget_end =
                floor_char_boundary(&full, (seed_start + self.max_chars).min(full.len()));

            // Consume whole records while they fit and stay in the same
            // locator family as the chunk's first record.
            let mut last_full = None;
            let mut j = rec;
            while j < spans.len()
                && spans[j].1 <= budget_end
                && records[j].position.same_family(&records[rec].position)
            {
                last_full = Some(j);
                j += 1;
            }

            let (content_end, last_rec) = match last_full {
                Some(k) => (spans[k].1, k),
                None => {
                    // Not even the current record's remainder fits: hard
                    // split at a char boundary, keeping that record's
                    // single locator.
                    let mut end = budget_end;
                    if end <= pos {
                        end = ceil_char_boundary(&full, pos + 1);
                    }
                    (end, rec)
                }
            };

            let locator =
                Locator::from_positions(&records[rec].position, &records[last_rec].position);
            let source = ChunkSource {
                filename: doc.filename.clone(),
                content_type: doc.content_type.clone(),
                locator,
            };

            chunks.push(Chunk::new(
                doc.id,
                full[seed_start..content_end].to_string(),
                source,
                pos,
                content_end,
                index,
            ));

            index += 1;
            prev_text_start = seed_start;
            pos = content_end;
            while rec < spans.len() && spans[rec].1 <= pos {
                rec += 1;
            }
        }

        chunks
    }
}

fn floor_char_boundary(s: &str, i: usize) -> usize {
    let mut i = i.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, i: usize) -> usize {
    let mut i = i.min(s.len());
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ContentType, RecordPosition};

    fn doc() -> Document {
        Document::new(
            "stats.csv".to_string(),
            ContentType::Csv,
            "hash".to_string(),
            0,
        )
    }

    fn row(index: u32, text: &str) -> Record {
        Record::new(RecordPosition::Row { sheet: None, index }, text)
    }

    /// Rebuild the joined text from each chunk's non-overlap content.
    fn reconstruct(chunks: &[Chunk]) -> String {
        let mut out = String::new();
        for chunk in chunks {
            let seed_len = chunk.text.len() - (chunk.char_end - chunk.char_start);
            out.push_str(&chunk.text[seed_len..]);
        }
        out
    }

    fn joined(records: &[Record]) -> String {
        records
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn three_rows_fit_in_one_chunk() {
        let records = vec![row(0, "a: 1"), row(1, "b: 2"), row(2, "c: 3")];
        let chunks = Chunker::new(1000, 100).chunk(&doc(), &records);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "a: 1\nb: 2\nc: 3");
        assert_eq!(chunks[0].source.locator.label(), "rows 0-2");
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn split_chunk_is_seeded_with_previous_tail() {
        let records = vec![
            row(0, &"a".repeat(40)),
            row(1, &"b".repeat(40)),
            row(2, &"c".repeat(40)),
        ];
        let chunks = Chunker::new(90, 10).chunk(&doc(), &records);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source.locator.label(), "rows 0-1");
        assert_eq!(chunks[1].source.locator.label(), "row 2");
        // Second chunk starts with the tail of the first chunk's text
        let tail = &chunks[0].text[chunks[0].text.len() - 10..];
        assert!(chunks[1].text.starts_with(tail));
        assert_eq!(reconstruct(&chunks), joined(&records));
    }

    #[test]
    fn oversized_record_is_hard_split_never_dropped() {
        let records = vec![row(0, &"x".repeat(250))];
        let chunker = Chunker::new(100, 20);
        let chunks = chunker.chunk(&doc(), &records);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.len() <= 100);
            assert_eq!(chunk.source.locator.label(), "row 0");
        }
        assert_eq!(reconstruct(&chunks), joined(&records));
    }

    #[test]
    fn no_chunk_exceeds_max_chars() {
        let records: Vec<Record> = (0..30)
            .map(|i| row(i, &format!("field: {}", "v".repeat(7 + (i as usize * 13) % 90))))
            .collect();
        let chunks = Chunker::new(128, 32).chunk(&doc(), &records);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.len() <= 128, "chunk of {} bytes", chunk.text.len());
        }
        assert_eq!(reconstruct(&chunks), joined(&records));
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let records = vec![row(0, &"héllø wörld ".repeat(30))];
        let chunks = Chunker::new(64, 16).chunk(&doc(), &records);

        for chunk in &chunks {
            assert!(chunk.text.len() <= 64);
            // Slicing would have panicked on a broken boundary; also make
            // sure the text round-trips as valid UTF-8 content.
            assert!(!chunk.text.is_empty());
        }
        assert_eq!(reconstruct(&chunks), joined(&records));
    }

    #[test]
    fn rechunking_reproduces_identical_ids() {
        let records = vec![
            row(0, &"a".repeat(40)),
            row(1, &"b".repeat(40)),
            row(2, &"c".repeat(40)),
        ];
        let document = doc();
        let chunker = Chunker::new(90, 10);

        let first = chunker.chunk(&document, &records);
        let second = chunker.chunk(&document, &records);

        let first_ids: Vec<_> = first.iter().map(|c| c.id).collect();
        let second_ids: Vec<_> = second.iter().map(|c| c.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn chunks_do_not_merge_across_sheets() {
        let records = vec![
            Record::new(
                RecordPosition::Row {
                    sheet: Some("Q1".to_string()),
                    index: 0,
                },
                "north: 10",
            ),
            Record::new(
                RecordPosition::Row {
                    sheet: Some("Q2".to_string()),
                    index: 0,
                },
                "north: 12",
            ),
        ];
        let chunks = Chunker::new(1000, 50).chunk(&doc(), &records);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].source.locator.label(), "sheet Q1, row 0");
        assert_eq!(chunks[1].source.locator.label(), "sheet Q2, row 0");
    }

    #[test]
    fn page_records_merge_into_page_ranges() {
        let records = vec![
            Record::new(RecordPosition::Page(2), "second page text"),
            Record::new(RecordPosition::Page(3), "third page text"),
        ];
        let chunks = Chunker::new(1000, 50).chunk(&doc(), &records);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source.locator.label(), "pages 2-3");
    }

    #[test]
    fn empty_records_yield_no_chunks() {
        assert!(Chunker::new(100, 10).chunk(&doc(), &[]).is_empty());
    }
}
