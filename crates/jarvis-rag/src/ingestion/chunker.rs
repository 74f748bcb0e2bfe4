//! Fixed-size text chunking with character overlap
//!
//! Sizes are measured in Unicode scalar values. Window `i` starts at
//! `i * (chunk_size - overlap)`; only the last window may be short.

use crate::config::ChunkingConfig;
use crate::error::Result;
use crate::types::{Chunk, Document};

/// A window of the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    /// Start offset in chars
    pub char_start: usize,
    /// End offset in chars (exclusive)
    pub char_end: usize,
}

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Chunk size in characters
    chunk_size: usize,
    /// Overlap between consecutive chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; `overlap` must be smaller than `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        ChunkingConfig {
            chunk_size,
            chunk_overlap: overlap,
        }
        .validate()?;

        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Create from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Number of chunks `split` yields for text of `len` chars
    pub fn expected_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else if len <= self.chunk_size {
            1
        } else {
            let step = self.chunk_size - self.overlap;
            (len - self.overlap).div_ceil(step)
        }
    }

    /// Split text into overlapping windows
    pub fn split(&self, text: &str) -> Vec<TextSpan> {
        // byte offset of every char, plus the end of the string
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let len = offsets.len() - 1;

        let mut spans = Vec::with_capacity(self.expected_count(len));
        if len == 0 {
            return spans;
        }

        let step = self.chunk_size - self.overlap;
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(len);
            spans.push(TextSpan {
                text: text[offsets[start]..offsets[end]].to_string(),
                char_start: start,
                char_end: end,
            });
            if end == len {
                break;
            }
            start += step;
        }

        spans
    }

    /// Chunk a document, numbering chunks from zero
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = self
            .split(&doc.content)
            .into_iter()
            .enumerate()
            .map(|(i, span)| {
                Chunk::new(doc, span.text, i as u32, span.char_start, span.char_end)
            })
            .collect();

        tracing::debug!(
            document_id = %doc.id,
            chunks = chunks.len(),
            "Chunked document"
        );
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::FileType;
    use proptest::prelude::*;

    /// Rebuild the source by dropping each window's overlap prefix
    fn reassemble(chunker: &TextChunker, spans: &[TextSpan]) -> String {
        let mut out = String::new();
        for (i, span) in spans.iter().enumerate() {
            if i == 0 {
                out.push_str(&span.text);
            } else {
                out.extend(span.text.chars().skip(chunker.overlap()));
            }
        }
        out
    }

    #[test]
    fn test_invalid_overlap() {
        assert!(matches!(
            TextChunker::new(100, 100),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(TextChunker::new(0, 0).is_err());
        assert!(TextChunker::new(100, 99).is_ok());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = TextChunker::new(500, 50).unwrap();
        let spans = chunker.split("Employees receive 15 vacation days per year.");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].char_start, 0);
        assert_eq!(spans[0].text, "Employees receive 15 vacation days per year.");
    }

    #[test]
    fn test_empty_text() {
        let chunker = TextChunker::new(500, 50).unwrap();
        assert!(chunker.split("").is_empty());
    }

    #[test]
    fn test_windows_overlap() {
        let chunker = TextChunker::new(10, 3).unwrap();
        let text = "abcdefghijklmnopqrstuvwxyz";
        let spans = chunker.split(text);

        assert_eq!(spans.len(), chunker.expected_count(26));
        assert_eq!(spans[0].text, "abcdefghij");
        assert_eq!(spans[1].text, "hijklmnopq");
        assert_eq!(spans[1].char_start, 7);
        assert_eq!(spans.last().unwrap().char_end, 26);
        assert_eq!(reassemble(&chunker, &spans), text);
    }

    #[test]
    fn test_multibyte_chars() {
        let chunker = TextChunker::new(4, 1).unwrap();
        let text = "héllo wörld ✓✓";
        let spans = chunker.split(text);
        assert!(spans.iter().all(|s| s.text.chars().count() <= 4));
        assert_eq!(reassemble(&chunker, &spans), text);
    }

    #[test]
    fn test_chunk_document_ids() {
        let chunker = TextChunker::new(10, 2).unwrap();
        let doc = Document::new("notes.txt", FileType::Txt, "x".repeat(25));
        let chunks = chunker.chunk_document(&doc);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].id, "notes.txt_0");
        assert_eq!(chunks[2].id, "notes.txt_2");
        assert!(chunks.iter().all(|c| c.document_id == "notes.txt"));
    }

    proptest! {
        #[test]
        fn prop_chunk_count_matches_formula(
            text in "[a-zé ]{0,400}",
            size in 1usize..60,
            overlap_seed in 0usize..60,
        ) {
            let overlap = overlap_seed % size;
            let chunker = TextChunker::new(size, overlap).unwrap();
            let len = text.chars().count();
            let spans = chunker.split(&text);

            let expected = if len == 0 {
                0
            } else if len <= size {
                1
            } else {
                (len - overlap + (size - overlap) - 1) / (size - overlap)
            };
            prop_assert_eq!(spans.len(), expected);
            prop_assert_eq!(reassemble(&chunker, &spans), text);

            for pair in spans.windows(2) {
                prop_assert_eq!(pair[1].char_start, pair[0].char_end - overlap);
                prop_assert_eq!(pair[0].text.chars().count(), size);
            }
        }
    }
}
