//! Turning vector matches into citations

use crate::providers::VectorMatch;
use crate::types::{ChunkMetadata, Citation};

/// A retrieved chunk: its citation plus the full stored text for the prompt
#[derive(Debug, Clone)]
pub struct RetrievedChunk {
    pub citation: Citation,
    pub text: String,
}

/// Build citations from matches, keeping the store's order
///
/// Matches whose metadata cannot be read are skipped.
pub fn retrieved_chunks(matches: &[VectorMatch], snippet_len: usize) -> Vec<RetrievedChunk> {
    matches
        .iter()
        .filter_map(|m| match ChunkMetadata::from_map(&m.metadata) {
            Ok(meta) => Some(RetrievedChunk {
                citation: Citation::from_match(&m.id, m.score, &meta, snippet_len),
                text: meta.text,
            }),
            Err(e) => {
                tracing::warn!(id = %m.id, error = %e, "Skipping match with unreadable metadata");
                None
            }
        })
        .collect()
}

/// Truncate snippet to a maximum number of chars while preserving word boundaries
pub fn truncate_snippet(snippet: &str, max_len: usize) -> String {
    if snippet.chars().count() <= max_len {
        return snippet.to_string();
    }

    let head: String = snippet.chars().take(max_len).collect();

    // Try to end at a word boundary
    match head.rfind(' ') {
        Some(pos) if pos > 0 => format!("{}...", &head[..pos]),
        _ => format!("{}...", head),
    }
}

/// One line per citation, for plain-text output
pub fn format_sources(citations: &[Citation]) -> String {
    citations
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c.format_inline()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, Document, FileType};

    #[test]
    fn test_truncate_snippet() {
        let snippet = "This is a very long snippet that needs to be truncated.";
        let truncated = truncate_snippet(snippet, 20);

        assert_eq!(truncated, "This is a very long...");
        assert_eq!(truncate_snippet("short", 20), "short");
        assert_eq!(truncate_snippet("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_retrieved_chunks_skip_bad_metadata() {
        let doc = Document::new("leave.txt", FileType::Txt, "15 days".to_string());
        let chunk = Chunk::new(&doc, "15 days".to_string(), 0, 0, 7);

        let matches = vec![
            VectorMatch {
                id: chunk.id.clone(),
                score: 0.8,
                metadata: chunk.metadata().into_map().unwrap(),
            },
            VectorMatch {
                id: "orphan".to_string(),
                score: 0.7,
                metadata: Default::default(),
            },
        ];

        let retrieved = retrieved_chunks(&matches, 300);
        assert_eq!(retrieved.len(), 1);
        assert_eq!(retrieved[0].citation.document_name, "leave.txt");
        assert_eq!(retrieved[0].text, "15 days");
        let sources = format_sources(&[retrieved[0].citation.clone()]);
        assert!(sources.starts_with("1. [Source: leave.txt"));
    }
}
