//! Response types for RAG queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{ChunkMetadata, FileType};
use crate::generation::citation::truncate_snippet;

/// Answer returned when retrieval finds nothing relevant
pub const NO_RELEVANT_INFORMATION: &str = "I couldn't find any relevant information in the \
    knowledge base to answer your question. Please upload documents that contain this \
    information and ask again.";

/// Citation from a source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Chunk ID
    pub chunk_id: String,
    /// Document ID
    pub document_id: String,
    /// Source filename
    pub document_name: String,
    /// Chunk index within the document
    pub chunk_index: u32,
    /// Snippet from the source
    pub snippet: String,
    /// Similarity score reported by the index
    pub score: f32,
}

impl Citation {
    /// Create a citation from a match and its stored metadata
    pub fn from_match(
        chunk_id: &str,
        score: f32,
        meta: &ChunkMetadata,
        snippet_len: usize,
    ) -> Self {
        Self {
            chunk_id: chunk_id.to_string(),
            document_id: meta.document_id.clone(),
            document_name: meta.source.clone(),
            chunk_index: meta.chunk_index,
            snippet: truncate_snippet(&meta.text, snippet_len),
            score,
        }
    }

    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        format!("[Source: {}, relevance {:.3}]", self.document_name, self.score)
    }
}

/// Response from a RAG query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer
    pub answer: String,
    /// Citations with source snippets
    pub citations: Vec<Citation>,
    /// Number of chunks passed to the model
    pub retrieved_chunks: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// True when the fallback answer was returned instead of generating
    pub no_results: bool,
}

impl QueryResponse {
    /// Create a new query response
    pub fn new(answer: String, citations: Vec<Citation>, processing_time_ms: u64) -> Self {
        Self {
            answer,
            retrieved_chunks: citations.len(),
            citations,
            processing_time_ms,
            no_results: false,
        }
    }

    /// Response when no relevant information is found
    pub fn not_found(processing_time_ms: u64, user_name: Option<&str>) -> Self {
        let answer = match user_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => personalized_not_found(name),
            None => NO_RELEVANT_INFORMATION.to_string(),
        };
        Self {
            answer,
            citations: Vec::new(),
            retrieved_chunks: 0,
            processing_time_ms,
            no_results: true,
        }
    }

    /// Response for a chat without any user turn
    pub fn no_question() -> Self {
        Self {
            answer: "No user message found.".to_string(),
            citations: Vec::new(),
            retrieved_chunks: 0,
            processing_time_ms: 0,
            no_results: true,
        }
    }
}

fn personalized_not_found(name: &str) -> String {
    format!(
        "Hey {name}! I couldn't find any information related to your question in the knowledge base.\n\n\
         Here's what you can do:\n\
         1. Check the Document Collection tab to see which documents are available\n\
         2. Use the Upload Documents tab to add documents or text that cover this topic\n\
         3. Ask again once the documents are uploaded\n\n\
         I only answer from uploaded documents, so I won't guess."
    )
}

/// Result of ingesting a single document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub document_id: String,
    pub filename: String,
    pub file_type: FileType,
    /// Chunks written for this ingestion
    pub chunks_created: usize,
    /// Stale chunks removed before writing
    pub chunks_replaced: usize,
}

/// Response from document ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Whether every file was ingested
    pub success: bool,
    /// Ingested documents
    pub documents: Vec<IngestReport>,
    /// Total chunks created across all documents
    pub total_chunks_created: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Per-file failures
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<IngestError>,
}

impl IngestResponse {
    /// Assemble a response from per-file outcomes
    pub fn new(
        documents: Vec<IngestReport>,
        errors: Vec<IngestError>,
        processing_time_ms: u64,
    ) -> Self {
        Self {
            success: errors.is_empty() && !documents.is_empty(),
            total_chunks_created: documents.iter().map(|d| d.chunks_created).sum(),
            documents,
            processing_time_ms,
            errors,
        }
    }
}

/// Error during ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestError {
    /// Filename that failed
    pub filename: String,
    /// Error message
    pub error: String,
}

/// Summary of a document present in the index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub file_type: FileType,
    /// Number of chunks stored for the document
    pub chunks: usize,
    pub ingested_at: DateTime<Utc>,
}

/// Response for listing documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentSummary>,
    pub total_count: usize,
    pub total_chunks: usize,
}

impl DocumentListResponse {
    pub fn new(documents: Vec<DocumentSummary>) -> Self {
        Self {
            total_count: documents.len(),
            total_chunks: documents.iter().map(|d| d.chunks).sum(),
            documents,
        }
    }
}

/// Index and model statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_vectors: usize,
    pub index_name: String,
    pub dimension: usize,
    pub vector_backend: String,
    pub embedding_model: String,
    pub llm_model: String,
}
