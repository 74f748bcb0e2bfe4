//! jarvis-rag: document Q&A with source citations
//!
//! Documents (PDF, DOCX, plain text, Markdown) are split into overlapping
//! character windows, embedded with a sentence-transformer model and stored in
//! a Pinecone index. Questions are answered by a locally served Ollama model
//! that only sees the retrieved chunks, and every answer carries citations
//! back to the source documents.

pub mod config;
pub mod engine;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use engine::{HealthReport, QueryStage, RagEngine};
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, ChunkMetadata, Document, FileType},
    query::{ChatMessage, ChatRequest, ChatRole, QueryRequest, TextIngestRequest},
    response::{Citation, DocumentSummary, IngestReport, QueryResponse, SystemStats},
};
