//! Core types for the RAG system

pub mod document;
pub mod query;
pub mod response;

pub use document::{document_id_for, Chunk, ChunkMetadata, Document, FileType};
pub use query::{ChatMessage, ChatRequest, ChatRole, QueryRequest, TextIngestRequest};
pub use response::{
    Citation, DocumentListResponse, DocumentSummary, IngestError, IngestReport, IngestResponse,
    QueryResponse, SystemStats, NO_RELEVANT_INFORMATION,
};
