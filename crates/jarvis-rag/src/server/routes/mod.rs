//! API routes for the RAG server

pub mod documents;
pub mod ingest;
pub mod query;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{delete, get, post},
    Json, Router,
};
use std::convert::Infallible;

use tower_http::limit::RequestBodyLimitLayer;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{FileType, SystemStats};

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Questions
        .route("/query", post(query::query_rag))
        .route("/chat", post(query::chat))
        // Ingestion, with a larger body limit for file uploads
        .route(
            "/ingest",
            post(ingest::ingest_files)
                .layer::<_, Infallible>(DefaultBodyLimit::disable())
                .layer::<_, Infallible>(RequestBodyLimitLayer::new(max_upload_size)),
        )
        .route("/ingest/text", post(ingest::ingest_text))
        // Collection
        .route(
            "/documents",
            get(documents::list_documents).delete(documents::delete_all_documents),
        )
        .route("/documents/:id", delete(documents::delete_document))
        .route("/stats", get(stats))
        .route("/info", get(info))
}

/// GET /api/stats - Index size and models
async fn stats(State(state): State<AppState>) -> Result<Json<SystemStats>> {
    Ok(Json(state.engine().statistics().await?))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    Json(serde_json::json!({
        "name": "jarvis-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document Q&A over a Pinecone index with answers from a local Ollama model",
        "supported_formats": FileType::supported_extensions(),
        "models": {
            "embedding": config.embeddings.model,
            "llm": config.llm.model,
        },
        "endpoints": {
            "GET /": "Web UI",
            "POST /api/query": "Ask a question",
            "POST /api/chat": "Answer the last user message of a conversation",
            "POST /api/ingest": "Upload documents (multipart)",
            "POST /api/ingest/text": "Add pasted text as a document",
            "GET /api/documents": "List documents with chunk counts",
            "DELETE /api/documents/:id": "Delete a document",
            "DELETE /api/documents": "Delete every document",
            "GET /api/stats": "Index statistics"
        }
    }))
}
