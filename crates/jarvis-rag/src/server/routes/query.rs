//! Question answering endpoints

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{ChatRequest, QueryRequest, QueryResponse};

/// POST /api/query - Query the RAG system
pub async fn query_rag(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    Ok(Json(state.engine().query(&request).await?))
}

/// POST /api/chat - Answer the latest user message
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<QueryResponse>> {
    tracing::debug!(turns = request.messages.len(), "Chat request");
    Ok(Json(state.engine().chat(&request).await?))
}
