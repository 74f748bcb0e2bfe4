//! Document management endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::DocumentListResponse;

/// GET /api/documents - List all documents
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<DocumentListResponse>> {
    let documents = state.engine().list_documents().await?;
    Ok(Json(DocumentListResponse::new(documents)))
}

/// DELETE /api/documents/:id - Delete a document and its chunks
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let deleted_chunks = state.engine().delete_document(&id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "document_id": id,
        "deleted_chunks": deleted_chunks
    })))
}

/// DELETE /api/documents - Clear the whole index
pub async fn delete_all_documents(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>> {
    state.engine().delete_all().await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
