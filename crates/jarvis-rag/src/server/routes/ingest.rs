//! Document ingestion endpoints

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{IngestError, IngestResponse, TextIngestRequest};

/// POST /api/ingest - Upload and process files
///
/// Each file succeeds or fails on its own; failures are reported per file.
pub async fn ingest_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let start = Instant::now();
    let mut documents = Vec::new();
    let mut errors = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("Failed to read multipart field: {}", e)))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let data = match field.bytes().await {
            Ok(d) => d,
            Err(e) => {
                errors.push(IngestError {
                    filename,
                    error: format!("Failed to read file: {}", e),
                });
                continue;
            }
        };

        tracing::info!("Processing file: {} ({} bytes)", filename, data.len());

        match state.engine().ingest_bytes(&filename, &data).await {
            Ok(report) => documents.push(report),
            Err(e) => {
                tracing::warn!("Failed to ingest {}: {}", filename, e);
                errors.push(IngestError {
                    filename,
                    error: e.to_string(),
                });
            }
        }
    }

    if documents.is_empty() && errors.is_empty() {
        return Err(Error::InvalidRequest("no files in upload".to_string()));
    }

    Ok(Json(IngestResponse::new(
        documents,
        errors,
        start.elapsed().as_millis() as u64,
    )))
}

/// POST /api/ingest/text - Save pasted text as a document and index it
pub async fn ingest_text(
    State(state): State<AppState>,
    Json(request): Json<TextIngestRequest>,
) -> Result<Json<IngestResponse>> {
    let start = Instant::now();
    let report = state
        .engine()
        .ingest_text(&request.title, &request.text)
        .await?;

    Ok(Json(IngestResponse::new(
        vec![report],
        Vec::new(),
        start.elapsed().as_millis() as u64,
    )))
}
