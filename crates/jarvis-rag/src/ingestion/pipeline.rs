//! Chunk, embed and store a document

use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, MetadataFilter, VectorRecord, VectorStoreProvider};
use crate::types::{Document, IngestReport};

use super::chunker::TextChunker;

/// Ingestion pipeline: chunk → embed → replace the document's vectors
///
/// Re-ingesting a document id replaces its previous chunks, so running the
/// pipeline twice on the same document leaves the index unchanged.
pub struct IngestPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStoreProvider>,
}

impl IngestPipeline {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            vector_store,
        }
    }

    /// Ingest one document
    pub async fn ingest(&self, doc: &Document) -> Result<IngestReport> {
        let start = Instant::now();

        let mut chunks = self.chunker.chunk_document(doc);
        if chunks.is_empty() {
            return Err(Error::EmptyDocument(doc.filename.clone()));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::model_unavailable(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let dimensions = self.embedder.dimensions();
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            if embedding.len() != dimensions {
                return Err(Error::DimensionMismatch {
                    expected: dimensions,
                    actual: embedding.len(),
                });
            }
            chunk.embedding = embedding;
        }

        // Embedding succeeded, so it is safe to drop the previous version
        let replaced = self
            .vector_store
            .delete_by_filter(&MetadataFilter::DocumentId(doc.id.clone()))
            .await?;

        let records = chunks
            .iter()
            .map(|c| c.to_record())
            .collect::<Result<Vec<VectorRecord>>>()?;
        self.vector_store.upsert(&records).await?;

        tracing::info!(
            document_id = %doc.id,
            chunks = records.len(),
            replaced,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Ingested document"
        );

        Ok(IngestReport {
            document_id: doc.id.clone(),
            filename: doc.filename.clone(),
            file_type: doc.file_type,
            chunks_created: records.len(),
            chunks_replaced: replaced,
        })
    }
}
