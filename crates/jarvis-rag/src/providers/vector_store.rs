//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Metadata stored alongside each vector
pub type Metadata = serde_json::Map<String, Value>;

/// A vector ready to be written to the index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Search result from vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    /// Similarity score reported by the index (cosine, higher is closer)
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A stored vector without its values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredVector {
    pub id: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Metadata predicate used for bulk deletes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataFilter {
    /// All chunks belonging to one document
    DocumentId(String),
}

impl MetadataFilter {
    /// Evaluate the filter against stored metadata
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match self {
            Self::DocumentId(id) => {
                metadata.get("document_id").and_then(Value::as_str) == Some(id.as_str())
            }
        }
    }
}

/// Index-level statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStats {
    pub total_vectors: usize,
    pub dimension: usize,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `PineconeVectorStore`: hosted Pinecone serverless index
/// - `InMemoryVectorStore`: brute-force cosine search held in process memory
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Insert or overwrite records by id
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Top-k nearest neighbours, highest score first
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>>;

    /// Delete records by id; unknown ids are ignored
    async fn delete(&self, ids: &[String]) -> Result<()>;

    /// Delete every record whose metadata satisfies the filter
    async fn delete_by_filter(&self, filter: &MetadataFilter) -> Result<usize> {
        let ids: Vec<String> = self
            .list_all()
            .await?
            .into_iter()
            .filter(|v| filter.matches(&v.metadata))
            .map(|v| v.id)
            .collect();

        if !ids.is_empty() {
            self.delete(&ids).await?;
        }
        Ok(ids.len())
    }

    /// Enumerate every stored vector with its metadata
    async fn list_all(&self) -> Result<Vec<StoredVector>>;

    /// Remove every record in the index
    async fn delete_all(&self) -> Result<()>;

    /// Vector count and dimension
    async fn stats(&self) -> Result<IndexStats>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_filter() {
        let mut meta = Metadata::new();
        meta.insert("document_id".into(), Value::from("handbook.pdf"));

        assert!(MetadataFilter::DocumentId("handbook.pdf".into()).matches(&meta));
        assert!(!MetadataFilter::DocumentId("handbook".into()).matches(&meta));
        assert!(!MetadataFilter::DocumentId("handbook.pdf".into()).matches(&Metadata::new()));
    }
}
