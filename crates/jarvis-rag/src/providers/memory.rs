//! In-process vector store with brute-force cosine search
//!
//! Used for local development without a Pinecone account and by the test
//! suite. Contents are lost when the process exits.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

use super::vector_store::{
    IndexStats, Metadata, StoredVector, VectorMatch, VectorRecord, VectorStoreProvider,
};

/// Vector store backed by an ordered map
pub struct InMemoryVectorStore {
    dimension: usize,
    entries: RwLock<BTreeMap<String, (Vec<f32>, Metadata)>>,
}

impl InMemoryVectorStore {
    /// Create an empty store for vectors of `dimension`
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn check_dimension(&self, len: usize) -> Result<()> {
        if len != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: len,
            });
        }
        Ok(())
    }
}

/// Cosine similarity; zero when either vector has no magnitude
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStoreProvider for InMemoryVectorStore {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        for record in records {
            self.check_dimension(record.values.len())?;
        }

        let mut entries = self.entries.write();
        for record in records {
            entries.insert(
                record.id.clone(),
                (record.values.clone(), record.metadata.clone()),
            );
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>> {
        self.check_dimension(vector.len())?;

        let entries = self.entries.read();
        let mut matches: Vec<VectorMatch> = entries
            .iter()
            .map(|(id, (values, metadata))| VectorMatch {
                id: id.clone(),
                score: cosine_similarity(vector, values),
                metadata: metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut entries = self.entries.write();
        for id in ids {
            entries.remove(id);
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StoredVector>> {
        Ok(self
            .entries
            .read()
            .iter()
            .map(|(id, (_, metadata))| StoredVector {
                id: id.clone(),
                metadata: metadata.clone(),
            })
            .collect())
    }

    async fn delete_all(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }

    async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            total_vectors: self.len(),
            dimension: self.dimension,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
