//! Provider abstractions for embeddings, LLM and vector storage
//!
//! Trait objects let the engine switch between local and hosted backends
//! without changes to the orchestration code.

pub mod embedding;
pub mod llm;
pub mod memory;
pub mod ollama;
pub mod onnx;
pub mod pinecone;
pub mod vector_store;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, RagConfig, VectorBackend};
use crate::error::Result;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use memory::InMemoryVectorStore;
pub use ollama::{OllamaClient, OllamaEmbedder};
pub use onnx::OnnxEmbedder;
pub use pinecone::PineconeVectorStore;
pub use vector_store::{
    IndexStats, Metadata, MetadataFilter, StoredVector, VectorMatch, VectorRecord,
    VectorStoreProvider,
};

/// Providers selected by configuration
pub struct Providers {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub vector_store: Arc<dyn VectorStoreProvider>,
    pub llm: Arc<dyn LlmProvider>,
}

impl Providers {
    /// Build every provider from configuration
    pub async fn from_config(config: &RagConfig) -> Result<Self> {
        let ollama = Arc::new(OllamaClient::new(&config.llm)?);

        let embedder: Arc<dyn EmbeddingProvider> = match config.embeddings.backend {
            EmbeddingBackend::Onnx => Arc::new(OnnxEmbedder::new(&config.embeddings).await?),
            EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(
                Arc::clone(&ollama),
                config.llm.embed_model.clone(),
                config.embeddings.dimensions,
            )),
        };

        let vector_store: Arc<dyn VectorStoreProvider> = match config.vector_db.backend {
            VectorBackend::Pinecone => Arc::new(
                PineconeVectorStore::connect(&config.vector_db, embedder.dimensions()).await?,
            ),
            VectorBackend::Memory => Arc::new(InMemoryVectorStore::new(embedder.dimensions())),
        };

        tracing::info!(
            embedder = embedder.name(),
            vector_store = vector_store.name(),
            llm = ollama.name(),
            "Providers initialized"
        );

        Ok(Self {
            embedder,
            vector_store,
            llm: ollama,
        })
    }
}
