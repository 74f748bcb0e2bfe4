//! Retrieval-answer orchestration
//!
//! A query moves through [`QueryStage`]s: the question is embedded, the index
//! is searched, weak matches are dropped, and only if something relevant
//! remains is a prompt built and sent to the language model.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::{clean_response, retrieved_chunks, PromptBuilder};
use crate::ingestion::{DocumentLoader, IngestPipeline, TextChunker};
use crate::providers::{
    EmbeddingProvider, LlmProvider, MetadataFilter, Providers, VectorStoreProvider,
};
use crate::types::{
    ChatRequest, ChunkMetadata, Document, DocumentSummary, IngestReport, QueryRequest,
    QueryResponse, SystemStats,
};

/// Progress of a single question through the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Received,
    Embedding,
    Retrieving,
    Prompting,
    Generating,
    Answered,
    Failed,
}

impl QueryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Embedding => "embedding",
            Self::Retrieving => "retrieving",
            Self::Prompting => "prompting",
            Self::Generating => "generating",
            Self::Answered => "answered",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health of each backing service
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct HealthReport {
    pub embedder: bool,
    pub vector_store: bool,
    pub llm: bool,
}

impl HealthReport {
    pub fn all_healthy(&self) -> bool {
        self.embedder && self.vector_store && self.llm
    }
}

/// The RAG engine: ingestion, question answering and collection management
pub struct RagEngine {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStoreProvider>,
    llm: Arc<dyn LlmProvider>,
    pipeline: IngestPipeline,
    loader: DocumentLoader,
}

impl RagEngine {
    /// Assemble an engine from explicit providers
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStoreProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let chunker = TextChunker::from_config(&config.chunking)?;
        let pipeline = IngestPipeline::new(
            chunker,
            Arc::clone(&embedder),
            Arc::clone(&vector_store),
        );
        let loader = DocumentLoader::new(config.storage.documents_dir.clone());

        Ok(Self {
            config,
            embedder,
            vector_store,
            llm,
            pipeline,
            loader,
        })
    }

    /// Validate configuration and connect every configured provider
    pub async fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;
        let providers = Providers::from_config(&config).await?;
        Self::new(config, providers.embedder, providers.vector_store, providers.llm)
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn loader(&self) -> &DocumentLoader {
        &self.loader
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.vector_store
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Answer a question from the indexed documents
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let start = Instant::now();
        let mut stage = QueryStage::Received;

        tracing::info!(stage = %stage, question = %request.question, "Query received");

        let result = self.answer(request, &mut stage, start).await;
        match &result {
            Ok(response) => tracing::info!(
                stage = %QueryStage::Answered,
                citations = response.citations.len(),
                fallback = response.no_results,
                elapsed_ms = response.processing_time_ms,
                "Query answered"
            ),
            Err(e) => tracing::error!(
                stage = %QueryStage::Failed,
                failed_at = %stage,
                error = %e,
                "Query failed"
            ),
        }
        result
    }

    async fn answer(
        &self,
        request: &QueryRequest,
        stage: &mut QueryStage,
        start: Instant,
    ) -> Result<QueryResponse> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(Error::InvalidRequest("question must not be empty".to_string()));
        }
        let top_k = request.top_k.unwrap_or(self.config.retrieval.top_k).max(1);

        *stage = QueryStage::Embedding;
        tracing::debug!(stage = %stage, "Embedding question");
        let query_vector = self.embedder.embed(question).await?;

        *stage = QueryStage::Retrieving;
        tracing::debug!(stage = %stage, top_k, "Searching index");
        let matches = self.vector_store.query(&query_vector, top_k).await?;

        let min_score = self.config.retrieval.min_score;
        let relevant: Vec<_> = matches
            .into_iter()
            .filter(|m| m.score >= min_score)
            .collect();

        let chunks = retrieved_chunks(&relevant, self.config.retrieval.snippet_length);
        if chunks.is_empty() {
            tracing::info!(min_score, "No relevant chunks, returning fallback answer");
            return Ok(QueryResponse::not_found(
                elapsed_ms(start),
                request.user_name.as_deref(),
            ));
        }

        for chunk in &chunks {
            tracing::debug!(
                source = %chunk.citation.document_name,
                score = chunk.citation.score,
                "Retrieved chunk"
            );
        }

        *stage = QueryStage::Prompting;
        let prompt = PromptBuilder::build_rag_prompt(question, &chunks);

        *stage = QueryStage::Generating;
        tracing::debug!(stage = %stage, model = self.llm.model(), "Calling language model");
        let raw = self
            .llm
            .generate(&prompt, self.config.llm.max_tokens, self.config.llm.temperature)
            .await?;

        let citations = chunks.into_iter().map(|c| c.citation).collect();
        Ok(QueryResponse::new(clean_response(&raw), citations, elapsed_ms(start)))
    }

    /// Answer the most recent user turn of a conversation
    pub async fn chat(&self, request: &ChatRequest) -> Result<QueryResponse> {
        match request.last_user_message() {
            Some(question) => {
                let query = QueryRequest {
                    question: question.to_string(),
                    top_k: request.top_k,
                    user_name: request.user_name.clone(),
                };
                self.query(&query).await
            }
            None => Ok(QueryResponse::no_question()),
        }
    }

    /// Index an already loaded document, replacing any previous version
    pub async fn ingest_document(&self, doc: &Document) -> Result<IngestReport> {
        self.pipeline.ingest(doc).await
    }

    /// Parse and index uploaded bytes, keeping a raw copy when configured
    pub async fn ingest_bytes(&self, filename: &str, data: &[u8]) -> Result<IngestReport> {
        let doc = self.loader.load_bytes(filename, data)?;
        let report = self.pipeline.ingest(&doc).await?;
        if self.config.storage.save_uploads {
            self.loader.save_upload(filename, data).await?;
        }
        Ok(report)
    }

    /// Load and index a file from disk
    pub async fn ingest_path(&self, path: &Path) -> Result<IngestReport> {
        let doc = self.loader.load_path(path).await?;
        self.pipeline.ingest(&doc).await
    }

    /// Store pasted text as a `.txt` document and index it
    pub async fn ingest_text(&self, title: &str, text: &str) -> Result<IngestReport> {
        if text.trim().is_empty() {
            return Err(Error::InvalidRequest("text must not be empty".to_string()));
        }
        let filename = DocumentLoader::text_filename(title)?;
        let doc = self.loader.load_bytes(&filename, text.as_bytes())?;
        let report = self.pipeline.ingest(&doc).await?;
        self.loader.save_upload(&filename, text.as_bytes()).await?;
        Ok(report)
    }

    /// Documents present in the index, with their chunk counts
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let mut documents: BTreeMap<String, DocumentSummary> = BTreeMap::new();

        for stored in self.vector_store.list_all().await? {
            let meta = match ChunkMetadata::from_map(&stored.metadata) {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::debug!(
                        id = %stored.id,
                        error = %e,
                        "Ignoring vector without chunk metadata"
                    );
                    continue;
                }
            };

            documents
                .entry(meta.document_id.clone())
                .and_modify(|d| {
                    d.chunks += 1;
                    if meta.ingested_at > d.ingested_at {
                        d.ingested_at = meta.ingested_at;
                    }
                })
                .or_insert_with(|| DocumentSummary {
                    id: meta.document_id.clone(),
                    filename: meta.source.clone(),
                    file_type: meta.file_type,
                    chunks: 1,
                    ingested_at: meta.ingested_at,
                });
        }

        let mut documents: Vec<DocumentSummary> = documents.into_values().collect();
        documents.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(documents)
    }

    /// Delete a document's chunks and its stored raw file
    pub async fn delete_document(&self, document_id: &str) -> Result<usize> {
        let summary = self
            .list_documents()
            .await?
            .into_iter()
            .find(|d| d.id == document_id)
            .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))?;

        let deleted = self
            .vector_store
            .delete_by_filter(&MetadataFilter::DocumentId(summary.id.clone()))
            .await?;
        self.loader.remove_stored(&summary.filename).await?;

        tracing::info!(document_id, chunks = deleted, "Deleted document");
        Ok(deleted)
    }

    /// Remove every vector from the index
    pub async fn delete_all(&self) -> Result<()> {
        self.vector_store.delete_all().await?;
        tracing::warn!("Deleted all documents from the index");
        Ok(())
    }

    /// Index size and configured models
    pub async fn statistics(&self) -> Result<SystemStats> {
        let stats = self.vector_store.stats().await?;
        Ok(SystemStats {
            total_vectors: stats.total_vectors,
            index_name: self.config.vector_db.index_name.clone(),
            dimension: stats.dimension,
            vector_backend: self.vector_store.name().to_string(),
            embedding_model: self.config.embeddings.model.clone(),
            llm_model: self.llm.model().to_string(),
        })
    }

    /// Probe every provider
    pub async fn health(&self) -> HealthReport {
        let (embedder, vector_store, llm) = tokio::join!(
            self.embedder.health_check(),
            self.vector_store.health_check(),
            self.llm.health_check(),
        );

        HealthReport {
            embedder: embedder.unwrap_or(false),
            vector_store: vector_store.unwrap_or(false),
            llm: llm.unwrap_or(false),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
