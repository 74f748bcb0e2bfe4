//! Configuration for the RAG system
//!
//! Values come from three layers, later ones winning: built-in defaults, an
//! optional TOML file, and environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main RAG system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama/LLM configuration
    pub llm: LlmConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Local file storage
    pub storage: StorageConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                toml::from_str(&content).map_err(|e| {
                    Error::Config(format!("Failed to parse {}: {}", path.display(), e))
                })?
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (normally the process environment)
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("PINECONE_API_KEY") {
            self.vector_db.api_key = Some(key);
        }
        if let Some(name) = lookup("PINECONE_INDEX_NAME") {
            self.vector_db.index_name = name;
        }
        if let Some(region) = lookup("PINECONE_ENVIRONMENT") {
            self.vector_db.region = region;
        }
        if let Some(host) = lookup("PINECONE_HOST") {
            self.vector_db.host = Some(host);
        }
        if let Some(backend) = lookup("JARVIS_VECTOR_BACKEND") {
            self.vector_db.backend = match backend.to_lowercase().as_str() {
                "pinecone" => VectorBackend::Pinecone,
                "memory" => VectorBackend::Memory,
                other => {
                    return Err(Error::Config(format!("Unknown vector backend: {}", other)))
                }
            };
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embeddings.model = model;
        }
        if let Some(size) = lookup("CHUNK_SIZE") {
            self.chunking.chunk_size = parse_env("CHUNK_SIZE", &size)?;
        }
        if let Some(overlap) = lookup("CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_env("CHUNK_OVERLAP", &overlap)?;
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(temperature) = lookup("LLM_TEMPERATURE") {
            self.llm.temperature = parse_env("LLM_TEMPERATURE", &temperature)?;
        }
        if let Some(max_tokens) = lookup("LLM_MAX_TOKENS") {
            self.llm.max_tokens = parse_env("LLM_MAX_TOKENS", &max_tokens)?;
        }
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(dir) = lookup("JARVIS_DOCUMENTS_DIR") {
            self.storage.documents_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Validate all required settings
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.vector_db.backend == VectorBackend::Pinecone
            && self.vector_db.api_key.as_deref().map_or(true, str::is_empty)
        {
            errors.push("PINECONE_API_KEY is not set".to_string());
        }
        if self.vector_db.index_name.trim().is_empty() {
            errors.push("vector index name is empty".to_string());
        }
        if self.llm.model.trim().is_empty() {
            errors.push("LLM model name is empty".to_string());
        }
        if self.embeddings.model.trim().is_empty() {
            errors.push("embedding model name is empty".to_string());
        }
        if self.embeddings.dimensions == 0 {
            errors.push("embedding dimension must be positive".to_string());
        }

        if !errors.is_empty() {
            return Err(Error::Config(errors.join("; ")));
        }

        self.chunking.validate()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} has an invalid value: {}", key, value)))
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Sentence-transformer model run in-process through ONNX Runtime
    #[default]
    Onnx,
    /// Ollama `/api/embeddings`
    Ollama,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding backend
    pub backend: EmbeddingBackend,
    /// Model to use (default: all-MiniLM-L6-v2)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Batch size for embedding generation
    pub batch_size: usize,
    /// Maximum sequence length
    pub max_length: usize,
    /// Cache directory for models
    pub cache_dir: PathBuf,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Onnx,
            model: "all-MiniLM-L6-v2".to_string(),
            dimensions: 384,
            batch_size: 32,
            max_length: 256,
            cache_dir: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("jarvis-rag")
                .join("models"),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    /// Overlap must be strictly smaller than the chunk size
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfiguration(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfiguration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// Embedding model name (only used with the Ollama embedding backend)
    pub embed_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Sampling: top-k
    pub top_k: u32,
    /// Sampling: nucleus probability
    pub top_p: f32,
    /// Sampling: repetition penalty
    pub repeat_penalty: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b".to_string(),
            embed_model: "all-minilm".to_string(),
            temperature: 0.3,
            max_tokens: 512,
            top_k: 40,
            top_p: 0.9,
            repeat_penalty: 1.1,
            timeout_secs: 120,
        }
    }
}

/// Which vector store backend to use
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VectorBackend {
    /// Hosted Pinecone index
    #[default]
    Pinecone,
    /// Process-local index, contents lost on exit
    Memory,
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Backend selection
    pub backend: VectorBackend,
    /// Pinecone API key
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Index name
    pub index_name: String,
    /// Serverless cloud used when creating the index
    pub cloud: String,
    /// Serverless region used when creating the index
    pub region: String,
    /// Data-plane host; resolved from the control plane when unset
    pub host: Option<String>,
    /// Control-plane base URL
    pub control_plane_url: String,
    /// Pinecone API version header
    pub api_version: String,
    /// Similarity metric used when creating the index
    pub metric: String,
    /// Vectors per upsert request
    pub upsert_batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Pinecone,
            api_key: None,
            index_name: "enterprise-jarvis".to_string(),
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            host: None,
            control_plane_url: "https://api.pinecone.io".to_string(),
            api_version: "2024-07".to_string(),
            metric: "cosine".to_string(),
            upsert_batch_size: 100,
            timeout_secs: 30,
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks to retrieve per question
    pub top_k: usize,
    /// Matches scoring below this are treated as irrelevant
    pub min_score: f32,
    /// Maximum characters of chunk text shown in a citation
    pub snippet_length: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_score: 0.3,
            snippet_length: 300,
        }
    }
}

/// Local file storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where uploaded and pasted documents are written
    pub documents_dir: PathBuf,
    /// Keep a copy of every upload on disk
    pub save_uploads: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("data").join("raw_documents"),
            save_uploads: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = RagConfig::default();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.embeddings.dimensions, 384);
        assert_eq!(config.vector_db.index_name, "enterprise-jarvis");
        assert_eq!(config.llm.model, "qwen2.5:7b");
        assert_eq!(config.llm.max_tokens, 512);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PINECONE_API_KEY", "pc-test"),
            ("CHUNK_SIZE", "800"),
            ("CHUNK_OVERLAP", "100"),
            ("LLM_TEMPERATURE", "0.1"),
            ("JARVIS_VECTOR_BACKEND", "memory"),
        ]
        .into_iter()
        .collect();

        let mut config = RagConfig::default();
        config
            .apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.vector_db.api_key.as_deref(), Some("pc-test"));
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert!((config.llm.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.vector_db.backend, VectorBackend::Memory);
    }

    #[test]
    fn test_bad_env_value() {
        let mut config = RagConfig::default();
        let result = config.apply_env_overrides(|key| {
            (key == "CHUNK_SIZE").then(|| "lots".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_api_key() {
        let config = RagConfig::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = RagConfig::default();
        config.vector_db.backend = VectorBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller() {
        let mut config = RagConfig::default();
        config.vector_db.backend = VectorBackend::Memory;
        config.chunking.chunk_overlap = 500;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_toml_partial() {
        let config: RagConfig = toml::from_str(
            r#"
            [chunking]
            chunk_size = 1000

            [vector_db]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 50);
        assert_eq!(config.vector_db.backend, VectorBackend::Memory);
    }
}
