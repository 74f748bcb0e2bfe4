//! Deterministic providers shared by the integration tests.

#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use jarvis_rag::config::{RagConfig, VectorBackend};
use jarvis_rag::providers::{EmbeddingProvider, InMemoryVectorStore, LlmProvider};
use jarvis_rag::{Error, RagEngine, Result};
use parking_lot::Mutex;
use tempfile::TempDir;

pub const DIM: usize = 384;

/// Bag-of-words embedder: each lowercase word is hashed into one of `DIM`
/// buckets and the counts are L2-normalized. Texts sharing words score high.
pub struct HashEmbedder;

impl HashEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; DIM];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            v[(hasher.finish() % DIM as u64) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vector(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash"
    }
}

/// [`HashEmbedder`] that reports the model as unavailable while switched off
pub struct SwitchableEmbedder {
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl SwitchableEmbedder {
    pub fn new() -> Self {
        Self {
            offline: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for SwitchableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::ModelUnavailable("embedding model is offline".to_string()));
        }
        Ok(HashEmbedder::vector(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.offline.load(Ordering::SeqCst))
    }

    fn name(&self) -> &str {
        "switchable"
    }
}

/// LLM double that fails every generation with the error `fail` builds
pub struct FailingLlm {
    fail: fn() -> Error,
    calls: AtomicUsize,
}

impl FailingLlm {
    pub fn new(fail: fn() -> Error) -> Self {
        Self {
            fail,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn generate(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err((self.fail)())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Err((self.fail)())
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing"
    }
}

/// LLM double that records every prompt and returns a fixed reply
pub struct RecordingLlm {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl RecordingLlm {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for RecordingLlm {
    async fn generate(&self, prompt: &str, _max_tokens: u32, _temperature: f32) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec!["recording".to_string()])
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn model(&self) -> &str {
        "recording"
    }
}

pub struct Harness {
    pub engine: RagEngine,
    pub store: Arc<InMemoryVectorStore>,
    pub embedder: Arc<SwitchableEmbedder>,
    pub llm: Arc<RecordingLlm>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_reply("ANSWER: Employees receive 15 vacation days per year.")
    }

    pub fn with_reply(reply: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();

        let store = Arc::new(InMemoryVectorStore::new(DIM));
        let embedder = Arc::new(SwitchableEmbedder::new());
        let llm = Arc::new(RecordingLlm::new(reply));
        let engine = RagEngine::new(
            memory_config(dir.path()),
            embedder.clone(),
            store.clone(),
            llm.clone(),
        )
        .unwrap();

        Self {
            engine,
            store,
            embedder,
            llm,
            dir,
        }
    }

    /// A second engine over the same index and embedder with a different LLM
    pub fn engine_with_llm(&self, llm: Arc<dyn LlmProvider>) -> RagEngine {
        RagEngine::new(
            memory_config(self.dir.path()),
            self.embedder.clone(),
            self.store.clone(),
            llm,
        )
        .unwrap()
    }
}

fn memory_config(documents_dir: &Path) -> RagConfig {
    let mut config = RagConfig::default();
    config.vector_db.backend = VectorBackend::Memory;
    config.storage.documents_dir = documents_dir.to_path_buf();
    config
}

pub const HANDBOOK: &str = "Employee Handbook. Employees receive 15 vacation days per year. \
Vacation days must be requested two weeks in advance.";

pub const EXPENSES: &str = "Expense policy. Travel receipts are submitted through the finance \
portal within thirty days of the trip.";

/// Text long enough to produce several chunks at the default window size
pub fn long_text(words: usize) -> String {
    (0..words)
        .map(|i| format!("word{}", i))
        .collect::<Vec<_>>()
        .join(" ")
}
