//! ONNX-based embedding generation
//!
//! Runs a sentence-transformers model (all-MiniLM-L6-v2 by default) in
//! process. Model and tokenizer are downloaded from Hugging Face into the
//! configured cache directory on first use.

use async_trait::async_trait;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;

/// Tokenizer and inference session, used from blocking threads only
struct OnnxModel {
    session: Session,
    tokenizer: Tokenizer,
    dimensions: usize,
    max_length: usize,
    batch_size: usize,
}

/// ONNX-based text embedder
pub struct OnnxEmbedder {
    model: Arc<Mutex<OnnxModel>>,
    dimensions: usize,
}

impl OnnxEmbedder {
    /// Load the model, downloading it first if it is not cached
    pub async fn new(config: &EmbeddingConfig) -> Result<Self> {
        tracing::info!(model = %config.model, "Initializing ONNX embedder");

        let model_dir = config.cache_dir.join(&config.model);
        std::fs::create_dir_all(&model_dir).map_err(|e| {
            Error::config(format!("Failed to create model cache directory: {}", e))
        })?;

        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            download(&config.model, "onnx/model.onnx", &model_path).await?;
        }
        if !tokenizer_path.exists() {
            download(&config.model, "tokenizer.json", &tokenizer_path).await?;
        }

        let session = Session::builder()
            .map_err(|e| {
                Error::model_unavailable(format!("Failed to create session builder: {}", e))
            })?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                Error::model_unavailable(format!("Failed to set optimization level: {}", e))
            })?
            .with_intra_threads(4)
            .map_err(|e| Error::model_unavailable(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| Error::model_unavailable(format!("Failed to load model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::model_unavailable(format!("Failed to load tokenizer: {}", e)))?;

        tracing::info!(dimensions = config.dimensions, "ONNX embedder ready");

        Ok(Self {
            model: Arc::new(Mutex::new(OnnxModel {
                session,
                tokenizer,
                dimensions: config.dimensions,
                max_length: config.max_length,
                batch_size: config.batch_size.max(1),
            })),
            dimensions: config.dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::model_unavailable("Empty embedding result"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = model.lock();
            let mut all = Vec::with_capacity(texts.len());
            let batch_size = model.batch_size;
            for batch in texts.chunks(batch_size) {
                let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
                all.extend(model.embed_batch(&refs)?);
            }
            Ok(all)
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

impl OnnxModel {
    fn embed_batch(&mut self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let batch_size = texts.len();

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::model_unavailable(format!("Tokenization failed: {}", e)))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length);

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();

            for j in 0..ids.len().min(max_len) {
                input_ids[i * max_len + j] = ids[j] as i64;
                attention_mask[i * max_len + j] = mask[j] as i64;
                token_type_ids[i * max_len + j] = types[j] as i64;
            }
        }

        let tensor = |data: Vec<i64>, what: &str| {
            Tensor::from_array((vec![batch_size, max_len], data.into_boxed_slice()))
                .map_err(|e| {
                    Error::model_unavailable(format!("{} tensor creation failed: {}", what, e))
                })
        };

        let inputs = vec![
            ("input_ids", tensor(input_ids, "Input")?.into_dyn()),
            ("attention_mask", tensor(attention_mask.clone(), "Attention mask")?.into_dyn()),
            ("token_type_ids", tensor(token_type_ids, "Token type")?.into_dyn()),
        ];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| Error::model_unavailable(format!("Inference failed: {}", e)))?;

        let output_iter: Vec<_> = outputs.iter().collect();
        let output = output_iter
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| output_iter.first())
            .map(|(_, v)| v)
            .ok_or_else(|| Error::model_unavailable("No output tensor"))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::model_unavailable(format!("Failed to extract tensor: {}", e)))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        let hidden_size = dims.get(2).copied().unwrap_or(self.dimensions);

        let mut embeddings = Vec::with_capacity(batch_size);
        for i in 0..batch_size {
            let mask = &attention_mask[i * max_len..(i + 1) * max_len];
            let start = i * max_len * hidden_size;
            let end = (start + max_len * hidden_size).min(data.len());
            let mut pooled = mean_pool(&data[start..end], mask, hidden_size);
            l2_normalize(&mut pooled);
            embeddings.push(pooled);
        }

        Ok(embeddings)
    }
}

/// Average token vectors where the attention mask is set
fn mean_pool(hidden: &[f32], mask: &[i64], hidden_size: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden_size];
    let mut count = 0.0f32;

    for (token, &m) in hidden.chunks(hidden_size).zip(mask.iter()) {
        if m > 0 {
            for (acc, v) in sum.iter_mut().zip(token) {
                *acc += v;
            }
            count += 1.0;
        }
    }

    if count > 0.0 {
        for v in &mut sum {
            *v /= count;
        }
    }
    sum
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Fetch one file of a sentence-transformers repository
async fn download(model_name: &str, file: &str, path: &Path) -> Result<()> {
    let url = format!(
        "https://huggingface.co/sentence-transformers/{}/resolve/main/{}",
        model_name, file
    );

    tracing::info!(url = %url, "Downloading embedding model file");

    let response = reqwest::get(&url)
        .await
        .map_err(|e| Error::model_unavailable(format!("Failed to download {}: {}", file, e)))?;

    if !response.status().is_success() {
        return Err(Error::model_unavailable(format!(
            "Download of {} failed: HTTP {}",
            file,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::model_unavailable(format!("Failed to read {}: {}", file, e)))?;

    std::fs::write(path, &bytes)?;

    tracing::info!(bytes = bytes.len(), file, "Download complete");
    Ok(())
}
