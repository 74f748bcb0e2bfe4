//! Ollama client for answer generation and embeddings
//!
//! Requests are sent once; failures are classified and returned to the
//! caller without retrying.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;

/// Ollama API client
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
    top_k: u32,
    top_p: f32,
    repeat_penalty: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Generate an embedding with `model`
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(self.url("/api/embeddings"))
            .json(&EmbedRequest { model, prompt: text })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let embed_response: EmbedResponse = self
            .check_status(response, model)
            .await?
            .json()
            .await
            .map_err(|e| {
                Error::model_unavailable(format!("Failed to parse embedding response: {}", e))
            })?;

        Ok(embed_response.embedding)
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_connect() {
            Error::ConnectionRefused(self.config.base_url.clone())
        } else if e.is_timeout() {
            Error::model_unavailable(format!(
                "Ollama did not respond within {}s",
                self.config.timeout_secs
            ))
        } else {
            Error::model_unavailable(format!("Ollama request failed: {}", e))
        }
    }

    async fn check_status(&self, response: Response, model: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND || body.contains("not found") {
            return Err(Error::ModelNotFound(model.to_string()));
        }
        Err(Error::model_unavailable(format!(
            "Ollama returned HTTP {}: {}",
            status, body
        )))
    }
}

#[async_trait]
impl LlmProvider for OllamaClient {
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature,
                num_predict: max_tokens,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
                repeat_penalty: self.config.repeat_penalty,
            },
        };

        tracing::info!(model = %self.config.model, max_tokens, "Generating answer");

        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let generate_response: GenerateResponse = self
            .check_status(response, &self.config.model)
            .await?
            .json()
            .await
            .map_err(|e| {
                Error::model_unavailable(format!("Failed to parse generation response: {}", e))
            })?;

        Ok(generate_response.response)
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.get(self.url("/api/tags")).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!(error = %e, "Ollama health check failed");
                Ok(false)
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let tags: TagsResponse = self
            .check_status(response, &self.config.model)
            .await?
            .json()
            .await
            .map_err(|e| Error::model_unavailable(format!("Failed to parse model list: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

/// Ollama embedding provider
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create an embedder sharing an existing client
    pub fn new(client: Arc<OllamaClient>, model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            client,
            model: model.into(),
            dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.client.embed(&self.model, text).await?;
        if embedding.len() != self.dimensions {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
