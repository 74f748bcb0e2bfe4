//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;

/// Trait for prompt completion by a language model
///
/// Implementations:
/// - `OllamaClient`: local Ollama server (qwen2.5:7b by default)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a fully assembled prompt
    async fn generate(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Models the server has available
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Whether the configured model is among [`list_models`](Self::list_models)
    async fn model_available(&self) -> Result<bool> {
        let wanted = self.model();
        Ok(self
            .list_models()
            .await?
            .iter()
            .any(|name| model_matches(name, wanted)))
    }

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}

/// `qwen2.5` and `qwen2.5:latest` name the same model
pub fn model_matches(available: &str, wanted: &str) -> bool {
    fn base(name: &str) -> &str {
        name.strip_suffix(":latest").unwrap_or(name)
    }
    base(available) == base(wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_matches_latest_tag() {
        assert!(model_matches("qwen2.5:7b", "qwen2.5:7b"));
        assert!(model_matches("llama3:latest", "llama3"));
        assert!(!model_matches("qwen2.5:14b", "qwen2.5:7b"));
    }
}
