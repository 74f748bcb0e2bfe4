//! Application state for the RAG server

use std::sync::Arc;

use crate::config::RagConfig;
use crate::engine::RagEngine;
use crate::error::Result;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    engine: RagEngine,
}

impl AppState {
    /// Wrap an assembled engine
    pub fn new(engine: RagEngine) -> Self {
        Self {
            inner: Arc::new(AppStateInner { engine }),
        }
    }

    /// Connect providers from configuration
    pub async fn from_config(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing RAG application state...");
        let engine = RagEngine::from_config(config).await?;
        tracing::info!("Application state ready");
        Ok(Self::new(engine))
    }

    pub fn engine(&self) -> &RagEngine {
        &self.inner.engine
    }

    pub fn config(&self) -> &RagConfig {
        self.inner.engine.config()
    }
}
