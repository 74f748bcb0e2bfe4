//! RAG Server binary
//!
//! Run with: cargo run -p jarvis-rag --bin jarvis-rag-server

use std::path::PathBuf;

use jarvis_rag::{
    config::RagConfig,
    server::{state::AppState, RagServer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jarvis_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                    Enterprise JARVIS                      ║
║           Document Q&A with Source Citations              ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let config_path = std::env::var("JARVIS_CONFIG").ok().map(PathBuf::from);
    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Embedding model: {}", config.embeddings.model);
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!("  - LLM model: {}", config.llm.model);
    tracing::info!("  - Vector index: {}", config.vector_db.index_name);
    tracing::info!(
        "  - Chunking: {} chars, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );

    let state = AppState::from_config(config).await?;

    tracing::info!(
        "Uploads saved to {}",
        state.engine().loader().documents_dir().display()
    );

    let llm = state.engine().llm();
    match llm.model_available().await {
        Ok(true) => tracing::info!("Ollama is serving {}", llm.model()),
        Ok(false) => {
            tracing::warn!("Model {} is not pulled", llm.model());
            tracing::warn!("  Run: ollama pull {}", llm.model());
        }
        Err(e) => {
            tracing::warn!("Ollama not available at {}: {}", state.config().llm.base_url, e);
            tracing::warn!("  1. Start: ollama serve");
            tracing::warn!("  2. Pull the model: ollama pull {}", llm.model());
        }
    }

    let server = RagServer::new(state);

    println!("\nServer starting...");
    println!("  UI:     http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  Info:   http://{}/api/info", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
