//! Command line tool for index setup, bulk ingestion and ad-hoc queries
//!
//! Run with: cargo run -p jarvis-rag --features cli --bin jarvis-rag-setup -- setup

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use jarvis_rag::{
    config::{RagConfig, VectorBackend},
    generation::citation::format_sources,
    ingestion::DocumentLoader,
    providers::PineconeVectorStore,
    QueryRequest, RagEngine,
};

/// Enterprise JARVIS management CLI
#[derive(Parser, Debug)]
#[command(name = "jarvis-rag-setup")]
#[command(version)]
#[command(about = "Set up the vector index and manage indexed documents", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults to $JARVIS_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the index if needed and ingest every supported file in a directory
    Setup {
        /// Directory to scan (defaults to the configured documents directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Ask a question and print the answer with its sources
    Query {
        question: String,
        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },
    /// Show index statistics
    Stats,
    /// List indexed documents
    List,
    /// Delete one document and all of its chunks
    Delete { document_id: String },
    /// Delete every vector in the index
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "jarvis_rag=warn");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = execute(cli).await {
        eprintln!("{} {:#}", style("error:").red().bold(), e);
        if let Some(hint) = e.downcast_ref::<jarvis_rag::Error>().and_then(hint) {
            eprintln!("{} {}", style("hint:").yellow(), hint);
        }
        std::process::exit(1);
    }
}

fn hint(e: &jarvis_rag::Error) -> Option<&'static str> {
    if e.is_model_error() {
        Some("is Ollama running? Start it with `ollama serve` and pull the configured model")
    } else if e.is_index_error() {
        Some("check PINECONE_API_KEY and PINECONE_INDEX_NAME, or run `jarvis-rag-setup setup`")
    } else {
        None
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .or_else(|| std::env::var("JARVIS_CONFIG").ok().map(PathBuf::from));
    let config = RagConfig::load(config_path.as_deref())?;
    config.validate()?;

    match cli.command {
        Commands::Setup { dir } => setup(config, dir).await,
        Commands::Query { question, top_k } => query(config, question, top_k).await,
        Commands::Stats => stats(config).await,
        Commands::List => list(config).await,
        Commands::Delete { document_id } => delete(config, document_id).await,
        Commands::Clear { yes } => clear(config, yes).await,
    }
}

async fn setup(config: RagConfig, dir: Option<PathBuf>) -> Result<()> {
    if config.vector_db.backend == VectorBackend::Pinecone {
        let spinner = ProgressBar::new_spinner();
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(format!(
            "Checking index {}",
            config.vector_db.index_name
        ));

        let created = PineconeVectorStore::create_index_if_missing(
            &config.vector_db,
            config.embeddings.dimensions,
        )
        .await?;

        spinner.finish_and_clear();
        if created {
            println!(
                "{} Created index {}",
                style("✓").green(),
                config.vector_db.index_name
            );
        } else {
            println!(
                "{} Index {} already exists",
                style("✓").green(),
                config.vector_db.index_name
            );
        }
    }

    let dir = dir.unwrap_or_else(|| config.storage.documents_dir.clone());
    let files = DocumentLoader::scan_directory(&dir)?;
    if files.is_empty() {
        println!("No supported documents found in {}", dir.display());
        return Ok(());
    }

    let engine = RagEngine::from_config(config).await?;

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {wide_msg}")?
            .progress_chars("=> "),
    );

    let mut chunks = 0;
    let mut failures = Vec::new();
    for path in &files {
        progress.set_message(path.display().to_string());
        match engine.ingest_path(path).await {
            Ok(report) => chunks += report.chunks_created,
            Err(e) => failures.push((path.clone(), e)),
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    println!(
        "{} Indexed {} of {} documents ({} chunks)",
        style("✓").green(),
        files.len() - failures.len(),
        files.len(),
        chunks
    );
    for (path, e) in &failures {
        println!("{} {}: {}", style("✗").red(), path.display(), e);
    }

    Ok(())
}

async fn query(config: RagConfig, question: String, top_k: Option<usize>) -> Result<()> {
    let engine = RagEngine::from_config(config).await?;

    let mut request = QueryRequest::new(question);
    if let Some(k) = top_k {
        request = request.with_top_k(k);
    }

    let response = engine.query(&request).await?;

    println!("{}\n", response.answer);
    if !response.citations.is_empty() {
        println!("{}", style("Sources").bold());
        println!("{}", format_sources(&response.citations));
    }
    println!(
        "{}",
        style(format!("{} ms", response.processing_time_ms)).dim()
    );

    Ok(())
}

async fn stats(config: RagConfig) -> Result<()> {
    let engine = RagEngine::from_config(config).await?;
    let stats = engine.statistics().await?;

    println!("Index:           {}", stats.index_name);
    println!("Backend:         {}", stats.vector_backend);
    println!("Vectors:         {}", stats.total_vectors);
    println!("Dimension:       {}", stats.dimension);
    println!("Embedding model: {}", stats.embedding_model);
    println!("LLM model:       {}", stats.llm_model);

    Ok(())
}

async fn list(config: RagConfig) -> Result<()> {
    let engine = RagEngine::from_config(config).await?;
    let documents = engine.list_documents().await?;

    if documents.is_empty() {
        println!("No documents indexed");
        return Ok(());
    }

    for doc in &documents {
        println!(
            "{:<40} {:<24} {:>5} chunks  {}",
            doc.filename,
            doc.file_type.display_name(),
            doc.chunks,
            style(&doc.id).dim()
        );
    }
    println!("\n{} documents", documents.len());

    Ok(())
}

async fn delete(config: RagConfig, document_id: String) -> Result<()> {
    let engine = RagEngine::from_config(config).await?;
    let deleted = engine.delete_document(&document_id).await?;
    println!(
        "{} Deleted {} ({} chunks)",
        style("✓").green(),
        document_id,
        deleted
    );
    Ok(())
}

async fn clear(config: RagConfig, yes: bool) -> Result<()> {
    if !yes {
        let term = console::Term::stdout();
        term.write_str("Delete every vector in the index? [y/N] ")?;
        let answer = term.read_line()?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("Aborted");
            return Ok(());
        }
    }

    let engine = RagEngine::from_config(config).await?;
    engine.delete_all().await?;
    println!("{} Index cleared", style("✓").green());
    Ok(())
}
