//! Document ingestion: parsing, chunking and indexing

mod chunker;
mod loader;
mod parser;
mod pipeline;

pub use chunker::{TextChunker, TextSpan};
pub use loader::DocumentLoader;
pub use parser::{FileParser, ParsedDocument};
pub use pipeline::IngestPipeline;
