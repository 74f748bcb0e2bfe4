//! Prompt assembly, response cleanup and citations

pub mod citation;
pub mod prompt;

pub use citation::{format_sources, retrieved_chunks, truncate_snippet, RetrievedChunk};
pub use prompt::{clean_response, PromptBuilder};
