//! Document and chunk types with source tracking for citations

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::providers::vector_store::{Metadata, VectorRecord};

/// Maximum characters of chunk text stored as vector metadata
pub const METADATA_TEXT_LIMIT: usize = 1000;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Microsoft Word document (.docx)
    Docx,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Docx,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a filename
    pub fn from_filename(filename: &str) -> Self {
        match filename.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Self::Unknown,
        }
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "Word Document (.docx)",
            Self::Txt => "Text File",
            Self::Markdown => "Markdown",
            Self::Unknown => "Unknown",
        }
    }

    /// Extensions accepted by the loader
    pub fn supported_extensions() -> &'static [&'static str] {
        &["pdf", "docx", "txt", "text", "md", "markdown"]
    }
}

/// Derive the document id used for chunk ids and cascade deletes.
///
/// ASCII alphanumerics, `.`, `-` and `_` are kept; every other byte is
/// percent-encoded, so distinct filenames never share an id.
pub fn document_id_for(filename: &str) -> String {
    let mut id = String::with_capacity(filename.len());
    for b in filename.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_') {
            id.push(char::from(b));
        } else {
            id.push_str(&format!("%{:02X}", b));
        }
    }
    id
}

/// A document loaded from disk or upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document id derived from the filename
    pub id: String,
    /// Original filename as uploaded by user
    pub filename: String,
    /// File type
    pub file_type: FileType,
    /// Extracted text
    pub content: String,
    /// Total number of pages (PDF only)
    pub total_pages: Option<u32>,
    /// Ingestion timestamp
    pub ingested_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document
    pub fn new(filename: impl Into<String>, file_type: FileType, content: String) -> Self {
        let filename = filename.into();
        Self {
            id: document_id_for(&filename),
            filename,
            file_type,
            content,
            total_pages: None,
            ingested_at: Utc::now(),
        }
    }

    /// Character length of the content
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// `{document_id}_{chunk_index}`
    pub id: String,
    /// Parent document ID
    pub document_id: String,
    /// Source filename
    pub filename: String,
    /// File type of the source
    pub file_type: FileType,
    /// Text content
    pub text: String,
    /// Chunk index within document
    pub chunk_index: u32,
    /// Character span in the original document
    pub char_start: usize,
    pub char_end: usize,
    /// Embedding vector, empty until embedded
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Ingestion timestamp of the parent document
    pub ingested_at: DateTime<Utc>,
}

impl Chunk {
    /// Create a chunk for a document span
    pub fn new(
        doc: &Document,
        text: String,
        chunk_index: u32,
        char_start: usize,
        char_end: usize,
    ) -> Self {
        Self {
            id: format!("{}_{}", doc.id, chunk_index),
            document_id: doc.id.clone(),
            filename: doc.filename.clone(),
            file_type: doc.file_type,
            text,
            chunk_index,
            char_start,
            char_end,
            embedding: Vec::new(),
            ingested_at: doc.ingested_at,
        }
    }

    /// Metadata stored alongside the vector
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            document_id: self.document_id.clone(),
            source: self.filename.clone(),
            file_type: self.file_type,
            chunk_index: self.chunk_index,
            char_start: self.char_start,
            char_end: self.char_end,
            text: self.text.chars().take(METADATA_TEXT_LIMIT).collect(),
            ingested_at: self.ingested_at,
        }
    }

    /// Convert to a vector store record; the chunk must be embedded
    pub fn to_record(&self) -> Result<VectorRecord> {
        if self.embedding.is_empty() {
            return Err(Error::vector_db(format!("Chunk {} has no embedding", self.id)));
        }
        Ok(VectorRecord {
            id: self.id.clone(),
            values: self.embedding.clone(),
            metadata: self.metadata().into_map()?,
        })
    }
}

/// Typed view of the metadata stored with every vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub document_id: String,
    /// Source filename
    pub source: String,
    pub file_type: FileType,
    #[serde(deserialize_with = "number_as_integer")]
    pub chunk_index: u32,
    #[serde(deserialize_with = "number_as_integer")]
    pub char_start: usize,
    #[serde(deserialize_with = "number_as_integer")]
    pub char_end: usize,
    pub text: String,
    pub ingested_at: DateTime<Utc>,
}

/// Pinecone hands numeric metadata back as floats (`3.0`)
fn number_as_integer<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = f64::deserialize(deserializer)?;
    if value < 0.0 || value.fract() != 0.0 {
        return Err(de::Error::custom(format!(
            "expected a non-negative integer, got {}",
            value
        )));
    }
    T::try_from(value as u64).map_err(|_| de::Error::custom("integer out of range"))
}

impl ChunkMetadata {
    /// Serialize into the untyped map the vector store carries
    pub fn into_map(self) -> Result<Metadata> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(Error::internal("chunk metadata did not serialize to an object")),
        }
    }

    /// Parse from vector store metadata
    pub fn from_map(map: &Metadata) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(map.clone()))?)
    }
}
