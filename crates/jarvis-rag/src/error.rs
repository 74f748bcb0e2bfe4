//! Error types for the RAG system

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG system errors
///
/// Lower layers return these unchanged; nothing in the crate retries.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing credentials, model names or other required settings
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings that are present but inconsistent (e.g. overlap >= chunk size)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Unrecognized file extension
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Document produced no text
    #[error("No text could be extracted from '{0}'")]
    EmptyDocument(String),

    /// Embedding or generation model unreachable or failed
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// The model server does not have the configured model loaded
    #[error("Model '{0}' is not available on the model server")]
    ModelNotFound(String),

    /// The model server could not be reached
    #[error("Connection refused by {0}")]
    ConnectionRefused(String),

    /// The configured vector index does not exist
    #[error("Index not found: {0}")]
    IndexNotFound(String),

    /// Transport failure talking to the vector store
    #[error("Network error: {0}")]
    Network(String),

    /// Vector store rejected a request
    #[error("Vector database error: {0}")]
    VectorDb(String),

    /// Embedding length does not match the index
    #[error("Dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Malformed request from a client
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a model unavailable error
    pub fn model_unavailable(message: impl Into<String>) -> Self {
        Self::ModelUnavailable(message.into())
    }

    /// Create a vector db error
    pub fn vector_db(message: impl Into<String>) -> Self {
        Self::VectorDb(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error came from the vector index layer
    pub fn is_index_error(&self) -> bool {
        matches!(
            self,
            Self::IndexNotFound(_)
                | Self::Network(_)
                | Self::VectorDb(_)
                | Self::DimensionMismatch { .. }
        )
    }

    /// Whether this error came from the embedding or generation model layer
    pub fn is_model_error(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable(_) | Self::ModelNotFound(_) | Self::ConnectionRefused(_)
        )
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::InvalidConfiguration(_) => (StatusCode::BAD_REQUEST, "invalid_configuration"),
            Error::UnsupportedFormat(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format")
            }
            Error::FileParse { .. } => (StatusCode::BAD_REQUEST, "parse_error"),
            Error::EmptyDocument(_) => (StatusCode::UNPROCESSABLE_ENTITY, "empty_document"),
            Error::ModelUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "model_unavailable"),
            Error::ModelNotFound(_) => (StatusCode::SERVICE_UNAVAILABLE, "model_not_found"),
            Error::ConnectionRefused(_) => (StatusCode::SERVICE_UNAVAILABLE, "connection_refused"),
            Error::IndexNotFound(_) => (StatusCode::SERVICE_UNAVAILABLE, "index_not_found"),
            Error::Network(_) => (StatusCode::BAD_GATEWAY, "network_error"),
            Error::VectorDb(_) => (StatusCode::BAD_GATEWAY, "vector_db_error"),
            Error::DimensionMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "dimension_mismatch")
            }
            Error::DocumentNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
