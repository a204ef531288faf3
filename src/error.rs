//! Error types for the RAG pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File extraction error (per-file, never fatal to a batch)
    #[error("Failed to extract '{filename}': {reason}")]
    Extraction { filename: String, reason: String },

    /// Unsupported content type
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Embedding service error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Indexing error; `indexed` chunks were committed before the failure
    #[error("Indexing incomplete after {indexed} chunks: {message}")]
    Indexing { message: String, indexed: usize },

    /// Retrieval error
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// Generation service error
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

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
    /// Create an extraction error
    pub fn extraction(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            filename: filename.into(),
            reason: reason.into(),
        }
    }

    /// Create an indexing error recording how many chunks made it in
    pub fn indexing(message: impl Into<String>, indexed: usize) -> Self {
        Self::Indexing {
            message: message.into(),
            indexed,
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::BAD_REQUEST, "config_error", msg.clone()),
            Error::Extraction { filename, reason } => (
                StatusCode::BAD_REQUEST,
                "extraction_error",
                format!("Failed to extract '{}': {}", filename, reason),
            ),
            Error::UnsupportedContentType(ext) => (
                StatusCode::BAD_REQUEST,
                "unsupported_type",
                format!("Unsupported content type: {}", ext),
            ),
            Error::Embedding(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "embedding_error",
                msg.clone(),
            ),
            Error::Indexing { message, indexed } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "indexing_error",
                format!("Indexing incomplete after {} chunks: {}", indexed, message),
            ),
            Error::Retrieval(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "retrieval_error",
                msg.clone(),
            ),
            Error::Generation(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "generation_error",
                msg.clone(),
            ),
            Error::DocumentNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Document not found: {}", id),
            ),
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
            Error::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
