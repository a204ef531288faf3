//! Response types for upload and query endpoints

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{ContentType, Document};
use crate::retrieval::RetrievedEvidence;

/// Citation pointing at one retrieved evidence item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Document ID
    pub document_id: Uuid,
    /// Source filename
    pub filename: String,
    /// Locator label, e.g. "rows 10-14" or "page 3"
    pub locator: String,
    /// Supporting snippet from the source
    pub snippet: String,
    /// Similarity score of the cited evidence (0.0-1.0)
    pub score: f32,
}

impl Citation {
    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        format!("[{}, {}]", self.filename, self.locator)
    }
}

/// Final answer to a query: answer text, resolved citations, confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredAnswer {
    /// Generated answer text
    pub answer: String,
    /// Citations in the order the model emitted them
    pub citations: Vec<Citation>,
    /// Confidence score in [0, 1]
    pub confidence: f32,
}

impl StructuredAnswer {
    /// Terminal answer for the empty-evidence case; the generation
    /// service is never called for this.
    pub fn no_evidence() -> Self {
        Self {
            answer: "No relevant content was found in the uploaded documents.".to_string(),
            citations: Vec::new(),
            confidence: 0.0,
        }
    }

    /// Degraded answer returned when retrieval itself is unavailable
    pub fn unavailable() -> Self {
        Self {
            answer: "Sorry, document search is temporarily unavailable. Please try again."
                .to_string(),
            citations: Vec::new(),
            confidence: 0.0,
        }
    }

    /// Degraded answer returned when the generation service fails
    pub fn degraded() -> Self {
        Self {
            answer: "Sorry, the answer could not be generated right now. Please try again."
                .to_string(),
            citations: Vec::new(),
            confidence: 0.0,
        }
    }
}

/// Response from the query endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Echo of the query for frontend convenience
    pub query: String,
    /// The structured answer
    pub answer: StructuredAnswer,
    /// Retrieved evidence, in rank order
    pub evidence: Vec<RetrievedEvidence>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Conversation this turn was recorded in, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Uuid>,
}

/// Summary of a registered document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Document ID
    pub id: Uuid,
    /// Filename
    pub filename: String,
    /// Content type
    pub content_type: ContentType,
    /// File size in bytes
    pub size_bytes: u64,
    /// Number of chunks indexed
    pub total_chunks: u32,
    /// Upload timestamp
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename.clone(),
            content_type: doc.content_type.clone(),
            size_bytes: doc.size_bytes,
            total_chunks: doc.total_chunks,
            uploaded_at: doc.uploaded_at,
        }
    }
}

/// Outcome of processing a single uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// File extracted, chunked, and indexed
    Indexed {
        document: DocumentSummary,
        chunks_indexed: u32,
    },
    /// Processing failed; other files in the batch are unaffected
    Failed { filename: String, error: String },
}

impl FileOutcome {
    /// Get the filename from either variant
    pub fn filename(&self) -> &str {
        match self {
            Self::Indexed { document, .. } => &document.filename,
            Self::Failed { filename, .. } => filename,
        }
    }

    /// Whether the file was indexed
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Indexed { .. })
    }
}

/// Response from the upload endpoint: one outcome per file, never
/// all-or-nothing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Per-file outcomes
    pub files: Vec<FileOutcome>,
    /// Total chunks indexed across successful files
    pub total_chunks_indexed: u32,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Response for listing documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    /// Registered documents
    pub documents: Vec<DocumentSummary>,
    /// Total count
    pub total_count: usize,
}
