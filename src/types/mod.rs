//! Core types for the RAG pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{
    hash_bytes, Chunk, ChunkSource, ContentType, Document, Locator, Record, RecordPosition,
};
pub use query::QueryRequest;
pub use response::{
    Citation, DocumentListResponse, DocumentSummary, FileOutcome, QueryResponse, StructuredAnswer,
    UploadResponse,
};
