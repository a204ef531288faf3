//! datarag: document Q&A with retrieval-augmented answers and citations
//!
//! Uploaded files (tabular, PDF, plain text) are extracted into
//! positional records, chunked, embedded, and indexed into one vector
//! collection per document. Queries are embedded with the same model,
//! matched across collections, and answered by a generation service
//! grounded in the retrieved evidence, with citations resolved back to
//! exact source locations.

pub mod config;
pub mod error;
pub mod generation;
pub mod history;
pub mod index;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod store;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, ChunkSource, ContentType, Document, Locator, Record, RecordPosition},
    query::QueryRequest,
    response::{Citation, QueryResponse, StructuredAnswer},
};
