//! Persistent stores: per-document vector collections and raw documents

mod document_store;
mod vector_store;

pub use document_store::DocumentStore;
pub use vector_store::{ScoredChunk, VectorStore};
