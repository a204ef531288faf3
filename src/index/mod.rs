//! Indexing: embedding chunks and writing them to the vector store

use std::sync::Arc;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::store::VectorStore;
use crate::types::Chunk;

/// Embeds chunks and upserts them into the owning document's collection.
///
/// Re-indexing a document with unchanged content is idempotent: chunk
/// ids are deterministic and upserts replace rather than duplicate.
pub struct Indexer {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<VectorStore>,
    batch_size: usize,
}

impl Indexer {
    /// Create a new indexer
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<VectorStore>,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Index a document's chunks. Returns the number of chunks written.
    ///
    /// On failure the error reports how many chunks were already
    /// committed; those writes stand (at-least-once on retry) but the
    /// caller must treat the document as incompletely indexed.
    pub async fn index(&self, document_id: Uuid, mut chunks: Vec<Chunk>) -> Result<usize> {
        let total = chunks.len();
        let mut indexed = 0usize;

        for batch in chunks.chunks_mut(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self
                .embedder
                .embed_batch(&texts)
                .await
                .map_err(|e| Error::indexing(e.to_string(), indexed))?;

            for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }

            self.store
                .upsert_chunks(&document_id, batch)
                .map_err(|e| Error::indexing(e.to_string(), indexed))?;
            indexed += batch.len();
        }

        tracing::info!(
            "Indexed {}/{} chunks for document {}",
            indexed,
            total,
            document_id
        );
        Ok(indexed)
    }

    /// Remove every entry tagged with the document id. Must fully
    /// complete before the caller reports a deletion as successful.
    pub async fn remove(&self, document_id: &Uuid) -> Result<usize> {
        let removed = self.store.remove_document(document_id)?;
        tracing::info!("Removed {} chunks for document {}", removed, document_id);
        Ok(removed)
    }
}
