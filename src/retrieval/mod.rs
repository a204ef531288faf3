//! Retrieval: nearest-neighbor search merged across collections

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::store::VectorStore;
use crate::types::Locator;

/// A query-time result: one chunk with its rank and similarity.
/// Rebuilt per query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedEvidence {
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Source document ID
    pub document_id: Uuid,
    /// Source filename
    pub filename: String,
    /// Range of the source the chunk covers
    pub locator: Locator,
    /// Chunk text
    pub text: String,
    /// Similarity score (higher is more relevant)
    pub score: f32,
    /// 1-based rank in the merged result list
    pub rank: usize,
}

/// Embeds a query and merges per-collection candidates into one ranked,
/// deduplicated evidence set.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<VectorStore>,
}

impl Retriever {
    /// Create a new retriever. Must share its embedding provider with
    /// the indexer: query and corpus embeddings live in the same space.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<VectorStore>) -> Self {
        Self { embedder, store }
    }

    /// Retrieve up to `top_k` evidence chunks for a query, optionally
    /// restricted to the given documents.
    ///
    /// An empty store, or a filter matching no collection, returns an
    /// empty sequence rather than an error. Results are ordered by
    /// descending similarity with ties broken by document id then chunk
    /// id, so ranking is reproducible.
    pub async fn retrieve(
        &self,
        query_text: &str,
        top_k: usize,
        document_ids: Option<&[Uuid]>,
    ) -> Result<Vec<RetrievedEvidence>> {
        let top_k = top_k.max(1);
        // An empty filter list means unrestricted, same as no filter
        let document_ids = document_ids.filter(|ids| !ids.is_empty());

        if self.store.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(query_text)
            .await
            .map_err(|e| Error::Retrieval(format!("query embedding failed: {}", e)))?;

        let mut candidates = self.store.search(&query_embedding, top_k, document_ids);

        // Global k-way merge of the per-collection rankings
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.document_id.cmp(&b.chunk.document_id))
                .then_with(|| a.chunk.id.cmp(&b.chunk.id))
        });

        // Defensive dedup: the same chunk id keeps only its best-scoring
        // occurrence (the first after sorting).
        let mut seen = HashSet::new();
        let mut evidence = Vec::with_capacity(top_k);
        for candidate in candidates {
            if !seen.insert(candidate.chunk.id) {
                continue;
            }
            let rank = evidence.len() + 1;
            evidence.push(RetrievedEvidence {
                chunk_id: candidate.chunk.id,
                document_id: candidate.chunk.document_id,
                filename: candidate.chunk.source.filename.clone(),
                locator: candidate.chunk.source.locator.clone(),
                text: candidate.chunk.text.clone(),
                score: candidate.score,
                rank,
            });
            if evidence.len() == top_k {
                break;
            }
        }

        tracing::debug!(
            "Retrieved {} evidence chunks (top_k={}, filtered={})",
            evidence.len(),
            top_k,
            document_ids.is_some()
        );
        Ok(evidence)
    }
}
