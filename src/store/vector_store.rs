//! Per-document vector collections with cosine similarity search
//!
//! The store is an addressable map from document id to an independent
//! collection; there is no shared index mutated across documents, so
//! removing a document drops exactly its own vectors.

use std::collections::BTreeMap;
use std::path::PathBuf;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::Chunk;

/// One document's index partition. Every embedding in a collection has
/// matching dimensionality.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Collection {
    dimensions: usize,
    entries: BTreeMap<Uuid, Chunk>,
}

/// A chunk matched by similarity search
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine similarity (higher is more relevant)
    pub score: f32,
}

/// Vector store holding one persistent collection per document.
///
/// Writes to a collection go through the map's entry lock, so writers
/// for the same document are serialized while other documents' reads
/// and writes proceed independently. Each collection is flushed to
/// `<dir>/<document_id>.json` after every mutation and reloaded on open.
pub struct VectorStore {
    dir: PathBuf,
    collections: DashMap<Uuid, Collection>,
}

impl VectorStore {
    /// Open the store, loading any collections persisted under `dir`
    pub fn open(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)?;

        let collections = DashMap::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            let document_id = match path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            {
                Some(id) => id,
                None => continue,
            };
            match std::fs::read_to_string(&path) {
                Ok(raw) => match serde_json::from_str::<Collection>(&raw) {
                    Ok(collection) => {
                        collections.insert(document_id, collection);
                    }
                    Err(e) => {
                        tracing::warn!("Skipping unreadable collection {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Skipping collection {}: {}", path.display(), e);
                }
            }
        }

        tracing::info!("Vector store loaded {} collections", collections.len());
        Ok(Self { dir, collections })
    }

    fn collection_path(&self, document_id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", document_id))
    }

    /// Upsert chunks into a document's collection. Entries with the same
    /// chunk id are replaced, never duplicated.
    pub fn upsert_chunks(&self, document_id: &Uuid, chunks: &[Chunk]) -> Result<()> {
        let mut collection = self.collections.entry(*document_id).or_default();

        for chunk in chunks {
            if chunk.embedding.is_empty() {
                return Err(Error::internal(format!(
                    "chunk {} has no embedding",
                    chunk.id
                )));
            }
            if collection.dimensions == 0 {
                collection.dimensions = chunk.embedding.len();
            } else if collection.dimensions != chunk.embedding.len() {
                return Err(Error::internal(format!(
                    "embedding dimension mismatch: collection has {}, chunk {} has {}",
                    collection.dimensions,
                    chunk.id,
                    chunk.embedding.len()
                )));
            }
            collection.entries.insert(chunk.id, chunk.clone());
        }

        let snapshot = serde_json::to_string(&*collection)?;
        std::fs::write(self.collection_path(document_id), snapshot)?;
        Ok(())
    }

    /// Delete a document's collection. Returns the number of entries
    /// removed; removing an unknown document is not an error.
    pub fn remove_document(&self, document_id: &Uuid) -> Result<usize> {
        let removed = self
            .collections
            .remove(document_id)
            .map(|(_, collection)| collection.entries.len())
            .unwrap_or(0);

        let path = self.collection_path(document_id);
        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        Ok(removed)
    }

    /// Search collections for the nearest chunks to `query`, returning
    /// up to `per_collection_k` candidates from each searched collection.
    /// When `document_filter` is given, only those documents' collections
    /// are searched; unknown ids contribute nothing.
    pub fn search(
        &self,
        query: &[f32],
        per_collection_k: usize,
        document_filter: Option<&[Uuid]>,
    ) -> Vec<ScoredChunk> {
        let mut results = Vec::new();

        match document_filter {
            Some(ids) => {
                for id in ids {
                    if let Some(collection) = self.collections.get(id) {
                        search_collection(&collection, query, per_collection_k, &mut results);
                    }
                }
            }
            None => {
                for entry in self.collections.iter() {
                    search_collection(entry.value(), query, per_collection_k, &mut results);
                }
            }
        }

        results
    }

    /// Number of chunks stored for one document
    pub fn collection_len(&self, document_id: &Uuid) -> usize {
        self.collections
            .get(document_id)
            .map(|c| c.entries.len())
            .unwrap_or(0)
    }

    /// Whether any collection exists
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

fn search_collection(
    collection: &Collection,
    query: &[f32],
    top_k: usize,
    out: &mut Vec<ScoredChunk>,
) {
    if collection.dimensions != query.len() {
        tracing::warn!(
            "Skipping collection with {} dimensions for a {}-dimension query",
            collection.dimensions,
            query.len()
        );
        return;
    }

    let mut scored: Vec<ScoredChunk> = collection
        .entries
        .values()
        .map(|chunk| ScoredChunk {
            score: cosine_similarity(&chunk.embedding, query),
            chunk: chunk.clone(),
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);
    out.extend(scored);
}

/// Cosine similarity of two vectors; 0.0 if either has zero magnitude
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChunkSource, ContentType, Locator};

    fn chunk(document_id: Uuid, index: u32, embedding: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new(
            document_id,
            format!("chunk {}", index),
            ChunkSource {
                filename: "test.csv".to_string(),
                content_type: ContentType::Csv,
                locator: Locator::Rows {
                    sheet: None,
                    start: index,
                    end: index,
                },
            },
            0,
            0,
            index,
        );
        chunk.embedding = embedding;
        chunk
    }

    #[test]
    fn upsert_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path().to_path_buf()).unwrap();
        let doc = Uuid::new_v4();

        let chunks = vec![
            chunk(doc, 0, vec![1.0, 0.0]),
            chunk(doc, 1, vec![0.0, 1.0]),
        ];
        store.upsert_chunks(&doc, &chunks).unwrap();
        store.upsert_chunks(&doc, &chunks).unwrap();

        assert_eq!(store.collection_len(&doc), 2);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path().to_path_buf()).unwrap();
        let doc = Uuid::new_v4();

        store
            .upsert_chunks(&doc, &[chunk(doc, 0, vec![1.0, 0.0])])
            .unwrap();
        let err = store.upsert_chunks(&doc, &[chunk(doc, 1, vec![1.0, 0.0, 0.0])]);
        assert!(err.is_err());
    }

    #[test]
    fn remove_document_clears_collection_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path().to_path_buf()).unwrap();
        let doc = Uuid::new_v4();

        store
            .upsert_chunks(&doc, &[chunk(doc, 0, vec![1.0, 0.0])])
            .unwrap();
        assert_eq!(store.remove_document(&doc).unwrap(), 1);
        assert_eq!(store.collection_len(&doc), 0);
        assert!(!dir.path().join(format!("{}.json", doc)).exists());

        // Removing again is a no-op, not an error
        assert_eq!(store.remove_document(&doc).unwrap(), 0);
    }

    #[test]
    fn search_respects_document_filter() {
        let dir = tempfile::tempdir().unwrap();
        let store = VectorStore::open(dir.path().to_path_buf()).unwrap();
        let doc_a = Uuid::new_v4();
        let doc_b = Uuid::new_v4();

        store
            .upsert_chunks(&doc_a, &[chunk(doc_a, 0, vec![1.0, 0.0])])
            .unwrap();
        store
            .upsert_chunks(&doc_b, &[chunk(doc_b, 0, vec![1.0, 0.0])])
            .unwrap();

        let results = store.search(&[1.0, 0.0], 10, Some(&[doc_a]));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.document_id, doc_a);

        // Unknown document ids contribute nothing rather than erroring
        let results = store.search(&[1.0, 0.0], 10, Some(&[Uuid::new_v4()]));
        assert!(results.is_empty());
    }

    #[test]
    fn collections_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let doc = Uuid::new_v4();

        {
            let store = VectorStore::open(dir.path().to_path_buf()).unwrap();
            store
                .upsert_chunks(&doc, &[chunk(doc, 0, vec![0.6, 0.8])])
                .unwrap();
        }

        let store = VectorStore::open(dir.path().to_path_buf()).unwrap();
        assert_eq!(store.collection_len(&doc), 1);
        let results = store.search(&[0.6, 0.8], 1, None);
        assert_eq!(results.len(), 1);
        assert!(results[0].score > 0.99);
    }
}
