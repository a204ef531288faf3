//! Application state wiring the pipeline components together

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::AnswerComposer;
use crate::history::HistoryStore;
use crate::index::Indexer;
use crate::ingestion::{Chunker, Extractor};
use crate::providers::{
    EmbeddingProvider, GenerationProvider, OllamaClient, OllamaEmbedder, OllamaGenerator,
};
use crate::retrieval::{RetrievedEvidence, Retriever};
use crate::store::{DocumentStore, VectorStore};
use crate::types::{hash_bytes, ContentType, Document, QueryRequest, StructuredAnswer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Extraction of raw files into records
    extractor: Extractor,
    /// Record chunking
    chunker: Chunker,
    /// Embedding + upsert write path
    indexer: Indexer,
    /// Query read path
    retriever: Retriever,
    /// Prompting + generation + citation linking
    composer: AnswerComposer,
    /// Raw file storage
    document_store: DocumentStore,
    /// Conversation history
    history: HistoryStore,
    /// Vector collections, shared by indexer and retriever
    vector_store: Arc<VectorStore>,
    /// Document registry (persisted to disk)
    documents: DashMap<Uuid, Document>,
    /// Path of the registry file
    documents_path: PathBuf,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create application state with the default Ollama-backed providers
    pub fn new(config: RagConfig) -> Result<Self> {
        let client = Arc::new(OllamaClient::new(&config.llm)?);
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(OllamaEmbedder::new(
            Arc::clone(&client),
            config.embeddings.dimensions,
        ));
        let generator: Arc<dyn GenerationProvider> = Arc::new(OllamaGenerator::new(
            client,
            config.llm.generate_model.clone(),
        ));
        Self::with_providers(config, embedder, generator)
    }

    /// Create application state with explicit providers
    pub fn with_providers(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self> {
        fs::create_dir_all(&config.storage.data_dir)?;

        let vector_store = Arc::new(VectorStore::open(config.storage.vectors_dir())?);
        let document_store = DocumentStore::new(config.storage.documents_dir())?;
        let history = HistoryStore::new(config.storage.history_dir())?;

        let documents_path = config.storage.registry_path();
        let documents = Self::load_documents(&documents_path);
        tracing::info!("Loaded {} documents from registry", documents.len());

        let extractor = Extractor::new(config.extraction.clone());
        let chunker = Chunker::new(config.chunking.max_chars, config.chunking.overlap_chars);
        let indexer = Indexer::new(
            Arc::clone(&embedder),
            Arc::clone(&vector_store),
            config.embeddings.batch_size,
        );
        let retriever = Retriever::new(embedder, Arc::clone(&vector_store));
        let composer = AnswerComposer::new(generator, config.llm.max_context_chars);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                extractor,
                chunker,
                indexer,
                retriever,
                composer,
                document_store,
                history,
                vector_store,
                documents,
                documents_path,
                ready: RwLock::new(true),
            }),
        })
    }

    /// Ingest one uploaded file: store bytes, extract, chunk, index,
    /// register. Returns the registered document and its chunk count.
    ///
    /// On an indexing failure the document is still registered with the
    /// number of chunks actually committed, so the caller can retry or
    /// flag it as not fully searchable; the error is returned either way.
    pub async fn ingest_file(
        &self,
        filename: &str,
        content_type: ContentType,
        data: &[u8],
    ) -> Result<(Document, usize)> {
        let mut doc = Document::new(
            filename.to_string(),
            content_type,
            hash_bytes(data),
            data.len() as u64,
        );

        self.inner.document_store.save(&doc.id, data).await?;

        let records = match self
            .inner
            .extractor
            .extract(filename, data, &doc.content_type)
        {
            Ok(records) => records,
            Err(e) => {
                // Nothing was indexed; do not keep unusable bytes around
                let _ = self.inner.document_store.delete(&doc.id).await;
                return Err(e);
            }
        };

        let chunks = self.inner.chunker.chunk(&doc, &records);
        let chunk_count = chunks.len();

        match self.inner.indexer.index(doc.id, chunks).await {
            Ok(indexed) => {
                doc.total_chunks = indexed as u32;
                tracing::info!(
                    "Ingested '{}': {} records, {} chunks",
                    filename,
                    records.len(),
                    indexed
                );
                self.add_document(doc.clone());
                Ok((doc, indexed))
            }
            Err(e) => {
                if let Error::Indexing { indexed, .. } = &e {
                    doc.total_chunks = *indexed as u32;
                }
                tracing::error!(
                    "Indexing '{}' failed after {}/{} chunks: {}",
                    filename,
                    doc.total_chunks,
                    chunk_count,
                    e
                );
                self.add_document(doc);
                Err(e)
            }
        }
    }

    /// Delete a document: vectors first, then stored bytes, then the
    /// registry entry. A failed vector removal aborts the deletion so a
    /// document is never reported deleted while its chunks remain
    /// searchable.
    pub async fn delete_document(&self, id: &Uuid) -> Result<Document> {
        let doc = self
            .get_document(id)
            .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;

        let removed = self.inner.indexer.remove(id).await?;
        self.inner.document_store.delete(id).await?;
        self.remove_document(id);

        tracing::info!(
            "Deleted document '{}' ({} chunks removed)",
            doc.filename,
            removed
        );
        Ok(doc)
    }

    /// Answer a query: retrieve evidence, compose an answer. Retrieval
    /// and generation failures degrade to defined fallback answers so
    /// chat always returns the StructuredAnswer shape.
    pub async fn answer_query(
        &self,
        request: &QueryRequest,
    ) -> Result<(StructuredAnswer, Vec<RetrievedEvidence>)> {
        let top_k = request.top_k.unwrap_or(self.inner.config.retrieval.top_k);
        let evidence = match self
            .inner
            .retriever
            .retrieve(&request.query, top_k, request.document_ids.as_deref())
            .await
        {
            Ok(evidence) => evidence,
            Err(Error::Retrieval(e)) => {
                tracing::error!("Retrieval failed, returning degraded answer: {}", e);
                return Ok((StructuredAnswer::unavailable(), Vec::new()));
            }
            Err(e) => return Err(e),
        };

        let answer = match self.inner.composer.compose(&request.query, &evidence).await {
            Ok(answer) => answer,
            Err(Error::Generation(e)) => {
                tracing::warn!("Generation failed, returning degraded answer: {}", e);
                StructuredAnswer::degraded()
            }
            Err(e) => return Err(e),
        };

        Ok((answer, evidence))
    }

    /// Load the document registry from disk
    fn load_documents(path: &PathBuf) -> DashMap<Uuid, Document> {
        let documents = DashMap::new();

        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<Vec<Document>>(&content) {
                    Ok(docs) => {
                        for doc in docs {
                            documents.insert(doc.id, doc);
                        }
                    }
                    Err(e) => tracing::warn!("Failed to parse documents.json: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read documents.json: {}", e),
            }
        }

        documents
    }

    /// Save the document registry to disk
    fn save_documents(&self) {
        let docs: Vec<Document> = self
            .inner
            .documents
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        match serde_json::to_string_pretty(&docs) {
            Ok(content) => {
                if let Err(e) = fs::write(&self.inner.documents_path, content) {
                    tracing::error!("Failed to save documents.json: {}", e);
                }
            }
            Err(e) => tracing::error!("Failed to serialize documents: {}", e),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the raw document store
    pub fn document_store(&self) -> &DocumentStore {
        &self.inner.document_store
    }

    /// Get the history store
    pub fn history(&self) -> &HistoryStore {
        &self.inner.history
    }

    /// Get the vector store
    pub fn vector_store(&self) -> &Arc<VectorStore> {
        &self.inner.vector_store
    }

    /// Add a document to the registry (persisted to disk)
    pub fn add_document(&self, doc: Document) {
        self.inner.documents.insert(doc.id, doc);
        self.save_documents();
    }

    /// Get a document by ID
    pub fn get_document(&self, id: &Uuid) -> Option<Document> {
        self.inner.documents.get(id).map(|d| d.clone())
    }

    /// Remove a document from the registry (persisted to disk)
    fn remove_document(&self, id: &Uuid) {
        if self.inner.documents.remove(id).is_some() {
            self.save_documents();
        }
    }

    /// List all documents, newest first
    pub fn list_documents(&self) -> Vec<Document> {
        let mut docs: Vec<Document> = self
            .inner
            .documents
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        docs.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        docs
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
