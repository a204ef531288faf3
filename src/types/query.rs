//! Query request types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query request for the RAG read path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub query: String,

    /// Number of evidence chunks to retrieve; the configured default
    /// applies when omitted
    #[serde(default)]
    pub top_k: Option<usize>,

    /// Restrict the search to these documents (optional)
    #[serde(default)]
    pub document_ids: Option<Vec<Uuid>>,

    /// Append this turn to an existing conversation (optional)
    #[serde(default)]
    pub conversation_id: Option<Uuid>,

    /// Record this turn in a new conversation when no id is given
    #[serde(default)]
    pub record_history: bool,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: None,
            document_ids: None,
            conversation_id: None,
            record_history: false,
        }
    }

    /// Set the number of results to retrieve
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Restrict the search to specific documents
    pub fn with_documents(mut self, document_ids: Vec<Uuid>) -> Self {
        self.document_ids = Some(document_ids);
        self
    }
}
