//! API routes

pub mod files;
pub mod history;
pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Files - with larger body limit for multipart uploads
        .route(
            "/files/upload",
            post(files::upload_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/files", get(files::list_documents))
        .route("/files/:id/download", get(files::download_document))
        .route("/files/:id", delete(files::delete_document))
        // Query
        .route("/query", post(query::query))
        // Conversation history
        .route(
            "/history/conversations",
            post(history::create_conversation).get(history::list_conversations),
        )
        .route(
            "/history/conversations/:id",
            get(history::get_conversation).delete(history::delete_conversation),
        )
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "datarag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document Q&A with retrieval-augmented answers and citations",
        "endpoints": {
            "POST /api/files/upload": "Upload and index documents",
            "GET /api/files": "List documents",
            "GET /api/files/:id/download": "Download a stored file",
            "DELETE /api/files/:id": "Delete a document and its vectors",
            "POST /api/query": "Ask a question, get an answer with citations",
            "POST /api/history/conversations": "Create a conversation",
            "GET /api/history/conversations": "List conversations",
            "GET /api/history/conversations/:id": "Get a conversation",
            "DELETE /api/history/conversations/:id": "Delete a conversation"
        }
    }))
}
