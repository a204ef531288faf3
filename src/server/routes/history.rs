//! Conversation history endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::Result;
use crate::history::{Conversation, ConversationSummary};
use crate::server::state::AppState;

/// Query parameters for listing conversations
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Maximum number of conversations to return
    pub limit: Option<usize>,
}

/// POST /api/history/conversations - Create a new conversation
pub async fn create_conversation(State(state): State<AppState>) -> Result<Json<Conversation>> {
    let conversation = state.history().create()?;
    Ok(Json(conversation))
}

/// GET /api/history/conversations - List recent conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ConversationSummary>>> {
    let summaries = state.history().list(params.limit.unwrap_or(50))?;
    Ok(Json(summaries))
}

/// GET /api/history/conversations/:id - Get a full conversation
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    match state.history().get(&id)? {
        Some(conversation) => Ok(Json(conversation).into_response()),
        None => Ok(not_found(&id)),
    }
}

/// DELETE /api/history/conversations/:id - Delete a conversation
pub async fn delete_conversation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    if state.history().delete(&id)? {
        Ok(Json(json!({ "success": true })).into_response())
    } else {
        Ok(not_found(&id))
    }
}

fn not_found(id: &Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "type": "not_found",
                "message": format!("Conversation not found: {}", id),
            }
        })),
    )
        .into_response()
}
