//! Query endpoint: retrieval-augmented answers with citations

use std::time::Instant;

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /api/query - Answer a question from the indexed documents
///
/// Always answers with the StructuredAnswer shape: a failed generation
/// call degrades to a fallback answer with confidence 0 rather than
/// surfacing an error to the end user.
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();

    tracing::info!("Query: \"{}\"", request.query);

    let (answer, evidence) = state.answer_query(&request).await?;

    // Record the turn when the client is tracking a conversation
    let conversation_id = if request.conversation_id.is_some() || request.record_history {
        let id = match request.conversation_id {
            Some(id) => id,
            None => state.history().create()?.id,
        };
        state.history().add_turn(&id, &request.query, &answer)?;
        Some(id)
    } else {
        None
    };

    let processing_time_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "Query completed in {}ms: {} evidence chunks, {} citations, confidence {:.2}",
        processing_time_ms,
        evidence.len(),
        answer.citations.len(),
        answer.confidence
    );

    Ok(Json(QueryResponse {
        query: request.query,
        answer,
        evidence,
        processing_time_ms,
        conversation_id,
    }))
}
