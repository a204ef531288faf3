//! File endpoints: upload, list, download, delete

use std::time::{Duration, Instant};

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use futures::stream::{self, StreamExt};
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{
    ContentType, DocumentListResponse, DocumentSummary, FileOutcome, UploadResponse,
};

/// POST /api/files/upload - Upload and index files
///
/// Files in one batch are processed concurrently and independently: one
/// file's failure never aborts the others, and the response carries one
/// outcome per file.
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let start = Instant::now();
    let mut pending = Vec::new();
    let mut read_failures = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::internal(format!("failed to read multipart field: {}", e)))?
    {
        // Non-file form fields are not uploads
        let filename = match field.file_name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        let declared_mime = field.content_type().map(|m| m.to_string());

        match field.bytes().await {
            Ok(data) => pending.push((filename, declared_mime, data.to_vec())),
            Err(e) => read_failures.push(FileOutcome::Failed {
                filename,
                error: format!("failed to read file: {}", e),
            }),
        }
    }

    let parallel = state
        .config()
        .processing
        .parallel_files
        .unwrap_or_else(|| num_cpus::get().min(4))
        .max(1);
    let file_timeout = Duration::from_secs(state.config().processing.file_timeout_secs);

    tracing::info!(
        "Processing upload batch of {} files ({} in parallel)",
        pending.len(),
        parallel
    );

    let mut outcomes: Vec<FileOutcome> = stream::iter(pending)
        .map(|(filename, declared_mime, data)| {
            let state = state.clone();
            async move { process_file(state, filename, declared_mime, data, file_timeout).await }
        })
        .buffered(parallel)
        .collect()
        .await;
    outcomes.extend(read_failures);

    let total_chunks_indexed = outcomes
        .iter()
        .map(|o| match o {
            FileOutcome::Indexed { chunks_indexed, .. } => *chunks_indexed,
            FileOutcome::Failed { .. } => 0,
        })
        .sum();

    Ok(Json(UploadResponse {
        files: outcomes,
        total_chunks_indexed,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Run one file through extract -> chunk -> index, bounded by the
/// per-file timeout.
async fn process_file(
    state: AppState,
    filename: String,
    declared_mime: Option<String>,
    data: Vec<u8>,
    file_timeout: Duration,
) -> FileOutcome {
    let start = Instant::now();

    let content_type = match ContentType::resolve(&filename, declared_mime.as_deref()) {
        Ok(ct) => ct,
        Err(e) => {
            return FileOutcome::Failed {
                filename,
                error: e.to_string(),
            }
        }
    };

    match timeout(
        file_timeout,
        state.ingest_file(&filename, content_type, &data),
    )
    .await
    {
        Ok(Ok((doc, chunks_indexed))) => {
            tracing::info!(
                "Ingested '{}' in {:.1}s",
                filename,
                start.elapsed().as_secs_f64()
            );
            FileOutcome::Indexed {
                document: DocumentSummary::from(&doc),
                chunks_indexed: chunks_indexed as u32,
            }
        }
        Ok(Err(e)) => {
            tracing::error!("Failed to process '{}': {}", filename, e);
            FileOutcome::Failed {
                filename,
                error: e.to_string(),
            }
        }
        Err(_) => {
            tracing::error!(
                "Timeout processing '{}' after {}s (size: {} bytes)",
                filename,
                file_timeout.as_secs(),
                data.len()
            );
            FileOutcome::Failed {
                filename,
                error: format!("processing timeout after {}s", file_timeout.as_secs()),
            }
        }
    }
}

/// GET /api/files - List registered documents
pub async fn list_documents(State(state): State<AppState>) -> Json<DocumentListResponse> {
    let documents: Vec<DocumentSummary> = state
        .list_documents()
        .iter()
        .map(DocumentSummary::from)
        .collect();
    let total_count = documents.len();

    Json(DocumentListResponse {
        documents,
        total_count,
    })
}

/// GET /api/files/:id/download - Download the stored raw bytes
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let doc = state
        .get_document(&id)
        .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?;
    let data = state.document_store().load(&id).await?;

    let mime = mime_guess::from_path(&doc.filename).first_or_octet_stream();
    let headers = [
        (header::CONTENT_TYPE, mime.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", doc.filename),
        ),
    ];

    Ok((headers, data))
}

/// DELETE /api/files/:id - Delete a document
///
/// Vector removal runs before storage deletion, so a failed removal
/// never leaves orphaned vectors behind a "deleted" document.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let doc = state.delete_document(&id).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("File '{}' deleted successfully", doc.filename),
    })))
}
