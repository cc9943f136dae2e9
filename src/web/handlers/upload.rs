//! Chunked upload handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::upload::{ChunkOutcome, InitUpload};
use crate::web::dto::{
    ApiResponse, ChunkResponse, InitUploadRequest, InitUploadResponse, UploadCompleteResponse,
    UploadProgressResponse,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthOwner;
use crate::FilelockError;

fn parse_upload_id(raw: &str) -> Result<Uuid, ApiError> {
    // Anything that is not a UUID cannot name a live session
    Uuid::parse_str(raw)
        .map_err(|_| ApiError::from(FilelockError::UnknownSession(raw.to_string())))
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::bad_request(format!("Missing required field: {}", field)))
}

/// POST /api/upload/init - Start a chunked upload.
pub async fn init_upload(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Json(req): Json<InitUploadRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InitUploadResponse>>), ApiError> {
    let owner_id = required(req.owner_id, "ownerId")?;
    let folder_id = required(req.folder_id, "folderId")?;
    let filename = required(req.filename, "filename")?;
    let total_size = required(req.total_size, "totalSize")?;
    let total_chunks = required(req.total_chunks, "totalChunks")?;

    if owner_id != auth.owner_id() {
        return Err(ApiError::forbidden("Cannot upload on behalf of another owner"));
    }

    let upload_id = state
        .uploads
        .init(InitUpload {
            owner_id,
            folder_id,
            filename,
            total_size,
            total_chunks,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(InitUploadResponse {
            upload_id: upload_id.to_string(),
        })),
    ))
}

/// POST /api/upload/chunk/:upload_id - Send one chunk.
///
/// Request body: multipart/form-data with "chunkIndex" and "chunk" fields.
/// The chunk that completes the upload returns the new file.
pub async fn upload_chunk(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Path(upload_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ChunkResponse>>, ApiError> {
    let upload_id = parse_upload_id(&upload_id)?;

    let mut chunk_index: Option<i64> = None;
    let mut chunk: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "chunkIndex" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request("Invalid chunkIndex"))?;
                chunk_index = Some(
                    text.trim()
                        .parse()
                        .map_err(|_| ApiError::bad_request("chunkIndex must be an integer"))?,
                );
            }
            "chunk" => {
                chunk = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| {
                            tracing::error!("Failed to read chunk content: {}", e);
                            ApiError::bad_request("Failed to read chunk")
                        })?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    let chunk_index = required(chunk_index, "chunkIndex")?;
    let chunk = required(chunk, "chunk")?;

    let outcome = state
        .uploads
        .receive_chunk(upload_id, auth.owner_id(), chunk_index, &chunk)
        .await?;

    let response = match outcome {
        ChunkOutcome::Progress(receipt) => {
            ChunkResponse::Progress(UploadProgressResponse::from(receipt))
        }
        ChunkOutcome::Completed(file) => {
            ChunkResponse::Complete(UploadCompleteResponse::from(&file))
        }
    };

    Ok(Json(ApiResponse::new(response)))
}

/// GET /api/upload/:upload_id - Upload progress.
pub async fn upload_progress(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Path(upload_id): Path<String>,
) -> Result<Json<ApiResponse<UploadProgressResponse>>, ApiError> {
    let upload_id = parse_upload_id(&upload_id)?;
    let session = state.uploads.progress(upload_id, auth.owner_id()).await?;

    Ok(Json(ApiResponse::new(UploadProgressResponse::from(&session))))
}

/// POST /api/upload/:upload_id/complete - Retry assembly of a complete upload.
pub async fn complete_upload(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Path(upload_id): Path<String>,
) -> Result<Json<ApiResponse<UploadCompleteResponse>>, ApiError> {
    let upload_id = parse_upload_id(&upload_id)?;
    let file = state
        .uploads
        .retry_assembly(upload_id, auth.owner_id())
        .await?;

    Ok(Json(ApiResponse::new(UploadCompleteResponse::from(&file))))
}

/// DELETE /api/upload/:upload_id - Abandon an upload.
pub async fn abandon_upload(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Path(upload_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let upload_id = parse_upload_id(&upload_id)?;
    state.uploads.abandon(upload_id, auth.owner_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
