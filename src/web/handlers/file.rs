//! File handlers for Web API.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::header,
    response::Response,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::db::OwnerRepository;
use crate::web::dto::{ApiResponse, FileResponse, UploadedFilesResponse};
use crate::web::error::ApiError;
use crate::web::handlers::folder::read_file_parts;
use crate::web::handlers::{content_disposition_header, AppState};
use crate::web::middleware::AuthOwner;

/// GET /api/files/:id - Get file metadata.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.tree().get_file(auth.owner_id(), file_id).await?;
    Ok(Json(ApiResponse::new(FileResponse::from(&file))))
}

/// GET /api/files/:id/download - Download a file.
///
/// Files in locked folders require a token issued with the key.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Path(file_id): Path<i64>,
) -> Result<Response, ApiError> {
    let (file, content) = state
        .tree()
        .open_file(auth.owner_id(), file_id, auth.has_key())
        .await?;

    let content_type = mime_guess::from_path(&file.name)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&file.name),
        )
        .header(header::CONTENT_LENGTH, file.size)
        .body(Body::from_stream(ReaderStream::new(content)))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// DELETE /api/files/:id - Delete a file.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.tree().delete_file(auth.owner_id(), file_id).await?;
    Ok(Json(ApiResponse::new(FileResponse::from(&file))))
}

/// POST /api/mobile-upload/:owner_id - Upload into an owner's root folder.
///
/// Used by the QR code flow, so no token is required. An `auto_backup`
/// form field set to "true" only changes the summary message.
pub async fn mobile_upload(
    State(state): State<Arc<AppState>>,
    Path(owner_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadedFilesResponse>>, ApiError> {
    let owner = OwnerRepository::new(state.db.pool())
        .get_by_id(owner_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Owner not found"))?;

    let (parts, fields) = read_file_parts(&mut multipart, state.max_upload_size).await?;
    if parts.is_empty() {
        return Err(ApiError::bad_request("No file provided"));
    }
    let auto_backup = fields
        .iter()
        .any(|(name, value)| name == "auto_backup" && value == "true");

    let tree = state.tree();
    let root = tree.ensure_root(owner.id).await?;

    let mut files = Vec::with_capacity(parts.len());
    for part in parts {
        let file = tree
            .upload_file(owner.id, root.id, &part.filename, &part.content)
            .await?;
        files.push(FileResponse::from(&file));
    }

    tracing::info!(owner_id, count = files.len(), auto_backup, "Mobile upload stored");

    let message = if auto_backup {
        format!("Auto-backup completed. {} files uploaded.", files.len())
    } else {
        format!("{} files uploaded successfully.", files.len())
    };

    Ok(Json(ApiResponse::new(UploadedFilesResponse { message, files })))
}
