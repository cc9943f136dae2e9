//! Folder handlers for Web API.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, HeaderName, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::file::{ArchiveExporter, FolderDeletion};
use crate::web::dto::{
    ApiResponse, CreateFolderRequest, DeleteFolderResponse, FileResponse, FolderResponse,
    FolderViewResponse, RenameFolderRequest, UploadedFilesResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::{content_disposition_header, AppState};
use crate::web::middleware::{AuthOwner, ARCHIVE_SKIPPED_HEADER};

/// A file part read from a multipart body.
pub(crate) struct UploadedPart {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Read every non-empty `file` part of a multipart body.
///
/// Other text fields are returned as `(name, value)` pairs.
pub(crate) async fn read_file_parts(
    multipart: &mut Multipart,
    max_size: u64,
) -> Result<(Vec<UploadedPart>, Vec<(String, String)>), ApiError> {
    let mut parts = Vec::new();
    let mut fields = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            let filename = field.file_name().unwrap_or("").to_string();
            let content = field.bytes().await.map_err(|e| {
                tracing::error!("Failed to read file content: {}", e);
                ApiError::bad_request("Failed to read file")
            })?;

            // Browsers send an empty part when nothing was selected
            if filename.is_empty() {
                continue;
            }
            if content.len() as u64 > max_size {
                let max_mb = max_size / 1024 / 1024;
                return Err(ApiError::bad_request(format!(
                    "File too large (max {}MB)",
                    max_mb
                )));
            }
            parts.push(UploadedPart {
                filename,
                content: content.to_vec(),
            });
        } else {
            let value = field.text().await.map_err(|e| {
                tracing::error!("Failed to read form field: {}", e);
                ApiError::bad_request("Invalid form field")
            })?;
            fields.push((name, value));
        }
    }

    Ok((parts, fields))
}

/// POST /api/folders - Create a folder.
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderResponse>>), ApiError> {
    let tree = state.tree();
    let parent_id = match req.parent_id {
        Some(id) => id,
        None => tree.ensure_root(auth.owner_id()).await?.id,
    };

    let folder = tree
        .create_folder(auth.owner_id(), parent_id, &req.name)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(FolderResponse::from(&folder))),
    ))
}

/// GET /api/folders/:id - Folder contents.
pub async fn view_folder(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Path(folder_id): Path<i64>,
) -> Result<Json<ApiResponse<FolderViewResponse>>, ApiError> {
    let view = state
        .tree()
        .view_folder(auth.owner_id(), folder_id, auth.has_key())
        .await?;

    Ok(Json(ApiResponse::new(FolderViewResponse::from(&view))))
}

/// PUT /api/folders/:id - Rename a folder.
pub async fn rename_folder(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Path(folder_id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RenameFolderRequest>,
) -> Result<Json<ApiResponse<FolderResponse>>, ApiError> {
    let folder = state
        .tree()
        .rename_folder(auth.owner_id(), folder_id, &req.name)
        .await?;

    Ok(Json(ApiResponse::new(FolderResponse::from(&folder))))
}

/// DELETE /api/folders/:id - Delete a folder and everything under it.
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Path(folder_id): Path<i64>,
) -> Result<Json<ApiResponse<DeleteFolderResponse>>, ApiError> {
    match state.tree().delete_folder(auth.owner_id(), folder_id).await? {
        FolderDeletion::RootProtected => Err(ApiError::conflict("Cannot delete root folder")),
        FolderDeletion::Deleted { folders, files } => {
            Ok(Json(ApiResponse::new(DeleteFolderResponse {
                folders_deleted: folders,
                files_deleted: files,
            })))
        }
    }
}

/// GET /api/folders/:id/archive - Download a folder as a zip archive.
pub async fn download_archive(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Path(folder_id): Path<i64>,
) -> Result<Response, ApiError> {
    let archive = ArchiveExporter::new(&state.db, &state.storage)
        .export(auth.owner_id(), folder_id, auth.has_key())
        .await?;

    let body = Body::from_stream(ReaderStream::new(archive.file));

    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&archive.filename),
        )
        .header(header::CONTENT_LENGTH, archive.size)
        .header(
            HeaderName::from_static(ARCHIVE_SKIPPED_HEADER),
            archive.skipped.len(),
        )
        .body(body)
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// POST /api/folders/:id/files - Upload one or more files.
///
/// Request body: multipart/form-data with one or more "file" fields.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    auth: AuthOwner,
    Path(folder_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadedFilesResponse>>, ApiError> {
    let (parts, _) = read_file_parts(&mut multipart, state.max_upload_size).await?;
    if parts.is_empty() {
        return Err(ApiError::bad_request("No file provided"));
    }

    let tree = state.tree();
    let mut files = Vec::with_capacity(parts.len());
    for part in parts {
        let file = tree
            .upload_file(auth.owner_id(), folder_id, &part.filename, &part.content)
            .await?;
        files.push(FileResponse::from(&file));
    }

    Ok(Json(ApiResponse::new(UploadedFilesResponse {
        message: format!("{} files uploaded successfully.", files.len()),
        files,
    })))
}
