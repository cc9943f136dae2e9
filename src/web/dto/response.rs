//! Response DTOs for the web API.

use serde::Serialize;

use crate::db::Owner;
use crate::file::{FileMetadata, Folder, FolderView};
use crate::upload::{ChunkReceipt, UploadSession};

/// Convert a SQLite `YYYY-MM-DD HH:MM:SS` UTC timestamp to RFC3339.
pub fn to_rfc3339(datetime_str: &str) -> String {
    format!("{}Z", datetime_str.replace(' ', "T"))
}

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Owner information.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerResponse {
    /// Owner ID.
    pub id: i64,
    /// Generated username.
    pub username: String,
    /// Root folder ID.
    pub root_folder_id: i64,
    /// Whether a key has been generated.
    pub has_key: bool,
    /// Creation time (RFC3339).
    pub created_at: String,
}

impl OwnerResponse {
    /// Build from an owner and its root folder.
    pub fn new(owner: &Owner, root: &Folder) -> Self {
        Self {
            id: owner.id,
            username: owner.username.clone(),
            root_folder_id: root.id,
            has_key: owner.has_key(),
            created_at: to_rfc3339(&owner.created_at),
        }
    }
}

/// An access token with the owner it belongs to.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Access token (JWT).
    pub access_token: String,
    /// Access token expiry in seconds.
    pub expires_in: u64,
    /// Whether the token opens locked folders.
    pub has_key: bool,
    /// Owner information.
    pub owner: OwnerResponse,
}

/// A freshly generated key.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyResponse {
    /// The key, 128 hex characters. Shown once.
    pub key: String,
    /// A new token that opens locked folders.
    pub access_token: String,
}

/// Result of a lock or unlock.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityResponse {
    /// Whether the tree is now locked.
    pub locked: bool,
    /// Number of folders updated.
    pub folders_updated: usize,
    /// A new token that opens locked folders.
    pub access_token: String,
}

/// Folder information.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderResponse {
    /// Folder ID.
    pub id: i64,
    /// Folder name.
    pub name: String,
    /// Parent folder ID.
    pub parent_id: Option<i64>,
    /// Visibility flag.
    pub is_visible: bool,
    /// Creation time (RFC3339).
    pub created_at: String,
    /// Last update time (RFC3339).
    pub updated_at: String,
}

impl From<&Folder> for FolderResponse {
    fn from(folder: &Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name.clone(),
            parent_id: folder.parent_id,
            is_visible: folder.is_visible,
            created_at: to_rfc3339(&folder.created_at),
            updated_at: to_rfc3339(&folder.updated_at),
        }
    }
}

/// File information.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    /// File ID.
    pub id: i64,
    /// Display filename.
    pub name: String,
    /// Size in bytes.
    pub size: i64,
    /// Extension, or "".
    pub file_type: String,
    /// Containing folder.
    pub folder_id: i64,
    /// Creation time (RFC3339).
    pub created_at: String,
}

impl From<&FileMetadata> for FileResponse {
    fn from(file: &FileMetadata) -> Self {
        Self {
            id: file.id,
            name: file.name.clone(),
            size: file.size,
            file_type: file.file_type.clone(),
            folder_id: file.folder_id,
            created_at: to_rfc3339(&file.created_at),
        }
    }
}

/// Folder contents.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderViewResponse {
    /// The folder.
    pub folder: FolderResponse,
    /// Path from the root, root first.
    pub path: Vec<FolderResponse>,
    /// Child folders.
    pub subfolders: Vec<FolderResponse>,
    /// Files in the folder.
    pub files: Vec<FileResponse>,
}

impl From<&FolderView> for FolderViewResponse {
    fn from(view: &FolderView) -> Self {
        Self {
            folder: FolderResponse::from(&view.folder),
            path: view.path.iter().map(FolderResponse::from).collect(),
            subfolders: view.subfolders.iter().map(FolderResponse::from).collect(),
            files: view.files.iter().map(FileResponse::from).collect(),
        }
    }
}

/// Result of a folder deletion.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFolderResponse {
    /// Folders removed.
    pub folders_deleted: usize,
    /// Files removed.
    pub files_deleted: usize,
}

/// Files stored by a direct upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFilesResponse {
    /// Summary message.
    pub message: String,
    /// Stored files.
    pub files: Vec<FileResponse>,
}

/// A started chunked upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadResponse {
    /// Session ID to send chunks to.
    pub upload_id: String,
}

/// Progress of a chunked upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgressResponse {
    /// Distinct chunks received.
    pub received_chunks: u32,
    /// Chunks expected.
    pub total_chunks: u32,
}

impl From<ChunkReceipt> for UploadProgressResponse {
    fn from(receipt: ChunkReceipt) -> Self {
        Self {
            received_chunks: receipt.received,
            total_chunks: receipt.total,
        }
    }
}

impl From<&UploadSession> for UploadProgressResponse {
    fn from(session: &UploadSession) -> Self {
        Self {
            received_chunks: session.received_chunks(),
            total_chunks: session.total_chunks,
        }
    }
}

/// A chunked upload that produced a file.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCompleteResponse {
    /// New file ID.
    pub file_id: i64,
    /// Display filename.
    pub file_name: String,
    /// Size in bytes.
    pub file_size: i64,
}

impl From<&FileMetadata> for UploadCompleteResponse {
    fn from(file: &FileMetadata) -> Self {
        Self {
            file_id: file.id,
            file_name: file.name.clone(),
            file_size: file.size,
        }
    }
}

/// Response to a chunk: progress, or the finished file.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ChunkResponse {
    /// More chunks expected.
    Progress(UploadProgressResponse),
    /// The upload is complete.
    Complete(UploadCompleteResponse),
}
