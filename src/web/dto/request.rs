//! Request DTOs for the web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed};

/// Request carrying an owner key (lock, unlock, retrieve).
#[derive(Debug, Deserialize)]
pub struct KeyRequest {
    /// 128 hex characters. Missing keys are rejected as malformed.
    #[serde(default)]
    pub key: String,
}

/// Create folder request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    /// Parent folder; the owner's root when omitted.
    pub parent_id: Option<i64>,
    /// Folder name.
    #[validate(
        length(min = 1, max = 255, message = "Folder name must be 1-255 characters"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars")
    )]
    pub name: String,
}

/// Rename folder request.
#[derive(Debug, Deserialize, Validate)]
pub struct RenameFolderRequest {
    /// New folder name.
    #[validate(
        length(min = 1, max = 255, message = "Folder name must be 1-255 characters"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars")
    )]
    pub name: String,
}

/// Start a chunked upload.
///
/// Every field is optional at the JSON level so a missing one surfaces as a
/// 400 with the field name rather than a generic body rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadRequest {
    /// Owner starting the upload; must match the token.
    pub owner_id: Option<i64>,
    /// Destination folder.
    pub folder_id: Option<i64>,
    /// Original filename.
    pub filename: Option<String>,
    /// Size of the whole file in bytes.
    pub total_size: Option<i64>,
    /// Number of chunks the client will send.
    pub total_chunks: Option<i64>,
}
