//! File management module for filelock.
//!
//! This module provides the per-owner folder tree:
//! - Hierarchical folders with a visibility flag
//! - File metadata and UUID-named physical storage
//! - Recursive deletion and zip export of subtrees

mod archive;
mod folder;
mod metadata;
mod storage;
mod tree;

pub use archive::{ArchiveExporter, FolderArchive};
pub use folder::{collect_subtree_ids, Folder, FolderRepository, NewFolder};
pub use metadata::{FileMetadata, FileRepository, NewFile};
pub use storage::FileStorage;
pub use tree::{ensure_readable, FolderDeletion, FolderTree, FolderView};

use crate::{FilelockError, Result};

/// Maximum length for file and folder names (in characters).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Name given to every owner's root folder.
pub const ROOT_FOLDER_NAME: &str = "Root";

/// Default maximum file size (100MB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Reduce a client-supplied filename to a safe display name.
///
/// Directory components, control characters and leading dots are removed.
pub fn sanitize_filename(raw: &str) -> Result<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim().trim_start_matches('.').trim();

    if cleaned.is_empty() {
        return Err(FilelockError::InvalidArgument(
            "filename is empty".to_string(),
        ));
    }
    if cleaned.chars().count() > MAX_FILENAME_LENGTH {
        return Err(FilelockError::InvalidArgument(format!(
            "filename must be at most {MAX_FILENAME_LENGTH} characters"
        )));
    }

    Ok(cleaned.to_string())
}

/// Validate a folder name.
pub fn validate_folder_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(FilelockError::InvalidArgument(
            "folder name is empty".to_string(),
        ));
    }
    if name.contains(['/', '\\']) || name.chars().any(char::is_control) {
        return Err(FilelockError::InvalidArgument(
            "folder name contains invalid characters".to_string(),
        ));
    }
    if name.chars().count() > MAX_FILENAME_LENGTH {
        return Err(FilelockError::InvalidArgument(format!(
            "folder name must be at most {MAX_FILENAME_LENGTH} characters"
        )));
    }
    Ok(name.to_string())
}

/// File type derived from a name: the text after the last dot, or "".
pub fn file_type_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_lowercase(),
        _ => String::new(),
    }
}
