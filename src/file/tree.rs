//! Folder tree service for filelock.
//!
//! High-level operations on an owner's tree:
//! - Root creation and folder creation under the new-folder policy
//! - Browsing with the locked-folder gate
//! - Direct uploads, file deletion and recursive folder deletion

use tracing::{info, warn};

use crate::config::NewFolderVisibility;
use crate::db::Database;
use crate::{FilelockError, Result};

use super::folder::{collect_subtree_ids, Folder, FolderRepository, NewFolder};
use super::metadata::{delete_in_folder, FileMetadata, FileRepository, NewFile};
use super::storage::FileStorage;
use super::{sanitize_filename, validate_folder_name, DEFAULT_MAX_FILE_SIZE};

/// Outcome of a folder deletion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderDeletion {
    /// The folder is the owner's root and was left untouched.
    RootProtected,
    /// The folder and everything under it was removed.
    Deleted {
        /// Folders removed, including the target.
        folders: usize,
        /// File records removed.
        files: usize,
    },
}

/// A folder with its direct contents.
#[derive(Debug, Clone)]
pub struct FolderView {
    /// The folder itself.
    pub folder: Folder,
    /// Folders from the root down to (and including) this folder.
    pub path: Vec<Folder>,
    /// Child folders the caller may see.
    pub subfolders: Vec<Folder>,
    /// Files directly in the folder.
    pub files: Vec<FileMetadata>,
}

/// Fail with `AccessDenied` when the folder is locked and the caller has not
/// presented the owner key.
pub fn ensure_readable(folder: &Folder, has_key: bool) -> Result<()> {
    if !folder.is_visible && !has_key {
        return Err(FilelockError::AccessDenied("folder is locked".to_string()));
    }
    Ok(())
}

/// Folder tree service.
pub struct FolderTree<'a> {
    db: &'a Database,
    storage: &'a FileStorage,
    new_folder_visibility: NewFolderVisibility,
    max_file_size: u64,
}

impl<'a> FolderTree<'a> {
    /// Create a new FolderTree.
    pub fn new(db: &'a Database, storage: &'a FileStorage) -> Self {
        Self {
            db,
            storage,
            new_folder_visibility: NewFolderVisibility::default(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Set the visibility policy for newly created folders.
    pub fn with_new_folder_visibility(mut self, policy: NewFolderVisibility) -> Self {
        self.new_folder_visibility = policy;
        self
    }

    /// Set the maximum size of a directly uploaded file.
    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    /// Get the owner's root folder, creating it on first use.
    pub async fn ensure_root(&self, owner_id: i64) -> Result<Folder> {
        let repo = FolderRepository::new(self.db.pool());
        if let Some(root) = repo.get_root(owner_id).await? {
            return Ok(root);
        }

        match repo.create(&NewFolder::root(owner_id)).await {
            Ok(root) => {
                info!(owner_id, folder_id = root.id, "Created root folder");
                Ok(root)
            }
            // Lost a race with a concurrent request; the unique index kept one root.
            Err(e) => repo.get_root(owner_id).await?.ok_or(e),
        }
    }

    /// Create a folder under `parent_id`.
    pub async fn create_folder(&self, owner_id: i64, parent_id: i64, name: &str) -> Result<Folder> {
        let name = validate_folder_name(name)?;
        let repo = FolderRepository::new(self.db.pool());
        let parent = repo.get_owned(parent_id, owner_id).await?;

        let is_visible = match self.new_folder_visibility {
            NewFolderVisibility::DefaultVisible => true,
            NewFolderVisibility::InheritParent => parent.is_visible,
        };

        let folder = repo
            .create(&NewFolder::new(owner_id, parent.id, name).with_visibility(is_visible))
            .await?;
        info!(owner_id, folder_id = folder.id, parent_id, "Created folder");
        Ok(folder)
    }

    /// Rename a folder.
    pub async fn rename_folder(&self, owner_id: i64, folder_id: i64, name: &str) -> Result<Folder> {
        let name = validate_folder_name(name)?;
        let repo = FolderRepository::new(self.db.pool());
        repo.get_owned(folder_id, owner_id).await?;

        repo.rename(folder_id, &name)
            .await?
            .ok_or_else(|| FilelockError::NotFound("folder".to_string()))
    }

    /// Show a folder with its children.
    ///
    /// Without the key, locked folders cannot be opened and locked
    /// subfolders are left out of the listing.
    pub async fn view_folder(&self, owner_id: i64, folder_id: i64, has_key: bool) -> Result<FolderView> {
        let repo = FolderRepository::new(self.db.pool());
        let folder = repo.get_owned(folder_id, owner_id).await?;
        ensure_readable(&folder, has_key)?;

        let subfolders = repo
            .list_by_parent(folder.id)
            .await?
            .into_iter()
            .filter(|f| has_key || f.is_visible)
            .collect();
        let files = FileRepository::new(self.db.pool())
            .list_by_folder(folder.id)
            .await?;
        let path = repo.get_path(folder.id).await?;

        Ok(FolderView {
            folder,
            path,
            subfolders,
            files,
        })
    }

    /// Store a directly uploaded file in a folder.
    pub async fn upload_file(
        &self,
        owner_id: i64,
        folder_id: i64,
        filename: &str,
        content: &[u8],
    ) -> Result<FileMetadata> {
        let name = sanitize_filename(filename)?;
        if content.len() as u64 > self.max_file_size {
            let max_mb = self.max_file_size / 1024 / 1024;
            return Err(FilelockError::InvalidArgument(format!(
                "file is too large (max {max_mb}MB)"
            )));
        }

        let folder = FolderRepository::new(self.db.pool())
            .get_owned(folder_id, owner_id)
            .await?;

        let stored_name = self.storage.save(content, &name).await?;
        let new_file = NewFile::new(folder.id, owner_id, name, &stored_name, content.len() as i64);

        match FileRepository::new(self.db.pool()).create(&new_file).await {
            Ok(file) => {
                info!(owner_id, file_id = file.id, size = file.size, "Stored uploaded file");
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&stored_name).await {
                    warn!(stored_name = %stored_name, error = %cleanup, "Failed to remove orphaned artifact");
                }
                Err(e)
            }
        }
    }

    /// Get a file owned by `owner_id`.
    pub async fn get_file(&self, owner_id: i64, file_id: i64) -> Result<FileMetadata> {
        let file = FileRepository::new(self.db.pool())
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| FilelockError::NotFound("file".to_string()))?;

        if file.owner_id != owner_id {
            return Err(FilelockError::AccessDenied(
                "file belongs to another owner".to_string(),
            ));
        }
        Ok(file)
    }

    /// Open a file's content for download.
    pub async fn open_file(
        &self,
        owner_id: i64,
        file_id: i64,
        has_key: bool,
    ) -> Result<(FileMetadata, tokio::fs::File)> {
        let file = self.get_file(owner_id, file_id).await?;
        let folder = FolderRepository::new(self.db.pool())
            .get_owned(file.folder_id, owner_id)
            .await?;
        ensure_readable(&folder, has_key)?;

        let content = self.storage.open(&file.stored_name).await?;
        Ok((file, content))
    }

    /// Delete a single file and its stored content.
    pub async fn delete_file(&self, owner_id: i64, file_id: i64) -> Result<FileMetadata> {
        let file = self.get_file(owner_id, file_id).await?;

        FileRepository::new(self.db.pool()).delete(file.id).await?;
        if let Err(e) = self.storage.delete(&file.stored_name).await {
            warn!(file_id, error = %e, "Failed to remove stored file");
        }

        info!(owner_id, file_id, "Deleted file");
        Ok(file)
    }

    /// Delete a folder, every descendant folder and every contained file.
    ///
    /// Database rows go in one transaction; stored content is removed after
    /// the commit. The root folder is never deleted.
    pub async fn delete_folder(&self, owner_id: i64, folder_id: i64) -> Result<FolderDeletion> {
        let folder = FolderRepository::new(self.db.pool())
            .get_owned(folder_id, owner_id)
            .await?;

        if folder.is_root() {
            info!(owner_id, folder_id, "Refused to delete root folder");
            return Ok(FolderDeletion::RootProtected);
        }

        let mut tx = self.db.pool().begin().await?;
        let folder_ids = collect_subtree_ids(&mut tx, folder.id).await?;

        let mut stored_names = Vec::new();
        for id in folder_ids.iter().rev() {
            stored_names.extend(delete_in_folder(&mut tx, *id).await?);
            sqlx::query("DELETE FROM folders WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        for stored_name in &stored_names {
            if let Err(e) = self.storage.delete(stored_name).await {
                warn!(stored_name = %stored_name, error = %e, "Failed to remove stored file");
            }
        }

        info!(
            owner_id,
            folder_id,
            folders = folder_ids.len(),
            files = stored_names.len(),
            "Deleted folder tree"
        );
        Ok(FolderDeletion::Deleted {
            folders: folder_ids.len(),
            files: stored_names.len(),
        })
    }
}
