//! File storage for filelock.
//!
//! Stored files live under UUID-based names in a sharded directory tree.
//! Writes go to a `.part` sibling first and are renamed into place, so a
//! stored name never points at a half-written file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::{FilelockError, Result};

const PARTIAL_SUFFIX: &str = "part";

/// File storage service for managing physical files.
///
/// ```text
/// {base_path}/
/// ├── ab/
/// │   └── ab12cd34-5678-90ab-cdef-123456789012.pdf
/// └── cd/
///     └── cd90ab12-3456-7890-abcd-ef1234567890.bin
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Save content under a freshly generated stored name.
    pub async fn save(&self, content: &[u8], original_name: &str) -> Result<String> {
        let stored_name = Self::generate_stored_name(original_name);
        let mut file = self.create_partial(&stored_name).await?;

        let written = async {
            file.write_all(content).await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        if let Err(e) = written {
            self.discard_partial(&stored_name).await;
            return Err(e.into());
        }

        self.commit_partial(&stored_name).await?;
        Ok(stored_name)
    }

    /// Open the `.part` file for a stored name, creating its shard directory.
    pub async fn create_partial(&self, stored_name: &str) -> Result<tokio::fs::File> {
        let path = self.partial_path(stored_name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        Ok(tokio::fs::File::create(&path).await?)
    }

    /// Move a finished `.part` file to its final location.
    pub async fn commit_partial(&self, stored_name: &str) -> Result<()> {
        tokio::fs::rename(
            self.partial_path(stored_name),
            self.get_file_path(stored_name),
        )
        .await?;
        Ok(())
    }

    /// Remove a `.part` file, ignoring errors.
    pub async fn discard_partial(&self, stored_name: &str) {
        let path = self.partial_path(stored_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial file");
            }
        }
    }

    /// Open a stored file for reading.
    pub async fn open(&self, stored_name: &str) -> Result<tokio::fs::File> {
        match tokio::fs::File::open(self.get_file_path(stored_name)).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FilelockError::NotFound(format!("file content {stored_name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a file from storage.
    ///
    /// Returns `true` if the file was deleted, `false` if it didn't exist.
    pub async fn delete(&self, stored_name: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.get_file_path(stored_name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if a file exists in storage.
    pub fn exists(&self, stored_name: &str) -> bool {
        self.get_file_path(stored_name).exists()
    }

    /// Get the full file path for a stored name.
    ///
    /// The path is `{base_path}/{shard}/{stored_name}` where shard is the
    /// first 2 characters of the stored name.
    pub fn get_file_path(&self, stored_name: &str) -> PathBuf {
        let shard = Self::get_shard(stored_name);
        self.base_path.join(shard).join(stored_name)
    }

    fn partial_path(&self, stored_name: &str) -> PathBuf {
        let mut path = self.get_file_path(stored_name).into_os_string();
        path.push(".");
        path.push(PARTIAL_SUFFIX);
        PathBuf::from(path)
    }

    fn get_shard(stored_name: &str) -> &str {
        stored_name.get(..2).unwrap_or(stored_name)
    }

    /// Extract the file extension from a filename.
    ///
    /// Returns "bin" if no usable extension is found.
    fn extract_extension(filename: &str) -> &str {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin")
    }

    /// Generate a new UUID-based stored name keeping the original extension.
    pub fn generate_stored_name(original_name: &str) -> String {
        let uuid = Uuid::new_v4();
        let ext = Self::extract_extension(original_name);
        format!("{uuid}.{ext}")
    }
}
