//! On-disk staging for upload chunks.
//!
//! Each session owns `{base}/{session_id}/`, and chunk `n` lives at
//! `chunk_{n}` inside it. Chunks are written to a uniquely named temporary
//! file and renamed into place, so a reader never sees a partial chunk and
//! concurrent writes of the same index leave one complete copy.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::{FilelockError, Result};

/// Staging area for chunked uploads.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    base_path: PathBuf,
}

impl ChunkStore {
    /// Create a new ChunkStore rooted at `base_path`, creating it if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Staging directory for a session.
    pub fn staging_dir(&self, session_id: Uuid) -> PathBuf {
        self.base_path.join(session_id.to_string())
    }

    /// Path of one chunk.
    pub fn chunk_path(&self, session_id: Uuid, index: u32) -> PathBuf {
        self.staging_dir(session_id).join(format!("chunk_{index}"))
    }

    /// Create the staging directory for a session.
    pub async fn allocate(&self, session_id: Uuid) -> Result<PathBuf> {
        let dir = self.staging_dir(session_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Durably write chunk `index`, replacing any earlier copy.
    pub async fn write_chunk(&self, session_id: Uuid, index: u32, bytes: &[u8]) -> Result<()> {
        let dir = self.staging_dir(session_id);
        if !tokio::fs::try_exists(&dir).await? {
            return Err(FilelockError::UnknownSession(session_id.to_string()));
        }

        let tmp_path = dir.join(format!(".chunk_{index}.{}.tmp", Uuid::new_v4()));
        let written = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp_path, self.chunk_path(session_id, index)).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Sizes of chunks `0..total`, in order.
    ///
    /// A missing chunk means the staging area no longer matches the session.
    pub async fn chunk_sizes(&self, session_id: Uuid, total: u32) -> Result<Vec<u64>> {
        let mut sizes = Vec::with_capacity(total as usize);
        for index in 0..total {
            match tokio::fs::metadata(self.chunk_path(session_id, index)).await {
                Ok(meta) => sizes.push(meta.len()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(FilelockError::CorruptUpload(format!(
                        "chunk {index} is missing from staging"
                    )))
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(sizes)
    }

    /// Open chunk `index` for reading.
    pub async fn open_chunk(&self, session_id: Uuid, index: u32) -> Result<tokio::fs::File> {
        match tokio::fs::File::open(self.chunk_path(session_id, index)).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(FilelockError::CorruptUpload(
                format!("chunk {index} is missing from staging"),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a session's staging directory.
    ///
    /// Returns `false` if there was nothing to remove.
    pub async fn release(&self, session_id: Uuid) -> Result<bool> {
        match tokio::fs::remove_dir_all(self.staging_dir(session_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List staging directories with their last modification time.
    ///
    /// Entries whose name is not a session ID are ignored.
    pub async fn list_staging(&self) -> Result<Vec<(Uuid, SystemTime)>> {
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        let mut found = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let Some(session_id) = entry
                .file_name()
                .to_str()
                .and_then(|name| Uuid::parse_str(name).ok())
            else {
                continue;
            };
            let meta = entry.metadata().await?;
            if meta.is_dir() {
                found.push((session_id, meta.modified()?));
            }
        }

        Ok(found)
    }
}
