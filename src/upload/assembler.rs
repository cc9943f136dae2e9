//! Turns a complete upload session into a stored file.

use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::Database;
use crate::file::{FileMetadata, FileRepository, FileStorage, FolderRepository, NewFile};
use crate::{FilelockError, Result};

use super::chunk_store::ChunkStore;
use super::session::{UploadSession, UploadSessionRegistry};

/// Concatenates staged chunks into the file storage and records the file.
#[derive(Debug, Clone)]
pub struct Assembler {
    db: Database,
    storage: FileStorage,
    chunks: ChunkStore,
    registry: UploadSessionRegistry,
}

impl Assembler {
    /// Create a new Assembler.
    pub fn new(
        db: Database,
        storage: FileStorage,
        chunks: ChunkStore,
        registry: UploadSessionRegistry,
    ) -> Self {
        Self {
            db,
            storage,
            chunks,
            registry,
        }
    }

    /// Assemble a complete session into a file record.
    ///
    /// On success the staging area is released and the session forgotten.
    /// A size mismatch marks the session failed; any other error returns it
    /// to receiving so the assembly can be retried.
    ///
    /// The work runs on its own task and finishes even if the caller is
    /// dropped, so the session always leaves `Assembling`.
    pub async fn assemble(&self, session_id: Uuid, owner_id: i64) -> Result<FileMetadata> {
        let assembler = self.clone();
        let task = tokio::spawn(async move { assembler.run(session_id, owner_id).await });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Assembly task did not finish");
                self.registry.abort_assembly(session_id, false).await;
                Err(FilelockError::Io(std::io::Error::other(e)))
            }
        }
    }

    async fn run(&self, session_id: Uuid, owner_id: i64) -> Result<FileMetadata> {
        let gate = self.registry.get(session_id).await?.gate();
        let _exclusive = gate.write().await;

        if self.registry.get(session_id).await?.owner_id != owner_id {
            return Err(FilelockError::AccessDenied(
                "upload belongs to another owner".to_string(),
            ));
        }
        let session = self.registry.begin_assembly(session_id).await?;

        let file = match self.materialize(&session).await {
            Ok(file) => file,
            Err(e) => {
                let corrupt = matches!(e, FilelockError::CorruptUpload(_));
                if corrupt {
                    error!(session_id = %session_id, error = %e, "Upload failed verification");
                } else {
                    warn!(session_id = %session_id, error = %e, "Assembly failed, session kept for retry");
                }
                self.registry.abort_assembly(session_id, corrupt).await;
                return Err(e);
            }
        };

        if let Err(e) = self.chunks.release(session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to release staging directory");
        }
        if let Err(e) = self.registry.complete(session_id).await {
            warn!(session_id = %session_id, error = %e, "Session vanished during assembly");
        }

        info!(
            session_id = %session_id,
            file_id = file.id,
            size = file.size,
            chunks = session.total_chunks,
            "Assembled upload"
        );
        Ok(file)
    }

    async fn materialize(&self, session: &UploadSession) -> Result<FileMetadata> {
        let folder = FolderRepository::new(self.db.pool())
            .get_owned(session.folder_id, session.owner_id)
            .await?;

        let sizes = self.chunks.chunk_sizes(session.id, session.total_chunks).await?;
        let staged: u64 = sizes.iter().sum();
        if staged != session.total_size {
            return Err(FilelockError::CorruptUpload(format!(
                "chunks hold {staged} bytes, expected {}",
                session.total_size
            )));
        }

        let stored_name = FileStorage::generate_stored_name(&session.filename);
        if let Err(e) = self.write_artifact(session, &stored_name).await {
            self.storage.discard_partial(&stored_name).await;
            return Err(e);
        }
        self.storage.commit_partial(&stored_name).await?;

        let new_file = NewFile::new(
            folder.id,
            session.owner_id,
            session.filename.as_str(),
            stored_name.as_str(),
            session.total_size as i64,
        );
        match FileRepository::new(self.db.pool()).create(&new_file).await {
            Ok(file) => Ok(file),
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&stored_name).await {
                    warn!(stored_name = %stored_name, error = %cleanup, "Failed to remove orphaned artifact");
                }
                Err(e)
            }
        }
    }

    async fn write_artifact(&self, session: &UploadSession, stored_name: &str) -> Result<()> {
        let mut out = self.storage.create_partial(stored_name).await?;

        let mut written = 0u64;
        for index in 0..session.total_chunks {
            let mut chunk = self.chunks.open_chunk(session.id, index).await?;
            written += tokio::io::copy(&mut chunk, &mut out).await?;
            self.registry.touch(session.id).await;
        }
        out.flush().await?;
        out.sync_all().await?;

        if written != session.total_size {
            return Err(FilelockError::CorruptUpload(format!(
                "wrote {written} bytes, expected {}",
                session.total_size
            )));
        }
        Ok(())
    }
}
