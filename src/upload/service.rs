//! Upload service for filelock.
//!
//! Ties together the chunk store, the session registry and the assembler:
//! - Session initialization with ownership and size checks
//! - Chunk receipt with assembly on the completing chunk
//! - Explicit retry and abandonment
//! - Expiry of idle sessions and orphaned staging directories

use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::Database;
use crate::file::{sanitize_filename, FileMetadata, FileStorage, FolderRepository, DEFAULT_MAX_FILE_SIZE};
use crate::{FilelockError, Result};

use super::assembler::Assembler;
use super::chunk_store::ChunkStore;
use super::session::{ChunkReceipt, UploadSession, UploadSessionRegistry};

/// Default maximum chunk size (16MB).
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 16 * 1024 * 1024;

/// Parameters of a new chunked upload, as received from a client.
#[derive(Debug, Clone)]
pub struct InitUpload {
    /// Owner starting the upload.
    pub owner_id: i64,
    /// Destination folder.
    pub folder_id: i64,
    /// Client-supplied filename.
    pub filename: String,
    /// Declared size of the whole file in bytes.
    pub total_size: i64,
    /// Declared number of chunks.
    pub total_chunks: i64,
}

/// What happened to a received chunk.
#[derive(Debug, Clone)]
pub enum ChunkOutcome {
    /// The chunk was stored; more are expected.
    Progress(ChunkReceipt),
    /// The chunk completed the upload and the file was assembled.
    Completed(FileMetadata),
}

/// Summary of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Idle sessions dropped from the registry.
    pub expired_sessions: usize,
    /// Staging directories with no live session that were removed.
    pub orphaned_dirs: usize,
}

/// Chunked upload service.
#[derive(Debug, Clone)]
pub struct UploadService {
    db: Database,
    chunks: ChunkStore,
    registry: UploadSessionRegistry,
    assembler: Assembler,
    max_upload_size: u64,
    max_chunk_size: u64,
}

impl UploadService {
    /// Create a new UploadService.
    pub fn new(db: Database, storage: FileStorage, chunks: ChunkStore) -> Self {
        let registry = UploadSessionRegistry::new();
        let assembler = Assembler::new(db.clone(), storage, chunks.clone(), registry.clone());
        Self {
            db,
            chunks,
            registry,
            assembler,
            max_upload_size: DEFAULT_MAX_FILE_SIZE,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }

    /// Set the maximum size of a whole upload.
    pub fn with_max_upload_size(mut self, max_size: u64) -> Self {
        self.max_upload_size = max_size;
        self
    }

    /// Set the maximum size of one chunk.
    pub fn with_max_chunk_size(mut self, max_size: u64) -> Self {
        self.max_chunk_size = max_size;
        self
    }

    /// The session registry.
    pub fn registry(&self) -> &UploadSessionRegistry {
        &self.registry
    }

    /// The chunk store.
    pub fn chunk_store(&self) -> &ChunkStore {
        &self.chunks
    }

    /// Start a chunked upload into a folder owned by the caller.
    pub async fn init(&self, request: InitUpload) -> Result<Uuid> {
        let filename = sanitize_filename(&request.filename)?;
        if request.total_size <= 0 {
            return Err(FilelockError::InvalidArgument(
                "totalSize must be positive".to_string(),
            ));
        }
        if request.total_chunks <= 0 {
            return Err(FilelockError::InvalidArgument(
                "totalChunks must be positive".to_string(),
            ));
        }
        if request.total_chunks > request.total_size || request.total_chunks > i64::from(u32::MAX) {
            return Err(FilelockError::InvalidArgument(
                "totalChunks exceeds totalSize".to_string(),
            ));
        }
        let total_size = request.total_size as u64;
        if total_size > self.max_upload_size {
            let max_mb = self.max_upload_size / 1024 / 1024;
            return Err(FilelockError::InvalidArgument(format!(
                "file is too large (max {max_mb}MB)"
            )));
        }

        let folder = FolderRepository::new(self.db.pool())
            .get_by_id(request.folder_id)
            .await?;
        match folder {
            Some(folder) if folder.owner_id == request.owner_id => {}
            _ => {
                return Err(FilelockError::AccessDenied(
                    "folder does not belong to this owner".to_string(),
                ))
            }
        }

        let session = UploadSession::new(
            request.owner_id,
            request.folder_id,
            filename,
            total_size,
            request.total_chunks as u32,
        );
        self.chunks.allocate(session.id).await?;
        let id = self.registry.register(session).await;

        info!(
            session_id = %id,
            owner_id = request.owner_id,
            folder_id = request.folder_id,
            total_size,
            total_chunks = request.total_chunks,
            "Upload session started"
        );
        Ok(id)
    }

    /// Store one chunk; the chunk that completes the upload assembles it.
    pub async fn receive_chunk(
        &self,
        session_id: Uuid,
        owner_id: i64,
        index: i64,
        bytes: &[u8],
    ) -> Result<ChunkOutcome> {
        let session = self.registry.get(session_id).await?;
        if session.owner_id != owner_id {
            return Err(FilelockError::AccessDenied(
                "upload belongs to another owner".to_string(),
            ));
        }
        let index = u32::try_from(index)
            .ok()
            .filter(|i| *i < session.total_chunks)
            .ok_or_else(|| {
                FilelockError::InvalidArgument(format!(
                    "chunkIndex {index} out of range (total {})",
                    session.total_chunks
                ))
            })?;
        if bytes.is_empty() {
            return Err(FilelockError::InvalidArgument("chunk is empty".to_string()));
        }
        if bytes.len() as u64 > self.max_chunk_size {
            return Err(FilelockError::InvalidArgument(format!(
                "chunk exceeds {} bytes",
                self.max_chunk_size
            )));
        }

        let gate = session.gate();
        let receipt = {
            let _shared = gate.read().await;
            self.registry.ensure_receiving(session_id).await?;
            self.chunks.write_chunk(session_id, index, bytes).await?;
            self.registry.record_chunk(session_id, index).await?
        };
        debug!(
            session_id = %session_id,
            index,
            received = receipt.received,
            total = receipt.total,
            "Chunk stored"
        );

        if !receipt.newly_complete {
            return Ok(ChunkOutcome::Progress(receipt));
        }

        let file = self.assembler.assemble(session_id, owner_id).await?;
        Ok(ChunkOutcome::Completed(file))
    }

    /// Assemble a complete session whose earlier assembly did not finish.
    pub async fn retry_assembly(&self, session_id: Uuid, owner_id: i64) -> Result<FileMetadata> {
        self.assembler.assemble(session_id, owner_id).await
    }

    /// Progress of a session owned by the caller.
    pub async fn progress(&self, session_id: Uuid, owner_id: i64) -> Result<UploadSession> {
        let session = self.registry.get(session_id).await?;
        if session.owner_id != owner_id {
            return Err(FilelockError::AccessDenied(
                "upload belongs to another owner".to_string(),
            ));
        }
        Ok(session)
    }

    /// Drop a session and its staged chunks.
    pub async fn abandon(&self, session_id: Uuid, owner_id: i64) -> Result<()> {
        let gate = self.progress(session_id, owner_id).await?.gate();
        let _exclusive = gate.write().await;

        self.registry.abandon(session_id).await?;
        self.chunks.release(session_id).await?;

        info!(session_id = %session_id, owner_id, "Upload session abandoned");
        Ok(())
    }

    /// Expire idle sessions and remove staging directories nobody owns.
    pub async fn sweep(&self, ttl: Duration) -> Result<SweepReport> {
        let mut report = SweepReport::default();

        for session in self.registry.remove_expired(ttl).await {
            if let Err(e) = self.chunks.release(session.id).await {
                warn!(session_id = %session.id, error = %e, "Failed to release expired staging");
            }
            report.expired_sessions += 1;
        }

        for (session_id, modified) in self.chunks.list_staging().await? {
            let stale = modified.elapsed().map(|age| age > ttl).unwrap_or(false);
            if stale && !self.registry.contains(session_id).await {
                match self.chunks.release(session_id).await {
                    Ok(_) => report.orphaned_dirs += 1,
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Failed to remove orphaned staging")
                    }
                }
            }
        }

        Ok(report)
    }
}
