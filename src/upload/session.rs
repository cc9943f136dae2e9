//! In-memory registry of chunked upload sessions.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{FilelockError, Result};

/// Lifecycle state of an upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting chunks.
    Receiving,
    /// One request is assembling the file; no other may start.
    Assembling,
    /// Assembly found the chunks inconsistent. Staging is kept for inspection.
    Failed,
}

/// A chunked upload in progress.
#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Session ID handed to the client.
    pub id: Uuid,
    /// Owner that started the upload.
    pub owner_id: i64,
    /// Destination folder.
    pub folder_id: i64,
    /// Sanitized display filename.
    pub filename: String,
    /// Declared size of the whole file in bytes.
    pub total_size: u64,
    /// Declared number of chunks.
    pub total_chunks: u32,
    /// Current state.
    pub state: SessionState,
    /// When the session was created.
    pub created_at: Instant,
    /// Last time a chunk arrived, the state changed or assembly made progress.
    pub last_activity: Instant,
    received: BTreeSet<u32>,
    gate: Arc<RwLock<()>>,
}

impl UploadSession {
    /// Create a new session in the `Receiving` state.
    pub fn new(
        owner_id: i64,
        folder_id: i64,
        filename: impl Into<String>,
        total_size: u64,
        total_chunks: u32,
    ) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            folder_id,
            filename: filename.into(),
            total_size,
            total_chunks,
            state: SessionState::Receiving,
            created_at: now,
            last_activity: now,
            received: BTreeSet::new(),
            gate: Arc::new(RwLock::new(())),
        }
    }

    /// Number of distinct chunk indices received.
    pub fn received_chunks(&self) -> u32 {
        self.received.len() as u32
    }

    /// Whether a chunk index has been received.
    pub fn has_chunk(&self, index: u32) -> bool {
        self.received.contains(&index)
    }

    /// Whether every chunk has been received.
    pub fn is_complete(&self) -> bool {
        self.received_chunks() == self.total_chunks
    }

    /// Lock over the session's staged chunks.
    ///
    /// Chunk writes hold it shared; assembly and abandonment hold it
    /// exclusively, so no chunk file changes under them.
    pub fn gate(&self) -> Arc<RwLock<()>> {
        Arc::clone(&self.gate)
    }

    /// Time since the last activity.
    pub fn idle_duration(&self) -> Duration {
        self.last_activity.elapsed()
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

/// Result of recording one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkReceipt {
    /// Distinct chunks received so far.
    pub received: u32,
    /// Chunks declared at init.
    pub total: u32,
    /// True only for the call that brought the count up to `total`.
    pub newly_complete: bool,
}

impl ChunkReceipt {
    /// Whether every chunk has been received.
    pub fn is_complete(&self) -> bool {
        self.received == self.total
    }
}

/// Registry of live upload sessions.
///
/// All mutation happens under one write lock, so the chunk that completes a
/// session is observed by exactly one caller.
#[derive(Debug, Clone, Default)]
pub struct UploadSessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, UploadSession>>>,
}

impl UploadSessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new session and return its ID.
    pub async fn register(&self, session: UploadSession) -> Uuid {
        let id = session.id;
        self.sessions.write().await.insert(id, session);
        id
    }

    /// Snapshot of a session.
    pub async fn get(&self, id: Uuid) -> Result<UploadSession> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| unknown(id))
    }

    /// Whether the session is tracked.
    pub async fn contains(&self, id: Uuid) -> bool {
        self.sessions.read().await.contains_key(&id)
    }

    /// Number of tracked sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are tracked.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Fail unless the session exists and is still accepting chunks.
    pub async fn ensure_receiving(&self, id: Uuid) -> Result<()> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(&id).ok_or_else(|| unknown(id))?;

        if session.state != SessionState::Receiving {
            return Err(not_receiving());
        }
        Ok(())
    }

    /// Mark a session as active now.
    pub async fn touch(&self, id: Uuid) {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.touch();
        }
    }

    /// Record that chunk `index` has been durably written.
    ///
    /// Re-sending an index is accepted and does not change the count.
    pub async fn record_chunk(&self, id: Uuid, index: u32) -> Result<ChunkReceipt> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or_else(|| unknown(id))?;

        if index >= session.total_chunks {
            return Err(FilelockError::InvalidArgument(format!(
                "chunk index {index} out of range (total {})",
                session.total_chunks
            )));
        }
        if session.state != SessionState::Receiving {
            return Err(not_receiving());
        }

        let inserted = session.received.insert(index);
        session.touch();

        Ok(ChunkReceipt {
            received: session.received_chunks(),
            total: session.total_chunks,
            newly_complete: inserted && session.is_complete(),
        })
    }

    /// Move a complete session into `Assembling` and return a snapshot.
    ///
    /// Fails with `IncompleteUpload` while chunks are missing, and refuses a
    /// second concurrent assembly of the same session.
    pub async fn begin_assembly(&self, id: Uuid) -> Result<UploadSession> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or_else(|| unknown(id))?;

        match session.state {
            SessionState::Receiving => {}
            SessionState::Assembling => {
                return Err(FilelockError::InvalidArgument(
                    "upload is already being assembled".to_string(),
                ))
            }
            SessionState::Failed => {
                return Err(FilelockError::CorruptUpload(
                    "upload failed verification; start a new upload".to_string(),
                ))
            }
        }
        if !session.is_complete() {
            return Err(FilelockError::IncompleteUpload {
                received: session.received_chunks(),
                total: session.total_chunks,
            });
        }

        session.state = SessionState::Assembling;
        session.touch();
        Ok(session.clone())
    }

    /// Leave `Assembling` after a failed attempt.
    ///
    /// `corrupt` marks the session `Failed`; otherwise it returns to
    /// `Receiving` so assembly can be retried.
    pub async fn abort_assembly(&self, id: Uuid, corrupt: bool) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions
            .get_mut(&id)
            .filter(|s| s.state == SessionState::Assembling)
        {
            session.state = if corrupt {
                SessionState::Failed
            } else {
                SessionState::Receiving
            };
            session.touch();
        }
    }

    /// Forget a session after its file record was created.
    pub async fn complete(&self, id: Uuid) -> Result<UploadSession> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| unknown(id))
    }

    /// Forget a session that is not being assembled.
    pub async fn abandon(&self, id: Uuid) -> Result<UploadSession> {
        let mut sessions = self.sessions.write().await;
        let state = sessions
            .get(&id)
            .map(|s| s.state)
            .ok_or_else(|| unknown(id))?;

        if state == SessionState::Assembling {
            return Err(FilelockError::InvalidArgument(
                "upload is being assembled".to_string(),
            ));
        }
        sessions.remove(&id).ok_or_else(|| unknown(id))
    }

    /// Remove and return sessions idle for longer than `ttl`.
    ///
    /// A running assembly touches its session as it copies chunks, so only
    /// an assembly that stopped making progress is reclaimed.
    pub async fn remove_expired(&self, ttl: Duration) -> Vec<UploadSession> {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<Uuid> = sessions
            .values()
            .filter(|s| s.idle_duration() > ttl)
            .map(|s| s.id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| sessions.remove(&id))
            .collect()
    }
}

fn unknown(id: Uuid) -> FilelockError {
    FilelockError::UnknownSession(id.to_string())
}

fn not_receiving() -> FilelockError {
    FilelockError::InvalidArgument("upload is no longer accepting chunks".to_string())
}
