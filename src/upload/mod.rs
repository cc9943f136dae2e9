//! Chunked upload module for filelock.
//!
//! A client starts a session, sends numbered chunks in any order, and the
//! chunk that completes the set triggers assembly into a stored file.

mod assembler;
mod chunk_store;
mod service;
mod session;
mod sweeper;

pub use assembler::Assembler;
pub use chunk_store::ChunkStore;
pub use service::{ChunkOutcome, InitUpload, SweepReport, UploadService, DEFAULT_MAX_CHUNK_SIZE};
pub use session::{ChunkReceipt, SessionState, UploadSession, UploadSessionRegistry};
pub use sweeper::spawn_sweeper;
