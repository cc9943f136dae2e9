//! filelock - personal file storage
//!
//! Folder trees per owner with chunked uploads, zip export, and a key that
//! hides the whole tree until it is presented again.

pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod lock;
pub mod logging;
pub mod upload;
pub mod web;

pub use config::{Config, NewFolderVisibility};
pub use db::{Database, NewOwner, Owner, OwnerRepository};
pub use error::{FilelockError, Result};
pub use file::{ArchiveExporter, FileStorage, FolderDeletion, FolderTree};
pub use lock::{LockService, OwnerKey, VisibilityPropagator};
pub use upload::{ChunkOutcome, ChunkStore, InitUpload, UploadService, UploadSessionRegistry};
pub use web::WebServer;
