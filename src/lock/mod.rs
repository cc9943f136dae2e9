//! Folder locking for filelock.
//!
//! An owner generates a key, then presents it to hide (lock) or reveal
//! (unlock) their whole folder tree, or to retrieve the tree on another
//! device.

mod key;
mod service;
mod visibility;

pub use key::{OwnerKey, KEY_BYTES, KEY_HEX_LEN};
pub use service::LockService;
pub use visibility::VisibilityPropagator;
