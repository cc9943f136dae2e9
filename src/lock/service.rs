//! Lock service for filelock.
//!
//! Key-gated operations on an owner's tree:
//! - Key generation (replacing any earlier key)
//! - Lock and unlock of the whole tree
//! - Retrieval of an owner by key from another device

use tracing::{info, warn};

use crate::db::{Database, Owner, OwnerRepository};
use crate::file::FolderRepository;
use crate::{FilelockError, Result};

use super::key::OwnerKey;
use super::visibility::VisibilityPropagator;

/// Lock service.
pub struct LockService<'a> {
    db: &'a Database,
}

impl<'a> LockService<'a> {
    /// Create a new LockService.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Generate a new key for the owner, replacing any existing one.
    pub async fn generate_key(&self, owner_id: i64) -> Result<OwnerKey> {
        let key = OwnerKey::generate();
        let updated = OwnerRepository::new(self.db.pool())
            .set_key_hash(owner_id, key.as_str())
            .await?;
        if !updated {
            return Err(FilelockError::NotFound("owner".to_string()));
        }

        info!(owner_id, "Generated owner key");
        Ok(key)
    }

    /// Hide the owner's whole tree. Returns the number of folders updated.
    pub async fn lock(&self, owner_id: i64, key: &str) -> Result<usize> {
        self.set_tree_visibility(owner_id, key, false).await
    }

    /// Reveal the owner's whole tree. Returns the number of folders updated.
    pub async fn unlock(&self, owner_id: i64, key: &str) -> Result<usize> {
        self.set_tree_visibility(owner_id, key, true).await
    }

    /// Find the owner a key belongs to.
    pub async fn retrieve(&self, key: &str) -> Result<Owner> {
        let key = OwnerKey::parse(key)?;
        let owner = OwnerRepository::new(self.db.pool())
            .find_by_key_hash(key.as_str())
            .await?
            .filter(|owner| owner.key_hash.as_deref().is_some_and(|stored| key.matches(stored)));

        match owner {
            Some(owner) => {
                info!(owner_id = owner.id, "Retrieved folder tree by key");
                Ok(owner)
            }
            None => {
                warn!("Retrieval attempted with an unknown key");
                Err(FilelockError::AccessDenied("no folder matches this key".to_string()))
            }
        }
    }

    async fn verify_key(&self, owner_id: i64, key: &str) -> Result<()> {
        let key = OwnerKey::parse(key)?;
        let owner = OwnerRepository::new(self.db.pool())
            .get_by_id(owner_id)
            .await?
            .ok_or_else(|| FilelockError::NotFound("owner".to_string()))?;

        let matched = owner
            .key_hash
            .as_deref()
            .is_some_and(|stored| key.matches(stored));
        if !matched {
            warn!(owner_id, "Rejected lock request with a wrong key");
            return Err(FilelockError::AccessDenied("key does not match".to_string()));
        }
        Ok(())
    }

    async fn set_tree_visibility(&self, owner_id: i64, key: &str, visible: bool) -> Result<usize> {
        self.verify_key(owner_id, key).await?;

        let Some(root) = FolderRepository::new(self.db.pool())
            .get_root(owner_id)
            .await?
        else {
            return Ok(0);
        };

        let updated = VisibilityPropagator::new(self.db.pool())
            .set_visibility(root.id, visible)
            .await?;

        info!(
            owner_id,
            locked = !visible,
            folders = updated,
            "Changed folder tree visibility"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewOwner;
    use crate::file::NewFolder;

    async fn setup() -> (Database, i64, Vec<i64>) {
        let db = Database::open_in_memory().await.unwrap();
        let owner = OwnerRepository::new(db.pool())
            .create(&NewOwner::new("alice"))
            .await
            .unwrap();
        let repo = FolderRepository::new(db.pool());
        let root = repo.create(&NewFolder::root(owner.id)).await.unwrap();
        let a = repo.create(&NewFolder::new(owner.id, root.id, "A")).await.unwrap();
        let b = repo.create(&NewFolder::new(owner.id, a.id, "B")).await.unwrap();
        (db, owner.id, vec![root.id, a.id, b.id])
    }

    async fn flags(db: &Database, ids: &[i64]) -> Vec<bool> {
        let repo = FolderRepository::new(db.pool());
        let mut out = Vec::new();
        for id in ids {
            out.push(repo.get_by_id(*id).await.unwrap().unwrap().is_visible);
        }
        out
    }

    #[tokio::test]
    async fn test_lock_and_unlock() {
        let (db, owner_id, ids) = setup().await;
        let service = LockService::new(&db);
        let key = service.generate_key(owner_id).await.unwrap();

        assert_eq!(service.lock(owner_id, key.as_str()).await.unwrap(), 3);
        assert_eq!(flags(&db, &ids).await, vec![false; 3]);

        assert_eq!(service.unlock(owner_id, key.as_str()).await.unwrap(), 3);
        assert_eq!(flags(&db, &ids).await, vec![true; 3]);
    }

    #[tokio::test]
    async fn test_wrong_key_changes_nothing() {
        let (db, owner_id, ids) = setup().await;
        let service = LockService::new(&db);
        service.generate_key(owner_id).await.unwrap();
        let wrong = OwnerKey::generate();

        let result = service.lock(owner_id, wrong.as_str()).await;

        assert!(matches!(result, Err(FilelockError::AccessDenied(_))));
        assert_eq!(flags(&db, &ids).await, vec![true; 3]);
    }

    #[tokio::test]
    async fn test_lock_without_generated_key() {
        let (db, owner_id, _ids) = setup().await;
        let service = LockService::new(&db);

        let result = service.lock(owner_id, OwnerKey::generate().as_str()).await;
        assert!(matches!(result, Err(FilelockError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_malformed_key() {
        let (db, owner_id, _ids) = setup().await;
        let service = LockService::new(&db);
        service.generate_key(owner_id).await.unwrap();

        let result = service.lock(owner_id, "short").await;
        assert!(matches!(result, Err(FilelockError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_regenerate_replaces_key() {
        let (db, owner_id, _ids) = setup().await;
        let service = LockService::new(&db);
        let old = service.generate_key(owner_id).await.unwrap();
        let new = service.generate_key(owner_id).await.unwrap();

        assert!(service.lock(owner_id, old.as_str()).await.is_err());
        assert!(service.lock(owner_id, new.as_str()).await.is_ok());
    }

    #[tokio::test]
    async fn test_generate_key_unknown_owner() {
        let (db, _owner_id, _ids) = setup().await;

        let result = LockService::new(&db).generate_key(9999).await;
        assert!(matches!(result, Err(FilelockError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_retrieve() {
        let (db, owner_id, _ids) = setup().await;
        let service = LockService::new(&db);
        let key = service.generate_key(owner_id).await.unwrap();

        let owner = service.retrieve(key.as_str()).await.unwrap();
        assert_eq!(owner.id, owner_id);

        let result = service.retrieve(OwnerKey::generate().as_str()).await;
        assert!(matches!(result, Err(FilelockError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_lock_without_root() {
        let db = Database::open_in_memory().await.unwrap();
        let owner = OwnerRepository::new(db.pool())
            .create(&NewOwner::new("rootless"))
            .await
            .unwrap();
        let service = LockService::new(&db);
        let key = service.generate_key(owner.id).await.unwrap();

        assert_eq!(service.lock(owner.id, key.as_str()).await.unwrap(), 0);
    }
}
