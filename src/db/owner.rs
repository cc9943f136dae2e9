//! Owner accounts and their repository.

use uuid::Uuid;

use super::DbPool;
use crate::{FilelockError, Result};

/// An owner of a folder tree.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Owner {
    /// Unique owner ID.
    pub id: i64,
    /// Generated username.
    pub username: String,
    /// Hex form of the owner key, if one has been generated.
    pub key_hash: Option<String>,
    /// When the owner was created.
    pub created_at: String,
}

impl Owner {
    /// Whether a key has been generated for this owner.
    pub fn has_key(&self) -> bool {
        self.key_hash.is_some()
    }
}

/// Data for creating a new owner.
#[derive(Debug, Clone)]
pub struct NewOwner {
    /// Username.
    pub username: String,
}

impl NewOwner {
    /// Create a NewOwner with the given username.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Create a NewOwner with a random UUID username.
    pub fn anonymous() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}

/// Repository for owner operations.
pub struct OwnerRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> OwnerRepository<'a> {
    /// Create a new OwnerRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new owner.
    pub async fn create(&self, owner: &NewOwner) -> Result<Owner> {
        let id: i64 = sqlx::query_scalar("INSERT INTO owners (username) VALUES (?) RETURNING id")
            .bind(&owner.username)
            .fetch_one(self.pool)
            .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| FilelockError::NotFound("owner".to_string()))
    }

    /// Get an owner by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Owner>> {
        let owner = sqlx::query_as::<_, Owner>(
            "SELECT id, username, key_hash, created_at FROM owners WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(owner)
    }

    /// Find the owner holding the given key.
    pub async fn find_by_key_hash(&self, key_hash: &str) -> Result<Option<Owner>> {
        let owner = sqlx::query_as::<_, Owner>(
            "SELECT id, username, key_hash, created_at FROM owners WHERE key_hash = ?",
        )
        .bind(key_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(owner)
    }

    /// Replace the owner's key. Returns false if the owner does not exist.
    pub async fn set_key_hash(&self, id: i64, key_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE owners SET key_hash = ? WHERE id = ?")
            .bind(key_hash)
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
