//! Folder types and repository for filelock.

use sqlx::SqliteConnection;

use crate::db::DbPool;
use crate::{FilelockError, Result};

const FOLDER_COLUMNS: &str = "id, name, parent_id, owner_id, is_visible, created_at, updated_at";

/// A folder in an owner's tree.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Folder name.
    pub name: String,
    /// Parent folder ID (None for the owner's root).
    pub parent_id: Option<i64>,
    /// Owning owner ID.
    pub owner_id: i64,
    /// False while the folder is locked.
    pub is_visible: bool,
    /// When the folder was created.
    pub created_at: String,
    /// When the folder was last renamed or re-flagged.
    pub updated_at: String,
}

impl Folder {
    /// Whether this is the owner's root folder.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Folder name.
    pub name: String,
    /// Parent folder ID (None for a root).
    pub parent_id: Option<i64>,
    /// Owning owner ID.
    pub owner_id: i64,
    /// Initial visibility.
    pub is_visible: bool,
}

impl NewFolder {
    /// Create a visible child folder.
    pub fn new(owner_id: i64, parent_id: i64, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_id: Some(parent_id),
            owner_id,
            is_visible: true,
        }
    }

    /// Create a root folder for an owner.
    pub fn root(owner_id: i64) -> Self {
        Self {
            name: super::ROOT_FOLDER_NAME.to_string(),
            parent_id: None,
            owner_id,
            is_visible: true,
        }
    }

    /// Set the initial visibility.
    pub fn with_visibility(mut self, is_visible: bool) -> Self {
        self.is_visible = is_visible;
        self
    }
}

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new folder.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO folders (name, parent_id, owner_id, is_visible)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&folder.name)
        .bind(folder.parent_id)
        .bind(folder.owner_id)
        .bind(folder.is_visible)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| FilelockError::NotFound("folder".to_string()))
    }

    /// Get a folder by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// Get a folder that must belong to `owner_id`.
    pub async fn get_owned(&self, id: i64, owner_id: i64) -> Result<Folder> {
        let folder = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| FilelockError::NotFound("folder".to_string()))?;

        if folder.owner_id != owner_id {
            return Err(FilelockError::AccessDenied(
                "folder belongs to another owner".to_string(),
            ));
        }
        Ok(folder)
    }

    /// Get the owner's root folder.
    pub async fn get_root(&self, owner_id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE owner_id = ? AND parent_id IS NULL"
        ))
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(folder)
    }

    /// List child folders of a parent folder.
    pub async fn list_by_parent(&self, parent_id: i64) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE parent_id = ? ORDER BY name, id"
        ))
        .bind(parent_id)
        .fetch_all(self.pool)
        .await?;

        Ok(folders)
    }

    /// Rename a folder.
    pub async fn rename(&self, id: i64, name: &str) -> Result<Option<Folder>> {
        let result = sqlx::query(
            "UPDATE folders SET name = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(name)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Get the path from root to a folder.
    pub async fn get_path(&self, id: i64) -> Result<Vec<Folder>> {
        let mut path = Vec::new();
        let mut current_id = Some(id);

        while let Some(folder_id) = current_id {
            if let Some(folder) = self.get_by_id(folder_id).await? {
                current_id = folder.parent_id;
                path.push(folder);
            } else {
                break;
            }
        }

        path.reverse();
        Ok(path)
    }
}

/// List the IDs of a folder's direct children.
pub(crate) async fn child_ids(conn: &mut SqliteConnection, parent_id: i64) -> Result<Vec<i64>> {
    let ids = sqlx::query_scalar("SELECT id FROM folders WHERE parent_id = ? ORDER BY id")
        .bind(parent_id)
        .fetch_all(conn)
        .await?;

    Ok(ids)
}

/// Collect a folder and all its descendants, parents before children.
///
/// Walks with an explicit worklist so depth is bounded only by memory.
pub async fn collect_subtree_ids(conn: &mut SqliteConnection, root_id: i64) -> Result<Vec<i64>> {
    let mut ordered = Vec::new();
    let mut stack = vec![root_id];

    while let Some(id) = stack.pop() {
        ordered.push(id);
        let children = child_ids(&mut *conn, id).await?;
        stack.extend(children.into_iter().rev());
    }

    Ok(ordered)
}
