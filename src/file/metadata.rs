//! File metadata types and repository for filelock.

use sqlx::SqliteConnection;

use crate::db::DbPool;
use crate::{FilelockError, Result};

const FILE_COLUMNS: &str =
    "id, name, stored_name, size, file_type, folder_id, owner_id, created_at, updated_at";

/// File metadata stored in the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileMetadata {
    /// Unique file ID.
    pub id: i64,
    /// Display filename.
    pub name: String,
    /// Stored filename (UUID-based) inside the file storage.
    pub stored_name: String,
    /// File size in bytes.
    pub size: i64,
    /// Lower-cased extension, or "".
    pub file_type: String,
    /// Folder ID this file belongs to.
    pub folder_id: i64,
    /// Owning owner ID.
    pub owner_id: i64,
    /// When the file was created.
    pub created_at: String,
    /// When the record was last changed.
    pub updated_at: String,
}

/// Data for creating a new file record.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Display filename.
    pub name: String,
    /// Stored filename.
    pub stored_name: String,
    /// File size in bytes.
    pub size: i64,
    /// File type derived from the name.
    pub file_type: String,
    /// Target folder.
    pub folder_id: i64,
    /// Owning owner ID.
    pub owner_id: i64,
}

impl NewFile {
    /// Create a new NewFile; the file type is derived from `name`.
    pub fn new(
        folder_id: i64,
        owner_id: i64,
        name: impl Into<String>,
        stored_name: impl Into<String>,
        size: i64,
    ) -> Self {
        let name = name.into();
        Self {
            file_type: super::file_type_of(&name),
            name,
            stored_name: stored_name.into(),
            size,
            folder_id,
            owner_id,
        }
    }
}

/// Repository for file metadata operations.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new file record.
    pub async fn create(&self, file: &NewFile) -> Result<FileMetadata> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO files (name, stored_name, size, file_type, folder_id, owner_id)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&file.name)
        .bind(&file.stored_name)
        .bind(file.size)
        .bind(&file.file_type)
        .bind(file.folder_id)
        .bind(file.owner_id)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| FilelockError::NotFound("file".to_string()))
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileMetadata>> {
        let file = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(file)
    }

    /// List files in a folder.
    pub async fn list_by_folder(&self, folder_id: i64) -> Result<Vec<FileMetadata>> {
        let files = sqlx::query_as::<_, FileMetadata>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE folder_id = ? ORDER BY name, id"
        ))
        .bind(folder_id)
        .fetch_all(self.pool)
        .await?;

        Ok(files)
    }

    /// Delete a file record.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Delete every file record in a folder, returning their stored names.
pub(crate) async fn delete_in_folder(
    conn: &mut SqliteConnection,
    folder_id: i64,
) -> Result<Vec<String>> {
    let stored_names = sqlx::query_scalar("DELETE FROM files WHERE folder_id = ? RETURNING stored_name")
        .bind(folder_id)
        .fetch_all(conn)
        .await?;

    Ok(stored_names)
}
