//! Recursive visibility propagation over a folder subtree.

use tracing::debug;

use crate::db::DbPool;
use crate::file::collect_subtree_ids;
use crate::{FilelockError, Result};

/// Sets the visibility flag on a folder and all of its descendants.
pub struct VisibilityPropagator<'a> {
    pool: &'a DbPool,
}

impl<'a> VisibilityPropagator<'a> {
    /// Create a new VisibilityPropagator.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Set `is_visible` on `folder_id` and every descendant.
    ///
    /// Runs in a single transaction: on error no flag changes. Returns the
    /// number of folders updated.
    pub async fn set_visibility(&self, folder_id: i64, visible: bool) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM folders WHERE id = ?")
            .bind(folder_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(FilelockError::NotFound("folder".to_string()));
        }

        let folder_ids = collect_subtree_ids(&mut tx, folder_id).await?;
        for id in &folder_ids {
            sqlx::query(
                "UPDATE folders SET is_visible = ?, updated_at = datetime('now') WHERE id = ?",
            )
            .bind(visible)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(folder_id, visible, updated = folder_ids.len(), "Propagated visibility");
        Ok(folder_ids.len())
    }
}
