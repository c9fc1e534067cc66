//! Registered-folder persistence.
//!
//! Folders mostly exist implicitly through `item.folder` values; the
//! `folder_registry` table only records paths created before any item
//! landed in them. Paths arrive pre-normalized from the callers.

use async_trait::async_trait;
use llog_core::{folder, Error, FolderStore, FolderTreeStore, Result};
use sqlx::{PgConnection, Pool, Postgres};

pub struct PgFolderStore {
    pool: Pool<Postgres>,
}

impl PgFolderStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FolderStore for PgFolderStore {
    async fn registered(&self) -> Result<Vec<String>> {
        sqlx::query_scalar("SELECT path FROM folder_registry ORDER BY path")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)
    }

    async fn register(&self, path: &str) -> Result<bool> {
        let result =
            sqlx::query("INSERT INTO folder_registry (path) VALUES ($1) ON CONFLICT (path) DO NOTHING")
                .bind(path)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn unregister(&self, path: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folder_registry WHERE path = $1")
            .bind(path)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn rename_prefix(&self, old_prefix: &str, new_prefix: &str) -> Result<i64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let renamed = rename_registered_prefix(&mut *tx, old_prefix, new_prefix).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(renamed)
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<i64> {
        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        remove_registered_prefix(&mut *conn, prefix).await
    }
}

/// Rewrite registered paths within `old_prefix` to live under
/// `new_prefix`. Runs on the caller's connection, which must be inside a
/// transaction (the row scan takes `FOR UPDATE` locks).
///
/// Row-by-row rewrite rather than a single UPDATE: a rewritten path may
/// collide with an already registered one, and those collisions must
/// merge instead of violating the primary key.
async fn rename_registered_prefix(
    conn: &mut PgConnection,
    old_prefix: &str,
    new_prefix: &str,
) -> Result<i64> {
    let affected: Vec<String> = sqlx::query_scalar(
        "SELECT path FROM folder_registry
         WHERE $1 = '' OR path = $1 OR left(path, char_length($1) + 1) = $1 || '/'
         FOR UPDATE",
    )
    .bind(old_prefix)
    .fetch_all(&mut *conn)
    .await
    .map_err(Error::Database)?;

    for path in &affected {
        sqlx::query("DELETE FROM folder_registry WHERE path = $1")
            .bind(path)
            .execute(&mut *conn)
            .await
            .map_err(Error::Database)?;
        let Some(updated) = folder::replace_prefix(path, old_prefix, new_prefix) else {
            continue;
        };
        // A path rewritten to the root has no registration row.
        if !updated.is_empty() {
            sqlx::query(
                "INSERT INTO folder_registry (path) VALUES ($1) ON CONFLICT (path) DO NOTHING",
            )
            .bind(&updated)
            .execute(&mut *conn)
            .await
            .map_err(Error::Database)?;
        }
    }

    Ok(affected.len() as i64)
}

/// Delete registered paths within `prefix`, the prefix itself included.
async fn remove_registered_prefix(conn: &mut PgConnection, prefix: &str) -> Result<i64> {
    let result = sqlx::query(
        "DELETE FROM folder_registry
         WHERE $1 = '' OR path = $1 OR left(path, char_length($1) + 1) = $1 || '/'",
    )
    .bind(prefix)
    .execute(&mut *conn)
    .await
    .map_err(Error::Database)?;
    Ok(result.rows_affected() as i64)
}

/// Postgres [`FolderTreeStore`].
///
/// One transaction covers the item rewrite and the registry rewrite, so
/// a rename or delete never commits items under the new path while
/// registered folders keep the old one.
pub struct PgFolderTree {
    pool: Pool<Postgres>,
}

impl PgFolderTree {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FolderTreeStore for PgFolderTree {
    async fn rename_tree(&self, old_prefix: &str, new_prefix: &str) -> Result<i64> {
        let old_prefix = folder::normalize(old_prefix);
        let new_prefix = folder::normalize(new_prefix);
        if old_prefix.is_empty() {
            return Err(Error::InvalidInput(
                "Cannot rename the root folder".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let moved = crate::items::rewrite_item_folders(&mut *tx, &old_prefix, &new_prefix).await?;
        rename_registered_prefix(&mut *tx, &old_prefix, &new_prefix).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(moved)
    }

    async fn remove_tree(&self, prefix: &str, parent: &str) -> Result<i64> {
        let prefix = folder::normalize(prefix);
        let parent = folder::normalize(parent);
        if prefix.is_empty() {
            return Err(Error::InvalidInput(
                "Cannot delete the root folder".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let moved = crate::items::rewrite_item_folders(&mut *tx, &prefix, &parent).await?;
        remove_registered_prefix(&mut *tx, &prefix).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(moved)
    }
}
