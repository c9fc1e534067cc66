//! Item registry persistence.
//!
//! The `item` table is the source of truth for the registry view; the
//! `item_content` table holds the backing indexed body, one row per
//! item, always written and removed in the same transaction as its
//! item. Folder paths are normalized before every write so the column
//! never holds a denormalized path.

use async_trait::async_trait;
use chrono::Utc;
use llog_core::{
    folder, registry, AutoMetadata, Error, IndexStatus, Item, ItemContent, ItemStore, ItemType,
    NewItem, RegistryPage, RegistryQuery, Result,
};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};

const ITEM_COLUMNS: &str = "id, title, item_type, folder, notion_id, auto_metadata, \
     index_status, index_error, created_at";

pub struct PgItemStore {
    pool: Pool<Postgres>,
}

impl PgItemStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Convert ItemType to database string.
    fn item_type_to_str(item_type: ItemType) -> &'static str {
        match item_type {
            ItemType::Page => "page",
            ItemType::Database => "database",
            ItemType::Pdf => "pdf",
            ItemType::Text => "text",
            ItemType::Markdown => "markdown",
            ItemType::Document => "document",
        }
    }

    /// Convert string from database to ItemType.
    fn str_to_item_type(s: &str) -> ItemType {
        match s {
            "page" => ItemType::Page,
            "database" => ItemType::Database,
            "pdf" => ItemType::Pdf,
            "text" => ItemType::Text,
            "markdown" => ItemType::Markdown,
            "document" => ItemType::Document,
            _ => ItemType::Document, // fallback
        }
    }

    /// Convert IndexStatus to database string.
    fn index_status_to_str(status: IndexStatus) -> &'static str {
        match status {
            IndexStatus::Pending => "pending",
            IndexStatus::Indexing => "indexing",
            IndexStatus::Ready => "ready",
            IndexStatus::Failed => "failed",
        }
    }

    /// Convert string from database to IndexStatus.
    fn str_to_index_status(s: &str) -> IndexStatus {
        match s {
            "pending" => IndexStatus::Pending,
            "indexing" => IndexStatus::Indexing,
            "ready" => IndexStatus::Ready,
            "failed" => IndexStatus::Failed,
            _ => IndexStatus::Ready, // fallback
        }
    }

    /// Parse an item row into an Item struct.
    fn parse_item_row(row: PgRow) -> Item {
        Item {
            id: row.get("id"),
            title: row.get("title"),
            item_type: Self::str_to_item_type(row.get("item_type")),
            folder: row.get("folder"),
            notion_id: row.get("notion_id"),
            auto_metadata: row
                .get::<Option<serde_json::Value>, _>("auto_metadata")
                .and_then(|value| serde_json::from_value(value).ok()),
            index_status: Self::str_to_index_status(row.get("index_status")),
            index_error: row.get("index_error"),
            created_at: row.get("created_at"),
        }
    }

    fn parse_content_row(row: PgRow) -> ItemContent {
        ItemContent {
            item_id: row.get("item_id"),
            body: row.get("body"),
            refreshed_at: row.get("refreshed_at"),
        }
    }
}

#[async_trait]
impl ItemStore for PgItemStore {
    /// List a registry page, pushing the filters down into SQL.
    ///
    /// Must stay behaviorally equal to `registry::evaluate` over
    /// `list_all`: conjunctive filters, stable creation order, totals
    /// over the full filtered set, and an empty slice (never an error)
    /// for pages past the end.
    async fn list(&self, query: &RegistryQuery) -> Result<RegistryPage> {
        let per_page = query.per_page.max(1);
        let title_needle = query.title_contains.as_deref().map(crate::escape_like);
        let type_filter = query.item_type.map(Self::item_type_to_str);
        let folder_filter = query.folder.as_deref().map(folder::normalize);

        let mut where_clause = String::from("WHERE TRUE");
        let mut param_idx = 1;
        if title_needle.is_some() {
            where_clause.push_str(&format!(
                r#" AND title ILIKE '%' || ${} || '%' ESCAPE '\'"#,
                param_idx
            ));
            param_idx += 1;
        }
        if type_filter.is_some() {
            where_clause.push_str(&format!(" AND item_type = ${}", param_idx));
            param_idx += 1;
        }
        if folder_filter.is_some() {
            where_clause.push_str(&format!(" AND folder = ${}", param_idx));
            param_idx += 1;
        }

        let count_query = format!("SELECT COUNT(*) as count FROM item {}", where_clause);
        let total_items: i64 = {
            let mut q = sqlx::query_scalar(&count_query);
            if let Some(needle) = &title_needle {
                q = q.bind(needle.clone());
            }
            if let Some(kind) = type_filter {
                q = q.bind(kind);
            }
            if let Some(path) = &folder_filter {
                q = q.bind(path.clone());
            }
            q.fetch_one(&self.pool).await.map_err(Error::Database)?
        };

        // Out-of-range and nonsensical page numbers degrade to an empty
        // slice with accurate totals rather than an error.
        let offset = query
            .page
            .checked_sub(1)
            .and_then(|page| page.checked_mul(per_page))
            .filter(|offset| *offset >= 0);

        let items = match offset {
            Some(offset) => {
                let page_query = format!(
                    "SELECT {} FROM item {} ORDER BY created_at ASC, id ASC LIMIT ${} OFFSET ${}",
                    ITEM_COLUMNS,
                    where_clause,
                    param_idx,
                    param_idx + 1
                );
                let mut q = sqlx::query(&page_query);
                if let Some(needle) = &title_needle {
                    q = q.bind(needle.clone());
                }
                if let Some(kind) = type_filter {
                    q = q.bind(kind);
                }
                if let Some(path) = &folder_filter {
                    q = q.bind(path.clone());
                }
                q = q.bind(per_page).bind(offset);
                let rows = q.fetch_all(&self.pool).await.map_err(Error::Database)?;
                rows.into_iter().map(Self::parse_item_row).collect()
            }
            None => Vec::new(),
        };

        Ok(RegistryPage {
            items,
            page: query.page,
            per_page,
            total_items,
            total_pages: registry::total_pages(total_items, per_page),
        })
    }

    async fn list_all(&self) -> Result<Vec<Item>> {
        let query = format!(
            "SELECT {} FROM item ORDER BY created_at ASC, id ASC",
            ITEM_COLUMNS
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.into_iter().map(Self::parse_item_row).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Item>> {
        let query = format!("SELECT {} FROM item WHERE id = $1", ITEM_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(Self::parse_item_row))
    }

    async fn upsert(&self, new_item: NewItem) -> Result<Item> {
        let folder = folder::normalize(&new_item.folder);
        let auto_metadata = match &new_item.auto_metadata {
            Some(metadata) => Some(serde_json::to_value(metadata)?),
            None => None,
        };
        let now = Utc::now();
        let query = format!(
            r#"
            INSERT INTO item (id, title, item_type, folder, notion_id, auto_metadata,
                              index_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'ready', $7)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                item_type = EXCLUDED.item_type,
                folder = EXCLUDED.folder,
                notion_id = EXCLUDED.notion_id,
                auto_metadata = EXCLUDED.auto_metadata
            RETURNING {}
            "#,
            ITEM_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(&new_item.id)
            .bind(&new_item.title)
            .bind(Self::item_type_to_str(new_item.item_type))
            .bind(&folder)
            .bind(&new_item.notion_id)
            .bind(auto_metadata)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(Self::parse_item_row(row))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM item_content WHERE item_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let result = sqlx::query("DELETE FROM item WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::ItemNotFound(id.to_string()));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn move_to_folder(&self, id: &str, folder_path: &str) -> Result<()> {
        let folder = folder::normalize(folder_path);
        let result = sqlx::query("UPDATE item SET folder = $1 WHERE id = $2")
            .bind(&folder)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::ItemNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn bulk_update_folder(&self, old_prefix: &str, new_prefix: &str) -> Result<i64> {
        let old_prefix = folder::normalize(old_prefix);
        let new_prefix = folder::normalize(new_prefix);
        if old_prefix.is_empty() {
            return Err(Error::InvalidInput(
                "Cannot bulk-move items out of the root folder".to_string(),
            ));
        }

        let mut conn = self.pool.acquire().await.map_err(Error::Database)?;
        rewrite_item_folders(&mut *conn, &old_prefix, &new_prefix).await
    }

    async fn set_index_status(
        &self,
        id: &str,
        status: IndexStatus,
        error: Option<&str>,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE item SET index_status = $1, index_error = $2 WHERE id = $3")
            .bind(Self::index_status_to_str(status))
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }

    async fn complete_refresh(&self, id: &str, title: Option<&str>, body: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // The conditional update also locks the item row, so a racing
        // delete waits until this transaction resolves.
        let result = sqlx::query(
            r#"
            UPDATE item
            SET title = COALESCE($2, title), index_status = 'ready', index_error = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(title)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO item_content (item_id, body, refreshed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (item_id) DO UPDATE SET
                body = EXCLUDED.body,
                refreshed_at = EXCLUDED.refreshed_at
            "#,
        )
        .bind(id)
        .bind(body)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(true)
    }

    async fn set_auto_metadata(&self, id: &str, metadata: &AutoMetadata) -> Result<()> {
        let value = serde_json::to_value(metadata)?;
        let result = sqlx::query("UPDATE item SET auto_metadata = $1 WHERE id = $2")
            .bind(value)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::ItemNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn get_content(&self, id: &str) -> Result<Option<ItemContent>> {
        let row =
            sqlx::query("SELECT item_id, body, refreshed_at FROM item_content WHERE item_id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(row.map(Self::parse_content_row))
    }
}

/// Single-statement rewrite of the folder prefix of every contained
/// item, so a prefix rename is atomic. The WHERE clause matches on
/// segment boundaries only: `math` matches `math` and `math/...` but
/// never `math2`. Prefixes arrive normalized, `old_prefix` non-empty.
///
/// Takes a connection rather than the pool so the folder-tree store can
/// run it inside the transaction that also rewrites the registry.
pub(crate) async fn rewrite_item_folders(
    conn: &mut sqlx::PgConnection,
    old_prefix: &str,
    new_prefix: &str,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        UPDATE item
        SET folder = CASE
            WHEN folder = $1 THEN $2
            WHEN $2 = '' THEN substring(folder FROM char_length($1) + 2)
            ELSE $2 || substring(folder FROM char_length($1) + 1)
        END
        WHERE folder = $1 OR left(folder, char_length($1) + 1) = $1 || '/'
        "#,
    )
    .bind(old_prefix)
    .bind(new_prefix)
    .execute(&mut *conn)
    .await
    .map_err(Error::Database)?;
    Ok(result.rows_affected() as i64)
}
