//! Core traits for llog abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability. The HTTP
//! layer and the job worker only see these traits; Postgres-backed
//! implementations live in `llog-db`, origin and inference clients in
//! `llog-notion` and `llog-inference`.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::registry::{self, RegistryPage, RegistryQuery};

// =============================================================================
// ITEM STORE
// =============================================================================

/// Store for registry items and their backing indexed content.
///
/// Implementations keep `list_all` in stable creation order (`created_at`
/// ascending, item id as tiebreaker) and store folder paths normalized.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// List one page of items matching the query.
    ///
    /// The default implementation runs the pure registry engine over
    /// `list_all`. Stores may override it to push filtering into the
    /// backend, provided the observable semantics stay identical.
    async fn list(&self, query: &RegistryQuery) -> Result<RegistryPage> {
        let items = self.list_all().await?;
        Ok(registry::evaluate(&items, query))
    }

    /// List every item in stable creation order.
    async fn list_all(&self) -> Result<Vec<Item>>;

    /// Fetch an item by ID.
    async fn get(&self, id: &str) -> Result<Option<Item>>;

    /// Create or replace an item.
    ///
    /// Replacing keeps the original `created_at` (and thus list position)
    /// and indexing state; only the descriptive fields change.
    async fn upsert(&self, item: NewItem) -> Result<Item>;

    /// Delete an item together with its backing content, as a single
    /// logical transaction. No partial deletes are observable.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Move an item to a folder. Idempotent: moving to the current
    /// folder succeeds without change.
    async fn move_to_folder(&self, id: &str, folder: &str) -> Result<()>;

    /// Rewrite the folders of every item within `old_prefix` to live
    /// under `new_prefix`, atomically. Segment-boundary safe: renaming
    /// `math` never touches `math2`. Returns the number of items moved.
    ///
    /// `old_prefix` must name a real folder, not the root; the root is
    /// not renameable and an empty prefix is rejected as invalid input.
    async fn bulk_update_folder(&self, old_prefix: &str, new_prefix: &str) -> Result<i64>;

    /// Set an item's indexing status (and error detail, for failures).
    ///
    /// Conditional: returns `false` when the item no longer exists, so a
    /// refresh racing a delete cannot resurrect it.
    async fn set_index_status(
        &self,
        id: &str,
        status: IndexStatus,
        error: Option<&str>,
    ) -> Result<bool>;

    /// Store freshly fetched content, update the title when the origin
    /// supplied one, and mark the item `Ready`, as one transaction.
    /// Returns `false` when the item no longer exists.
    async fn complete_refresh(&self, id: &str, title: Option<&str>, body: &str) -> Result<bool>;

    /// Replace an item's descriptive metadata.
    async fn set_auto_metadata(&self, id: &str, metadata: &AutoMetadata) -> Result<()>;

    /// Fetch the backing content for an item, if any has been indexed.
    async fn get_content(&self, id: &str) -> Result<Option<ItemContent>>;
}

// =============================================================================
// FOLDER STORE
// =============================================================================

/// Store for explicitly registered folders.
///
/// Most folders exist implicitly through item paths; this registry only
/// holds paths created before any item landed in them. Paths are
/// normalized, non-empty strings.
#[async_trait]
pub trait FolderStore: Send + Sync {
    /// All registered paths, sorted.
    async fn registered(&self) -> Result<Vec<String>>;

    /// Register a path. Returns `false` if it was already registered.
    async fn register(&self, path: &str) -> Result<bool>;

    /// Drop a single registered path. Returns `false` if it was absent.
    async fn unregister(&self, path: &str) -> Result<bool>;

    /// Rewrite registered paths within `old_prefix` to live under
    /// `new_prefix`. Returns the number of paths rewritten.
    async fn rename_prefix(&self, old_prefix: &str, new_prefix: &str) -> Result<i64>;

    /// Delete registered paths within `prefix`, the prefix itself
    /// included. Returns the number of paths removed.
    async fn remove_prefix(&self, prefix: &str) -> Result<i64>;
}

// =============================================================================
// FOLDER TREE
// =============================================================================

/// Combined folder-tree mutations spanning items and the folder
/// registry.
///
/// A folder rename or delete must rewrite both sides together: the
/// `folder` column of every contained item and the registered empty
/// folders under the same prefix. Implementations make the pair atomic,
/// so a failure (or crash) leaves items and registry consistent.
#[async_trait]
pub trait FolderTreeStore: Send + Sync {
    /// Re-root every item and registered folder within `old_prefix`
    /// under `new_prefix`, atomically. Returns the number of items
    /// moved. An empty `old_prefix` is rejected as invalid input.
    async fn rename_tree(&self, old_prefix: &str, new_prefix: &str) -> Result<i64>;

    /// Drop every registered folder within `prefix` (the prefix itself
    /// included) and move the contained items under `parent`,
    /// atomically. Returns the number of items moved.
    async fn remove_tree(&self, prefix: &str, parent: &str) -> Result<i64>;
}

// =============================================================================
// JOB QUEUE
// =============================================================================

/// Queue for background jobs (item refresh).
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Queue a new job.
    async fn queue(
        &self,
        item_id: Option<&str>,
        job_type: JobType,
        priority: i32,
        payload: Option<JsonValue>,
    ) -> Result<Uuid>;

    /// Queue a job unless one of the same type is already pending or
    /// running for the same item. Returns `None` when skipped.
    async fn queue_deduplicated(
        &self,
        item_id: Option<&str>,
        job_type: JobType,
        priority: i32,
        payload: Option<JsonValue>,
    ) -> Result<Option<Uuid>>;

    /// Claim the next pending job whose type is in `job_types`, marking
    /// it running. An empty slice claims any type. Safe under concurrent
    /// workers: a job is claimed at most once.
    async fn claim_next_for_types(&self, job_types: &[JobType]) -> Result<Option<Job>>;

    /// Update job progress. Applies only while the job is running; a
    /// report arriving after finalization is ignored.
    async fn update_progress(&self, job_id: Uuid, percent: i32, message: Option<&str>)
        -> Result<()>;

    /// Mark job as completed.
    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()>;

    /// Record a job failure.
    ///
    /// While `retry_count < max_retries` the job goes back to pending
    /// with the count incremented and progress reset; only once retries
    /// are exhausted does it land in `Failed`.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Get job by ID.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Most recently created job for an item, regardless of status.
    async fn latest_for_item(&self, item_id: &str) -> Result<Option<Job>>;

    /// Number of pending jobs.
    async fn pending_count(&self) -> Result<i64>;

    /// Queue statistics.
    async fn stats(&self) -> Result<QueueStats>;

    /// Cancel a pending job. Running jobs are not preempted. Returns
    /// `true` if a job was cancelled.
    async fn cancel(&self, job_id: Uuid) -> Result<bool>;
}

// =============================================================================
// ORIGIN FETCH
// =============================================================================

/// Fetches the current content of an item from its origin system.
///
/// Only Notion-backed items (`page`, `database`) have a live origin;
/// implementations reject other kinds with `Error::InvalidInput`.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    /// Fetch the current title and full content for an item from its
    /// origin.
    async fn fetch_content(&self, item: &Item) -> Result<OriginContent>;
}

// =============================================================================
// INFERENCE
// =============================================================================

/// Backend for AI metadata generation.
#[async_trait]
pub trait MetadataBackend: Send + Sync {
    /// Generate descriptive metadata from an item's title and a sample
    /// of its content. The result replaces existing metadata wholesale.
    async fn generate_metadata(&self, title: &str, sample: &str) -> Result<AutoMetadata>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
