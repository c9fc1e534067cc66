//! In-memory store implementations.
//!
//! Reference implementations of [`ItemStore`], [`FolderStore`], and
//! [`JobQueue`] backed by mutex-guarded collections. They define the
//! observable semantics the Postgres-backed stores in `llog-db` must
//! match, and they let the HTTP handlers and the job worker run in tests
//! without a database.
//!
//! Not intended for production use: nothing persists across restarts.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::defaults;
use crate::error::{Error, Result};
use crate::folder;
use crate::models::*;
use crate::traits::{FolderStore, FolderTreeStore, ItemStore, JobQueue};
use crate::uuid_utils::new_v7;

// =============================================================================
// ITEM STORE
// =============================================================================

#[derive(Default)]
struct ItemsInner {
    /// Items in creation order; this order is the stable listing order.
    items: Vec<Item>,
    content: HashMap<String, ItemContent>,
}

/// In-memory [`ItemStore`].
#[derive(Default)]
pub struct MemoryItemStore {
    inner: Mutex<ItemsInner>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with items in the given order.
    pub async fn with_items(items: Vec<NewItem>) -> Result<Self> {
        let store = Self::new();
        for item in items {
            store.upsert(item).await?;
        }
        Ok(store)
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn list_all(&self) -> Result<Vec<Item>> {
        Ok(self.inner.lock().await.items.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Item>> {
        let inner = self.inner.lock().await;
        Ok(inner.items.iter().find(|item| item.id == id).cloned())
    }

    async fn upsert(&self, item: NewItem) -> Result<Item> {
        let mut inner = self.inner.lock().await;
        let folder = folder::normalize(&item.folder);
        if let Some(existing) = inner.items.iter_mut().find(|i| i.id == item.id) {
            existing.title = item.title;
            existing.item_type = item.item_type;
            existing.folder = folder;
            existing.notion_id = item.notion_id;
            existing.auto_metadata = item.auto_metadata;
            return Ok(existing.clone());
        }
        let stored = Item {
            id: item.id,
            title: item.title,
            item_type: item.item_type,
            folder,
            notion_id: item.notion_id,
            auto_metadata: item.auto_metadata,
            index_status: IndexStatus::Ready,
            index_error: None,
            created_at: Utc::now(),
        };
        inner.items.push(stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let position = inner
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| Error::ItemNotFound(id.to_string()))?;
        inner.items.remove(position);
        inner.content.remove(id);
        Ok(())
    }

    async fn move_to_folder(&self, id: &str, folder_path: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let item = inner
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| Error::ItemNotFound(id.to_string()))?;
        item.folder = folder::normalize(folder_path);
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
        let mut inner = self.inner.lock().await;
        let mut moved = 0_i64;
        for item in inner.items.iter_mut() {
            if let Some(updated) = folder::replace_prefix(&item.folder, &old_prefix, &new_prefix) {
                item.folder = updated;
                moved += 1;
            }
        }
        Ok(moved)
    }

    async fn set_index_status(
        &self,
        id: &str,
        status: IndexStatus,
        error: Option<&str>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        match inner.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.index_status = status;
                item.index_error = error.map(str::to_string);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn complete_refresh(&self, id: &str, title: Option<&str>, body: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let Some(item) = inner.items.iter_mut().find(|item| item.id == id) else {
            return Ok(false);
        };
        if let Some(title) = title {
            item.title = title.to_string();
        }
        item.index_status = IndexStatus::Ready;
        item.index_error = None;
        let record = ItemContent {
            item_id: id.to_string(),
            body: body.to_string(),
            refreshed_at: Utc::now(),
        };
        inner.content.insert(id.to_string(), record);
        Ok(true)
    }

    async fn set_auto_metadata(&self, id: &str, metadata: &AutoMetadata) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let item = inner
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| Error::ItemNotFound(id.to_string()))?;
        item.auto_metadata = Some(metadata.clone());
        Ok(())
    }

    async fn get_content(&self, id: &str) -> Result<Option<ItemContent>> {
        Ok(self.inner.lock().await.content.get(id).cloned())
    }
}

// =============================================================================
// FOLDER STORE
// =============================================================================

/// In-memory [`FolderStore`].
#[derive(Default)]
pub struct MemoryFolderStore {
    paths: Mutex<BTreeSet<String>>,
}

impl MemoryFolderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FolderStore for MemoryFolderStore {
    async fn registered(&self) -> Result<Vec<String>> {
        Ok(self.paths.lock().await.iter().cloned().collect())
    }

    async fn register(&self, path: &str) -> Result<bool> {
        Ok(self.paths.lock().await.insert(path.to_string()))
    }

    async fn unregister(&self, path: &str) -> Result<bool> {
        Ok(self.paths.lock().await.remove(path))
    }

    async fn rename_prefix(&self, old_prefix: &str, new_prefix: &str) -> Result<i64> {
        let mut paths = self.paths.lock().await;
        let affected: Vec<String> = paths
            .iter()
            .filter(|path| folder::is_within(path, old_prefix))
            .cloned()
            .collect();
        for path in &affected {
            paths.remove(path);
            if let Some(updated) = folder::replace_prefix(path, old_prefix, new_prefix) {
                if !updated.is_empty() {
                    paths.insert(updated);
                }
            }
        }
        Ok(affected.len() as i64)
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<i64> {
        let mut paths = self.paths.lock().await;
        let before = paths.len();
        paths.retain(|path| !folder::is_within(path, prefix));
        Ok((before - paths.len()) as i64)
    }
}

// =============================================================================
// FOLDER TREE
// =============================================================================

/// In-memory [`FolderTreeStore`] over the two memory stores.
pub struct MemoryFolderTree {
    items: Arc<MemoryItemStore>,
    folders: Arc<MemoryFolderStore>,
}

impl MemoryFolderTree {
    pub fn new(items: Arc<MemoryItemStore>, folders: Arc<MemoryFolderStore>) -> Self {
        Self { items, folders }
    }
}

#[async_trait]
impl FolderTreeStore for MemoryFolderTree {
    // The item rewrite validates the prefix and is the only fallible
    // step; the registry rewrites below cannot fail. Running it first
    // keeps an error from touching either store.
    async fn rename_tree(&self, old_prefix: &str, new_prefix: &str) -> Result<i64> {
        let moved = self.items.bulk_update_folder(old_prefix, new_prefix).await?;
        self.folders.rename_prefix(old_prefix, new_prefix).await?;
        Ok(moved)
    }

    async fn remove_tree(&self, prefix: &str, parent: &str) -> Result<i64> {
        let moved = self.items.bulk_update_folder(prefix, parent).await?;
        self.folders.remove_prefix(prefix).await?;
        Ok(moved)
    }
}

// =============================================================================
// JOB QUEUE
// =============================================================================

/// In-memory [`JobQueue`].
#[derive(Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn queue(
        &self,
        item_id: Option<&str>,
        job_type: JobType,
        priority: i32,
        payload: Option<JsonValue>,
    ) -> Result<Uuid> {
        let mut jobs = self.jobs.lock().await;
        let job = Job {
            id: new_v7(),
            item_id: item_id.map(str::to_string),
            job_type,
            status: JobStatus::Pending,
            priority,
            payload,
            result: None,
            error_message: None,
            progress_percent: 0,
            progress_message: None,
            retry_count: 0,
            max_retries: defaults::JOB_MAX_RETRIES,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        let id = job.id;
        jobs.push(job);
        Ok(id)
    }

    async fn queue_deduplicated(
        &self,
        item_id: Option<&str>,
        job_type: JobType,
        priority: i32,
        payload: Option<JsonValue>,
    ) -> Result<Option<Uuid>> {
        if let Some(item_id) = item_id {
            let duplicate = {
                let jobs = self.jobs.lock().await;
                jobs.iter().any(|job| {
                    job.item_id.as_deref() == Some(item_id)
                        && job.job_type == job_type
                        && job.status.is_active()
                })
            };
            if duplicate {
                return Ok(None);
            }
        }
        self.queue(item_id, job_type, priority, payload).await.map(Some)
    }

    async fn claim_next_for_types(&self, job_types: &[JobType]) -> Result<Option<Job>> {
        let mut jobs = self.jobs.lock().await;
        let candidate = jobs
            .iter()
            .enumerate()
            .filter(|(_, job)| {
                job.status == JobStatus::Pending
                    && (job_types.is_empty() || job_types.contains(&job.job_type))
            })
            // Highest priority first; FIFO within a priority.
            .min_by_key(|(index, job)| (std::cmp::Reverse(job.priority), job.created_at, *index))
            .map(|(index, _)| index);

        Ok(candidate.map(|index| {
            let job = &mut jobs[index];
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
            job.clone()
        }))
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        percent: i32,
        message: Option<&str>,
    ) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        // Only running jobs accept progress; a report landing after the
        // job finalized must not overwrite the terminal state.
        if let Some(job) = jobs
            .iter_mut()
            .find(|job| job.id == job_id && job.status == JobStatus::Running)
        {
            job.progress_percent = percent.clamp(0, 100);
            job.progress_message = message.map(str::to_string);
        }
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.iter_mut().find(|job| job.id == job_id) {
            job.status = JobStatus::Completed;
            job.result = result;
            job.progress_percent = 100;
            job.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.iter_mut().find(|job| job.id == job_id) {
            if job.retry_count < job.max_retries {
                // Retry: back to pending with incremented retry count.
                job.status = JobStatus::Pending;
                job.retry_count += 1;
                job.error_message = Some(error.to_string());
                job.started_at = None;
                job.progress_percent = 0;
                job.progress_message = None;
            } else {
                job.status = JobStatus::Failed;
                job.error_message = Some(error.to_string());
                job.completed_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.iter().find(|job| job.id == job_id).cloned())
    }

    async fn latest_for_item(&self, item_id: &str) -> Result<Option<Job>> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .iter()
            .rev()
            .find(|job| job.item_id.as_deref() == Some(item_id))
            .cloned())
    }

    async fn pending_count(&self) -> Result<i64> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.iter().filter(|job| job.status == JobStatus::Pending).count() as i64)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let jobs = self.jobs.lock().await;
        let hour_ago = Utc::now() - Duration::hours(1);
        let finished_within_hour = |job: &&Job, status: JobStatus| {
            job.status == status && job.completed_at.is_some_and(|at| at >= hour_ago)
        };
        Ok(QueueStats {
            pending: jobs.iter().filter(|j| j.status == JobStatus::Pending).count() as i64,
            running: jobs.iter().filter(|j| j.status == JobStatus::Running).count() as i64,
            completed_last_hour: jobs
                .iter()
                .filter(|j| finished_within_hour(j, JobStatus::Completed))
                .count() as i64,
            failed_last_hour: jobs
                .iter()
                .filter(|j| finished_within_hour(j, JobStatus::Failed))
                .count() as i64,
            total: jobs.len() as i64,
        })
    }

    async fn cancel(&self, job_id: Uuid) -> Result<bool> {
        let mut jobs = self.jobs.lock().await;
        match jobs.iter_mut().find(|job| job.id == job_id) {
            Some(job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Cancelled;
                job.completed_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
