//! Refresh handler: re-fetches an item's content from its origin.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use llog_core::{IndexStatus, ItemStore, JobType, OriginFetcher};

use crate::handler::{JobContext, JobHandler, JobResult};

/// Handler for `refresh` jobs.
///
/// Re-fetches the item's current title and content from its origin system
/// and re-indexes it. A delete racing the refresh wins: once the item row
/// is gone the handler completes as a no-op instead of resurrecting it.
/// On a fetch failure the item keeps its last indexed content and only the
/// index status flips to `failed`.
pub struct RefreshHandler {
    items: Arc<dyn ItemStore>,
    fetcher: Arc<dyn OriginFetcher>,
}

impl RefreshHandler {
    /// Create a new refresh handler.
    pub fn new(items: Arc<dyn ItemStore>, fetcher: Arc<dyn OriginFetcher>) -> Self {
        Self { items, fetcher }
    }
}

#[async_trait]
impl JobHandler for RefreshHandler {
    fn job_type(&self) -> JobType {
        JobType::Refresh
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let item_id = match ctx.item_id() {
            Some(id) => id.to_string(),
            None => return JobResult::Failed("Refresh job has no item id".into()),
        };

        let item = match self.items.get(&item_id).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                // Deleted after the job was queued; nothing to refresh.
                return JobResult::Success(Some(json!({ "skipped": "item deleted" })));
            }
            Err(e) => return JobResult::Failed(format!("Failed to load item {}: {}", item_id, e)),
        };

        match self
            .items
            .set_index_status(&item_id, IndexStatus::Indexing, None)
            .await
        {
            Ok(true) => {}
            Ok(false) => return JobResult::Success(Some(json!({ "skipped": "item deleted" }))),
            Err(e) => return JobResult::Failed(format!("Failed to mark item indexing: {}", e)),
        }

        ctx.report_progress(10, Some("Fetching from origin"));

        let content = match self.fetcher.fetch_content(&item).await {
            Ok(content) => content,
            Err(e) => {
                let error = e.to_string();
                // The item keeps its last indexed content; only the status flips.
                if let Err(status_err) = self
                    .items
                    .set_index_status(&item_id, IndexStatus::Failed, Some(&error))
                    .await
                {
                    warn!(
                        error = ?status_err,
                        item_id = %item_id,
                        "Failed to record refresh failure"
                    );
                }
                return JobResult::Failed(error);
            }
        };

        ctx.report_progress(80, Some("Storing content"));

        match self
            .items
            .complete_refresh(&item_id, content.title.as_deref(), &content.body)
            .await
        {
            Ok(true) => {
                ctx.report_progress(100, Some("Done"));
                JobResult::Success(Some(json!({
                    "item_id": item_id,
                    "content_bytes": content.body.len(),
                })))
            }
            Ok(false) => JobResult::Success(Some(json!({ "skipped": "item deleted" }))),
            Err(e) => JobResult::Failed(format!("Failed to store refreshed content: {}", e)),
        }
    }
}
