//! Integration tests for JobWorker functionality.
//!
//! This suite validates:
//! - Worker claims and processes queued jobs
//! - Priority ordering with a single-slot worker
//! - Event broadcasting for job lifecycle
//! - Failure handling under the zero-retry default
//! - The refresh handler wired through a running worker
//! - Worker lifecycle (disabled start, graceful shutdown)
//!
//! All tests run against the in-memory queue, so they need no database.

use async_trait::async_trait;
use llog_core::{
    IndexStatus, Item, ItemStore, ItemType, JobQueue, JobStatus, JobType, MemoryItemStore,
    MemoryJobQueue, NewItem, OriginContent, OriginFetcher,
};
use llog_jobs::{
    JobContext, JobHandler, JobResult, NoOpHandler, RefreshHandler, WorkerBuilder, WorkerConfig,
    WorkerEvent,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use uuid::Uuid;

/// Wait for a job to reach a specific status.
async fn wait_for_job_status(
    queue: &Arc<MemoryJobQueue>,
    job_id: Uuid,
    expected_status: JobStatus,
    timeout_secs: u64,
) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed().as_secs() < timeout_secs {
        if let Ok(Some(job)) = queue.get(job_id).await {
            if job.status == expected_status {
                return true;
            }
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Custom test handler that tracks execution order.
struct TrackingHandler {
    executions: Arc<Mutex<Vec<Uuid>>>,
    should_fail: bool,
}

impl TrackingHandler {
    fn new(should_fail: bool) -> (Self, Arc<Mutex<Vec<Uuid>>>) {
        let executions = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                executions: executions.clone(),
                should_fail,
            },
            executions,
        )
    }
}

#[async_trait]
impl JobHandler for TrackingHandler {
    fn job_type(&self) -> JobType {
        JobType::Refresh
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        self.executions.lock().await.push(ctx.job.id);

        if self.should_fail {
            JobResult::Failed("Intentional test failure".to_string())
        } else {
            ctx.report_progress(50, Some("Halfway"));
            JobResult::Success(Some(json!({"result": "ok"})))
        }
    }
}

/// Fetcher stub returning fixed content for any item.
struct StubFetcher;

#[async_trait]
impl OriginFetcher for StubFetcher {
    async fn fetch_content(&self, _item: &Item) -> llog_core::Result<OriginContent> {
        Ok(OriginContent {
            title: Some("Refreshed Title".to_string()),
            body: "refreshed body".to_string(),
        })
    }
}

#[tokio::test]
async fn test_worker_processes_single_job() {
    let queue = Arc::new(MemoryJobQueue::new());
    let job_id = queue
        .queue(None, JobType::Refresh, 10, None)
        .await
        .expect("queue job");

    let worker = WorkerBuilder::new(queue.clone())
        .with_config(WorkerConfig::default().with_poll_interval(50))
        .with_handler(NoOpHandler::new(JobType::Refresh))
        .build()
        .await;

    let handle = worker.start();

    let completed = wait_for_job_status(&queue, job_id, JobStatus::Completed, 5).await;
    assert!(completed, "Job should complete within timeout");

    let job = queue.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress_percent, 100);
    assert!(job.completed_at.is_some());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_single_slot_worker_respects_priority_order() {
    let queue = Arc::new(MemoryJobQueue::new());

    let low = queue.queue(None, JobType::Refresh, 1, None).await.unwrap();
    let high = queue.queue(None, JobType::Refresh, 10, None).await.unwrap();
    let mid = queue.queue(None, JobType::Refresh, 5, None).await.unwrap();

    let (handler, executions) = TrackingHandler::new(false);
    let worker = WorkerBuilder::new(queue.clone())
        .with_config(
            WorkerConfig::default()
                .with_poll_interval(50)
                .with_max_concurrent(1),
        )
        .with_handler(handler)
        .build()
        .await;

    let handle = worker.start();

    for job_id in [low, high, mid] {
        assert!(
            wait_for_job_status(&queue, job_id, JobStatus::Completed, 5).await,
            "All jobs should complete"
        );
    }

    let order = executions.lock().await.clone();
    assert_eq!(order, vec![high, mid, low]);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_disabled_worker_does_not_process() {
    let queue = Arc::new(MemoryJobQueue::new());
    let job_id = queue.queue(None, JobType::Refresh, 5, None).await.unwrap();

    let worker = WorkerBuilder::new(queue.clone())
        .with_config(
            WorkerConfig::default()
                .with_poll_interval(50)
                .with_enabled(false),
        )
        .with_handler(NoOpHandler::new(JobType::Refresh))
        .build()
        .await;

    let _handle = worker.start();
    sleep(Duration::from_millis(300)).await;

    let job = queue.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
}

#[tokio::test]
async fn test_worker_broadcasts_job_lifecycle_events() {
    let queue = Arc::new(MemoryJobQueue::new());

    let worker = WorkerBuilder::new(queue.clone())
        .with_config(WorkerConfig::default().with_poll_interval(50))
        .with_handler(NoOpHandler::new(JobType::Refresh))
        .build()
        .await;

    let handle = worker.start();
    let mut events = handle.events();

    let job_id = queue.queue(None, JobType::Refresh, 5, None).await.unwrap();

    let mut saw_started = false;
    let mut saw_progress = false;
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("worker should emit events before timing out")
            .expect("event channel should stay open");

        match event {
            WorkerEvent::JobStarted { job_id: id, .. } if id == job_id => saw_started = true,
            WorkerEvent::JobProgress { job_id: id, .. } if id == job_id => saw_progress = true,
            WorkerEvent::JobCompleted { job_id: id, .. } if id == job_id => break,
            _ => {}
        }
    }

    assert!(saw_started, "JobStarted should precede completion");
    assert!(saw_progress, "progress reports should be broadcast");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_job_is_final_under_zero_retry_default() {
    let queue = Arc::new(MemoryJobQueue::new());
    let job_id = queue.queue(None, JobType::Refresh, 5, None).await.unwrap();

    let (handler, executions) = TrackingHandler::new(true);
    let worker = WorkerBuilder::new(queue.clone())
        .with_config(WorkerConfig::default().with_poll_interval(50))
        .with_handler(handler)
        .build()
        .await;

    let handle = worker.start();

    let failed = wait_for_job_status(&queue, job_id, JobStatus::Failed, 5).await;
    assert!(failed, "Job should fail within timeout");

    let job = queue.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.retry_count, 0);
    assert!(job
        .error_message
        .unwrap()
        .contains("Intentional test failure"));
    assert!(job.completed_at.is_some());

    // Exactly one execution: no hidden retry.
    assert_eq!(executions.lock().await.len(), 1);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_worker_without_handlers_fails_claimed_jobs() {
    let queue = Arc::new(MemoryJobQueue::new());
    let job_id = queue.queue(None, JobType::Refresh, 5, None).await.unwrap();

    // No handlers registered: the worker claims any type and records the
    // missing handler as the failure.
    let worker = WorkerBuilder::new(queue.clone())
        .with_config(WorkerConfig::default().with_poll_interval(50))
        .build()
        .await;

    let handle = worker.start();

    let failed = wait_for_job_status(&queue, job_id, JobStatus::Failed, 5).await;
    assert!(failed, "Job should fail within timeout");

    let job = queue.get(job_id).await.unwrap().unwrap();
    assert!(job.error_message.unwrap().contains("No handler"));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_refresh_job_end_to_end() {
    let store = Arc::new(MemoryItemStore::new());
    store
        .upsert(NewItem {
            id: "item-1".to_string(),
            title: "Stale Title".to_string(),
            item_type: ItemType::Page,
            folder: "math".to_string(),
            notion_id: Some("abc123".to_string()),
            auto_metadata: None,
        })
        .await
        .expect("seed item");

    let queue = Arc::new(MemoryJobQueue::new());
    let job_id = queue
        .queue(Some("item-1"), JobType::Refresh, 5, None)
        .await
        .unwrap();

    let worker = WorkerBuilder::new(queue.clone())
        .with_config(WorkerConfig::default().with_poll_interval(50))
        .with_handler(RefreshHandler::new(store.clone(), Arc::new(StubFetcher)))
        .build()
        .await;

    let handle = worker.start();

    let completed = wait_for_job_status(&queue, job_id, JobStatus::Completed, 5).await;
    assert!(completed, "Refresh job should complete within timeout");

    let item = store.get("item-1").await.unwrap().unwrap();
    assert_eq!(item.title, "Refreshed Title");
    assert_eq!(item.index_status, IndexStatus::Ready);

    let content = store.get_content("item-1").await.unwrap().unwrap();
    assert_eq!(content.body, "refreshed body");

    let job = queue.get(job_id).await.unwrap().unwrap();
    assert_eq!(job.result.unwrap()["item_id"], "item-1");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_graceful_shutdown_emits_worker_stopped() {
    let queue = Arc::new(MemoryJobQueue::new());

    let worker = WorkerBuilder::new(queue.clone())
        .with_config(WorkerConfig::default().with_poll_interval(50))
        .with_handler(NoOpHandler::new(JobType::Refresh))
        .build()
        .await;

    let handle = worker.start();
    let mut events = handle.events();

    handle.shutdown().await.unwrap();

    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("worker should stop before timing out")
            .expect("event channel should stay open");
        if matches!(event, WorkerEvent::WorkerStopped) {
            break;
        }
    }
}
