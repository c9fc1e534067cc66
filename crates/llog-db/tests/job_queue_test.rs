//! Integration tests for the Postgres job queue.
//!
//! This test suite validates:
//! - Claim ordering (priority first, FIFO within a priority)
//! - Atomic deduplication of active jobs per item
//! - Retry-then-fail semantics with progress reset
//! - Cancellation of pending jobs only
//!
//! Claims compete over a single shared table, so run this suite with
//! `--test-threads=1`.
//!
//! **IMPORTANT**: These tests require a fully migrated PostgreSQL database.
//! Run migrations first: `sqlx migrate run`

use llog_db::test_fixtures::test_pool;
use llog_db::{JobQueue, JobStatus, JobType, PgJobQueue};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

/// Helper to create a queue over an emptied job table.
///
/// Also returns the pool so tests can adjust rows the queue API
/// deliberately does not touch, such as the retry budget.
async fn fresh_queue() -> (PgJobQueue, PgPool) {
    dotenvy::dotenv().ok();
    let pool = test_pool().await;
    sqlx::query("TRUNCATE job_queue")
        .execute(&pool)
        .await
        .expect("failed to clear job queue");
    (PgJobQueue::new(pool.clone()), pool)
}

async fn set_retry_budget(pool: &PgPool, id: Uuid, max_retries: i32) {
    sqlx::query("UPDATE job_queue SET max_retries = $1 WHERE id = $2")
        .bind(max_retries)
        .bind(id)
        .execute(pool)
        .await
        .expect("failed to set retry budget");
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_claim_orders_by_priority_then_fifo() {
    let (queue, _pool) = fresh_queue().await;

    let low_first = queue
        .queue(Some("item-a"), JobType::Refresh, 5, Some(json!({"reason": "manual"})))
        .await
        .unwrap();
    let high = queue.queue(Some("item-b"), JobType::Refresh, 9, None).await.unwrap();
    let low_second = queue.queue(Some("item-c"), JobType::Refresh, 5, None).await.unwrap();

    let first = queue.claim_next_for_types(&[]).await.unwrap().unwrap();
    assert_eq!(first.id, high);
    assert_eq!(first.status, JobStatus::Running);
    assert!(first.started_at.is_some());

    let second = queue.claim_next_for_types(&[JobType::Refresh]).await.unwrap().unwrap();
    assert_eq!(second.id, low_first);
    assert_eq!(second.payload, Some(json!({"reason": "manual"})));

    let third = queue.claim_next_for_types(&[]).await.unwrap().unwrap();
    assert_eq!(third.id, low_second);

    assert!(queue.claim_next_for_types(&[]).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_queue_deduplicated_blocks_active_duplicates() {
    let (queue, _pool) = fresh_queue().await;

    let first = queue
        .queue_deduplicated(Some("item-a"), JobType::Refresh, 5, None)
        .await
        .unwrap();
    let first = first.expect("first job should queue");

    // Pending duplicate is rejected.
    assert!(queue
        .queue_deduplicated(Some("item-a"), JobType::Refresh, 5, None)
        .await
        .unwrap()
        .is_none());

    // Running duplicate is still rejected.
    queue.claim_next_for_types(&[]).await.unwrap().unwrap();
    assert!(queue
        .queue_deduplicated(Some("item-a"), JobType::Refresh, 5, None)
        .await
        .unwrap()
        .is_none());

    // A different item is unaffected.
    assert!(queue
        .queue_deduplicated(Some("item-b"), JobType::Refresh, 5, None)
        .await
        .unwrap()
        .is_some());

    // Once terminal, the item may be queued again.
    queue.complete(first, None).await.unwrap();
    assert!(queue
        .queue_deduplicated(Some("item-a"), JobType::Refresh, 5, None)
        .await
        .unwrap()
        .is_some());

    // Without an item id there is nothing to deduplicate on.
    assert!(queue
        .queue_deduplicated(None, JobType::Refresh, 5, None)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_fail_is_final_by_default() {
    let (queue, _pool) = fresh_queue().await;

    let id = queue.queue(Some("item-a"), JobType::Refresh, 5, None).await.unwrap();
    let claimed = queue.claim_next_for_types(&[]).await.unwrap().unwrap();
    assert_eq!(claimed.id, id);
    queue.fail(id, "origin unavailable").await.unwrap();

    let job = queue.get(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.retry_count, 0);
    assert_eq!(job.error_message.as_deref(), Some("origin unavailable"));
    assert!(job.completed_at.is_some());
    assert!(queue.claim_next_for_types(&[]).await.unwrap().is_none());

    // Failing an unknown job is a no-op, not an error.
    queue.fail(llog_db::uuid_utils::new_v7(), "whatever").await.unwrap();
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_fail_retries_until_budget_exhausted() {
    let (queue, pool) = fresh_queue().await;

    let id = queue.queue(Some("item-a"), JobType::Refresh, 5, None).await.unwrap();
    let max_retries = 2;
    set_retry_budget(&pool, id, max_retries).await;

    for attempt in 0..=max_retries {
        let claimed = queue.claim_next_for_types(&[]).await.unwrap().unwrap();
        assert_eq!(claimed.id, id);
        assert_eq!(claimed.retry_count, attempt);
        queue.update_progress(id, 40, Some("fetching")).await.unwrap();
        queue.fail(id, "origin unavailable").await.unwrap();
    }

    let job = queue.get(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.retry_count, max_retries);
    assert_eq!(job.error_message.as_deref(), Some("origin unavailable"));
    assert!(job.completed_at.is_some());
    assert!(queue.claim_next_for_types(&[]).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_retry_resets_progress() {
    let (queue, pool) = fresh_queue().await;

    let id = queue.queue(Some("item-a"), JobType::Refresh, 5, None).await.unwrap();
    set_retry_budget(&pool, id, 1).await;
    queue.claim_next_for_types(&[]).await.unwrap().unwrap();
    queue.update_progress(id, 250, Some("almost")).await.unwrap();

    let job = queue.get(id).await.unwrap().unwrap();
    assert_eq!(job.progress_percent, 100); // clamped

    queue.fail(id, "flaky origin").await.unwrap();
    let job = queue.get(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.retry_count, 1);
    assert_eq!(job.progress_percent, 0);
    assert!(job.progress_message.is_none());
    assert!(job.started_at.is_none());
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_complete_finalizes_with_result() {
    let (queue, _pool) = fresh_queue().await;

    let id = queue.queue(Some("item-a"), JobType::Refresh, 5, None).await.unwrap();
    queue.claim_next_for_types(&[]).await.unwrap().unwrap();
    queue.update_progress(id, 60, Some("indexing")).await.unwrap();
    queue.complete(id, Some(json!({"chars": 2048}))).await.unwrap();

    let job = queue.get(id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.progress_percent, 100);
    assert_eq!(job.result, Some(json!({"chars": 2048})));
    assert!(job.completed_at.is_some());
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_cancel_pending_only() {
    let (queue, _pool) = fresh_queue().await;

    let pending = queue.queue(Some("item-a"), JobType::Refresh, 5, None).await.unwrap();
    assert!(queue.cancel(pending).await.unwrap());
    let job = queue.get(pending).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Cancelled);
    assert!(job.completed_at.is_some());

    let running = queue.queue(Some("item-b"), JobType::Refresh, 5, None).await.unwrap();
    queue.claim_next_for_types(&[]).await.unwrap().unwrap();
    assert!(!queue.cancel(running).await.unwrap());
    assert_eq!(
        queue.get(running).await.unwrap().unwrap().status,
        JobStatus::Running
    );
}

#[tokio::test]
#[ignore = "requires migrated database"]
async fn test_latest_for_item_and_stats() {
    let (queue, _pool) = fresh_queue().await;

    queue.queue(Some("item-a"), JobType::Refresh, 5, None).await.unwrap();
    let newer = queue.queue(Some("item-a"), JobType::Refresh, 5, None).await.unwrap();

    let latest = queue.latest_for_item("item-a").await.unwrap().unwrap();
    assert_eq!(latest.id, newer);
    assert!(queue.latest_for_item("item-ghost").await.unwrap().is_none());

    assert_eq!(queue.pending_count().await.unwrap(), 2);
    let stats = queue.stats().await.unwrap();
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.running, 0);
    assert_eq!(stats.total, 2);
}
