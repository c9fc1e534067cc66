//! Job queue persistence.
//!
//! Claiming uses `FOR UPDATE SKIP LOCKED` so concurrent workers never
//! receive the same job twice. Queueing wakes waiting workers through a
//! shared [`Notify`] handle, keeping the poll interval a fallback rather
//! than the primary latency bound.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use llog_core::uuid_utils::new_v7;
use llog_core::{defaults, Error, Job, JobQueue, JobStatus, JobType, QueueStats, Result};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tokio::sync::Notify;
use uuid::Uuid;

const JOB_COLUMNS: &str = "id, item_id, job_type, status, priority, payload, result, \
     error_message, progress_percent, progress_message, retry_count, max_retries, \
     created_at, started_at, completed_at";

pub struct PgJobQueue {
    pool: Pool<Postgres>,
    notify: Arc<Notify>,
}

impl PgJobQueue {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            notify: Arc::new(Notify::new()),
        }
    }

    /// Create a queue sharing an existing notify handle.
    pub fn with_notify(pool: Pool<Postgres>, notify: Arc<Notify>) -> Self {
        Self { pool, notify }
    }

    /// Handle workers await to learn about newly queued jobs.
    pub fn job_notify(&self) -> Arc<Notify> {
        self.notify.clone()
    }

    // The job_type and status columns are text with CHECK constraints,
    // so encoding is a closed mapping in both directions.

    fn encode_type(job_type: JobType) -> &'static str {
        match job_type {
            JobType::Refresh => "refresh",
        }
    }

    fn decode_type(s: &str) -> JobType {
        match s {
            "refresh" => JobType::Refresh,
            _ => JobType::Refresh,
        }
    }

    fn encode_status(status: JobStatus) -> &'static str {
        match status {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    fn decode_status(s: &str) -> JobStatus {
        match s {
            "pending" => JobStatus::Pending,
            "running" => JobStatus::Running,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            "cancelled" => JobStatus::Cancelled,
            _ => JobStatus::Pending,
        }
    }

    fn row_to_job(row: PgRow) -> Job {
        Job {
            id: row.get("id"),
            item_id: row.get("item_id"),
            job_type: Self::decode_type(row.get("job_type")),
            status: Self::decode_status(row.get("status")),
            priority: row.get("priority"),
            payload: row.get("payload"),
            result: row.get("result"),
            error_message: row.get("error_message"),
            progress_percent: row.get("progress_percent"),
            progress_message: row.get("progress_message"),
            retry_count: row.get("retry_count"),
            max_retries: row.get("max_retries"),
            created_at: row.get("created_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
        }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn queue(
        &self,
        item_id: Option<&str>,
        job_type: JobType,
        priority: i32,
        payload: Option<JsonValue>,
    ) -> Result<Uuid> {
        let job_id = new_v7();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO job_queue (id, item_id, job_type, status, priority, payload, max_retries, created_at)
             VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7)",
        )
        .bind(job_id)
        .bind(item_id)
        .bind(Self::encode_type(job_type))
        .bind(priority)
        .bind(&payload)
        .bind(defaults::JOB_MAX_RETRIES)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        self.notify.notify_waiters();
        Ok(job_id)
    }

    async fn queue_deduplicated(
        &self,
        item_id: Option<&str>,
        job_type: JobType,
        priority: i32,
        payload: Option<JsonValue>,
    ) -> Result<Option<Uuid>> {
        // Atomic check-and-insert so concurrent requests cannot
        // double-queue a job for the same item. Without an item id there
        // is nothing to deduplicate on.
        if let Some(item_id) = item_id {
            let job_id = new_v7();
            let now = Utc::now();

            let result = sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO job_queue (id, item_id, job_type, status, priority, payload, max_retries, created_at)
                 SELECT $1, $2, $3, 'pending', $4, $5, $6, $7
                 WHERE NOT EXISTS (
                     SELECT 1 FROM job_queue
                     WHERE item_id = $2 AND job_type = $3
                       AND status IN ('pending', 'running')
                 )
                 RETURNING id",
            )
            .bind(job_id)
            .bind(item_id)
            .bind(Self::encode_type(job_type))
            .bind(priority)
            .bind(&payload)
            .bind(defaults::JOB_MAX_RETRIES)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

            if result.is_some() {
                self.notify.notify_waiters();
            }
            Ok(result)
        } else {
            let job_id = self.queue(item_id, job_type, priority, payload).await?;
            Ok(Some(job_id))
        }
    }

    async fn claim_next_for_types(&self, job_types: &[JobType]) -> Result<Option<Job>> {
        let now = Utc::now();
        let type_strings: Vec<String> = job_types
            .iter()
            .map(|jt| Self::encode_type(*jt).to_string())
            .collect();

        // Filter by job type before locking; an empty array claims any
        // type.
        let query = format!(
            "UPDATE job_queue
             SET status = 'running', started_at = $1
             WHERE id = (
                 SELECT id FROM job_queue
                 WHERE status = 'pending'
                   AND (cardinality($2::text[]) = 0 OR job_type = ANY($2))
                 ORDER BY priority DESC, created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING {}",
            JOB_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(now)
            .bind(&type_strings)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.map(Self::row_to_job))
    }

    async fn update_progress(
        &self,
        job_id: Uuid,
        percent: i32,
        message: Option<&str>,
    ) -> Result<()> {
        // Progress applies to running jobs only; late reports from a
        // handler must not touch a finalized row.
        sqlx::query(
            "UPDATE job_queue SET progress_percent = $1, progress_message = $2
             WHERE id = $3 AND status = 'running'",
        )
        .bind(percent.clamp(0, 100))
        .bind(message)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()> {
        let now = Utc::now();
        sqlx::query(
            "UPDATE job_queue
             SET status = 'completed', completed_at = $1, result = $2, progress_percent = 100
             WHERE id = $3",
        )
        .bind(now)
        .bind(&result)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let counts: Option<(i32, i32)> =
            sqlx::query_as("SELECT retry_count, max_retries FROM job_queue WHERE id = $1")
                .bind(job_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;
        let Some((retry_count, max_retries)) = counts else {
            return Ok(());
        };

        if retry_count < max_retries {
            // Budget left: hand the job back to the pending pool with a
            // clean progress slate.
            sqlx::query(
                "UPDATE job_queue
                 SET status = 'pending', retry_count = $1, error_message = $2,
                     started_at = NULL, progress_percent = 0, progress_message = NULL
                 WHERE id = $3",
            )
            .bind(retry_count + 1)
            .bind(error)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        } else {
            sqlx::query(
                "UPDATE job_queue
                 SET status = 'failed', completed_at = $1, error_message = $2
                 WHERE id = $3",
            )
            .bind(now)
            .bind(error)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        let query = format!("SELECT {} FROM job_queue WHERE id = $1", JOB_COLUMNS);
        let row = sqlx::query(&query)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(Self::row_to_job))
    }

    async fn latest_for_item(&self, item_id: &str) -> Result<Option<Job>> {
        let query = format!(
            "SELECT {} FROM job_queue WHERE item_id = $1 ORDER BY created_at DESC LIMIT 1",
            JOB_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.map(Self::row_to_job))
    }

    async fn pending_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_queue WHERE status = 'pending'")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }

    async fn stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) FILTER (WHERE status = 'pending') as pending,
                COUNT(*) FILTER (WHERE status = 'running') as running,
                COUNT(*) FILTER (WHERE status = 'completed' AND completed_at > NOW() - INTERVAL '1 hour') as completed_last_hour,
                COUNT(*) FILTER (WHERE status = 'failed' AND completed_at > NOW() - INTERVAL '1 hour') as failed_last_hour,
                COUNT(*) as total
             FROM job_queue",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(QueueStats {
            pending: row.get::<i64, _>("pending"),
            running: row.get::<i64, _>("running"),
            completed_last_hour: row.get::<i64, _>("completed_last_hour"),
            failed_last_hour: row.get::<i64, _>("failed_last_hour"),
            total: row.get::<i64, _>("total"),
        })
    }

    async fn cancel(&self, job_id: Uuid) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE job_queue
             SET status = 'cancelled', completed_at = $1
             WHERE id = $2 AND status = 'pending'",
        )
        .bind(now)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_type_str_roundtrip() {
        assert_eq!(PgJobQueue::encode_type(JobType::Refresh), "refresh");
        assert_eq!(PgJobQueue::decode_type("refresh"), JobType::Refresh);
    }

    #[test]
    fn test_job_status_str_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            let s = PgJobQueue::encode_status(status);
            assert_eq!(PgJobQueue::decode_status(s), status);
        }
    }

    #[test]
    fn test_str_to_job_status_unknown_falls_back() {
        assert_eq!(PgJobQueue::decode_status("paused"), JobStatus::Pending);
    }
}
