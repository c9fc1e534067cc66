//! The seam between the worker loop and per-type job logic.
//!
//! A [`JobHandler`] owns everything specific to one [`JobType`]; the
//! worker stays generic and only sees [`JobContext`] in and
//! [`JobResult`] out.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use llog_core::{Job, JobType};

/// Sink for handler progress reports. Installed by the worker; handlers
/// never see it directly.
pub type ProgressCallback = Box<dyn Fn(i32, Option<&str>) + Send + Sync>;

/// What a handler receives for one claimed job: the job row itself plus
/// a channel for progress reports.
pub struct JobContext {
    /// The claimed job.
    pub job: Job,
    progress_callback: Option<ProgressCallback>,
}

impl JobContext {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            progress_callback: None,
        }
    }

    /// Install the progress sink.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(i32, Option<&str>) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Report progress. Silently a no-op when no sink is installed, so
    /// handlers can report unconditionally.
    pub fn report_progress(&self, percent: i32, message: Option<&str>) {
        if let Some(ref callback) = self.progress_callback {
            callback(percent, message);
        }
    }

    /// The item this job targets, when it targets one.
    pub fn item_id(&self) -> Option<&str> {
        self.job.item_id.as_deref()
    }

    /// The job's payload, when one was queued with it.
    pub fn payload(&self) -> Option<&JsonValue> {
        self.job.payload.as_ref()
    }
}

/// A handler's verdict on one job.
#[derive(Debug)]
pub enum JobResult {
    /// Done; the payload, if any, is stored on the job row.
    Success(Option<JsonValue>),
    /// Permanently failed with the given reason.
    Failed(String),
    /// Failed, but worth another attempt if the retry budget allows.
    Retry(String),
}

/// One of these per [`JobType`], registered with the worker at startup.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The single job type this handler accepts.
    fn job_type(&self) -> JobType;

    /// Run the job to a verdict. Infrastructure errors should become
    /// [`JobResult::Failed`] or [`JobResult::Retry`], not panics.
    async fn execute(&self, ctx: JobContext) -> JobResult;

    fn can_handle(&self, job_type: JobType) -> bool {
        self.job_type() == job_type
    }
}

/// Handler that succeeds immediately after two progress reports. Lets
/// lifecycle tests exercise the worker without touching real handlers.
pub struct NoOpHandler {
    job_type: JobType,
}

impl NoOpHandler {
    pub fn new(job_type: JobType) -> Self {
        Self { job_type }
    }
}

#[async_trait]
impl JobHandler for NoOpHandler {
    fn job_type(&self) -> JobType {
        self.job_type
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        ctx.report_progress(50, Some("Processing..."));
        ctx.report_progress(100, Some("Done"));
        JobResult::Success(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llog_core::JobStatus;
    use serde_json::json;
    use uuid::Uuid;

    fn sample_job(item_id: Option<&str>, payload: Option<JsonValue>) -> Job {
        Job {
            id: Uuid::new_v4(),
            item_id: item_id.map(String::from),
            job_type: JobType::Refresh,
            status: JobStatus::Pending,
            priority: 5,
            payload,
            result: None,
            error_message: None,
            progress_percent: 0,
            progress_message: None,
            retry_count: 0,
            max_retries: 0,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_job_context_accessors() {
        let job = sample_job(Some("item-1"), Some(json!({"reason": "manual"})));
        let ctx = JobContext::new(job.clone());

        assert_eq!(ctx.job.id, job.id);
        assert_eq!(ctx.item_id(), Some("item-1"));
        assert_eq!(ctx.payload().unwrap()["reason"], "manual");
        assert!(ctx.progress_callback.is_none());
    }

    #[test]
    fn test_job_context_without_item_or_payload() {
        let ctx = JobContext::new(sample_job(None, None));
        assert!(ctx.item_id().is_none());
        assert!(ctx.payload().is_none());
    }

    #[test]
    fn test_report_progress_without_callback_does_not_panic() {
        let ctx = JobContext::new(sample_job(None, None));
        ctx.report_progress(30, Some("fetching"));
        ctx.report_progress(100, None);
    }

    #[test]
    fn test_progress_callback_sees_every_report() {
        use std::sync::{Arc, Mutex};

        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();

        let ctx = JobContext::new(sample_job(Some("item-1"), None)).with_progress_callback(
            move |percent, message| {
                sink.lock()
                    .unwrap()
                    .push((percent, message.map(String::from)));
            },
        );

        ctx.report_progress(40, Some("fetching origin copy"));
        ctx.report_progress(100, None);

        let seen = reports.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (40, Some("fetching origin copy".to_string())),
                (100, None),
            ]
        );
    }

    #[tokio::test]
    async fn test_noop_handler_reports_progress_and_succeeds() {
        use std::sync::{Arc, Mutex};

        let handler = NoOpHandler::new(JobType::Refresh);
        assert_eq!(handler.job_type(), JobType::Refresh);
        assert!(handler.can_handle(JobType::Refresh));

        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();

        let ctx = JobContext::new(sample_job(None, None)).with_progress_callback(
            move |percent, message| {
                sink.lock()
                    .unwrap()
                    .push((percent, message.map(String::from)));
            },
        );

        let result = handler.execute(ctx).await;
        assert!(matches!(result, JobResult::Success(None)));

        let seen = reports.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], (100, Some("Done".to_string())));
    }

    #[test]
    fn test_result_variants_pattern_match() {
        assert!(matches!(
            JobResult::Success(Some(json!({"status": "ok"}))),
            JobResult::Success(Some(_))
        ));
        assert!(matches!(
            JobResult::Failed("origin unreachable".to_string()),
            JobResult::Failed(_)
        ));
        assert!(matches!(
            JobResult::Retry("pool exhausted".to_string()),
            JobResult::Retry(_)
        ));
    }
}
