//! Claim loop for background jobs.
//!
//! A [`JobWorker`] polls the queue for jobs whose types it has handlers
//! for, runs up to a configured number of them concurrently, and settles
//! each outcome back into the queue. Lifecycle and progress are mirrored
//! onto a broadcast channel so observers (tests, future push channels)
//! can follow along without polling.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use llog_core::{defaults, Job, JobQueue, JobType, Result};

use crate::handler::{JobContext, JobHandler, JobResult};

/// Worker tuning.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long to sleep between polls when the queue is empty.
    pub poll_interval_ms: u64,
    /// Upper bound on jobs processed at the same time.
    pub max_concurrent_jobs: usize,
    /// A disabled worker starts and immediately exits its loop.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::JOB_POLL_INTERVAL_MS,
            max_concurrent_jobs: defaults::JOB_MAX_CONCURRENT,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Worker tuning from the environment.
    ///
    /// | Variable | Default | Meaning |
    /// |----------|---------|---------|
    /// | `JOB_WORKER_ENABLED` | `true` | Process jobs at all |
    /// | `JOB_MAX_CONCURRENT` | `4` | Concurrent job ceiling |
    /// | `JOB_POLL_INTERVAL_MS` | `1000` | Empty-queue poll interval |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);
        let max_concurrent_jobs = std::env::var("JOB_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::JOB_MAX_CONCURRENT)
            .max(1);
        let poll_interval_ms = std::env::var("JOB_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_POLL_INTERVAL_MS);

        Self {
            poll_interval_ms,
            max_concurrent_jobs,
            enabled,
        }
    }

    /// Override the empty-queue poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Override the concurrent job ceiling.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    /// Turn processing on or off.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Lifecycle notifications mirrored onto the worker's broadcast channel.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    JobStarted {
        job_id: Uuid,
        job_type: JobType,
    },
    JobProgress {
        job_id: Uuid,
        percent: i32,
        message: Option<String>,
    },
    JobCompleted {
        job_id: Uuid,
        job_type: JobType,
    },
    JobFailed {
        job_id: Uuid,
        job_type: JobType,
        error: String,
    },
    WorkerStarted,
    WorkerStopped,
}

/// Control handle for a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Ask the worker loop to stop after the current batch.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| llog_core::Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Subscribe to worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Background worker driving jobs from a [`JobQueue`] through registered
/// [`JobHandler`]s.
pub struct JobWorker {
    jobs: Arc<dyn JobQueue>,
    config: WorkerConfig,
    handlers: Arc<RwLock<HashMap<JobType, Arc<dyn JobHandler>>>>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorker {
    pub fn new(jobs: Arc<dyn JobQueue>, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            jobs,
            config,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
        }
    }

    /// Register the handler for a job type, replacing any previous one.
    pub async fn register_handler<H: JobHandler + 'static>(&self, handler: H) {
        let job_type = handler.job_type();
        self.handlers.write().await.insert(job_type, Arc::new(handler));
        debug!(?job_type, "Registered job handler");
    }

    /// Spawn the claim loop and hand back its control handle.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Job worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.config.max_concurrent_jobs,
            "Job worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Job worker received shutdown signal");
                break;
            }

            let batch = self.claim_batch(self.config.max_concurrent_jobs).await;
            if batch.is_empty() {
                // Nothing claimable; sleep unless shutdown arrives first.
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Job worker received shutdown signal");
                        break;
                    }
                    _ = sleep(poll_interval) => {}
                }
                continue;
            }

            debug!(claimed = batch.len(), "Processing job batch");
            let mut tasks = tokio::task::JoinSet::new();
            for job in batch {
                let runner = self.runner();
                tasks.spawn(async move { runner.execute(job).await });
            }
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    error!(error = ?e, "Job task panicked");
                }
            }
            // Batch done; loop straight back to claiming.
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Job worker stopped");
    }

    /// Claim up to `limit` jobs of the handled types. Stops early when the
    /// queue runs dry or a claim fails.
    async fn claim_batch(&self, limit: usize) -> Vec<Job> {
        let job_types: Vec<JobType> = self.handlers.read().await.keys().copied().collect();

        let mut batch = Vec::new();
        for _ in 0..limit {
            match self.jobs.claim_next_for_types(&job_types).await {
                Ok(Some(job)) => batch.push(job),
                Ok(None) => break,
                Err(e) => {
                    error!(error = ?e, "Failed to claim job");
                    break;
                }
            }
        }
        batch
    }

    fn runner(&self) -> JobRunner {
        JobRunner {
            jobs: self.jobs.clone(),
            handlers: self.handlers.clone(),
            event_tx: self.event_tx.clone(),
        }
    }

    /// Subscribe to worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Jobs currently waiting in the queue.
    pub async fn pending_count(&self) -> Result<i64> {
        self.jobs.pending_count().await
    }
}

/// Owned clones of the worker state one spawned job task needs.
struct JobRunner {
    jobs: Arc<dyn JobQueue>,
    handlers: Arc<RwLock<HashMap<JobType, Arc<dyn JobHandler>>>>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobRunner {
    async fn execute(self, job: Job) {
        let started = Instant::now();
        let job_id = job.id;
        let job_type = job.job_type;

        info!(?job_id, ?job_type, "Processing job");
        let _ = self
            .event_tx
            .send(WorkerEvent::JobStarted { job_id, job_type });

        let handler = self.handlers.read().await.get(&job_type).cloned();
        let result = match handler {
            Some(handler) => self.dispatch(handler, job).await,
            None => {
                warn!(?job_type, "No handler registered for job type");
                JobResult::Failed(format!("No handler for job type: {:?}", job_type))
            }
        };

        self.settle(job_id, job_type, started, result).await;
    }

    /// Run the handler under the per-job timeout, forwarding progress
    /// reports to the queue row and the event channel.
    async fn dispatch(&self, handler: Arc<dyn JobHandler>, job: Job) -> JobResult {
        let job_id = job.id;
        let jobs = self.jobs.clone();
        let event_tx = self.event_tx.clone();
        let ctx = JobContext::new(job).with_progress_callback(move |percent, message| {
            let _ = event_tx.send(WorkerEvent::JobProgress {
                job_id,
                percent,
                message: message.map(String::from),
            });
            let jobs = jobs.clone();
            let message = message.map(String::from);
            tokio::spawn(async move {
                if let Err(e) = jobs.update_progress(job_id, percent, message.as_deref()).await {
                    warn!(error = ?e, ?job_id, "Failed to persist job progress");
                }
            });
        });

        let budget = Duration::from_secs(defaults::JOB_TIMEOUT_SECS);
        match tokio::time::timeout(budget, handler.execute(ctx)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?job_id, "Job exceeded timeout of {}s", defaults::JOB_TIMEOUT_SECS);
                JobResult::Failed(format!(
                    "Job exceeded timeout of {}s",
                    defaults::JOB_TIMEOUT_SECS
                ))
            }
        }
    }

    /// Record the outcome in the queue and mirror it onto the event
    /// channel.
    async fn settle(&self, job_id: Uuid, job_type: JobType, started: Instant, result: JobResult) {
        match result {
            JobResult::Success(data) => {
                if let Err(e) = self.jobs.complete(job_id, data).await {
                    error!(error = ?e, ?job_id, "Failed to mark job as completed");
                    return;
                }
                info!(
                    ?job_id,
                    ?job_type,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Job completed"
                );
                let _ = self
                    .event_tx
                    .send(WorkerEvent::JobCompleted { job_id, job_type });
            }
            JobResult::Failed(error) | JobResult::Retry(error) => {
                if let Err(e) = self.jobs.fail(job_id, &error).await {
                    error!(error = ?e, ?job_id, "Failed to mark job as failed");
                    return;
                }
                warn!(
                    ?job_id,
                    ?job_type,
                    %error,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Job failed"
                );
                let _ = self.event_tx.send(WorkerEvent::JobFailed {
                    job_id,
                    job_type,
                    error,
                });
            }
        }
    }
}

/// Assembles a [`JobWorker`] with its handlers in one expression.
pub struct WorkerBuilder {
    jobs: Arc<dyn JobQueue>,
    config: WorkerConfig,
    handlers: Vec<Box<dyn JobHandler>>,
}

impl WorkerBuilder {
    pub fn new(jobs: Arc<dyn JobQueue>) -> Self {
        Self {
            jobs,
            config: WorkerConfig::default(),
            handlers: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_handler<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub async fn build(self) -> JobWorker {
        let worker = JobWorker::new(self.jobs, self.config);
        for handler in self.handlers {
            let job_type = handler.job_type();
            worker
                .handlers
                .write()
                .await
                .insert(job_type, Arc::from(handler));
        }
        worker
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_follow_shared_constants() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval_ms, defaults::JOB_POLL_INTERVAL_MS);
        assert_eq!(config.max_concurrent_jobs, defaults::JOB_MAX_CONCURRENT);
        assert!(config.enabled);
    }

    #[test]
    fn test_config_overrides_compose() {
        let config = WorkerConfig::default()
            .with_poll_interval(100)
            .with_max_concurrent(8)
            .with_enabled(false);

        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.max_concurrent_jobs, 8);
        assert!(!config.enabled);
    }

    #[test]
    fn test_events_are_cloneable_for_broadcast() {
        let job_id = Uuid::new_v4();
        let event = WorkerEvent::JobStarted {
            job_id,
            job_type: JobType::Refresh,
        };

        match event.clone() {
            WorkerEvent::JobStarted {
                job_id: id,
                job_type,
            } => {
                assert_eq!(id, job_id);
                assert_eq!(job_type, JobType::Refresh);
            }
            _ => panic!("Wrong event variant"),
        }
    }

    #[test]
    fn test_failed_event_carries_the_error_text() {
        let event = WorkerEvent::JobFailed {
            job_id: Uuid::new_v4(),
            job_type: JobType::Refresh,
            error: "origin unreachable".to_string(),
        };

        match event {
            WorkerEvent::JobFailed { error, .. } => {
                assert_eq!(error, "origin unreachable");
            }
            _ => panic!("Wrong event variant"),
        }
    }
}
