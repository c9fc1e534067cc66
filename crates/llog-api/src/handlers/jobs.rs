//! Job queue HTTP handlers.
//!
//! Read-only views over the background queue: single-job lookup for
//! polling after a refresh is queued, plus aggregate counters.

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::{ApiError, AppState};
use llog_core::{Job, QueueStats};

/// Fetch a queue job by id.
///
/// # Returns
/// - 200: the job, including progress and any error message
/// - 404: no job with that id
#[utoipa::path(get, path = "/api/v1/jobs/{id}", tag = "Jobs",
    responses((status = 200, description = "The job"),
              (status = 404, description = "Job not found")))]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
    let job = state
        .jobs
        .get(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Job '{}' not found", id)))?;
    Ok(Json(job))
}

/// Queue statistics: pending/running counts and recent outcomes.
#[utoipa::path(get, path = "/api/v1/jobs/stats", tag = "Jobs",
    responses((status = 200, description = "Queue statistics")))]
pub async fn queue_stats(State(state): State<AppState>) -> Result<Json<QueueStats>, ApiError> {
    Ok(Json(state.jobs.stats().await?))
}

/// Number of jobs waiting to be claimed.
#[utoipa::path(get, path = "/api/v1/jobs/pending", tag = "Jobs",
    responses((status = 200, description = "Pending job count")))]
pub async fn pending_jobs(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let pending = state.jobs.pending_count().await?;
    Ok(Json(serde_json::json!({ "pending": pending })))
}
