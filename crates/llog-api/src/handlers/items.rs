//! Item registry HTTP handlers.
//!
//! Listing with filters and pagination, single-item reads, moves between
//! folders, deletion, refresh queueing, and refresh status polling.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{ApiError, AppState};
use llog_core::{
    defaults, folder, IndexStatus, Item, ItemType, Job, JobType, RegistryQuery,
};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

/// Query parameters for the item listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListItemsQuery {
    /// Case-insensitive title substring filter.
    pub title: Option<String>,
    /// Item type filter; `all` (or absent) means every type.
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    /// Exact folder path filter; empty string selects the root folder.
    pub folder: Option<String>,
    /// 1-indexed page number (default 1).
    pub page: Option<i64>,
    /// Page size; one of 5, 10, 25, 50 (default 10).
    pub per_page: Option<i64>,
}

/// Pagination metadata accompanying a listing page.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginationMeta {
    pub page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

/// One page of the filtered registry.
#[derive(Debug, Serialize, ToSchema)]
pub struct ListItemsResponse {
    pub data: Vec<Item>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MoveItemRequest {
    /// Destination folder path; empty string is the root.
    pub folder: String,
}

/// Acknowledgement for a queued refresh.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshAccepted {
    pub job_id: Uuid,
    pub item_id: String,
    pub index_status: IndexStatus,
}

/// Condensed view of a queue job for status polling.
#[derive(Debug, Serialize, ToSchema)]
pub struct JobSummary {
    pub id: Uuid,
    pub status: llog_core::JobStatus,
    pub progress_percent: i32,
    pub progress_message: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobSummary {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            status: job.status,
            progress_percent: job.progress_percent,
            progress_message: job.progress_message,
            error_message: job.error_message,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ItemStatusResponse {
    pub index_status: IndexStatus,
    pub index_error: Option<String>,
    /// Latest refresh job for this item, when one exists.
    pub job: Option<JobSummary>,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// List registry items with filters and pagination.
///
/// # Query Parameters
/// See [`ListItemsQuery`]. Filters are conjunctive; ordering is stable
/// creation order. Out-of-range pages return an empty `data` array with
/// accurate pagination metadata.
///
/// # Returns
/// - 200: one page plus pagination metadata
/// - 400: page below 1, page size outside the allowed set, unknown type
#[utoipa::path(get, path = "/api/v1/items", tag = "Items",
    params(ListItemsQuery),
    responses((status = 200, description = "One page of items", body = ListItemsResponse)))]
pub async fn list_items(
    State(state): State<AppState>,
    Query(params): Query<ListItemsQuery>,
) -> Result<Json<ListItemsResponse>, ApiError> {
    let page = params.page.unwrap_or(defaults::DEFAULT_PAGE);
    let per_page = params.per_page.unwrap_or(defaults::DEFAULT_PER_PAGE);
    if !defaults::ALLOWED_PER_PAGE.contains(&per_page) {
        return Err(ApiError::BadRequest(format!(
            "per_page must be one of {:?}",
            defaults::ALLOWED_PER_PAGE
        )));
    }
    if page < 1 {
        return Err(ApiError::BadRequest("page numbers start at 1".to_string()));
    }

    let item_type = match params.item_type.as_deref() {
        None | Some("") => None,
        Some(raw) if raw.eq_ignore_ascii_case("all") => None,
        Some(raw) => Some(raw.parse::<ItemType>().map_err(ApiError::BadRequest)?),
    };

    let mut query = RegistryQuery::new().page(page).per_page(per_page);
    if let Some(title) = params.title.filter(|t| !t.is_empty()) {
        query = query.with_title(title);
    }
    if let Some(kind) = item_type {
        query = query.with_type(kind);
    }
    if let Some(path) = params.folder {
        query = query.in_folder(path);
    }

    let result = state.items.list(&query).await?;
    Ok(Json(ListItemsResponse {
        data: result.items,
        pagination: PaginationMeta {
            page: result.page,
            per_page: result.per_page,
            total_items: result.total_items,
            total_pages: result.total_pages,
        },
    }))
}

/// Fetch a single item.
///
/// # Returns
/// - 200: the item
/// - 404: no item with that id
#[utoipa::path(get, path = "/api/v1/items/{id}", tag = "Items",
    responses((status = 200, description = "The item", body = Item),
              (status = 404, description = "Item not found")))]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .items
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item '{}' not found", id)))?;
    Ok(Json(item))
}

/// Move an item to a folder.
///
/// The destination path is normalized (separators trimmed, empty segments
/// dropped); moving an item to the folder it is already in succeeds
/// without change.
///
/// # Request Body
/// `{ "folder": "math/algebra" }` — empty string moves to the root.
///
/// # Returns
/// - 200: the updated item
/// - 404: no item with that id
#[utoipa::path(post, path = "/api/v1/items/{id}/move", tag = "Items",
    request_body = MoveItemRequest,
    responses((status = 200, description = "Item moved", body = Item),
              (status = 404, description = "Item not found")))]
pub async fn move_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MoveItemRequest>,
) -> Result<Json<Item>, ApiError> {
    let destination = folder::normalize(&req.folder);
    state.items.move_to_folder(&id, &destination).await?;
    let item = state
        .items
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item '{}' not found", id)))?;
    Ok(Json(item))
}

/// Queue a refresh of the item's content from its origin.
///
/// Only `page` and `database` items carrying an origin reference can be
/// refreshed. The item is marked `pending` and a `Refresh` job is queued;
/// the worker performs the fetch off the request path.
///
/// # Returns
/// - 202: refresh queued, body carries the job id
/// - 400: item type has no origin, or the origin reference is missing
/// - 404: no item with that id
/// - 409: a refresh for this item is already pending or running
#[utoipa::path(post, path = "/api/v1/items/{id}/refresh", tag = "Items",
    responses((status = 202, description = "Refresh queued", body = RefreshAccepted),
              (status = 409, description = "Refresh already in flight")))]
pub async fn refresh_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<RefreshAccepted>), ApiError> {
    let item = state
        .items
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item '{}' not found", id)))?;
    if !item.item_type.is_refreshable() {
        return Err(ApiError::BadRequest(format!(
            "Items of type '{}' have no origin to refresh",
            item.item_type
        )));
    }
    if item.notion_id.is_none() {
        return Err(ApiError::BadRequest(format!(
            "Item '{}' has no origin reference",
            id
        )));
    }

    // Reject up front so a conflicting request mutates nothing.
    if let Some(job) = state.jobs.latest_for_item(&id).await? {
        if job.status.is_active() {
            return Err(ApiError::Conflict(format!(
                "A refresh for item '{}' is already in flight",
                id
            )));
        }
    }

    state
        .items
        .set_index_status(&id, IndexStatus::Pending, None)
        .await?;
    let job_id = state
        .jobs
        .queue_deduplicated(
            Some(&id),
            JobType::Refresh,
            JobType::Refresh.default_priority(),
            None,
        )
        .await?
        .ok_or_else(|| {
            ApiError::Conflict(format!("A refresh for item '{}' is already in flight", id))
        })?;

    info!(item_id = %id, job_id = %job_id, "Queued refresh");
    Ok((
        StatusCode::ACCEPTED,
        Json(RefreshAccepted {
            job_id,
            item_id: id,
            index_status: IndexStatus::Pending,
        }),
    ))
}

/// Poll an item's indexing status.
///
/// # Returns
/// - 200: `index_status`, `index_error`, and the latest refresh job when
///   one exists
/// - 404: no item with that id
#[utoipa::path(get, path = "/api/v1/items/{id}/status", tag = "Items",
    responses((status = 200, description = "Indexing status", body = ItemStatusResponse)))]
pub async fn item_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItemStatusResponse>, ApiError> {
    let item = state
        .items
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item '{}' not found", id)))?;
    let job = state.jobs.latest_for_item(&id).await?.map(JobSummary::from);
    Ok(Json(ItemStatusResponse {
        index_status: item.index_status,
        index_error: item.index_error,
        job,
    }))
}

/// Delete an item.
///
/// Removes the registry row and its backing content in one transaction;
/// a deleted item never reappears in any listing.
///
/// # Returns
/// - 204: deleted
/// - 404: no item with that id
#[utoipa::path(delete, path = "/api/v1/items/{id}", tag = "Items",
    responses((status = 204, description = "Deleted"),
              (status = 404, description = "Item not found")))]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.items.delete(&id).await?;
    info!(item_id = %id, "Deleted item");
    Ok(StatusCode::NO_CONTENT)
}
