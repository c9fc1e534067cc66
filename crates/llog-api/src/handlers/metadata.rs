//! Item metadata HTTP handlers.
//!
//! AI-backed wholesale regeneration and manual field-wise editing of the
//! `auto_metadata` block, plus title and folder edits through the same
//! PATCH surface.

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{ApiError, AppState};
use llog_core::{defaults, folder, Item, MetadataPatch, NewItem};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

/// Manual metadata edit.
///
/// Every field is optional; at least one must be present. Provided
/// `auto_metadata` sub-fields are merged field-wise into the stored block,
/// leaving the rest untouched.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    /// Replacement title.
    pub title: Option<String>,
    /// Destination folder path, applied with move semantics.
    pub folder: Option<String>,
    /// Field-wise patch of the descriptive metadata.
    pub auto_metadata: Option<MetadataPatch>,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Regenerate an item's metadata from its indexed content.
///
/// Sends a bounded sample of the content body to the metadata backend and
/// replaces the stored `auto_metadata` wholesale. Nothing is written when
/// the backend call fails.
///
/// # Returns
/// - 200: the updated item
/// - 400: item has no indexed content, or no backend is configured
/// - 404: no item with that id
/// - 502: the backend call failed
#[utoipa::path(post, path = "/api/v1/items/{id}/metadata/generate", tag = "Items",
    responses((status = 200, description = "Metadata regenerated", body = Item),
              (status = 502, description = "Metadata backend failure")))]
pub async fn generate_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    let backend = state
        .metadata
        .clone()
        .ok_or_else(|| ApiError::BadRequest("Metadata backend is not configured".to_string()))?;
    let item = state
        .items
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item '{}' not found", id)))?;
    let content = state.items.get_content(&id).await?.ok_or_else(|| {
        ApiError::BadRequest(format!("Item '{}' has no indexed content to sample", id))
    })?;

    let sample: String = content
        .body
        .chars()
        .take(defaults::METADATA_SAMPLE_CHARS)
        .collect();
    let mut metadata = backend.generate_metadata(&item.title, &sample).await?;
    metadata.auto_generated = true;

    state.items.set_auto_metadata(&id, &metadata).await?;
    info!(item_id = %id, model = backend.model_name(), "Regenerated metadata");

    let item = state
        .items
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item '{}' not found", id)))?;
    Ok(Json(item))
}

/// Edit an item's title, folder, or metadata fields.
///
/// # Request Body
/// See [`UpdateItemRequest`]. A provided `folder` is normalized like a
/// move; a provided `auto_metadata` patch changes only the fields it
/// carries and marks the block `auto_generated`.
///
/// # Returns
/// - 200: the updated item
/// - 400: empty update, or an empty title
/// - 404: no item with that id
#[utoipa::path(patch, path = "/api/v1/items/{id}/metadata", tag = "Items",
    request_body = UpdateItemRequest,
    responses((status = 200, description = "Item updated", body = Item)))]
pub async fn update_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<Item>, ApiError> {
    if req.title.is_none() && req.folder.is_none() && req.auto_metadata.is_none() {
        return Err(ApiError::BadRequest(
            "Update carries no fields".to_string(),
        ));
    }

    let item = state
        .items
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item '{}' not found", id)))?;

    let title = match req.title {
        Some(title) => {
            let trimmed = title.trim().to_string();
            if trimmed.is_empty() {
                return Err(ApiError::BadRequest("Title cannot be empty".to_string()));
            }
            trimmed
        }
        None => item.title.clone(),
    };
    let destination = match req.folder.as_deref() {
        Some(path) => folder::normalize(path),
        None => item.folder.clone(),
    };
    let auto_metadata = match req.auto_metadata {
        Some(patch) => {
            let mut merged = item.auto_metadata.clone().unwrap_or_default();
            merged.apply_patch(&patch);
            Some(merged)
        }
        None => item.auto_metadata.clone(),
    };

    let updated = state
        .items
        .upsert(NewItem {
            id: item.id,
            title,
            item_type: item.item_type,
            folder: destination,
            notion_id: item.notion_id,
            auto_metadata,
        })
        .await?;
    Ok(Json(updated))
}
