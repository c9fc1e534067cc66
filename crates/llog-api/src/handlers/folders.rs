//! Folder HTTP handlers.
//!
//! Folders are a virtual hierarchy derived from item paths plus
//! explicitly registered empty folders; these handlers expose the derived
//! index and the create/rename/delete mutations over it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{ApiError, AppState};
use llog_core::{folder, FolderInfo};

// =============================================================================
// REQUEST/RESPONSE TYPES
// =============================================================================

/// One navigation step within a folder path.
#[derive(Debug, Serialize, ToSchema)]
pub struct Breadcrumb {
    /// Segment label.
    pub name: String,
    /// Cumulative path up to and including this segment.
    pub path: String,
}

/// One folder in the derived index.
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderEntry {
    pub path: String,
    pub name: String,
    /// Items whose folder equals this path exactly.
    pub item_count: i64,
    pub breadcrumbs: Vec<Breadcrumb>,
}

impl From<FolderInfo> for FolderEntry {
    fn from(info: FolderInfo) -> Self {
        let breadcrumbs = folder::breadcrumbs(&info.path)
            .into_iter()
            .map(|(name, path)| Breadcrumb { name, path })
            .collect();
        Self {
            path: info.path,
            name: info.name,
            item_count: info.item_count,
            breadcrumbs,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateFolderRequest {
    /// Full path of the folder to register, e.g. `math/algebra`.
    pub path: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RenameFolderRequest {
    /// Path of the folder to rename.
    pub path: String,
    /// Replacement for the final path segment.
    pub new_name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RenameFolderResponse {
    /// Path of the folder after the rename.
    pub path: String,
    /// Items whose folder path was rewritten.
    pub items_moved: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteFolderRequest {
    /// Path of the folder to delete.
    pub path: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteFolderResponse {
    /// Parent that received the folder's contents.
    pub parent: String,
    /// Items whose folder path was rewritten.
    pub items_moved: i64,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// List every folder, derived and registered, with breadcrumbs.
///
/// The root folder is always first; the rest are sorted by path. Each
/// entry counts only the items sitting exactly at that path.
#[utoipa::path(get, path = "/api/v1/folders", tag = "Folders",
    responses((status = 200, description = "Folder index", body = [FolderEntry])))]
pub async fn list_folders(
    State(state): State<AppState>,
) -> Result<Json<Vec<FolderEntry>>, ApiError> {
    let items = state.items.list_all().await?;
    let registered = state.folders.registered().await?;
    let entries = folder::folder_index(&items, &registered)
        .into_iter()
        .map(FolderEntry::from)
        .collect();
    Ok(Json(entries))
}

/// Register an empty folder.
///
/// # Request Body
/// `{ "path": "math/algebra" }` — the parent must already exist (the root
/// always does).
///
/// # Returns
/// - 201: the registered folder
/// - 400: empty path
/// - 404: parent folder does not exist
/// - 409: a folder with that path already exists
#[utoipa::path(post, path = "/api/v1/folders", tag = "Folders",
    request_body = CreateFolderRequest,
    responses((status = 201, description = "Folder registered", body = FolderEntry),
              (status = 409, description = "Folder already exists")))]
pub async fn create_folder(
    State(state): State<AppState>,
    Json(req): Json<CreateFolderRequest>,
) -> Result<(StatusCode, Json<FolderEntry>), ApiError> {
    let path = folder::normalize(&req.path);
    if path.is_empty() {
        return Err(ApiError::BadRequest("Folder path cannot be empty".to_string()));
    }

    let items = state.items.list_all().await?;
    let registered = state.folders.registered().await?;
    if let Some(parent) = folder::parent(&path) {
        if !folder::folder_exists(parent, &items, &registered) {
            return Err(ApiError::NotFound(format!(
                "Parent folder '{}' not found",
                parent
            )));
        }
    }
    if folder::folder_exists(&path, &items, &registered) {
        return Err(ApiError::Conflict(format!("Folder '{}' already exists", path)));
    }

    state.folders.register(&path).await?;
    info!(folder = %path, "Registered folder");

    let entry = FolderEntry::from(FolderInfo {
        name: folder::name(&path).unwrap_or_default().to_string(),
        path,
        item_count: 0,
    });
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Rename a folder, re-foldering its whole subtree.
///
/// Replaces the final path segment. Every item under the old prefix has
/// the prefix rewritten; registered empty folders under it move too.
/// Matching is exact on segment boundaries, so renaming `math` never
/// touches `math2`.
///
/// # Returns
/// - 200: new path and the number of items moved
/// - 400: root rename, or a new name that is not a single segment
/// - 404: source folder does not exist
/// - 409: target folder already exists
#[utoipa::path(post, path = "/api/v1/folders/rename", tag = "Folders",
    request_body = RenameFolderRequest,
    responses((status = 200, description = "Folder renamed", body = RenameFolderResponse),
              (status = 409, description = "Target already exists")))]
pub async fn rename_folder(
    State(state): State<AppState>,
    Json(req): Json<RenameFolderRequest>,
) -> Result<Json<RenameFolderResponse>, ApiError> {
    let path = folder::normalize(&req.path);
    if path.is_empty() {
        return Err(ApiError::BadRequest("Cannot rename the root folder".to_string()));
    }
    let new_name = folder::normalize(&req.new_name);
    if new_name.is_empty() || new_name.contains('/') {
        return Err(ApiError::BadRequest(
            "New folder name must be a single non-empty path segment".to_string(),
        ));
    }

    let items = state.items.list_all().await?;
    let registered = state.folders.registered().await?;
    if !folder::folder_exists(&path, &items, &registered) {
        return Err(ApiError::NotFound(format!("Folder '{}' not found", path)));
    }
    let new_path = match folder::parent(&path) {
        Some(parent) if !parent.is_empty() => format!("{}/{}", parent, new_name),
        _ => new_name,
    };
    if folder::folder_exists(&new_path, &items, &registered) {
        return Err(ApiError::Conflict(format!(
            "Folder '{}' already exists",
            new_path
        )));
    }

    let items_moved = state.folder_tree.rename_tree(&path, &new_path).await?;
    info!(folder = %path, new_folder = %new_path, moved_count = items_moved, "Renamed folder");

    Ok(Json(RenameFolderResponse {
        path: new_path,
        items_moved,
    }))
}

/// Delete a folder, cascading its contents to the parent.
///
/// The deleted prefix is replaced with the parent prefix in every
/// contained item's path, so direct members land in the parent and nested
/// subtrees keep their shape one level up. Registered empty folders under
/// the prefix are dropped.
///
/// # Returns
/// - 200: receiving parent and the number of items moved
/// - 400: root deletion
/// - 404: folder does not exist
#[utoipa::path(post, path = "/api/v1/folders/delete", tag = "Folders",
    request_body = DeleteFolderRequest,
    responses((status = 200, description = "Folder deleted", body = DeleteFolderResponse)))]
pub async fn delete_folder(
    State(state): State<AppState>,
    Json(req): Json<DeleteFolderRequest>,
) -> Result<Json<DeleteFolderResponse>, ApiError> {
    let path = folder::normalize(&req.path);
    if path.is_empty() {
        return Err(ApiError::BadRequest("Cannot delete the root folder".to_string()));
    }

    let items = state.items.list_all().await?;
    let registered = state.folders.registered().await?;
    if !folder::folder_exists(&path, &items, &registered) {
        return Err(ApiError::NotFound(format!("Folder '{}' not found", path)));
    }

    let parent = folder::parent(&path).unwrap_or_default().to_string();
    let items_moved = state.folder_tree.remove_tree(&path, &parent).await?;
    info!(folder = %path, moved_count = items_moved, "Deleted folder");

    Ok(Json(DeleteFolderResponse {
        parent,
        items_moved,
    }))
}
