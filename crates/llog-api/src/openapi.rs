//! OpenAPI document assembly.

use utoipa::OpenApi;

/// OpenAPI documentation for the llog API, served at `/openapi.json` and
/// browsable through Swagger UI at `/docs`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Llog API",
        version = "0.4.2",
        description = "Content registry over imported Notion pages, databases, and local \
                       documents: filtered listing, folder hierarchy, refresh jobs, and \
                       AI-generated metadata."
    ),
    servers((url = "http://localhost:3000", description = "Local development")),
    paths(
        crate::handlers::items::list_items,
        crate::handlers::items::get_item,
        crate::handlers::items::move_item,
        crate::handlers::items::refresh_item,
        crate::handlers::items::item_status,
        crate::handlers::items::delete_item,
        crate::handlers::metadata::generate_metadata,
        crate::handlers::metadata::update_metadata,
        crate::handlers::folders::list_folders,
        crate::handlers::folders::create_folder,
        crate::handlers::folders::rename_folder,
        crate::handlers::folders::delete_folder,
        crate::handlers::jobs::get_job,
        crate::handlers::jobs::queue_stats,
        crate::handlers::jobs::pending_jobs,
        crate::routes::health_check,
        crate::routes::rate_limit_status,
    ),
    components(schemas(
        llog_core::Item,
        llog_core::ItemType,
        llog_core::IndexStatus,
        llog_core::JobStatus,
        llog_core::AutoMetadata,
        llog_core::MetadataPatch,
        crate::handlers::items::ListItemsResponse,
        crate::handlers::items::PaginationMeta,
        crate::handlers::items::MoveItemRequest,
        crate::handlers::items::RefreshAccepted,
        crate::handlers::items::JobSummary,
        crate::handlers::items::ItemStatusResponse,
        crate::handlers::metadata::UpdateItemRequest,
        crate::handlers::folders::Breadcrumb,
        crate::handlers::folders::FolderEntry,
        crate::handlers::folders::CreateFolderRequest,
        crate::handlers::folders::RenameFolderRequest,
        crate::handlers::folders::RenameFolderResponse,
        crate::handlers::folders::DeleteFolderRequest,
        crate::handlers::folders::DeleteFolderResponse,
    )),
    tags(
        (name = "Items", description = "Content registry items"),
        (name = "Folders", description = "Virtual folder hierarchy"),
        (name = "Jobs", description = "Background job queue"),
        (name = "System", description = "Health and service status")
    )
)]
pub struct ApiDoc;
