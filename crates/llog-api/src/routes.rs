//! Router assembly and ambient HTTP middleware.
//!
//! The middleware stack, outermost first: body size limit, CORS,
//! request-id stamping and propagation, trace spans, global rate limit.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{folders, items, jobs, metadata};
use crate::openapi::ApiDoc;
use crate::state::AppState;
use llog_core::{defaults, new_v7};

/// Request-id maker producing time-ordered UUIDv7 ids.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = new_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// CORS origins from `ALLOWED_ORIGINS` (comma-separated), with localhost
/// development defaults.
fn parse_allowed_origins() -> Vec<HeaderValue> {
    let origins = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());
    origins
        .split(',')
        .filter_map(|origin| {
            let trimmed = origin.trim();
            match trimmed.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

/// Global rate limit gate; passes straight through when no limiter is
/// configured.
async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            tracing::warn!("Rate limit exceeded");
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "rate_limit_exceeded",
                    "error_description": "Too many requests. Please wait before retrying."
                })),
            ));
        }
    }
    Ok(next.run(request).await)
}

/// Service liveness probe.
#[utoipa::path(get, path = "/health", tag = "System",
    responses((status = 200, description = "Service is healthy")))]
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Whether global rate limiting is active.
#[utoipa::path(get, path = "/api/v1/rate-limit", tag = "System",
    responses((status = 200, description = "Rate limiter state")))]
pub async fn rate_limit_status(State(state): State<AppState>) -> impl IntoResponse {
    match &state.rate_limiter {
        Some(_) => Json(serde_json::json!({
            "enabled": true,
            "message": "Global rate limiting is active"
        })),
        None => Json(serde_json::json!({
            "enabled": false,
            "message": "Rate limiting is disabled"
        })),
    }
}

/// Assemble the full router: API routes, Swagger UI, and the middleware
/// stack.
pub fn build_router(state: AppState) -> Router {
    let app = Router::new()
        .route("/api/v1/items", get(items::list_items))
        .route(
            "/api/v1/items/:id",
            get(items::get_item).delete(items::delete_item),
        )
        .route("/api/v1/items/:id/move", post(items::move_item))
        .route("/api/v1/items/:id/refresh", post(items::refresh_item))
        .route("/api/v1/items/:id/status", get(items::item_status))
        .route(
            "/api/v1/items/:id/metadata",
            patch(metadata::update_metadata),
        )
        .route(
            "/api/v1/items/:id/metadata/generate",
            post(metadata::generate_metadata),
        )
        .route(
            "/api/v1/folders",
            get(folders::list_folders).post(folders::create_folder),
        )
        .route("/api/v1/folders/rename", post(folders::rename_folder))
        .route("/api/v1/folders/delete", post(folders::delete_folder))
        .route("/api/v1/jobs/stats", get(jobs::queue_stats))
        .route("/api/v1/jobs/pending", get(jobs::pending_jobs))
        .route("/api/v1/jobs/:id", get(jobs::get_job))
        .route("/api/v1/rate-limit", get(rate_limit_status))
        .route("/health", get(health_check));

    let swagger = SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi());

    app.merge(swagger)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(parse_allowed_origins()))
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
                .allow_credentials(true)
                .max_age(Duration::from_secs(defaults::CORS_MAX_AGE_SECS)),
        )
        .layer(RequestBodyLimitLayer::new(defaults::MAX_BODY_SIZE_BYTES))
        .with_state(state)
}
