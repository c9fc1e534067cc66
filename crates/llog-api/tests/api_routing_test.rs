//! Integration tests for the assembled router and middleware stack.
//!
//! This test suite validates:
//! - Route wiring: health probe, item listing, folder mutations reachable
//!   at their documented paths; unknown paths 404
//! - Error body shape: failures serialize as `{"error": message}`
//! - Middleware: request-id propagation, CORS allow-listing, request body
//!   size limiting
//! - The generated OpenAPI document is served and names the API routes
//!
//! Requests are driven through `tower::ServiceExt::oneshot`, so the full
//! stack runs in-process with no listener.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::util::ServiceExt;
use uuid::Uuid;

use llog_api::{build_router, AppState};
use llog_core::{
    is_v7, ItemType, MemoryFolderStore, MemoryFolderTree, MemoryItemStore, MemoryJobQueue, NewItem,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn new_item(id: &str, title: &str, item_type: ItemType, folder: &str) -> NewItem {
    NewItem {
        id: id.to_string(),
        title: title.to_string(),
        item_type,
        folder: folder.to_string(),
        notion_id: None,
        auto_metadata: None,
    }
}

async fn test_router(items: Vec<NewItem>) -> axum::Router {
    let items = Arc::new(
        MemoryItemStore::with_items(items)
            .await
            .expect("Failed to seed item store"),
    );
    let folders = Arc::new(MemoryFolderStore::new());
    build_router(AppState {
        items: items.clone(),
        folders: folders.clone(),
        folder_tree: Arc::new(MemoryFolderTree::new(items, folders)),
        jobs: Arc::new(MemoryJobQueue::new()),
        metadata: None,
        rate_limiter: None,
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

fn post_json(uri: &str, payload: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request should build")
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should collect");
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

// ============================================================================
// ROUTES
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_reports_version() {
    let app = test_router(vec![]).await;
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = test_router(vec![]).await;
    let response = app.oneshot(get("/api/v1/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_listing_with_query_parameters() {
    let app = test_router(vec![
        new_item("1", "Algebra Notes", ItemType::Pdf, ""),
        new_item("2", "Algebra Exam", ItemType::Pdf, "math"),
        new_item("3", "History", ItemType::Text, "history"),
    ])
    .await;

    // `type` is the wire name of the item-type filter.
    let response = app
        .clone()
        .oneshot(get("/api/v1/items?type=pdf&title=algebra&per_page=5"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(body["pagination"]["total_items"], 2);
    assert_eq!(body["pagination"]["per_page"], 5);

    let rejected = app
        .oneshot(get("/api/v1/items?per_page=7"))
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_error_bodies_carry_a_single_error_field() {
    let app = test_router(vec![]).await;
    let response = app.oneshot(get("/api/v1/items/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json_body(response).await;
    assert_eq!(body["error"], "Item 'missing' not found");
    assert_eq!(body.as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_folder_creation_round_trips_through_the_router() {
    let app = test_router(vec![]).await;

    let created = app
        .clone()
        .oneshot(post_json("/api/v1/folders", r#"{"path": "projects"}"#))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = json_body(created).await;
    assert_eq!(body["path"], "projects");
    assert_eq!(body["item_count"], 0);

    let listed = app.oneshot(get("/api/v1/folders")).await.unwrap();
    let body = json_body(listed).await;
    let paths: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|folder| folder["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["", "projects"]);
}

#[tokio::test]
async fn test_rate_limit_status_reflects_configuration() {
    let app = test_router(vec![]).await;
    let response = app.oneshot(get("/api/v1/rate-limit")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["enabled"], false);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = test_router(vec![]).await;
    let response = app.oneshot(get("/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["info"]["title"], "Llog API");
    let paths = body["paths"].as_object().unwrap();
    assert!(paths.contains_key("/api/v1/items"));
    assert!(paths.contains_key("/api/v1/folders/rename"));
}

// ============================================================================
// MIDDLEWARE
// ============================================================================

#[tokio::test]
async fn test_responses_carry_a_time_ordered_request_id() {
    let app = test_router(vec![]).await;
    let response = app.oneshot(get("/health")).await.unwrap();

    let header = response
        .headers()
        .get("x-request-id")
        .expect("request id header present");
    let id: Uuid = header
        .to_str()
        .unwrap()
        .parse()
        .expect("request id is a UUID");
    assert!(is_v7(&id));
}

#[tokio::test]
async fn test_cors_preflight_allows_known_origins_only() {
    let app = test_router(vec![]).await;

    let preflight = |origin: &str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/items")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .expect("request should build")
    };

    let allowed = app
        .clone()
        .oneshot(preflight("http://localhost:3000"))
        .await
        .unwrap();
    assert_eq!(
        allowed
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );

    let denied = app
        .oneshot(preflight("http://evil.example"))
        .await
        .unwrap();
    assert!(denied
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_oversized_request_bodies_are_rejected() {
    let app = test_router(vec![]).await;
    let oversized = format!(
        r#"{{"path": "{}"}}"#,
        "x".repeat(3 * 1024 * 1024)
    );
    let response = app
        .oneshot(post_json("/api/v1/folders", &oversized))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
