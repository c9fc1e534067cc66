//! # llog-api
//!
//! HTTP API server for llog: the content registry view over imported
//! Notion pages, databases, and local documents.
//!
//! Handlers depend only on the `llog-core` store traits, so the whole
//! HTTP surface also runs over the in-memory stores in tests. The binary
//! in `main.rs` wires environment configuration, the Postgres stores, the
//! background refresh worker, and the router assembled in [`routes`].

pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::{AppState, GlobalRateLimiter};
