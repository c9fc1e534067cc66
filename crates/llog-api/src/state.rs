//! Shared application state.

use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::RateLimiter;
use llog_core::{FolderStore, FolderTreeStore, ItemStore, JobQueue, MetadataBackend};

/// Global (not per-client) rate limiter.
pub type GlobalRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Handles shared by every request handler.
///
/// Constructed once at startup and injected through axum state; handlers
/// never reach for process globals. The store handles are trait objects,
/// so tests run the same handlers over the in-memory stores.
#[derive(Clone)]
pub struct AppState {
    pub items: Arc<dyn ItemStore>,
    pub folders: Arc<dyn FolderStore>,
    /// Atomic rename/delete across items and the folder registry.
    pub folder_tree: Arc<dyn FolderTreeStore>,
    pub jobs: Arc<dyn JobQueue>,
    /// Metadata generation backend; `None` when not configured.
    pub metadata: Option<Arc<dyn MetadataBackend>>,
    /// `None` disables rate limiting.
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}
