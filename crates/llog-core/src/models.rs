//! Core data models for llog.
//!
//! These types are shared across all llog crates and represent
//! the core domain entities of the content registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// =============================================================================
// ITEM TYPES
// =============================================================================

/// Kind of content an item holds.
///
/// `Page` and `Database` originate in Notion and can be re-fetched from
/// there; the remaining kinds are imported local documents whose origin
/// copy is not retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Notion page
    Page,
    /// Notion database
    Database,
    /// Imported PDF document
    Pdf,
    /// Imported plain-text document
    Text,
    /// Imported markdown document
    Markdown,
    /// Imported document of unrecognized format
    Document,
}

impl ItemType {
    /// Whether this item kind has a live origin that refresh can re-fetch.
    pub fn is_refreshable(&self) -> bool {
        matches!(self, Self::Page | Self::Database)
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Database => write!(f, "database"),
            Self::Pdf => write!(f, "pdf"),
            Self::Text => write!(f, "text"),
            Self::Markdown => write!(f, "markdown"),
            Self::Document => write!(f, "document"),
        }
    }
}

impl std::str::FromStr for ItemType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "page" => Ok(Self::Page),
            "database" => Ok(Self::Database),
            "pdf" => Ok(Self::Pdf),
            "text" => Ok(Self::Text),
            "markdown" => Ok(Self::Markdown),
            "document" => Ok(Self::Document),
            _ => Err(format!("Invalid item type: {}", s)),
        }
    }
}

/// Indexing state of an item's backing content.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    /// Refresh queued, not yet started
    Pending,
    /// Refresh in progress; last-known-good content still served
    Indexing,
    /// Content indexed and current
    #[default]
    Ready,
    /// Last refresh failed; last-known-good content still served
    Failed,
}

impl std::fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Indexing => write!(f, "indexing"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for IndexStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "indexing" => Ok(Self::Indexing),
            "ready" => Ok(Self::Ready),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid index status: {}", s)),
        }
    }
}

/// AI-derived descriptive metadata attached to an item.
///
/// Scalar fields left `None` and list fields left empty are omitted from
/// serialized output. `auto_generated` records whether the current values
/// came from the metadata backend or a manual edit merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AutoMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "contentType", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub themes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<String>,
    #[serde(default)]
    pub auto_generated: bool,
}

/// Field-wise patch applied over existing [`AutoMetadata`].
///
/// Absent fields leave the stored value untouched; present fields replace
/// it wholesale (lists included). Used by the manual metadata edit path.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct MetadataPatch {
    pub summary: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "contentType")]
    pub content_type: Option<String>,
    pub themes: Option<Vec<String>>,
    pub topics: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub entities: Option<Vec<String>>,
}

impl MetadataPatch {
    /// True when the patch carries no metadata fields at all.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.language.is_none()
            && self.content_type.is_none()
            && self.themes.is_none()
            && self.topics.is_none()
            && self.keywords.is_none()
            && self.entities.is_none()
    }
}

impl AutoMetadata {
    /// Merge a manual edit into this metadata, field by field.
    ///
    /// Edited metadata is marked `auto_generated` so a later wholesale
    /// regeneration is allowed to replace it.
    pub fn apply_patch(&mut self, patch: &MetadataPatch) {
        if let Some(summary) = &patch.summary {
            self.summary = Some(summary.clone());
        }
        if let Some(language) = &patch.language {
            self.language = Some(language.clone());
        }
        if let Some(content_type) = &patch.content_type {
            self.content_type = Some(content_type.clone());
        }
        if let Some(themes) = &patch.themes {
            self.themes = themes.clone();
        }
        if let Some(topics) = &patch.topics {
            self.topics = topics.clone();
        }
        if let Some(keywords) = &patch.keywords {
            self.keywords = keywords.clone();
        }
        if let Some(entities) = &patch.entities {
            self.entities = entities.clone();
        }
        self.auto_generated = true;
    }
}

/// A registered content item.
///
/// The `folder` field is a `/`-separated virtual path; `""` is the root.
/// Folders have no identity of their own beyond the registry: an item at
/// `a/b/c` makes `a`, `a/b`, and `a/b/c` exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Item {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub folder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notion_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_metadata: Option<AutoMetadata>,
    pub index_status: IndexStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request for creating or replacing an item.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub id: String,
    pub title: String,
    pub item_type: ItemType,
    pub folder: String,
    pub notion_id: Option<String>,
    pub auto_metadata: Option<AutoMetadata>,
}

/// Indexed content backing an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemContent {
    pub item_id: String,
    pub body: String,
    pub refreshed_at: DateTime<Utc>,
}

/// Content fetched from an item's origin during a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct OriginContent {
    /// Origin-side title, when the origin supplies one.
    pub title: Option<String>,
    /// Flattened plain-text body.
    pub body: String,
}

// =============================================================================
// FOLDER TYPES
// =============================================================================

/// A folder entry in the registry listing.
///
/// Folders are virtual: this is derived from item paths plus explicitly
/// registered (possibly empty) folders. `item_count` counts items whose
/// folder equals `path` exactly, not descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct FolderInfo {
    pub path: String,
    pub name: String,
    pub item_count: i64,
}

// =============================================================================
// JOB TYPES
// =============================================================================

/// Status of a job in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether the job still occupies the queue (not yet terminal).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

/// Type of job to process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Re-fetch an item's content from its origin and re-index it
    Refresh,
}

impl JobType {
    /// Default priority for this job type (higher = more urgent)
    pub fn default_priority(&self) -> i32 {
        match self {
            JobType::Refresh => 5,
        }
    }
}

/// A job in the processing queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub item_id: Option<String>,
    pub job_type: JobType,
    pub status: JobStatus,
    pub priority: i32,
    pub payload: Option<JsonValue>,
    pub result: Option<JsonValue>,
    pub error_message: Option<String>,
    pub progress_percent: i32,
    pub progress_message: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Queue statistics summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: i64,
    pub running: i64,
    pub completed_last_hour: i64,
    pub failed_last_hour: i64,
    pub total: i64,
}
