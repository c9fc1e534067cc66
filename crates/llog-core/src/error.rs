//! The error type shared by every llog crate.
//!
//! Variants are grouped by what the caller can do about them: lookups
//! that missed, input the caller can fix, conflicts the caller can
//! retry differently, and infrastructure failures the caller can only
//! report. The API layer maps these onto HTTP statuses.

use thiserror::Error;

/// Result type alias using llog's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for llog operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A query or statement against the backing store failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A resource other than an item or folder was missing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No item with this id in the registry.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// No folder at this path in the registry.
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// The origin system (Notion, file source) could not supply content.
    #[error("Origin fetch error: {0}")]
    OriginFetch(String),

    /// Metadata generation against the model backend failed.
    #[error("Inference error: {0}")]
    Inference(String),

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// JSON encode/decode failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The caller supplied something the operation cannot accept.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// State conflict (duplicate folder, refresh already queued)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An outbound HTTP request failed below the protocol level.
    #[error("Request error: {0}")]
    Request(String),

    /// Invariant breakage that has no better home.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Local filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
