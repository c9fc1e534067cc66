//! Notion origin client for llog.
//!
//! Refresh jobs re-fetch the live title and content of Notion-backed items
//! through [`NotionClient`], which implements
//! [`OriginFetcher`](llog_core::OriginFetcher):
//!
//! - **Pages**: block children are walked depth-first and flattened to
//!   plain text, one line per text-bearing block.
//! - **Databases**: every page in the database is fetched and the page
//!   bodies are concatenated, separated by blank lines.
//!
//! # Example
//!
//! ```rust,no_run
//! use llog_notion::{NotionClient, NotionConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     // From NOTION_TOKEN / NOTION_VERSION environment variables
//!     let client = NotionClient::from_env().unwrap();
//!
//!     let content = client.fetch_page("a1b2c3d4-...").await.unwrap();
//!     println!("{:?}: {} chars", content.title, content.body.len());
//! }
//! ```

pub mod client;
pub mod types;

// Re-export core types
pub use llog_core::*;

pub use client::{NotionClient, NotionConfig, DEFAULT_NOTION_URL};
