//! Notion API client implementation.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use llog_core::{defaults, Error, Item, ItemType, OriginContent, OriginFetcher, Result};

use crate::types::*;

/// Default Notion API endpoint.
pub const DEFAULT_NOTION_URL: &str = "https://api.notion.com/v1";

/// Page size used for block children and database query pagination.
const PAGE_SIZE: u32 = 100;

// Child pages recurse too, so cap nesting rather than walking an entire
// workspace through one deeply linked page.
const MAX_BLOCK_DEPTH: usize = 16;

/// Configuration for the Notion client.
#[derive(Debug, Clone)]
pub struct NotionConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// Integration token (optional so tests can hit unauthenticated mocks;
    /// the live API rejects tokenless requests).
    pub token: Option<String>,
    /// Value of the `Notion-Version` header.
    pub notion_version: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NOTION_URL.to_string(),
            token: None,
            notion_version: defaults::NOTION_VERSION.to_string(),
            timeout_seconds: defaults::NOTION_TIMEOUT_SECS,
        }
    }
}

/// Client for the Notion REST API.
///
/// Fetches the current title and flattened plain-text content of pages
/// and databases; the [`OriginFetcher`] impl is what the refresh job
/// ultimately calls.
pub struct NotionClient {
    client: Client,
    config: NotionConfig,
}

impl NotionClient {
    /// Create a new client with the given configuration.
    pub fn new(config: NotionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing Notion client: url={}, version={}",
            config.base_url, config.notion_version
        );

        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        let config = NotionConfig {
            base_url: std::env::var("NOTION_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_NOTION_URL.to_string()),
            token: std::env::var("NOTION_TOKEN").ok(),
            notion_version: std::env::var("NOTION_VERSION")
                .unwrap_or_else(|_| defaults::NOTION_VERSION.to_string()),
            timeout_seconds: std::env::var("NOTION_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::NOTION_TIMEOUT_SECS),
        };

        Self::new(config)
    }

    /// Get the current configuration.
    pub fn config(&self) -> &NotionConfig {
        &self.config
    }

    /// Build a GET request with the standard Notion headers.
    fn build_get(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self
            .client
            .get(&url)
            .header("Notion-Version", &self.config.notion_version);

        if let Some(ref token) = self.config.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        req
    }

    /// Build a POST request with the standard Notion headers.
    fn build_post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self
            .client
            .post(&url)
            .header("Notion-Version", &self.config.notion_version);

        if let Some(ref token) = self.config.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        req.header("Content-Type", "application/json")
    }

    /// Decode a Notion response, turning API errors into [`Error::OriginFetch`].
    async fn decode<T: DeserializeOwned>(response: reqwest::Response, context: &str) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body: NotionErrorResponse =
                response.json().await.unwrap_or(NotionErrorResponse {
                    code: "unknown".to_string(),
                    message: "Unknown error".to_string(),
                });
            return Err(Error::OriginFetch(format!(
                "Notion returned {} for {}: {} ({})",
                status, context, body.message, body.code
            )));
        }

        response.json().await.map_err(|e| {
            Error::OriginFetch(format!("Failed to parse {} response: {}", context, e))
        })
    }

    /// Retrieve a page object (properties only, no content).
    pub async fn retrieve_page(&self, page_id: &str) -> Result<PageObject> {
        let response = self
            .build_get(&format!("/pages/{}", page_id))
            .send()
            .await
            .map_err(|e| Error::OriginFetch(format!("Request failed: {}", e)))?;
        Self::decode(response, "page").await
    }

    /// Retrieve a database object (title only, no rows).
    pub async fn retrieve_database(&self, database_id: &str) -> Result<DatabaseObject> {
        let response = self
            .build_get(&format!("/databases/{}", database_id))
            .send()
            .await
            .map_err(|e| Error::OriginFetch(format!("Request failed: {}", e)))?;
        Self::decode(response, "database").await
    }

    /// Fetch one page of a block's children.
    async fn list_block_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<BlockChildren> {
        let mut query = vec![("page_size", PAGE_SIZE.to_string())];
        if let Some(cursor) = cursor {
            query.push(("start_cursor", cursor.to_string()));
        }

        let response = self
            .build_get(&format!("/blocks/{}/children", block_id))
            .query(&query)
            .send()
            .await
            .map_err(|e| Error::OriginFetch(format!("Request failed: {}", e)))?;
        Self::decode(response, "block children").await
    }

    /// Fetch one page of a database query (page stubs only).
    async fn query_database(
        &self,
        database_id: &str,
        cursor: Option<&str>,
    ) -> Result<DatabaseQueryResponse> {
        let mut body = serde_json::json!({ "page_size": PAGE_SIZE });
        if let Some(cursor) = cursor {
            body["start_cursor"] = serde_json::Value::String(cursor.to_string());
        }

        let response = self
            .build_post(&format!("/databases/{}/query", database_id))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::OriginFetch(format!("Request failed: {}", e)))?;
        Self::decode(response, "database query").await
    }

    /// Walk a block tree depth-first, one line per text-bearing block,
    /// nested blocks indented with tabs.
    fn collect_blocks(&self, block_id: String, depth: usize) -> BoxFuture<'_, Result<Vec<String>>> {
        async move {
            let mut lines = Vec::new();
            let mut cursor: Option<String> = None;
            loop {
                let children = self.list_block_children(&block_id, cursor.as_deref()).await?;
                for block in children.results {
                    if let Some(text) = block.plain_text() {
                        lines.push(format!("{}{}", "\t".repeat(depth), text));
                    }
                    if block.has_children && depth < MAX_BLOCK_DEPTH {
                        lines.extend(self.collect_blocks(block.id, depth + 1).await?);
                    }
                }
                if !children.has_more {
                    break;
                }
                cursor = children.next_cursor;
                if cursor.is_none() {
                    break;
                }
            }
            Ok(lines)
        }
        .boxed()
    }

    /// Fetch a page's title and flattened content.
    pub async fn fetch_page(&self, page_id: &str) -> Result<OriginContent> {
        debug!("Fetching Notion page {}", page_id);

        let page = self.retrieve_page(page_id).await?;
        let lines = self.collect_blocks(page_id.to_string(), 0).await?;

        debug!("Fetched {} content lines from page {}", lines.len(), page_id);
        Ok(OriginContent {
            title: page.title(),
            body: lines.join("\n"),
        })
    }

    /// Fetch a database's title and the flattened content of every page
    /// in it, page bodies separated by blank lines.
    pub async fn fetch_database(&self, database_id: &str) -> Result<OriginContent> {
        debug!("Fetching Notion database {}", database_id);

        let database = self.retrieve_database(database_id).await?;

        let mut page_ids = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let batch = self.query_database(database_id, cursor.as_deref()).await?;
            page_ids.extend(batch.results.into_iter().map(|stub| stub.id));
            if !batch.has_more {
                break;
            }
            cursor = batch.next_cursor;
            if cursor.is_none() {
                break;
            }
        }

        if page_ids.is_empty() {
            return Err(Error::OriginFetch(format!(
                "No pages found in Notion database {}",
                database_id
            )));
        }

        debug!(
            "Found {} pages in database {}, fetching content",
            page_ids.len(),
            database_id
        );

        let mut bodies = Vec::with_capacity(page_ids.len());
        for page_id in page_ids {
            let lines = self.collect_blocks(page_id, 0).await?;
            if !lines.is_empty() {
                bodies.push(lines.join("\n"));
            }
        }

        Ok(OriginContent {
            title: database.title(),
            body: bodies.join("\n\n"),
        })
    }
}

#[async_trait]
impl OriginFetcher for NotionClient {
    async fn fetch_content(&self, item: &Item) -> Result<OriginContent> {
        let Some(notion_id) = item.notion_id.as_deref() else {
            return Err(Error::InvalidInput(format!(
                "Item {} has no Notion id to refresh from",
                item.id
            )));
        };

        match item.item_type {
            ItemType::Page => self.fetch_page(notion_id).await,
            ItemType::Database => self.fetch_database(notion_id).await,
            other => Err(Error::InvalidInput(format!(
                "{} items cannot be refreshed from Notion",
                other
            ))),
        }
    }
}
