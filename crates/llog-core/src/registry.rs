//! Pure query engine for the content registry view.
//!
//! Filtering and pagination over items is a pure function of `(items,
//! query)`: no store access, no mutation, no side effects. Stores feed
//! items in their stable listing order and the engine preserves it, so
//! identical inputs always produce identical pages.
//!
//! Filters are conjunctive:
//! - `title_contains`: case-insensitive substring match on the title
//! - `item_type`: exact match on the item kind
//! - `folder`: exact match on the normalized folder path, never a
//!   prefix match (`math` does not select items in `math/algebra`)
//!
//! Pages are 1-indexed. Out-of-range pages (including page zero) yield an
//! empty item slice while totals stay accurate; the engine never fails on
//! a bad page number. Boundary validation of caller input (allowed
//! per-page sizes, rejecting page zero outright) belongs to the HTTP
//! layer, not here.

use serde::{Deserialize, Serialize};

use crate::folder;
use crate::models::{Item, ItemType};

/// Filter and pagination parameters for one registry listing.
#[derive(Debug, Clone)]
pub struct RegistryQuery {
    /// Case-insensitive substring to require in the title.
    pub title_contains: Option<String>,
    /// Exact item kind to require.
    pub item_type: Option<ItemType>,
    /// Exact folder path to require (normalized before comparison).
    pub folder: Option<String>,
    /// 1-indexed page number.
    pub page: i64,
    /// Items per page; values below 1 are treated as 1.
    pub per_page: i64,
}

impl Default for RegistryQuery {
    fn default() -> Self {
        Self {
            title_contains: None,
            item_type: None,
            folder: None,
            page: 1,
            per_page: crate::defaults::DEFAULT_PER_PAGE,
        }
    }
}

impl RegistryQuery {
    /// Create a query with no filters, first page, default page size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a case-insensitive substring in the title.
    pub fn with_title(mut self, needle: impl Into<String>) -> Self {
        self.title_contains = Some(needle.into());
        self
    }

    /// Require an exact item kind.
    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    /// Require an exact folder path.
    pub fn in_folder(mut self, path: impl Into<String>) -> Self {
        self.folder = Some(path.into());
        self
    }

    /// Select a 1-indexed page.
    pub fn page(mut self, page: i64) -> Self {
        self.page = page;
        self
    }

    /// Set the page size.
    pub fn per_page(mut self, per_page: i64) -> Self {
        self.per_page = per_page;
        self
    }

    /// Check if the query carries no filters (pagination only).
    pub fn is_unfiltered(&self) -> bool {
        self.title_contains.is_none() && self.item_type.is_none() && self.folder.is_none()
    }
}

/// One page of registry results with pagination totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryPage {
    pub items: Vec<Item>,
    pub page: i64,
    pub per_page: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

/// Whether a single item satisfies every filter in the query.
pub fn matches(item: &Item, query: &RegistryQuery) -> bool {
    if let Some(needle) = &query.title_contains {
        if !item.title.to_lowercase().contains(&needle.to_lowercase()) {
            return false;
        }
    }
    if let Some(kind) = query.item_type {
        if item.item_type != kind {
            return false;
        }
    }
    if let Some(path) = &query.folder {
        if item.folder != folder::normalize(path) {
            return false;
        }
    }
    true
}

/// Number of pages needed for `total_items` at `per_page` per page.
/// An empty result still has one (empty) page.
pub fn total_pages(total_items: i64, per_page: i64) -> i64 {
    let per_page = per_page.max(1);
    if total_items > 0 {
        (total_items + per_page - 1) / per_page
    } else {
        1
    }
}

/// Evaluate a query over items, preserving their order.
///
/// Returns the requested page slice plus totals computed over the full
/// filtered set. The input is never modified.
pub fn evaluate(items: &[Item], query: &RegistryQuery) -> RegistryPage {
    let per_page = query.per_page.max(1);
    let matched: Vec<&Item> = items.iter().filter(|item| matches(item, query)).collect();
    let total_items = matched.len() as i64;

    let offset = query
        .page
        .checked_sub(1)
        .and_then(|page| page.checked_mul(per_page));
    let page_items = match offset {
        Some(offset) if query.page >= 1 => matched
            .into_iter()
            .skip(offset as usize)
            .take(per_page as usize)
            .cloned()
            .collect(),
        _ => Vec::new(),
    };

    RegistryPage {
        items: page_items,
        page: query.page,
        per_page,
        total_items,
        total_pages: total_pages(total_items, per_page),
    }
}
