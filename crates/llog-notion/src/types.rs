//! Notion API response types.
//!
//! Only the fields the refresh path reads are modeled; everything else in
//! the Notion payloads is ignored during deserialization.

use serde::Deserialize;
use std::collections::HashMap;

/// A single rich-text fragment. Notion pre-renders `plain_text` for every
/// fragment regardless of its annotations.
#[derive(Debug, Clone, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

/// Joins the `plain_text` of a rich-text array into one string.
pub fn flatten_rich_text(parts: &[RichText]) -> String {
    parts.iter().map(|part| part.plain_text.as_str()).collect()
}

/// A page object as returned by `GET /v1/pages/{id}`.
#[derive(Debug, Deserialize)]
pub struct PageObject {
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
}

impl PageObject {
    /// The page title: the one property of type `title`, flattened.
    /// `None` when the property is missing or empty.
    pub fn title(&self) -> Option<String> {
        self.properties
            .values()
            .find(|property| property.kind == "title")
            .and_then(|property| property.title.as_deref())
            .map(flatten_rich_text)
            .filter(|title| !title.is_empty())
    }
}

/// A property value on a page. Only title properties are read.
#[derive(Debug, Deserialize)]
pub struct PropertyValue {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: Option<Vec<RichText>>,
}

/// A database object as returned by `GET /v1/databases/{id}`.
#[derive(Debug, Deserialize)]
pub struct DatabaseObject {
    #[serde(default)]
    pub title: Vec<RichText>,
}

impl DatabaseObject {
    /// The database title, `None` when empty.
    pub fn title(&self) -> Option<String> {
        let title = flatten_rich_text(&self.title);
        (!title.is_empty()).then_some(title)
    }
}

/// One block from `GET /v1/blocks/{id}/children`.
///
/// The text payload lives under a key named after the block type
/// (`paragraph`, `heading_1`, ...), so it is kept as raw JSON and read
/// through [`Block::plain_text`].
#[derive(Debug, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub has_children: bool,
    #[serde(flatten)]
    pub payload: serde_json::Value,
}

impl Block {
    /// The block's own text, without children.
    ///
    /// Most block types carry a `rich_text` array; `child_page` and
    /// `child_database` carry a bare `title` string instead.
    pub fn plain_text(&self) -> Option<String> {
        let body = self.payload.get(&self.kind)?;
        if let Some(parts) = body.get("rich_text").and_then(|value| value.as_array()) {
            let text: String = parts
                .iter()
                .filter_map(|part| part.get("plain_text").and_then(|value| value.as_str()))
                .collect();
            return (!text.is_empty()).then_some(text);
        }
        body.get("title")
            .and_then(|value| value.as_str())
            .filter(|title| !title.is_empty())
            .map(str::to_string)
    }
}

/// Paginated response from `GET /v1/blocks/{id}/children`.
#[derive(Debug, Deserialize)]
pub struct BlockChildren {
    #[serde(default)]
    pub results: Vec<Block>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// One result row from `POST /v1/databases/{id}/query` — a page stub.
#[derive(Debug, Deserialize)]
pub struct PageStub {
    pub id: String,
}

/// Paginated response from `POST /v1/databases/{id}/query`.
#[derive(Debug, Deserialize)]
pub struct DatabaseQueryResponse {
    #[serde(default)]
    pub results: Vec<PageStub>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Error body returned by the Notion API.
#[derive(Debug, Deserialize)]
pub struct NotionErrorResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_title_from_title_property() {
        let page: PageObject = serde_json::from_value(json!({
            "object": "page",
            "properties": {
                "Name": {
                    "type": "title",
                    "title": [
                        {"plain_text": "Linear "},
                        {"plain_text": "Algebra"}
                    ]
                },
                "Tags": {"type": "multi_select"}
            }
        }))
        .unwrap();
        assert_eq!(page.title().as_deref(), Some("Linear Algebra"));
    }

    #[test]
    fn test_page_title_absent_when_empty() {
        let page: PageObject = serde_json::from_value(json!({
            "properties": {
                "Name": {"type": "title", "title": []}
            }
        }))
        .unwrap();
        assert!(page.title().is_none());

        let bare: PageObject = serde_json::from_value(json!({"object": "page"})).unwrap();
        assert!(bare.title().is_none());
    }

    #[test]
    fn test_database_title() {
        let database: DatabaseObject = serde_json::from_value(json!({
            "title": [{"plain_text": "Reading List"}]
        }))
        .unwrap();
        assert_eq!(database.title().as_deref(), Some("Reading List"));

        let untitled: DatabaseObject = serde_json::from_value(json!({"title": []})).unwrap();
        assert!(untitled.title().is_none());
    }

    #[test]
    fn test_block_plain_text_from_rich_text() {
        let block: Block = serde_json::from_value(json!({
            "id": "b1",
            "type": "paragraph",
            "has_children": false,
            "paragraph": {
                "rich_text": [
                    {"plain_text": "Hello, "},
                    {"plain_text": "world"}
                ]
            }
        }))
        .unwrap();
        assert_eq!(block.plain_text().as_deref(), Some("Hello, world"));
    }

    #[test]
    fn test_block_plain_text_child_page_title() {
        let block: Block = serde_json::from_value(json!({
            "id": "b2",
            "type": "child_page",
            "has_children": true,
            "child_page": {"title": "Appendix"}
        }))
        .unwrap();
        assert_eq!(block.plain_text().as_deref(), Some("Appendix"));
    }

    #[test]
    fn test_block_plain_text_empty_for_unknown_types() {
        let divider: Block = serde_json::from_value(json!({
            "id": "b3",
            "type": "divider",
            "has_children": false,
            "divider": {}
        }))
        .unwrap();
        assert!(divider.plain_text().is_none());

        let empty: Block = serde_json::from_value(json!({
            "id": "b4",
            "type": "paragraph",
            "has_children": false,
            "paragraph": {"rich_text": []}
        }))
        .unwrap();
        assert!(empty.plain_text().is_none());
    }
}
