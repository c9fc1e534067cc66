//! OpenAI-compatible metadata generation backend.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info};

use llog_core::{defaults, AutoMetadata, Error, MetadataBackend, Result};

use crate::types::*;

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEN_MODEL: &str = "gpt-4o-mini";

/// Completion budget for one metadata reply.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Connection settings for the OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// Endpoint root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token; local inference servers usually need none.
    pub api_key: Option<String>,
    /// Model to use for metadata generation.
    pub gen_model: String,
    /// Whole-request deadline in seconds.
    pub timeout_seconds: u64,
    /// Maximum completion tokens per request.
    pub max_tokens: u32,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: None,
            gen_model: DEFAULT_GEN_MODEL.to_string(),
            timeout_seconds: defaults::GEN_TIMEOUT_SECS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// OpenAI-compatible metadata backend.
///
/// Prompts a chat model with a document sample and parses the JSON object
/// it returns into [`AutoMetadata`]. Works against any endpoint speaking
/// the OpenAI chat completions protocol.
pub struct OpenAIBackend {
    client: Client,
    config: OpenAIConfig,
}

impl OpenAIBackend {
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            "Initializing OpenAI metadata backend: url={}, model={}",
            config.base_url, config.gen_model
        );

        Ok(Self { client, config })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(OpenAIConfig::default())
    }

    /// Backend configured from `OPENAI_*` environment variables, with
    /// the compiled-in defaults filling every gap.
    pub fn from_env() -> Result<Self> {
        let config = OpenAIConfig {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_URL.to_string()),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            gen_model: std::env::var("OPENAI_GEN_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEN_MODEL.to_string()),
            timeout_seconds: std::env::var("OPENAI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults::GEN_TIMEOUT_SECS),
            max_tokens: std::env::var("OPENAI_MAX_TOKENS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_TOKENS),
        };

        Self::new(config)
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// POST builder for `endpoint` under the configured base URL, with
    /// the bearer header when a key is present.
    fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        req.header("Content-Type", "application/json")
    }
}

/// Build the metadata extraction prompt.
///
/// The field list mirrors [`AutoMetadata`]; the model is told twice to
/// return bare JSON because chat models love to add commentary anyway.
fn build_prompt(title: &str, sample: &str) -> String {
    format!(
        "Analyze the following document content and extract key metadata.\n\
         The first element of each list should be the most important.\n\
         Return ONLY a JSON object with these fields:\n\
         - themes: List of 3-5 main themes\n\
         - topics: List of 5-10 specific topics covered\n\
         - entities: List of important entities mentioned (people, organizations, products)\n\
         - keywords: List of 10-15 relevant keywords for search\n\
         - summary: A 2-3 sentence summary of the content\n\
         - language: The detected language of the content\n\
         - contentType: The likely type of the content (article, report, tutorial, etc.)\n\
         \n\
         Title: {}\n\
         \n\
         Document content:\n\
         {}\n\
         \n\
         Return ONLY the JSON object with the extracted metadata.",
        title, sample
    )
}

/// Parse a model reply into [`AutoMetadata`].
///
/// Tries the whole reply as JSON first; when the model wraps the object
/// in prose or a code fence, falls back to the outermost brace-delimited
/// span.
fn json_object_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{[\s\S]*\}").unwrap())
}

fn extract_metadata_json(raw: &str) -> Result<AutoMetadata> {
    if let Ok(metadata) = serde_json::from_str::<AutoMetadata>(raw) {
        return Ok(metadata);
    }

    let Some(found) = json_object_pattern().find(raw) else {
        return Err(Error::Inference(
            "No JSON object in model response".to_string(),
        ));
    };

    serde_json::from_str::<AutoMetadata>(found.as_str())
        .map_err(|e| Error::Inference(format!("Failed to parse metadata from response: {}", e)))
}

#[async_trait]
impl MetadataBackend for OpenAIBackend {
    async fn generate_metadata(&self, title: &str, sample: &str) -> Result<AutoMetadata> {
        debug!(
            "Generating metadata with model {}, sample length: {}",
            self.config.gen_model,
            sample.len()
        );

        let request = ChatCompletionRequest {
            model: self.config.gen_model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(title, sample),
            }],
            temperature: None,
            max_tokens: Some(self.config.max_tokens),
            stream: false,
        };

        let response = self
            .build_request("/chat/completions")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            // Surface the upstream message when the body carries one;
            // some proxies return bare statuses.
            let body: OpenAIErrorResponse = response.json().await.unwrap_or(OpenAIErrorResponse {
                error: OpenAIError {
                    message: "no error body".to_string(),
                    error_type: "unknown".to_string(),
                    code: None,
                },
            });
            return Err(Error::Inference(format!(
                "Completion endpoint returned {}: {}",
                status, body.error.message
            )));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {}", e)))?;

        let content = result
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        let mut metadata = extract_metadata_json(content)?;
        metadata.auto_generated = true;

        debug!(
            "Metadata generation complete: {} topics, {} keywords",
            metadata.topics.len(),
            metadata.keywords.len()
        );
        Ok(metadata)
    }

    fn model_name(&self) -> &str {
        &self.config.gen_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_to_hosted_openai() {
        let config = OpenAIConfig::default();
        assert_eq!(config.base_url, DEFAULT_OPENAI_URL);
        assert_eq!(config.gen_model, DEFAULT_GEN_MODEL);
        assert!(config.api_key.is_none());
        assert_eq!(config.timeout_seconds, defaults::GEN_TIMEOUT_SECS);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_backend_for_local_endpoint_without_key() {
        let backend = OpenAIBackend::new(OpenAIConfig {
            base_url: "http://localhost:8080/v1".to_string(),
            api_key: None,
            gen_model: "local-model".to_string(),
            timeout_seconds: 10,
            max_tokens: 500,
        })
        .unwrap();

        assert_eq!(backend.config().base_url, "http://localhost:8080/v1");
        assert_eq!(backend.model_name(), "local-model");
    }

    #[test]
    fn test_prompt_names_every_metadata_field() {
        let prompt = build_prompt("Linear Algebra Notes", "Vectors and matrices.");
        for field in [
            "themes",
            "topics",
            "entities",
            "keywords",
            "summary",
            "language",
            "contentType",
        ] {
            assert!(prompt.contains(field), "prompt is missing {}", field);
        }
        assert!(prompt.contains("Linear Algebra Notes"));
        assert!(prompt.contains("Vectors and matrices."));
    }

    #[test]
    fn test_extract_json_direct() {
        let raw = r#"{"themes": ["math"], "summary": "Notes on vectors."}"#;
        let metadata = extract_metadata_json(raw).unwrap();
        assert_eq!(metadata.themes, vec!["math"]);
        assert_eq!(metadata.summary.as_deref(), Some("Notes on vectors."));
        assert!(!metadata.auto_generated);
    }

    #[test]
    fn test_extract_json_from_fenced_reply() {
        let raw = "Here is the metadata you asked for:\n```json\n{\"topics\": [\"vectors\", \"matrices\"], \"language\": \"en\"}\n```";
        let metadata = extract_metadata_json(raw).unwrap();
        assert_eq!(metadata.topics, vec!["vectors", "matrices"]);
        assert_eq!(metadata.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_extract_json_ignores_unknown_fields() {
        let raw = r#"{"keywords": ["algebra"], "confidence": 0.9}"#;
        let metadata = extract_metadata_json(raw).unwrap();
        assert_eq!(metadata.keywords, vec!["algebra"]);
    }

    #[test]
    fn test_extract_json_without_object_fails() {
        let raw = "I was unable to analyze this document.";
        let err = extract_metadata_json(raw).unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
        assert!(err.to_string().contains("No JSON object"));
    }
}
