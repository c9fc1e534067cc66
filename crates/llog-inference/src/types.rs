//! Wire types for the OpenAI-compatible chat completions endpoint.
//!
//! Only the fields llog actually reads or writes are modeled; unknown
//! response fields are ignored by serde.

use serde::{Deserialize, Serialize};

/// POST body for `/chat/completions`.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

/// One turn of the conversation, in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Successful completion response.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<ChatUsage>,
}

/// A generated alternative; llog only ever requests one.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub index: usize,
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

/// Token accounting, logged for observability.
#[derive(Debug, Deserialize)]
pub struct ChatUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Error envelope returned instead of a completion.
#[derive(Debug, Deserialize)]
pub struct OpenAIErrorResponse {
    pub error: OpenAIError,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_unset_sampling_fields() {
        let request = ChatCompletionRequest {
            model: "llama-3.1-8b-instruct".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "Summarize this document.".to_string(),
            }],
            temperature: None,
            max_tokens: Some(512),
            stream: false,
        };

        let body = serde_json::to_string(&request).unwrap();
        assert!(body.contains("llama-3.1-8b-instruct"));
        assert!(body.contains("\"max_tokens\":512"));
        assert!(body.contains("\"stream\":false"));
        assert!(!body.contains("temperature"));
    }

    #[test]
    fn test_completion_parses_choices_and_usage() {
        let body = r#"{
            "id": "chatcmpl-8xA4",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"summary\": \"Quarterly planning notes.\"}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 412, "completion_tokens": 37, "total_tokens": 449}
        }"#;

        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.id, "chatcmpl-8xA4");
        let choice = &response.choices[0];
        assert_eq!(choice.finish_reason.as_deref(), Some("stop"));
        assert!(choice.message.content.contains("Quarterly planning notes."));
        assert_eq!(response.usage.unwrap().total_tokens, 449);
    }

    #[test]
    fn test_usage_is_optional() {
        let body = r#"{"id": "chatcmpl-empty", "choices": []}"#;

        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert!(response.choices.is_empty());
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_error_envelope_parses_without_code() {
        let body = r#"{
            "error": {
                "message": "Rate limit reached for requests",
                "type": "rate_limit_error",
                "code": null
            }
        }"#;

        let response: OpenAIErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.error.message, "Rate limit reached for requests");
        assert_eq!(response.error.error_type, "rate_limit_error");
        assert!(response.error.code.is_none());
    }
}
