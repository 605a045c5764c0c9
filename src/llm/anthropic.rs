//! Anthropic Messages API adapter
//!
//! Calls `POST {api_base}/v1/messages` with the `x-api-key` header. Besides the
//! usual statuses, Anthropic answers `529` when overloaded, which is reported as
//! `RATE_LIMITED`.

use crate::llm::client::{decode_response, guarded_invoke, ProviderAdapter, ProviderError};
use crate::llm::provider_registry::Provider;
use crate::types::{ProviderResult, Task};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude adapter for API-based inference
pub struct AnthropicAdapter {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicAdapter {
    /// Create a new Anthropic adapter
    ///
    /// # Arguments
    ///
    /// * `api_key` - Anthropic API key
    /// * `model` - Model identifier (e.g., "claude-3-5-haiku-latest")
    pub fn new(
        http: reqwest::Client,
        api_key: String,
        api_base: &str,
        model: &str,
        max_tokens: u32,
    ) -> Self {
        Self {
            http,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_tokens,
        }
    }

    /// Extract text content from Claude response content blocks
    fn extract_text_content(content: Vec<ContentBlock>) -> Option<String> {
        let text: Vec<String> = content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.is_empty() {
            None
        } else {
            Some(text.join(""))
        }
    }

    async fn complete(&self, task: &Task) -> Result<String, ProviderError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: &task.instruction,
            messages: vec![Message {
                role: "user",
                content: &task.prompt,
            }],
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let parsed: MessagesResponse = decode_response(response).await?;

        Self::extract_text_content(parsed.content)
            .ok_or_else(|| ProviderError::Malformed("no text blocks in response".to_string()))
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    async fn invoke(&self, task: &Task, provider: &Provider, timeout: Duration) -> ProviderResult {
        guarded_invoke(task, provider, timeout, self.complete(task)).await
    }

    fn family(&self) -> &'static str {
        "anthropic"
    }
}
