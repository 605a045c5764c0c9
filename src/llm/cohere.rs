//! Cohere Chat API adapter
//!
//! Calls `POST {api_base}/v2/chat` with a bearer token. The reply arrives as a
//! list of content blocks under `message`, like Anthropic's, rather than as
//! OpenAI-style choices.

use crate::llm::client::{decode_response, guarded_invoke, ProviderAdapter, ProviderError};
use crate::llm::provider_registry::Provider;
use crate::types::{ProviderResult, Task};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cohere Command adapter
pub struct CohereAdapter {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<AssistantMessage>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Vec<ContentItem>,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl CohereAdapter {
    pub fn new(
        http: reqwest::Client,
        api_key: String,
        api_base: &str,
        model: &str,
        max_tokens: Option<u32>,
    ) -> Self {
        Self {
            http,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            max_tokens,
        }
    }

    fn reply_text(response: ChatResponse) -> Option<String> {
        let text: String = response
            .message?
            .content
            .into_iter()
            .filter(|item| item.kind == "text")
            .filter_map(|item| item.text)
            .collect();

        (!text.is_empty()).then_some(text)
    }

    async fn complete(&self, task: &Task) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &task.instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &task.prompt,
                },
            ],
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/v2/chat", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: ChatResponse = decode_response(response).await?;

        Self::reply_text(parsed)
            .ok_or_else(|| ProviderError::Malformed("no text content in message".to_string()))
    }
}

#[async_trait]
impl ProviderAdapter for CohereAdapter {
    async fn invoke(&self, task: &Task, provider: &Provider, timeout: Duration) -> ProviderResult {
        guarded_invoke(task, provider, timeout, self.complete(task)).await
    }

    fn family(&self) -> &'static str {
        "cohere"
    }
}
