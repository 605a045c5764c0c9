//! OpenAI-compatible chat completions adapter
//!
//! Works with any endpoint exposing `POST {api_base}/chat/completions` with
//! bearer authentication: OpenAI itself, xAI Grok, Mistral, OpenRouter and most
//! self-hosted gateways.

use crate::llm::client::{decode_response, guarded_invoke, ProviderAdapter, ProviderError};
use crate::llm::provider_registry::Provider;
use crate::types::{ProviderResult, Task};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OpenAIAdapter {
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
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAIAdapter {
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
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: ChatResponse = decode_response(response).await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Malformed("no choices in response".to_string()))
    }
}

#[async_trait]
impl ProviderAdapter for OpenAIAdapter {
    async fn invoke(&self, task: &Task, provider: &Provider, timeout: Duration) -> ProviderResult {
        guarded_invoke(task, provider, timeout, self.complete(task)).await
    }

    fn family(&self) -> &'static str {
        "openai"
    }
}
