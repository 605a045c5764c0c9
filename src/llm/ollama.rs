//! Ollama adapter for local inference
//!
//! Uses the non-streaming `POST {base_url}/api/chat` endpoint. Ollama needs no
//! credential, so this adapter is always available.

use crate::llm::client::{decode_response, guarded_invoke, ProviderAdapter, ProviderError};
use crate::llm::provider_registry::Provider;
use crate::types::{ProviderResult, Task};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OllamaAdapter {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaAdapter {
    pub fn new(http: reqwest::Client, base_url: &str, model: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
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
            stream: false,
        };

        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await?;

        let parsed: ChatResponse = decode_response(response).await?;

        parsed
            .message
            .map(|m| m.content)
            .ok_or_else(|| ProviderError::Malformed("no message in response".to_string()))
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    async fn invoke(&self, task: &Task, provider: &Provider, timeout: Duration) -> ProviderResult {
        guarded_invoke(task, provider, timeout, self.complete(task)).await
    }

    fn family(&self) -> &'static str {
        "ollama"
    }
}
