//! Google Gemini adapter
//!
//! Calls `POST {api_base}/models/{model}:generateContent`. The key is sent in the
//! `x-goog-api-key` header rather than the query string so it never shows up in
//! logged URLs.

use crate::llm::client::{decode_response, guarded_invoke, ProviderAdapter, ProviderError};
use crate::llm::provider_registry::Provider;
use crate::types::{ProviderResult, Task};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct GeminiAdapter {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

// Gemini API request/response structures

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(rename = "systemInstruction")]
    system_instruction: GeminiSystemInstruction<'a>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

impl GeminiAdapter {
    pub fn new(http: reqwest::Client, api_key: String, api_base: &str, model: &str) -> Self {
        Self {
            http,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn build_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    async fn complete(&self, task: &Task) -> Result<String, ProviderError> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: &task.prompt }],
            }],
            system_instruction: GeminiSystemInstruction {
                parts: vec![GeminiPart {
                    text: &task.instruction,
                }],
            },
        };

        let response = self
            .http
            .post(self.build_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let parsed: GeminiResponse = decode_response(response).await?;

        parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .ok_or_else(|| ProviderError::Malformed("no candidates in response".to_string()))
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    async fn invoke(&self, task: &Task, provider: &Provider, timeout: Duration) -> ProviderResult {
        guarded_invoke(task, provider, timeout, self.complete(task)).await
    }

    fn family(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let adapter = GeminiAdapter::new(
            reqwest::Client::new(),
            "key".to_string(),
            "https://generativelanguage.googleapis.com/v1beta/",
            "gemini-2.0-flash",
        );
        assert_eq!(
            adapter.build_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_request_uses_camel_case_system_instruction() {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: "hi" }],
            }],
            system_instruction: GeminiSystemInstruction {
                parts: vec![GeminiPart { text: "sys" }],
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "sys");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }
}
