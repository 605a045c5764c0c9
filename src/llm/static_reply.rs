//! Scripted local provider
//!
//! The `static` family answers without any network call: a fixed reply, an
//! optional artificial delay and an optional scripted failure. It backs demos,
//! local development without API keys, and end-to-end tests of the HTTP contract.

use crate::llm::client::{guarded_invoke, ProviderAdapter, ProviderError};
use crate::llm::provider_registry::Provider;
use crate::types::{ProviderResult, ResultStatus, Task};
use async_trait::async_trait;
use std::time::Duration;

pub struct StaticAdapter {
    reply: Option<String>,
    delay: Duration,
    fail_with: Option<ResultStatus>,
}

impl StaticAdapter {
    pub fn new(reply: Option<String>, delay: Duration, fail_with: Option<ResultStatus>) -> Self {
        Self {
            reply,
            delay,
            fail_with,
        }
    }

    /// Reply used when none is configured.
    fn echo(task: &Task) -> String {
        let first_line = task.prompt.lines().next().unwrap_or_default();
        format!("{}: {}", task.capability.title(), first_line)
    }

    fn scripted_failure(status: ResultStatus) -> ProviderError {
        match status {
            ResultStatus::Timeout => ProviderError::Timeout,
            ResultStatus::RateLimited => ProviderError::RateLimited("scripted".to_string()),
            ResultStatus::AuthError => ProviderError::Auth("scripted".to_string()),
            ResultStatus::Malformed => ProviderError::Malformed("scripted".to_string()),
            ResultStatus::Unavailable => ProviderError::MissingCredential("scripted".to_string()),
            ResultStatus::Success | ResultStatus::UnknownError => {
                ProviderError::Transport("scripted failure".to_string())
            }
        }
    }

    async fn complete(&self, task: &Task) -> Result<String, ProviderError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(status) = self.fail_with {
            return Err(Self::scripted_failure(status));
        }

        Ok(self.reply.clone().unwrap_or_else(|| Self::echo(task)))
    }
}

#[async_trait]
impl ProviderAdapter for StaticAdapter {
    async fn invoke(&self, task: &Task, provider: &Provider, timeout: Duration) -> ProviderResult {
        guarded_invoke(task, provider, timeout, self.complete(task)).await
    }

    fn family(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Capability;
    use uuid::Uuid;

    fn task() -> Task {
        Task {
            id: Uuid::new_v4(),
            capability: Capability::Sentiment,
            instruction: Capability::Sentiment.instruction().to_string(),
            prompt: "Rust adoption\n\nContext: survey".to_string(),
            assigned_providers: vec!["echo".to_string()],
        }
    }

    fn provider() -> Provider {
        Provider::scripted("echo", &[Capability::Sentiment], 1, "unused")
    }

    #[tokio::test]
    async fn test_configured_reply() {
        let adapter = StaticAdapter::new(Some("positive".to_string()), Duration::ZERO, None);
        let result = adapter
            .invoke(&task(), &provider(), Duration::from_secs(1))
            .await;

        assert_eq!(result.status, ResultStatus::Success);
        assert_eq!(result.content.as_deref(), Some("positive"));
        assert_eq!(result.provider_id.as_deref(), Some("echo"));
    }

    #[tokio::test]
    async fn test_echo_reply() {
        let adapter = StaticAdapter::new(None, Duration::ZERO, None);
        let result = adapter
            .invoke(&task(), &provider(), Duration::from_secs(1))
            .await;

        assert_eq!(result.content.as_deref(), Some("Sentiment: Rust adoption"));
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let adapter = StaticAdapter::new(None, Duration::ZERO, Some(ResultStatus::AuthError));
        let result = adapter
            .invoke(&task(), &provider(), Duration::from_secs(1))
            .await;

        assert_eq!(result.status, ResultStatus::AuthError);
        assert!(result.content.is_none());
    }

    #[tokio::test]
    async fn test_delay_beyond_timeout() {
        let adapter = StaticAdapter::new(None, Duration::from_millis(500), None);
        let result = adapter
            .invoke(&task(), &provider(), Duration::from_millis(50))
            .await;

        assert_eq!(result.status, ResultStatus::Timeout);
        assert!(result.latency_ms < 500);
    }

    #[tokio::test]
    async fn test_blank_reply_is_malformed() {
        let adapter = StaticAdapter::new(Some("  ".to_string()), Duration::ZERO, None);
        let result = adapter
            .invoke(&task(), &provider(), Duration::from_secs(1))
            .await;

        assert_eq!(result.status, ResultStatus::Malformed);
    }
}
