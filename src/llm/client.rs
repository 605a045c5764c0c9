//! Provider adapter abstractions
//!
//! A [`ProviderAdapter`] turns a [`Task`] into one call against a provider family
//! and normalizes whatever comes back into a [`ProviderResult`]. Adapters never
//! return errors: every failure is classified into a [`ResultStatus`] so the
//! dispatcher can decide what to try next.
//!
//! Adapters are created through an [`AdapterFactory`]. The default
//! [`ConfigAdapterFactory`] builds one adapter per provider on first use, gated on
//! the provider's credential being present, and caches it for later requests.

use crate::llm::anthropic::AnthropicAdapter;
use crate::llm::cohere::CohereAdapter;
use crate::llm::gemini::GeminiAdapter;
use crate::llm::ollama::OllamaAdapter;
use crate::llm::openai::OpenAIAdapter;
use crate::llm::provider_registry::Provider;
use crate::llm::rate_limit::RateLimitedAdapter;
use crate::llm::static_reply::StaticAdapter;
use crate::types::{ProviderResult, ResultStatus, Task};
use crate::utils::toml_config::BackendConfig;
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Adapter for one provider family.
///
/// Implementations must enforce `timeout` themselves (dropping the in-flight
/// request) and must map every failure into the returned result.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Run `task` against `provider` and record the outcome.
    async fn invoke(&self, task: &Task, provider: &Provider, timeout: Duration) -> ProviderResult;

    /// Family name (`openai`, `anthropic`, ...)
    fn family(&self) -> &'static str;
}

/// Failure inside an adapter, before it is classified.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request timed out")]
    Timeout,

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("credential '{0}' is not set")]
    MissingCredential(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let body = truncate(body, 200);
        match status.as_u16() {
            408 | 504 => ProviderError::Timeout,
            // 529 is Anthropic's "overloaded"
            429 | 529 => ProviderError::RateLimited(format!("HTTP {}", status.as_u16())),
            401 | 403 => ProviderError::Auth(format!("HTTP {}", status.as_u16())),
            code => ProviderError::Http { status: code, body },
        }
    }

    /// The result status this failure is reported as.
    pub fn status(&self) -> ResultStatus {
        match self {
            ProviderError::Timeout => ResultStatus::Timeout,
            ProviderError::RateLimited(_) => ResultStatus::RateLimited,
            ProviderError::Auth(_) => ResultStatus::AuthError,
            ProviderError::Malformed(_) => ResultStatus::Malformed,
            ProviderError::MissingCredential(_) => ResultStatus::Unavailable,
            ProviderError::Http { .. } | ProviderError::Transport(_) => ResultStatus::UnknownError,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Check the status of a provider response and decode its JSON body.
pub(crate) async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> std::result::Result<T, ProviderError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ProviderError::from_status(status, &body));
    }

    serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
}

/// Run one provider call under `timeout` and record the outcome.
///
/// Dropping `call` on timeout cancels the underlying HTTP request.
pub async fn guarded_invoke<F>(
    task: &Task,
    provider: &Provider,
    timeout: Duration,
    call: F,
) -> ProviderResult
where
    F: Future<Output = std::result::Result<String, ProviderError>> + Send,
{
    let started = Instant::now();
    let outcome = tokio::time::timeout(timeout, call).await;
    let elapsed = started.elapsed();

    let result = match outcome {
        Ok(Ok(content)) => ProviderResult::reply(task, &provider.id, content, elapsed),
        Ok(Err(err)) => {
            ProviderResult::failure(task, &provider.id, err.status(), err.to_string(), elapsed)
        }
        Err(_) => ProviderResult::failure(
            task,
            &provider.id,
            ResultStatus::Timeout,
            format!("no reply within {} ms", timeout.as_millis()),
            elapsed,
        ),
    };

    if result.is_success() {
        tracing::debug!(
            provider = %provider.id,
            capability = %task.capability,
            latency_ms = result.latency_ms,
            "Provider call succeeded"
        );
    } else {
        tracing::warn!(
            provider = %provider.id,
            capability = %task.capability,
            status = %result.status,
            detail = result.detail.as_deref().unwrap_or(""),
            "Provider call failed"
        );
    }

    result
}

/// Hands out the adapter for a provider.
pub trait AdapterFactory: Send + Sync {
    /// The adapter for `provider`, or the reason none can be built.
    fn adapter_for(
        &self,
        provider: &Provider,
    ) -> std::result::Result<Arc<dyn ProviderAdapter>, ProviderError>;

    /// Whether `adapter_for` would currently succeed for `provider`.
    fn is_available(&self, _provider: &Provider) -> bool {
        true
    }
}

type CredentialLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Factory that builds adapters from each provider's backend configuration.
///
/// Adapters are built lazily and cached by provider id. A provider whose
/// credential is absent gets no adapter and is reported as `UNAVAILABLE` without
/// any network attempt.
pub struct ConfigAdapterFactory {
    http: reqwest::Client,
    credentials: Arc<CredentialLookup>,
    cache: RwLock<HashMap<String, Arc<dyn ProviderAdapter>>>,
}

impl ConfigAdapterFactory {
    /// Factory reading credentials from the process environment.
    pub fn new() -> Self {
        Self::with_credentials(|name| std::env::var(name).ok())
    }

    /// Factory with a custom credential lookup.
    pub fn with_credentials<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            http: reqwest::Client::new(),
            credentials: Arc::new(lookup),
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn credential(&self, provider: &Provider) -> std::result::Result<String, ProviderError> {
        let name = provider.credential_ref.as_deref().unwrap_or_default();
        (self.credentials)(name)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ProviderError::MissingCredential(name.to_string()))
    }

    fn build(
        &self,
        provider: &Provider,
    ) -> std::result::Result<Arc<dyn ProviderAdapter>, ProviderError> {
        let adapter: Arc<dyn ProviderAdapter> = match &provider.backend {
            BackendConfig::OpenAI {
                api_base,
                model,
                max_tokens,
            } => Arc::new(OpenAIAdapter::new(
                self.http.clone(),
                self.credential(provider)?,
                api_base,
                model,
                *max_tokens,
            )),
            BackendConfig::Anthropic {
                api_base,
                model,
                max_tokens,
            } => Arc::new(AnthropicAdapter::new(
                self.http.clone(),
                self.credential(provider)?,
                api_base,
                model,
                *max_tokens,
            )),
            BackendConfig::Gemini { api_base, model } => Arc::new(GeminiAdapter::new(
                self.http.clone(),
                self.credential(provider)?,
                api_base,
                model,
            )),
            BackendConfig::Cohere {
                api_base,
                model,
                max_tokens,
            } => Arc::new(CohereAdapter::new(
                self.http.clone(),
                self.credential(provider)?,
                api_base,
                model,
                *max_tokens,
            )),
            BackendConfig::Ollama { base_url, model } => {
                Arc::new(OllamaAdapter::new(self.http.clone(), base_url, model))
            }
            BackendConfig::Static {
                reply,
                delay_ms,
                fail_with,
            } => Arc::new(StaticAdapter::new(
                reply.clone(),
                Duration::from_millis(*delay_ms),
                *fail_with,
            )),
        };

        Ok(match provider.rate_limit_per_minute {
            Some(limit) => Arc::new(RateLimitedAdapter::new(adapter, limit)),
            None => adapter,
        })
    }
}

impl Default for ConfigAdapterFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AdapterFactory for ConfigAdapterFactory {
    fn adapter_for(
        &self,
        provider: &Provider,
    ) -> std::result::Result<Arc<dyn ProviderAdapter>, ProviderError> {
        if let Some(adapter) = self.cache.read().get(&provider.id) {
            return Ok(adapter.clone());
        }

        let mut cache = self.cache.write();
        if let Some(adapter) = cache.get(&provider.id) {
            return Ok(adapter.clone());
        }

        let adapter = self.build(provider)?;
        tracing::debug!(provider = %provider.id, family = adapter.family(), "Adapter built");
        cache.insert(provider.id.clone(), adapter.clone());
        Ok(adapter)
    }

    fn is_available(&self, provider: &Provider) -> bool {
        !provider.backend.requires_credential() || self.credential(provider).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Capability;

    fn remote(id: &str) -> Provider {
        Provider::scripted(id, &[Capability::Reasoning], 1, "unused")
            .with_backend(BackendConfig::OpenAI {
                api_base: "http://127.0.0.1:9".to_string(),
                model: "gpt-4o-mini".to_string(),
                max_tokens: None,
            })
            .with_credential_ref("QUORUM_TEST_KEY")
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (StatusCode::REQUEST_TIMEOUT, ResultStatus::Timeout),
            (StatusCode::GATEWAY_TIMEOUT, ResultStatus::Timeout),
            (StatusCode::TOO_MANY_REQUESTS, ResultStatus::RateLimited),
            (StatusCode::UNAUTHORIZED, ResultStatus::AuthError),
            (StatusCode::FORBIDDEN, ResultStatus::AuthError),
            (StatusCode::INTERNAL_SERVER_ERROR, ResultStatus::UnknownError),
            (StatusCode::BAD_REQUEST, ResultStatus::UnknownError),
        ];
        for (code, expected) in cases {
            assert_eq!(ProviderError::from_status(code, "").status(), expected);
        }

        let overloaded = StatusCode::from_u16(529).unwrap();
        assert_eq!(
            ProviderError::from_status(overloaded, "").status(),
            ResultStatus::RateLimited
        );
        assert_eq!(
            ProviderError::MissingCredential("KEY".into()).status(),
            ResultStatus::Unavailable
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }

    #[test]
    fn test_missing_credential_yields_no_adapter() {
        let factory = ConfigAdapterFactory::with_credentials(|_| None);
        let provider = remote("gpt");

        assert!(!factory.is_available(&provider));
        let err = factory.adapter_for(&provider).err().expect("no adapter");
        assert_eq!(err.status(), ResultStatus::Unavailable);
        assert!(err.to_string().contains("QUORUM_TEST_KEY"));
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let factory = ConfigAdapterFactory::with_credentials(|_| Some("  ".to_string()));
        assert!(factory.adapter_for(&remote("gpt")).is_err());
    }

    #[test]
    fn test_adapters_are_cached() {
        let factory = ConfigAdapterFactory::with_credentials(|_| Some("sk-test".to_string()));
        let provider = remote("gpt");

        let first = factory.adapter_for(&provider).unwrap();
        let second = factory.adapter_for(&provider).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.family(), "openai");
    }

    #[test]
    fn test_local_families_need_no_credential() {
        let factory = ConfigAdapterFactory::with_credentials(|_| None);
        let provider = Provider::scripted("echo", &[Capability::Generation], 1, "hi");

        assert!(factory.is_available(&provider));
        assert_eq!(factory.adapter_for(&provider).unwrap().family(), "static");
    }
}
