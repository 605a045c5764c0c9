//! Scripted adapters shared by the integration tests.
//!
//! A [`MockFactory`] hands out one [`MockAdapter`] per provider id and records
//! every invocation, so tests can assert which providers were called, in what
//! order, and how many ran at once.

use async_trait::async_trait;
use parking_lot::Mutex;
use quorum::llm::{
    AdapterFactory, Capability, Provider, ProviderAdapter, ProviderError, ProviderRegistry,
};
use quorum::types::{ProviderResult, ResultStatus, Task};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// What a mock provider does when invoked.
#[derive(Debug, Clone)]
pub enum Behavior {
    Reply(String),
    Fail(ResultStatus),
    /// Sleep, then reply; honors the invocation timeout
    Slow(Duration, String),
    /// Sleep without looking at the invocation timeout
    Stall(Duration),
    Panic,
}

/// Shared invocation bookkeeping.
#[derive(Default)]
pub struct CallLog {
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl CallLog {
    /// Provider ids in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn count_for(&self, id: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == id).count()
    }

    /// Highest number of invocations observed running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct ActiveGuard<'a>(&'a CallLog);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockAdapter {
    behavior: Behavior,
    log: Arc<CallLog>,
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    async fn invoke(&self, task: &Task, provider: &Provider, timeout: Duration) -> ProviderResult {
        self.log.calls.lock().push(provider.id.clone());
        let now_active = self.log.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.peak.fetch_max(now_active, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.log);

        let started = Instant::now();
        match &self.behavior {
            Behavior::Reply(text) => {
                ProviderResult::reply(task, &provider.id, text.clone(), started.elapsed())
            }
            Behavior::Fail(status) => ProviderResult::failure(
                task,
                &provider.id,
                *status,
                "scripted failure",
                started.elapsed(),
            ),
            Behavior::Slow(delay, text) => {
                match tokio::time::timeout(timeout, tokio::time::sleep(*delay)).await {
                    Ok(()) => {
                        ProviderResult::reply(task, &provider.id, text.clone(), started.elapsed())
                    }
                    Err(_) => ProviderResult::failure(
                        task,
                        &provider.id,
                        ResultStatus::Timeout,
                        "timed out",
                        started.elapsed(),
                    ),
                }
            }
            Behavior::Stall(delay) => {
                tokio::time::sleep(*delay).await;
                ProviderResult::reply(task, &provider.id, "late".to_string(), started.elapsed())
            }
            Behavior::Panic => panic!("mock adapter for '{}' panicked", provider.id),
        }
    }

    fn family(&self) -> &'static str {
        "mock"
    }
}

/// Adapter factory over scripted behaviors. Providers without a behavior
/// report a missing credential.
#[derive(Default)]
pub struct MockFactory {
    adapters: HashMap<String, Arc<MockAdapter>>,
    log: Arc<CallLog>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: &str, behavior: Behavior) -> Self {
        self.adapters.insert(
            id.to_string(),
            Arc::new(MockAdapter {
                behavior,
                log: self.log.clone(),
            }),
        );
        self
    }

    pub fn reply(self, id: &str, text: &str) -> Self {
        self.with(id, Behavior::Reply(text.to_string()))
    }

    pub fn fail(self, id: &str, status: ResultStatus) -> Self {
        self.with(id, Behavior::Fail(status))
    }

    pub fn slow(self, id: &str, delay_ms: u64, text: &str) -> Self {
        self.with(
            id,
            Behavior::Slow(Duration::from_millis(delay_ms), text.to_string()),
        )
    }

    pub fn log(&self) -> Arc<CallLog> {
        self.log.clone()
    }
}

impl AdapterFactory for MockFactory {
    fn adapter_for(&self, provider: &Provider) -> Result<Arc<dyn ProviderAdapter>, ProviderError> {
        match self.adapters.get(&provider.id) {
            Some(adapter) => Ok(adapter.clone() as Arc<dyn ProviderAdapter>),
            None => Err(ProviderError::MissingCredential(format!(
                "{}_API_KEY",
                provider.id.to_uppercase()
            ))),
        }
    }

    fn is_available(&self, provider: &Provider) -> bool {
        self.adapters.contains_key(&provider.id)
    }
}

/// Provider serving `caps` at `priority`; its behavior comes from the factory.
pub fn provider(id: &str, caps: &[Capability], priority: u32) -> Provider {
    Provider::scripted(id, caps, priority, "unused")
}

pub fn registry(providers: Vec<Provider>) -> Arc<ProviderRegistry> {
    Arc::new(ProviderRegistry::new(providers))
}
