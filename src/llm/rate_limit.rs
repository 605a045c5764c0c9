//! Advisory per-provider rate limiting
//!
//! Providers with `rate_limit_per_minute` get their adapter wrapped in a
//! [`RateLimitedAdapter`]. Calls beyond the limit fail fast as `RATE_LIMITED`
//! without touching the network, so the dispatcher moves on to the next
//! candidate instead of burning the provider's own quota.

use crate::llm::client::ProviderAdapter;
use crate::llm::provider_registry::Provider;
use crate::types::{ProviderResult, ResultStatus, Task};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fixed-window counter. Lock-free; races at a window boundary may admit a few
/// extra calls, which is acceptable for an advisory limit.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    origin: Instant,
    current_window: AtomicU64,
    count: AtomicU32,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            origin: Instant::now(),
            current_window: AtomicU64::new(0),
            count: AtomicU32::new(0),
        }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    fn window_index(&self) -> u64 {
        let window_ms = self.window.as_millis().max(1);
        u64::try_from(self.origin.elapsed().as_millis() / window_ms).unwrap_or(u64::MAX)
    }

    /// Take one slot in the current window, if any is left.
    pub fn try_acquire(&self) -> bool {
        let now = self.window_index();
        let seen = self.current_window.load(Ordering::Acquire);
        if now != seen
            && self
                .current_window
                .compare_exchange(seen, now, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            self.count.store(0, Ordering::Release);
        }

        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                (count < self.max_requests).then_some(count + 1)
            })
            .is_ok()
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

/// Adapter wrapper that enforces a [`RateLimiter`] before delegating.
pub struct RateLimitedAdapter {
    inner: Arc<dyn ProviderAdapter>,
    limiter: RateLimiter,
}

impl RateLimitedAdapter {
    pub fn new(inner: Arc<dyn ProviderAdapter>, per_minute: u32) -> Self {
        Self::with_limiter(inner, RateLimiter::per_minute(per_minute))
    }

    pub fn with_limiter(inner: Arc<dyn ProviderAdapter>, limiter: RateLimiter) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl ProviderAdapter for RateLimitedAdapter {
    async fn invoke(&self, task: &Task, provider: &Provider, timeout: Duration) -> ProviderResult {
        if !self.limiter.try_acquire() {
            tracing::warn!(
                provider = %provider.id,
                limit = self.limiter.max_requests(),
                "Local rate limit reached"
            );
            return ProviderResult::failure(
                task,
                &provider.id,
                ResultStatus::RateLimited,
                format!(
                    "local limit of {} calls per window reached",
                    self.limiter.max_requests()
                ),
                Duration::ZERO,
            );
        }

        self.inner.invoke(task, provider, timeout).await
    }

    fn family(&self) -> &'static str {
        self.inner.family()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::static_reply::StaticAdapter;
    use crate::llm::Capability;
    use uuid::Uuid;

    #[test]
    fn test_limiter_admits_up_to_limit() {
        let limiter = RateLimiter::per_minute(2);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_limiter_resets_on_new_window() {
        let limiter = RateLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_wrapper_reports_rate_limited() {
        let inner: Arc<dyn ProviderAdapter> = Arc::new(StaticAdapter::new(
            Some("ok".to_string()),
            Duration::ZERO,
            None,
        ));
        let adapter = RateLimitedAdapter::new(inner, 1);
        let provider = Provider::scripted("echo", &[Capability::Reasoning], 1, "ok");
        let task = Task {
            id: Uuid::new_v4(),
            capability: Capability::Reasoning,
            instruction: String::new(),
            prompt: "q".to_string(),
            assigned_providers: vec!["echo".to_string()],
        };

        let first = adapter
            .invoke(&task, &provider, Duration::from_secs(1))
            .await;
        let second = adapter
            .invoke(&task, &provider, Duration::from_secs(1))
            .await;

        assert_eq!(first.status, ResultStatus::Success);
        assert_eq!(second.status, ResultStatus::RateLimited);
        assert_eq!(adapter.family(), "static");
    }
}
