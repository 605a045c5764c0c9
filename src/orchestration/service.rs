use crate::llm::{AdapterFactory, Capability, ConfigAdapterFactory, Provider, ProviderRegistry};
use crate::orchestration::dispatcher::Dispatcher;
use crate::orchestration::planner::TaskPlanner;
use crate::orchestration::synthesizer::Synthesizer;
use crate::types::{
    AggregatedResponse, AppError, OrchestrateRequest, OrchestrateResponse, OrchestrationMode,
    ProviderCheck, ProviderResult, ProviderSummary, ResearchRequest, Result, ResultStatus, Task,
};
use crate::utils::toml_config::{OrchestrationConfig, QuorumConfig};
use futures::{FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

const CHECK_PROMPT: &str = "Reply with the single word: ready";

/// Entry point for orchestration: validates a request, then runs
/// planner, dispatcher and synthesizer in turn.
pub struct OrchestrationService {
    registry: Arc<ProviderRegistry>,
    adapters: Arc<dyn AdapterFactory>,
    planner: TaskPlanner,
    dispatcher: Dispatcher,
    synthesizer: Synthesizer,
    limits: OrchestrationConfig,
}

impl OrchestrationService {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        adapters: Arc<dyn AdapterFactory>,
        limits: OrchestrationConfig,
    ) -> Self {
        Self {
            planner: TaskPlanner::new(registry.clone()),
            dispatcher: Dispatcher::new(registry.clone(), adapters.clone(), limits.max_concurrency),
            synthesizer: Synthesizer::new(registry.clone(), limits.agreement_threshold),
            registry,
            adapters,
            limits,
        }
    }

    /// Service over the configured providers, with credentials from the environment.
    pub fn from_config(config: &QuorumConfig) -> Self {
        Self::new(
            Arc::new(ProviderRegistry::from_config(config)),
            Arc::new(ConfigAdapterFactory::new()),
            config.orchestration.clone(),
        )
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Validate a raw API request. Runs before any provider is called.
    pub fn validate(&self, raw: OrchestrateRequest) -> Result<ResearchRequest> {
        let query = raw.query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput("query must not be empty".to_string()));
        }
        let query_chars = query.chars().count();
        if query_chars > self.limits.max_query_chars {
            return Err(AppError::InvalidInput(format!(
                "query is {} characters long; the limit is {}",
                query_chars, self.limits.max_query_chars
            )));
        }

        let capabilities = raw
            .capabilities
            .unwrap_or_default()
            .iter()
            .map(|name| {
                name.parse::<Capability>()
                    .map_err(|e| AppError::InvalidInput(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mode = match raw.mode.as_deref() {
            None => OrchestrationMode::default(),
            Some(mode) => OrchestrationMode::parse(mode).ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "unknown mode '{}'; expected 'fallback' or 'fanout'",
                    mode.trim()
                ))
            })?,
        };

        let deadline_ms = match raw.deadline_ms {
            None => self.limits.default_deadline_ms,
            Some(ms) if ms >= 1 && (ms as u64) <= self.limits.max_deadline_ms => ms as u64,
            Some(ms) => {
                return Err(AppError::InvalidInput(format!(
                    "deadlineMs must be between 1 and {}, got {}",
                    self.limits.max_deadline_ms, ms
                )))
            }
        };

        let mut request = ResearchRequest::new(query, capabilities)
            .with_mode(mode)
            .with_deadline(Duration::from_millis(deadline_ms));
        if let Some(context) = raw.context.as_deref().map(str::trim) {
            if !context.is_empty() {
                request = request.with_context(context);
            }
        }

        Ok(request)
    }

    /// Validate, orchestrate and shape the response for the HTTP contract.
    pub async fn handle(&self, raw: OrchestrateRequest) -> Result<OrchestrateResponse> {
        let request = self.validate(raw)?;
        let response = self.run(request).await?;
        Ok(response.into())
    }

    /// Orchestrate an already validated request.
    pub async fn run(&self, request: ResearchRequest) -> Result<AggregatedResponse> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();

        let tasks = self.planner.plan(&request);
        tracing::info!(
            %request_id,
            mode = request.mode.as_str(),
            tasks = tasks.len(),
            deadline_ms = request.deadline.as_millis() as u64,
            "Orchestrating request"
        );

        let results = self
            .dispatcher
            .execute(tasks.clone(), request.mode, request.deadline)
            .await
            .inspect_err(|e| tracing::error!(%request_id, error = %e, "Orchestration defect"))?;

        let response = self
            .synthesizer
            .synthesize(&request, &tasks, results, started.elapsed());

        tracing::info!(
            %request_id,
            confidence = response.confidence,
            fallback_used = response.fallback_used,
            contributors = ?response.contributing_providers,
            latency_ms = response.total_latency_ms,
            "Request orchestrated"
        );

        Ok(response)
    }

    /// Registry catalog with credential availability.
    pub fn provider_summaries(&self) -> Vec<ProviderSummary> {
        self.registry
            .providers()
            .iter()
            .map(|p| ProviderSummary {
                id: p.id.clone(),
                display_name: p.display_name.clone(),
                family: p.family().to_string(),
                capabilities: p.capabilities.iter().copied().collect(),
                priority: p.priority,
                reliability: p.reliability,
                timeout_ms: p.timeout.as_millis() as u64,
                available: self.adapters.is_available(p),
            })
            .collect()
    }

    /// Send a minimal task to every provider and report how each one answered.
    ///
    /// Unlike [`provider_summaries`](Self::provider_summaries) this makes real
    /// calls, so it spends provider quota and local rate-limit slots. Checks run
    /// concurrently up to `max_concurrency` and come back in candidate order.
    pub async fn check_providers(&self) -> Vec<ProviderCheck> {
        let limit = Duration::from_millis(self.limits.check_timeout_ms);
        let calls: Vec<_> = self
            .registry
            .providers()
            .iter()
            .map(|provider| self.check_one(provider, limit))
            .collect();
        let checks: Vec<ProviderCheck> = futures::stream::iter(calls)
            .buffered(self.limits.max_concurrency.max(1))
            .collect()
            .await;

        let reachable = checks.iter().filter(|c| c.status.is_success()).count();
        tracing::info!(
            providers = checks.len(),
            reachable,
            "Provider connectivity checked"
        );
        checks
    }

    async fn check_one(&self, provider: &Provider, limit: Duration) -> ProviderCheck {
        let capability = provider
            .capabilities
            .iter()
            .next()
            .copied()
            .unwrap_or(Capability::Generation);
        let task = Task {
            id: Uuid::new_v4(),
            capability,
            instruction: capability.instruction().to_string(),
            prompt: CHECK_PROMPT.to_string(),
            assigned_providers: vec![provider.id.clone()],
        };

        let result = match self.adapters.adapter_for(provider) {
            Ok(adapter) => {
                let timeout = provider.timeout.min(limit);
                let call =
                    AssertUnwindSafe(adapter.invoke(&task, provider, timeout)).catch_unwind();
                // Adapters bound themselves; the outer timeout covers ones that don't.
                match tokio::time::timeout(timeout, call).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(_)) => ProviderResult::failure(
                        &task,
                        &provider.id,
                        ResultStatus::UnknownError,
                        "adapter panicked",
                        Duration::ZERO,
                    ),
                    Err(_) => ProviderResult::failure(
                        &task,
                        &provider.id,
                        ResultStatus::Timeout,
                        format!("no reply within {} ms", timeout.as_millis()),
                        timeout,
                    ),
                }
            }
            Err(err) => ProviderResult::failure(
                &task,
                &provider.id,
                err.status(),
                err.to_string(),
                Duration::ZERO,
            ),
        };

        ProviderCheck::from_result(provider.family(), &result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::toml_config::BackendConfig;

    fn service() -> OrchestrationService {
        let registry = Arc::new(ProviderRegistry::new(vec![Provider::scripted(
            "mock1",
            &[Capability::Reasoning],
            1,
            "scripted answer",
        )]));
        OrchestrationService::new(
            registry,
            Arc::new(ConfigAdapterFactory::with_credentials(|_| None)),
            OrchestrationConfig::default(),
        )
    }

    fn raw(query: &str) -> OrchestrateRequest {
        OrchestrateRequest {
            query: query.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_defaults() {
        let request = service().validate(raw("  outlook  ")).unwrap();
        assert_eq!(request.query, "outlook");
        assert!(request.capabilities.is_empty());
        assert_eq!(request.mode, OrchestrationMode::Fallback);
        assert_eq!(request.deadline, Duration::from_millis(30_000));
        assert!(request.context.is_none());
    }

    #[test]
    fn test_validate_rejects_blank_query() {
        assert!(matches!(
            service().validate(raw("   ")),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_rejects_long_query() {
        let long = "x".repeat(8_001);
        let err = service().validate(raw(&long)).unwrap_err();
        assert!(err.to_string().contains("8000"));
    }

    #[test]
    fn test_validate_capabilities_case_insensitive() {
        let mut req = raw("q");
        req.capabilities = Some(vec!["REASONING".into(), "sentiment".into()]);
        let request = service().validate(req).unwrap();
        assert_eq!(
            request.capabilities,
            vec![Capability::Reasoning, Capability::Sentiment]
        );

        let mut bad = raw("q");
        bad.capabilities = Some(vec!["astrology".into()]);
        let err = service().validate(bad).unwrap_err();
        assert!(err.to_string().contains("astrology"));
    }

    #[test]
    fn test_validate_mode_and_deadline() {
        let mut req = raw("q");
        req.mode = Some("FanOut".into());
        req.deadline_ms = Some(250);
        let request = service().validate(req).unwrap();
        assert_eq!(request.mode, OrchestrationMode::Fanout);
        assert_eq!(request.deadline, Duration::from_millis(250));

        for deadline in [0, -5, 120_001] {
            let mut req = raw("q");
            req.deadline_ms = Some(deadline);
            assert!(service().validate(req).is_err(), "deadline {}", deadline);
        }

        let mut req = raw("q");
        req.mode = Some("broadcast".into());
        assert!(service().validate(req).is_err());
    }

    #[tokio::test]
    async fn test_handle_end_to_end() {
        let response = service().handle(raw("What now?")).await.unwrap();
        assert_eq!(response.content, "scripted answer");
        assert!(response.confidence > 0.0);
        assert!(!response.fallback_used);
        assert_eq!(response.contributing_providers, vec!["mock1"]);
        assert_eq!(response.per_task.len(), 1);
    }

    #[test]
    fn test_provider_summaries() {
        let summaries = service().provider_summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].family, "static");
        assert!(summaries[0].available);
    }

    fn scripted_failure(id: &str, status: ResultStatus) -> Provider {
        Provider::scripted(id, &[Capability::Sentiment], 2, "unused").with_backend(
            BackendConfig::Static {
                reply: None,
                delay_ms: 0,
                fail_with: Some(status),
            },
        )
    }

    #[tokio::test]
    async fn test_local_rate_limit_falls_back_to_next_provider() {
        let registry = Arc::new(ProviderRegistry::new(vec![
            Provider::scripted("limited", &[Capability::Reasoning], 1, "first").with_rate_limit(1),
            Provider::scripted("backup", &[Capability::Reasoning], 2, "second"),
        ]));
        let service = OrchestrationService::new(
            registry,
            Arc::new(ConfigAdapterFactory::with_credentials(|_| None)),
            OrchestrationConfig::default(),
        );
        let request = || ResearchRequest::new("Hold or sell?", vec![Capability::Reasoning]);

        let first = service.run(request()).await.unwrap();
        assert_eq!(first.content, "first");
        assert!(!first.fallback_used);

        let second = service.run(request()).await.unwrap();
        assert_eq!(second.content, "second");
        assert!(second.fallback_used);
        assert_eq!(second.contributing_providers, vec!["backup"]);

        let limited = second
            .per_task_results
            .iter()
            .find(|r| r.provider_id.as_deref() == Some("limited"))
            .unwrap();
        assert_eq!(limited.status, ResultStatus::RateLimited);
        assert_eq!(limited.attempt, 1);
    }

    #[tokio::test]
    async fn test_check_providers_reports_each_outcome() {
        let registry = Arc::new(ProviderRegistry::new(vec![
            Provider::scripted("ready", &[Capability::Reasoning], 1, "ready"),
            scripted_failure("busy", ResultStatus::RateLimited),
            Provider::scripted("sleepy", &[Capability::Generation], 3, "zzz")
                .with_backend(BackendConfig::Static {
                    reply: Some("zzz".to_string()),
                    delay_ms: 500,
                    fail_with: None,
                })
                .with_timeout(Duration::from_millis(50)),
            Provider::scripted("remote", &[Capability::Summarization], 4, "unused")
                .with_backend(BackendConfig::OpenAI {
                    api_base: "http://127.0.0.1:9".to_string(),
                    model: "gpt-4o-mini".to_string(),
                    max_tokens: None,
                })
                .with_credential_ref("QUORUM_TEST_KEY"),
        ]));
        let service = OrchestrationService::new(
            registry,
            Arc::new(ConfigAdapterFactory::with_credentials(|_| None)),
            OrchestrationConfig::default(),
        );

        let checks = service.check_providers().await;
        let ids: Vec<&str> = checks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["ready", "busy", "sleepy", "remote"]);

        let statuses: Vec<ResultStatus> = checks.iter().map(|c| c.status).collect();
        assert_eq!(
            statuses,
            vec![
                ResultStatus::Success,
                ResultStatus::RateLimited,
                ResultStatus::Timeout,
                ResultStatus::Unavailable,
            ]
        );
        assert_eq!(checks[3].family, "openai");
        assert_eq!(checks[3].latency_ms, 0);
        assert!(checks[3].detail.as_deref().unwrap().contains("QUORUM_TEST_KEY"));
        assert!(checks[2].latency_ms < 450);
    }
}
