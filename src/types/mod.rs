use crate::llm::Capability;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use utoipa::ToSchema;
use uuid::Uuid;

// ============= Orchestration Domain Types =============

/// Identifier of a planned task. Unique per request only.
pub type TaskId = Uuid;

/// How the dispatcher treats the candidate providers of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrchestrationMode {
    /// Try candidates one at a time in priority order until one succeeds.
    #[default]
    Fallback,
    /// Invoke every candidate concurrently and combine all successes.
    Fanout,
}

impl OrchestrationMode {
    /// Parse a mode name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fallback" => Some(Self::Fallback),
            "fanout" | "fan-out" => Some(Self::Fanout),
            _ => None,
        }
    }

    /// Wire name of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fallback => "fallback",
            Self::Fanout => "fanout",
        }
    }
}

/// Outcome of a single adapter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    Success,
    Timeout,
    RateLimited,
    AuthError,
    Malformed,
    /// The adapter could not be built (missing credential); no call was made.
    Unavailable,
    UnknownError,
}

impl ResultStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Timeout => "TIMEOUT",
            Self::RateLimited => "RATE_LIMITED",
            Self::AuthError => "AUTH_ERROR",
            Self::Malformed => "MALFORMED",
            Self::Unavailable => "UNAVAILABLE",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated orchestration request. Lives for the duration of one call.
#[derive(Debug, Clone)]
pub struct ResearchRequest {
    pub query: String,
    /// Requested capabilities, in the caller's order, without duplicates.
    pub capabilities: Vec<Capability>,
    pub mode: OrchestrationMode,
    pub context: Option<String>,
    pub deadline: Duration,
}

impl ResearchRequest {
    /// Create a fallback-mode request with a 30 second deadline.
    pub fn new(query: impl Into<String>, capabilities: Vec<Capability>) -> Self {
        let mut unique = Vec::with_capacity(capabilities.len());
        for cap in capabilities {
            if !unique.contains(&cap) {
                unique.push(cap);
            }
        }

        Self {
            query: query.into(),
            capabilities: unique,
            mode: OrchestrationMode::Fallback,
            context: None,
            deadline: Duration::from_secs(30),
        }
    }

    pub fn with_mode(mut self, mode: OrchestrationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

/// One unit of planned work: a capability and its candidate providers.
#[derive(Debug, Clone)]
pub struct Task {
    pub id: TaskId,
    pub capability: Capability,
    /// System instruction for the capability
    pub instruction: String,
    /// User prompt derived from the query and optional context
    pub prompt: String,
    /// Candidate provider ids in priority order
    pub assigned_providers: Vec<String>,
}

/// Append-only record of one adapter invocation (or a synthetic resolution).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResult {
    pub task_id: TaskId,
    pub capability: Capability,
    /// `None` only for the synthetic "capability unavailable" result
    pub provider_id: Option<String>,
    /// 1-based position of the provider in the task's candidate list
    pub attempt: u32,
    pub status: ResultStatus,
    pub content: Option<String>,
    /// Diagnostic message for failures
    pub detail: Option<String>,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl ProviderResult {
    /// Record a provider reply. Blank replies are recorded as `MALFORMED`, so a
    /// `SUCCESS` always carries non-empty content.
    pub fn reply(task: &Task, provider_id: &str, content: String, latency: Duration) -> Self {
        if content.trim().is_empty() {
            return Self::failure(
                task,
                provider_id,
                ResultStatus::Malformed,
                "provider returned an empty reply",
                latency,
            );
        }

        Self {
            task_id: task.id,
            capability: task.capability,
            provider_id: Some(provider_id.to_string()),
            attempt: 1,
            status: ResultStatus::Success,
            content: Some(content),
            detail: None,
            latency_ms: duration_ms(latency),
            timestamp: Utc::now(),
        }
    }

    /// Record a failed invocation. Passing `Success` here is a caller bug and is
    /// recorded as `UNKNOWN_ERROR`.
    pub fn failure(
        task: &Task,
        provider_id: &str,
        status: ResultStatus,
        detail: impl Into<String>,
        latency: Duration,
    ) -> Self {
        let status = if status.is_success() {
            ResultStatus::UnknownError
        } else {
            status
        };

        Self {
            task_id: task.id,
            capability: task.capability,
            provider_id: Some(provider_id.to_string()),
            attempt: 1,
            status,
            content: None,
            detail: Some(detail.into()),
            latency_ms: duration_ms(latency),
            timestamp: Utc::now(),
        }
    }

    /// Synthetic result for a task whose capability has no registered provider.
    pub fn capability_unavailable(task: &Task) -> Self {
        Self {
            task_id: task.id,
            capability: task.capability,
            provider_id: None,
            attempt: 0,
            status: ResultStatus::UnknownError,
            content: None,
            detail: Some(format!(
                "capability '{}' unavailable: no provider registered",
                task.capability
            )),
            latency_ms: 0,
            timestamp: Utc::now(),
        }
    }

    /// Set the position of this attempt in the candidate chain.
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Provider id, or `-` for synthetic results.
    pub fn provider_label(&self) -> &str {
        self.provider_id.as_deref().unwrap_or("-")
    }
}

/// The terminal, synthesized answer for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedResponse {
    pub content: String,
    /// 0.0 exactly when no provider succeeded
    pub confidence: f64,
    pub contributing_providers: Vec<String>,
    pub fallback_used: bool,
    pub per_task_results: Vec<ProviderResult>,
    /// Human-readable provenance, one line per result
    pub trace: Vec<String>,
    pub total_latency_ms: u64,
}

pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============= API Request/Response Types =============

/// Body of `POST /api/orchestrate`.
///
/// Fields are kept loosely typed so that every malformed value is reported as a
/// validation error with a `400` instead of a deserialization rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrateRequest {
    /// Required, non-empty
    #[serde(default)]
    pub query: String,
    /// Capability names; defaults to every capability with a registered provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<String>>,
    /// `fallback` (default) or `fanout`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Request deadline in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<i64>,
}

/// One provider attempt as reported to API callers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PerTaskEntry {
    pub capability: Capability,
    pub provider: Option<String>,
    pub status: ResultStatus,
    pub latency_ms: u64,
}

/// Body of a successful `POST /api/orchestrate`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrateResponse {
    pub content: String,
    pub confidence: f64,
    pub fallback_used: bool,
    pub contributing_providers: Vec<String>,
    pub per_task: Vec<PerTaskEntry>,
    pub trace: Vec<String>,
    pub total_latency_ms: u64,
}

impl From<AggregatedResponse> for OrchestrateResponse {
    fn from(response: AggregatedResponse) -> Self {
        let per_task = response
            .per_task_results
            .iter()
            .map(|result| PerTaskEntry {
                capability: result.capability,
                provider: result.provider_id.clone(),
                status: result.status,
                latency_ms: result.latency_ms,
            })
            .collect();

        Self {
            content: response.content,
            confidence: response.confidence,
            fallback_used: response.fallback_used,
            contributing_providers: response.contributing_providers,
            per_task,
            trace: response.trace,
            total_latency_ms: response.total_latency_ms,
        }
    }
}

/// Registry entry as exposed by `GET /api/providers`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSummary {
    pub id: String,
    pub display_name: String,
    pub family: String,
    pub capabilities: Vec<Capability>,
    pub priority: u32,
    pub reliability: f64,
    pub timeout_ms: u64,
    /// Whether the provider's credential (if any) is present
    pub available: bool,
}

/// Outcome of one live connectivity check, as exposed by
/// `GET /api/providers/check`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCheck {
    pub id: String,
    pub family: String,
    pub status: ResultStatus,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProviderCheck {
    pub fn from_result(family: &str, result: &ProviderResult) -> Self {
        Self {
            id: result.provider_id.clone().unwrap_or_default(),
            family: family.to_string(),
            status: result.status,
            latency_ms: result.latency_ms,
            detail: result.detail.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub providers: usize,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The caller's request was invalid; reported as `400`.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A defect in planning or synthesis; the only source of `5xx` responses.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            AppError::Configuration(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
