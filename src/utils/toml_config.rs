//! TOML-based configuration for Quorum
//!
//! The whole server is described by one file (`quorum.toml`): the listen address,
//! the orchestration limits and the provider catalog. Credentials never live in
//! the file; providers name the environment variable holding their secret.
//!
//! The configuration is loaded once at startup. Changing providers requires a
//! restart, which keeps the registry immutable for the lifetime of the process.

use crate::llm::Capability;
use crate::types::{AppError, ResultStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure loaded from quorum.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuorumConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub orchestration: OrchestrationConfig,

    /// Provider catalog keyed by provider id
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============= Orchestration Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// Deadline applied when a request does not carry one
    #[serde(default = "default_deadline_ms")]
    pub default_deadline_ms: u64,

    /// Largest deadline a caller may ask for
    #[serde(default = "default_max_deadline_ms")]
    pub max_deadline_ms: u64,

    /// Upper bound on concurrent outbound provider calls, across all requests
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,

    /// Key-term overlap at which two fan-out answers count as agreeing
    #[serde(default = "default_agreement_threshold")]
    pub agreement_threshold: f64,

    /// Upper bound on each live connectivity check
    #[serde(default = "default_check_timeout_ms")]
    pub check_timeout_ms: u64,
}

fn default_deadline_ms() -> u64 {
    30_000
}

fn default_max_deadline_ms() -> u64 {
    120_000
}

fn default_max_concurrency() -> usize {
    16
}

fn default_max_query_chars() -> usize {
    8_000
}

fn default_agreement_threshold() -> f64 {
    0.3
}

fn default_check_timeout_ms() -> u64 {
    5_000
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            default_deadline_ms: default_deadline_ms(),
            max_deadline_ms: default_max_deadline_ms(),
            max_concurrency: default_max_concurrency(),
            max_query_chars: default_max_query_chars(),
            agreement_threshold: default_agreement_threshold(),
            check_timeout_ms: default_check_timeout_ms(),
        }
    }
}

// ============= Provider Configuration =============

/// One entry of `[providers.<id>]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Defaults to the provider id
    #[serde(default)]
    pub display_name: Option<String>,

    pub capabilities: Vec<Capability>,

    /// Lower is tried first
    #[serde(default = "default_priority")]
    pub priority: u32,

    /// Prior in [0, 1]; breaks priority ties and seeds confidence
    #[serde(default = "default_reliability")]
    pub reliability: f64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Environment variable containing the API key
    #[serde(default)]
    pub credential_env: Option<String>,

    /// Advisory local limit; calls beyond it fail fast as `RATE_LIMITED`
    #[serde(default)]
    pub rate_limit_per_minute: Option<u32>,

    #[serde(flatten)]
    pub backend: BackendConfig,
}

fn default_priority() -> u32 {
    100
}

fn default_reliability() -> f64 {
    0.5
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// Provider family and its endpoint details, selected by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Any OpenAI-compatible `/chat/completions` endpoint
    #[serde(rename = "openai")]
    OpenAI {
        #[serde(default = "default_openai_base")]
        api_base: String,
        model: String,
        #[serde(default)]
        max_tokens: Option<u32>,
    },
    Anthropic {
        #[serde(default = "default_anthropic_base")]
        api_base: String,
        model: String,
        #[serde(default = "default_max_tokens")]
        max_tokens: u32,
    },
    Gemini {
        #[serde(default = "default_gemini_base")]
        api_base: String,
        model: String,
    },
    Cohere {
        #[serde(default = "default_cohere_base")]
        api_base: String,
        model: String,
        #[serde(default)]
        max_tokens: Option<u32>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        model: String,
    },
    /// Scripted local reply for development and demos
    Static {
        #[serde(default)]
        reply: Option<String>,
        #[serde(default)]
        delay_ms: u64,
        #[serde(default)]
        fail_with: Option<ResultStatus>,
    },
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_base() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_gemini_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_cohere_base() -> String {
    "https://api.cohere.com".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

impl BackendConfig {
    /// Family name as written in `type`.
    pub fn family(&self) -> &'static str {
        match self {
            BackendConfig::OpenAI { .. } => "openai",
            BackendConfig::Anthropic { .. } => "anthropic",
            BackendConfig::Gemini { .. } => "gemini",
            BackendConfig::Cohere { .. } => "cohere",
            BackendConfig::Ollama { .. } => "ollama",
            BackendConfig::Static { .. } => "static",
        }
    }

    /// Whether calls to this family need a credential.
    pub fn requires_credential(&self) -> bool {
        matches!(
            self,
            BackendConfig::OpenAI { .. }
                | BackendConfig::Anthropic { .. }
                | BackendConfig::Gemini { .. }
                | BackendConfig::Cohere { .. }
        )
    }
}

// ============= Configuration Loading & Validation =============

/// Configuration warnings that don't prevent operation but may indicate issues
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub kind: ConfigWarningKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarningKind {
    /// The provider's credential variable is not set; it will report `UNAVAILABLE`
    UnresolvedCredential,
    /// No provider declares the capability
    UncoveredCapability,
    /// Two providers of one capability share a priority
    PriorityTie,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Provider '{0}': {1}")]
    InvalidProvider(String, String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl QuorumConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: QuorumConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural consistency. Missing credentials are not errors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let orch = &self.orchestration;

        if orch.max_deadline_ms == 0 {
            return Err(ConfigError::ValidationError(
                "orchestration.max_deadline_ms must be greater than zero".to_string(),
            ));
        }
        if orch.default_deadline_ms == 0 || orch.default_deadline_ms > orch.max_deadline_ms {
            return Err(ConfigError::ValidationError(format!(
                "orchestration.default_deadline_ms must be in 1..={}, got {}",
                orch.max_deadline_ms, orch.default_deadline_ms
            )));
        }
        if orch.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "orchestration.max_concurrency must be greater than zero".to_string(),
            ));
        }
        if orch.check_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "orchestration.check_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if orch.max_query_chars == 0 {
            return Err(ConfigError::ValidationError(
                "orchestration.max_query_chars must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&orch.agreement_threshold) {
            return Err(ConfigError::ValidationError(format!(
                "orchestration.agreement_threshold must be within [0, 1], got {}",
                orch.agreement_threshold
            )));
        }

        for (id, provider) in &self.providers {
            self.validate_provider(id, provider)?;
        }

        Ok(())
    }

    fn validate_provider(&self, id: &str, provider: &ProviderConfig) -> Result<(), ConfigError> {
        let invalid = |msg: String| ConfigError::InvalidProvider(id.to_string(), msg);

        if id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider ids must not be empty".to_string(),
            ));
        }
        if provider.capabilities.is_empty() {
            return Err(invalid("must declare at least one capability".to_string()));
        }
        if !(0.0..=1.0).contains(&provider.reliability) {
            return Err(invalid(format!(
                "reliability must be within [0, 1], got {}",
                provider.reliability
            )));
        }
        if provider.timeout_ms == 0 {
            return Err(invalid("timeout_ms must be greater than zero".to_string()));
        }
        if provider.rate_limit_per_minute == Some(0) {
            return Err(invalid(
                "rate_limit_per_minute must be greater than zero when set".to_string(),
            ));
        }

        match &provider.backend {
            BackendConfig::OpenAI { api_base, model, .. }
            | BackendConfig::Anthropic { api_base, model, .. }
            | BackendConfig::Gemini { api_base, model }
            | BackendConfig::Cohere { api_base, model, .. } => {
                if api_base.trim().is_empty() {
                    return Err(invalid("api_base must not be empty".to_string()));
                }
                if model.trim().is_empty() {
                    return Err(invalid("model must not be empty".to_string()));
                }
                if provider.credential_env.is_none() {
                    return Err(invalid(format!(
                        "type '{}' requires credential_env",
                        provider.backend.family()
                    )));
                }
            }
            BackendConfig::Ollama { base_url, model } => {
                if base_url.trim().is_empty() {
                    return Err(invalid("base_url must not be empty".to_string()));
                }
                if model.trim().is_empty() {
                    return Err(invalid("model must not be empty".to_string()));
                }
            }
            BackendConfig::Static { fail_with, .. } => {
                if *fail_with == Some(ResultStatus::Success) {
                    return Err(invalid("fail_with cannot be SUCCESS".to_string()));
                }
            }
        }

        Ok(())
    }

    /// Validate configuration and collect warnings
    ///
    /// Returns Ok with warnings, or Err if validation fails
    pub fn validate_with_warnings(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(self.check_unresolved_credentials());
        warnings.extend(self.check_uncovered_capabilities());
        warnings.extend(self.check_priority_ties());

        Ok(warnings)
    }

    fn check_unresolved_credentials(&self) -> Vec<ConfigWarning> {
        let mut warnings: Vec<ConfigWarning> = self
            .providers
            .iter()
            .filter_map(|(id, provider)| {
                let env = provider.credential_env.as_ref()?;
                if self.resolve_env(env).is_some() {
                    return None;
                }
                Some(ConfigWarning {
                    kind: ConfigWarningKind::UnresolvedCredential,
                    message: format!(
                        "Provider '{}' reads its credential from '{}', which is not set; it will report UNAVAILABLE",
                        id, env
                    ),
                })
            })
            .collect();
        warnings.sort_by(|a, b| a.message.cmp(&b.message));
        warnings
    }

    fn check_uncovered_capabilities(&self) -> Vec<ConfigWarning> {
        Capability::ALL
            .into_iter()
            .filter(|cap| {
                !self
                    .providers
                    .values()
                    .any(|p| p.capabilities.contains(cap))
            })
            .map(|cap| ConfigWarning {
                kind: ConfigWarningKind::UncoveredCapability,
                message: format!("No provider declares capability '{}'", cap),
            })
            .collect()
    }

    fn check_priority_ties(&self) -> Vec<ConfigWarning> {
        let mut by_slot: BTreeMap<(Capability, u32), Vec<&str>> = BTreeMap::new();
        for (id, provider) in &self.providers {
            for cap in &provider.capabilities {
                by_slot
                    .entry((*cap, provider.priority))
                    .or_default()
                    .push(id.as_str());
            }
        }

        by_slot
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|((cap, priority), mut ids)| {
                ids.sort_unstable();
                ConfigWarning {
                    kind: ConfigWarningKind::PriorityTie,
                    message: format!(
                        "Providers {} share priority {} for '{}'; reliability then id decide the order",
                        ids.join(", "),
                        priority,
                        cap
                    ),
                }
            })
            .collect()
    }

    /// Get a resolved value from an env var reference
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok().filter(|v| !v.trim().is_empty())
    }

    /// Get provider by id
    pub fn get_provider(&self, id: &str) -> Option<&ProviderConfig> {
        self.providers.get(id)
    }
}
