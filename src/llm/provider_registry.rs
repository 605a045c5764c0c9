//! Provider Registry for the configured inference providers
//!
//! The registry is the read-only catalog the planner consults to find candidate
//! providers for a capability. It is built once from `quorum.toml` and shared as
//! an `Arc`; nothing mutates it afterwards, so lookups take no locks.
//!
//! ```rust,ignore
//! use quorum::llm::{Capability, ProviderRegistry};
//!
//! let registry = ProviderRegistry::from_config(&config);
//! for provider in registry.list_by_capability(Capability::Reasoning) {
//!     println!("{} (priority {})", provider.id, provider.priority);
//! }
//! ```

use crate::llm::capabilities::Capability;
use crate::types::{AppError, Result};
use crate::utils::toml_config::{BackendConfig, ProviderConfig, QuorumConfig};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::time::Duration;

/// A registered provider. Immutable after the registry is built.
#[derive(Debug, Clone)]
pub struct Provider {
    pub id: String,
    pub display_name: String,
    pub capabilities: BTreeSet<Capability>,
    /// Lower is tried first
    pub priority: u32,
    /// Prior in [0, 1]
    pub reliability: f64,
    pub timeout: Duration,
    /// Name of the environment variable holding the credential
    pub credential_ref: Option<String>,
    pub rate_limit_per_minute: Option<u32>,
    pub backend: BackendConfig,
}

impl Provider {
    /// Build a provider from its `[providers.<id>]` entry.
    pub fn from_config(id: &str, config: &ProviderConfig) -> Self {
        Self {
            id: id.to_string(),
            display_name: config
                .display_name
                .clone()
                .unwrap_or_else(|| id.to_string()),
            capabilities: config.capabilities.iter().copied().collect(),
            priority: config.priority,
            reliability: config.reliability.clamp(0.0, 1.0),
            timeout: Duration::from_millis(config.timeout_ms),
            credential_ref: config.credential_env.clone(),
            rate_limit_per_minute: config.rate_limit_per_minute,
            backend: config.backend.clone(),
        }
    }

    /// A `static` provider with a canned reply. Handy for wiring and tests.
    pub fn scripted(id: &str, capabilities: &[Capability], priority: u32, reply: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: id.to_string(),
            capabilities: capabilities.iter().copied().collect(),
            priority,
            reliability: 0.5,
            timeout: Duration::from_secs(10),
            credential_ref: None,
            rate_limit_per_minute: None,
            backend: BackendConfig::Static {
                reply: Some(reply.to_string()),
                delay_ms: 0,
                fail_with: None,
            },
        }
    }

    pub fn with_reliability(mut self, reliability: f64) -> Self {
        self.reliability = reliability.clamp(0.0, 1.0);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_credential_ref(mut self, env_name: &str) -> Self {
        self.credential_ref = Some(env_name.to_string());
        self
    }

    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = Some(per_minute);
        self
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Provider family (`openai`, `anthropic`, ...).
    pub fn family(&self) -> &'static str {
        self.backend.family()
    }

    /// Candidate order: priority ascending, reliability descending, id ascending.
    fn candidate_order(a: &Provider, b: &Provider) -> Ordering {
        a.priority
            .cmp(&b.priority)
            .then_with(|| b.reliability.total_cmp(&a.reliability))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Read-only catalog of providers, kept in candidate order.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Provider>,
}

impl ProviderRegistry {
    /// Create a registry from providers. Later duplicates of an id are dropped.
    pub fn new(providers: Vec<Provider>) -> Self {
        let mut unique: Vec<Provider> = Vec::with_capacity(providers.len());
        for provider in providers {
            if unique.iter().any(|p| p.id == provider.id) {
                tracing::warn!(provider = %provider.id, "Duplicate provider id ignored");
                continue;
            }
            unique.push(provider);
        }
        unique.sort_by(Provider::candidate_order);

        Self { providers: unique }
    }

    /// Create a provider registry from TOML configuration
    pub fn from_config(config: &QuorumConfig) -> Self {
        Self::new(
            config
                .providers
                .iter()
                .map(|(id, provider)| Provider::from_config(id, provider))
                .collect(),
        )
    }

    /// Providers declaring `capability`, in candidate order.
    pub fn list_by_capability(&self, capability: Capability) -> Vec<&Provider> {
        self.providers
            .iter()
            .filter(|p| p.supports(capability))
            .collect()
    }

    /// Look up a provider by id.
    pub fn get(&self, id: &str) -> Result<&Provider> {
        self.providers
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| AppError::NotFound(format!("provider '{}' is not registered", id)))
    }

    /// Capabilities with at least one provider, in declaration order.
    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.providers.iter().any(|p| p.supports(*cap)))
            .collect()
    }

    /// All providers, in candidate order.
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
