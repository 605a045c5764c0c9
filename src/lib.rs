//! # Quorum - multi-provider inference orchestration
//!
//! Quorum takes a single request, splits it into one task per capability
//! (reasoning, summarization, sentiment, ...), dispatches each task to several
//! independent and unreliable inference providers, tolerates partial failure,
//! and returns one synthesized, confidence-scored answer together with the
//! provenance of every provider call.
//!
//! ## Overview
//!
//! Quorum can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `quorum-server` binary
//! 2. **As a library** - Embed the [`OrchestrationService`] in your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use quorum::{OrchestrationService, QuorumConfig};
//! use quorum::llm::Capability;
//! use quorum::types::{OrchestrationMode, ResearchRequest};
//!
//! let config = QuorumConfig::load("quorum.toml")?;
//! let service = OrchestrationService::from_config(&config);
//!
//! let request = ResearchRequest::new("Is the Rust job market growing?", vec![
//!     Capability::Reasoning,
//!     Capability::Sentiment,
//! ])
//! .with_mode(OrchestrationMode::Fanout);
//!
//! let answer = service.run(request).await?;
//! println!("{} (confidence {:.2})", answer.content, answer.confidence);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `swagger-ui` | Interactive API documentation at `/swagger-ui` |
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`cli`] - Command-line interface
//! - [`llm`] - Provider registry and adapters
//! - [`orchestration`] - Planner, dispatcher, synthesizer and service
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Provider registry and adapters.
pub mod llm;
/// Planning, dispatch and synthesis of requests.
pub mod orchestration;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use llm::{AdapterFactory, ConfigAdapterFactory, ProviderAdapter, ProviderRegistry};
pub use orchestration::OrchestrationService;
pub use types::{AppError, Result};
pub use utils::toml_config::QuorumConfig;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Orchestration pipeline over the configured providers
    pub service: Arc<OrchestrationService>,
}

impl AppState {
    /// State over the configured providers, with credentials from the environment.
    pub fn from_config(config: &QuorumConfig) -> Self {
        Self {
            service: Arc::new(OrchestrationService::from_config(config)),
        }
    }
}
