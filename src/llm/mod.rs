//! Provider catalog and adapters
//!
//! This module holds everything that talks to, or describes, an external
//! inference provider.
//!
//! # Architecture
//!
//! - [`Capability`] - The kind of work a task needs
//! - [`ProviderRegistry`] - Read-only, priority-ordered catalog built from `quorum.toml`
//! - [`ProviderAdapter`] - One implementation per provider family; turns a task into a call
//!   and normalizes the outcome into a [`ProviderResult`](crate::types::ProviderResult)
//! - [`AdapterFactory`] / [`ConfigAdapterFactory`] - Builds and caches adapters, gated on
//!   credential presence
//!
//! # Supported Families
//!
//! | `type` | Endpoint | Credential |
//! |--------|----------|------------|
//! | `openai` | `{api_base}/chat/completions` (OpenAI, Grok, Mistral, ...) | bearer |
//! | `anthropic` | `{api_base}/v1/messages` | `x-api-key` |
//! | `gemini` | `{api_base}/models/{model}:generateContent` | `x-goog-api-key` |
//! | `cohere` | `{api_base}/v2/chat` | bearer |
//! | `ollama` | `{base_url}/api/chat` | none |
//! | `static` | scripted local reply | none |

/// Anthropic Messages API adapter.
pub mod anthropic;
/// Capability tags.
pub mod capabilities;
/// Adapter trait, error classification and the adapter factory.
pub mod client;
/// Cohere Chat API adapter.
pub mod cohere;
/// Google Gemini adapter.
pub mod gemini;
/// Ollama adapter.
pub mod ollama;
/// OpenAI-compatible adapter.
pub mod openai;
/// Registry of configured providers.
pub mod provider_registry;
/// Advisory per-provider rate limiting.
pub mod rate_limit;
/// Scripted local adapter.
pub mod static_reply;

pub use capabilities::{Capability, UnknownCapability};
pub use client::{AdapterFactory, ConfigAdapterFactory, ProviderAdapter, ProviderError};
pub use provider_registry::{Provider, ProviderRegistry};
