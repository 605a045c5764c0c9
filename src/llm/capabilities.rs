//! Capability tags for inference work
//!
//! A [`Capability`] names the kind of work a task needs. Providers declare the
//! capabilities they can serve in `quorum.toml`, and the planner creates one task
//! per requested capability.
//!
//! # Example
//!
//! ```rust,ignore
//! use quorum::llm::Capability;
//!
//! let cap: Capability = "Sentiment".parse()?;
//! assert_eq!(cap, Capability::Sentiment);
//! assert_eq!(cap.as_str(), "sentiment");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// The kind of work a task requires.
///
/// Ordering follows declaration order and is used wherever capabilities are
/// listed (planner defaults, CLI output).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Multi-step analysis and argumentation
    Reasoning,
    /// Condensing the query subject into key points
    Summarization,
    /// Tone and sentiment assessment
    Sentiment,
    /// Recalling relevant facts and sources
    Retrieval,
    /// Free-form content generation
    Generation,
}

impl Capability {
    /// Every known capability, in declaration order.
    pub const ALL: [Capability; 5] = [
        Capability::Reasoning,
        Capability::Summarization,
        Capability::Sentiment,
        Capability::Retrieval,
        Capability::Generation,
    ];

    /// Wire name of the capability.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Reasoning => "reasoning",
            Capability::Summarization => "summarization",
            Capability::Sentiment => "sentiment",
            Capability::Retrieval => "retrieval",
            Capability::Generation => "generation",
        }
    }

    /// Human-readable section title.
    pub fn title(&self) -> &'static str {
        match self {
            Capability::Reasoning => "Reasoning",
            Capability::Summarization => "Summary",
            Capability::Sentiment => "Sentiment",
            Capability::Retrieval => "Retrieval",
            Capability::Generation => "Generation",
        }
    }

    /// System instruction sent to providers for tasks of this capability.
    pub fn instruction(&self) -> &'static str {
        match self {
            Capability::Reasoning => {
                "You are a careful analyst. Reason step by step about the request, \
                 weigh the evidence and state a clear conclusion."
            }
            Capability::Summarization => {
                "You summarize. Produce a concise summary of the key points relevant \
                 to the request, without speculation."
            }
            Capability::Sentiment => {
                "You assess sentiment. Describe the prevailing sentiment around the \
                 request (positive, negative, mixed or neutral) and the main drivers."
            }
            Capability::Retrieval => {
                "You retrieve knowledge. List the most relevant facts, figures and \
                 well-known sources for the request."
            }
            Capability::Generation => {
                "You are a helpful assistant. Write a complete, well-structured answer \
                 to the request."
            }
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown capability name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability '{0}'")]
pub struct UnknownCapability(pub String);

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Capability::ALL
            .into_iter()
            .find(|cap| cap.as_str() == normalized)
            .ok_or_else(|| UnknownCapability(s.trim().to_string()))
    }
}
