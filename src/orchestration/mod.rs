//! Request orchestration
//!
//! A request flows through four stages:
//!
//! 1. [`OrchestrationService`] validates the raw request
//! 2. [`TaskPlanner`] creates one task per capability with its ordered candidates
//! 3. [`Dispatcher`] invokes providers under the fallback or fan-out policy,
//!    bounded by a process-wide semaphore and the request deadline
//! 4. [`Synthesizer`] merges the results into one confidence-scored answer
//!
//! Provider failures never escape as errors; they are recorded as results with a
//! status. The only error a request can produce past validation is an internal
//! defect (a task naming an unregistered provider).

/// Concurrent execution of planned tasks.
pub mod dispatcher;
/// Request decomposition into tasks.
pub mod planner;
/// Validation and wiring of the pipeline.
pub mod service;
/// Result merging and confidence scoring.
pub mod synthesizer;

pub use dispatcher::{Dispatcher, TaskState};
pub use planner::TaskPlanner;
pub use service::OrchestrationService;
pub use synthesizer::Synthesizer;
