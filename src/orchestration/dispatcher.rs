//! Concurrent task execution under a request deadline
//!
//! Every invocation runs on a per-request [`JoinSet`] and reports back over a
//! channel. The dispatcher keeps a ledger of invocations that are queued for a
//! permit or running but not finished, so when the deadline fires it can abort
//! the outstanding work and still record each of them as `TIMEOUT`. Calls that
//! never got a permit are recorded with zero latency.

use crate::llm::{AdapterFactory, Provider, ProviderRegistry};
use crate::types::{AppError, OrchestrationMode, ProviderResult, Result, ResultStatus, Task};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Progress of a task through its candidate chain in fallback mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    /// Invoking the candidate at this index
    Trying(usize),
    /// The candidate at this index succeeded
    Succeeded(usize),
    /// Every candidate failed (or none was left in time)
    Exhausted,
}

impl TaskState {
    /// First state for a task with `candidates` providers.
    pub fn start(candidates: usize) -> Self {
        if candidates == 0 {
            TaskState::Exhausted
        } else {
            TaskState::Trying(0)
        }
    }

    /// Next state after the current attempt ended with `status`.
    pub fn advance(self, status: ResultStatus, candidates: usize) -> Self {
        match self {
            TaskState::Pending => TaskState::start(candidates),
            TaskState::Trying(i) if status.is_success() => TaskState::Succeeded(i),
            TaskState::Trying(i) if i + 1 < candidates => TaskState::Trying(i + 1),
            TaskState::Trying(_) => TaskState::Exhausted,
            done => done,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded(_) | TaskState::Exhausted)
    }
}

/// Task index plus 1-based attempt number.
type Slot = (usize, u32);

enum Event {
    /// Waiting for a concurrency permit
    Queued { slot: Slot, provider_id: String },
    /// Permit held; the provider call is under way
    Started { slot: Slot, at: Instant },
    Finished { slot: Slot, result: ProviderResult },
}

struct InFlight {
    provider_id: String,
    /// `None` while still queued for a permit
    started: Option<Instant>,
}

/// Everything a spawned invocation needs, cheap to clone.
#[derive(Clone)]
struct Invoker {
    adapters: Arc<dyn AdapterFactory>,
    permits: Arc<Semaphore>,
    events: mpsc::UnboundedSender<Event>,
    deadline_at: Instant,
}

impl Invoker {
    async fn invoke(&self, slot: Slot, task: &Task, provider: &Provider) -> ProviderResult {
        let _ = self.events.send(Event::Queued {
            slot,
            provider_id: provider.id.clone(),
        });

        let result = match self.permits.clone().acquire_owned().await {
            Ok(_permit) => {
                let _ = self.events.send(Event::Started {
                    slot,
                    at: Instant::now(),
                });
                self.invoke_isolated(task, provider).await
            }
            Err(_) => ProviderResult::failure(
                task,
                &provider.id,
                ResultStatus::UnknownError,
                "dispatcher is shutting down",
                Duration::ZERO,
            ),
        };
        let result = result.with_attempt(slot.1);

        let _ = self.events.send(Event::Finished {
            slot,
            result: result.clone(),
        });
        result
    }

    /// Call the provider's adapter. The caller holds a permit.
    async fn invoke_isolated(&self, task: &Task, provider: &Provider) -> ProviderResult {
        let adapter = match self.adapters.adapter_for(provider) {
            Ok(adapter) => adapter,
            Err(err) => {
                tracing::warn!(provider = %provider.id, error = %err, "Provider unavailable");
                return ProviderResult::failure(
                    task,
                    &provider.id,
                    err.status(),
                    err.to_string(),
                    Duration::ZERO,
                );
            }
        };

        let remaining = self.deadline_at.saturating_duration_since(Instant::now());
        let timeout = provider.timeout.min(remaining);
        let started = Instant::now();

        AssertUnwindSafe(adapter.invoke(task, provider, timeout))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                tracing::error!(provider = %provider.id, "Adapter panicked");
                ProviderResult::failure(
                    task,
                    &provider.id,
                    ResultStatus::UnknownError,
                    "adapter panicked",
                    started.elapsed(),
                )
            })
    }
}

/// Executes planned tasks against their candidate providers.
///
/// One dispatcher is shared by all requests; its semaphore bounds the number of
/// outbound calls in flight across the whole process.
pub struct Dispatcher {
    registry: Arc<ProviderRegistry>,
    adapters: Arc<dyn AdapterFactory>,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        adapters: Arc<dyn AdapterFactory>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            registry,
            adapters,
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Run `tasks` under `mode` and return every recorded result, in completion
    /// order. Never waits past `deadline`.
    ///
    /// Fails only when a task names a provider that is not registered (or does
    /// not declare the task's capability), before anything is invoked.
    pub async fn execute(
        &self,
        tasks: Vec<Task>,
        mode: OrchestrationMode,
        deadline: Duration,
    ) -> Result<Vec<ProviderResult>> {
        let plan = self.resolve(tasks)?;
        let deadline_at = Instant::now() + deadline;
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        let invoker = Invoker {
            adapters: self.adapters.clone(),
            permits: self.permits.clone(),
            events: events_tx,
            deadline_at,
        };

        let mut results = Vec::new();
        let mut set = JoinSet::new();
        let tasks: Vec<Arc<Task>> = plan.iter().map(|(task, _)| task.clone()).collect();

        for (index, (task, candidates)) in plan.into_iter().enumerate() {
            if candidates.is_empty() {
                tracing::debug!(capability = %task.capability, "No provider for capability");
                results.push(ProviderResult::capability_unavailable(&task));
                continue;
            }

            match mode {
                OrchestrationMode::Fallback => {
                    let invoker = invoker.clone();
                    set.spawn(async move {
                        run_fallback(invoker, index, task, candidates).await;
                    });
                }
                OrchestrationMode::Fanout => {
                    for (position, provider) in candidates.into_iter().enumerate() {
                        let invoker = invoker.clone();
                        let task = task.clone();
                        let slot = (index, position as u32 + 1);
                        set.spawn(async move {
                            invoker.invoke(slot, &task, &provider).await;
                        });
                    }
                }
            }
        }

        // Only the spawned futures hold senders from here on.
        drop(invoker);

        let mut in_flight: HashMap<Slot, InFlight> = HashMap::new();
        let deadline_sleep = tokio::time::sleep_until(deadline_at);
        tokio::pin!(deadline_sleep);

        let timed_out = loop {
            tokio::select! {
                biased;
                event = events_rx.recv() => match event {
                    Some(event) => record(event, &mut in_flight, &mut results),
                    None => break false,
                },
                _ = &mut deadline_sleep => break true,
            }
        };

        if timed_out {
            set.abort_all();
            while let Ok(event) = events_rx.try_recv() {
                record(event, &mut in_flight, &mut results);
            }
            tracing::debug!(pending = in_flight.len(), "Deadline reached");
        }

        let mut leftovers: Vec<(Slot, InFlight)> = in_flight.into_iter().collect();
        leftovers.sort_by_key(|(slot, _)| *slot);
        for ((index, attempt), entry) in leftovers {
            let (status, detail) = match (timed_out, entry.started) {
                (true, Some(_)) => (ResultStatus::Timeout, "request deadline elapsed"),
                (true, None) => (
                    ResultStatus::Timeout,
                    "request deadline elapsed while waiting for a permit",
                ),
                (false, _) => (ResultStatus::UnknownError, "invocation ended without a result"),
            };
            let latency = entry
                .started
                .map(|started| started.elapsed())
                .unwrap_or(Duration::ZERO);
            results.push(
                ProviderResult::failure(&tasks[index], &entry.provider_id, status, detail, latency)
                    .with_attempt(attempt),
            );
        }

        Ok(results)
    }

    /// Resolve every candidate id against the registry.
    fn resolve(&self, tasks: Vec<Task>) -> Result<Vec<(Arc<Task>, Vec<Provider>)>> {
        tasks
            .into_iter()
            .map(|task| {
                let candidates = task
                    .assigned_providers
                    .iter()
                    .map(|id| {
                        let provider = self.registry.get(id).map_err(|_| {
                            AppError::Internal(format!(
                                "task for '{}' references unknown provider '{}'",
                                task.capability, id
                            ))
                        })?;
                        if !provider.supports(task.capability) {
                            return Err(AppError::Internal(format!(
                                "provider '{}' does not declare capability '{}'",
                                id, task.capability
                            )));
                        }
                        Ok(provider.clone())
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok((Arc::new(task), candidates))
            })
            .collect()
    }
}

fn record(
    event: Event,
    in_flight: &mut HashMap<Slot, InFlight>,
    results: &mut Vec<ProviderResult>,
) {
    match event {
        Event::Queued { slot, provider_id } => {
            in_flight.insert(
                slot,
                InFlight {
                    provider_id,
                    started: None,
                },
            );
        }
        Event::Started { slot, at } => {
            if let Some(entry) = in_flight.get_mut(&slot) {
                entry.started = Some(at);
            }
        }
        Event::Finished { slot, result } => {
            in_flight.remove(&slot);
            results.push(result);
        }
    }
}

async fn run_fallback(invoker: Invoker, index: usize, task: Arc<Task>, candidates: Vec<Provider>) {
    let mut state = TaskState::start(candidates.len());

    while let TaskState::Trying(i) = state {
        if Instant::now() >= invoker.deadline_at {
            state = TaskState::Exhausted;
            break;
        }

        let result = invoker
            .invoke((index, i as u32 + 1), &task, &candidates[i])
            .await;
        let next = state.advance(result.status, candidates.len());
        tracing::debug!(
            capability = %task.capability,
            provider = %candidates[i].id,
            status = %result.status,
            latency_ms = result.latency_ms,
            from = ?state,
            to = ?next,
            "Fallback transition"
        );
        state = next;
    }

    debug_assert!(state.is_terminal());
    tracing::debug!(capability = %task.capability, state = ?state, "Task finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine_success_stops_chain() {
        let state = TaskState::Pending.advance(ResultStatus::Success, 3);
        assert_eq!(state, TaskState::Trying(0));

        let state = state.advance(ResultStatus::Timeout, 3);
        assert_eq!(state, TaskState::Trying(1));

        let state = state.advance(ResultStatus::Success, 3);
        assert_eq!(state, TaskState::Succeeded(1));
        assert!(state.is_terminal());
        assert_eq!(state.advance(ResultStatus::Timeout, 3), TaskState::Succeeded(1));
    }

    #[test]
    fn test_state_machine_exhausts() {
        let mut state = TaskState::start(2);
        state = state.advance(ResultStatus::RateLimited, 2);
        state = state.advance(ResultStatus::AuthError, 2);
        assert_eq!(state, TaskState::Exhausted);
    }

    #[test]
    fn test_state_machine_without_candidates() {
        assert_eq!(TaskState::start(0), TaskState::Exhausted);
        assert_eq!(
            TaskState::Pending.advance(ResultStatus::Success, 0),
            TaskState::Exhausted
        );
    }
}
