//! Merging provider results into one answer
//!
//! Confidence is computed only from observable facts: which providers succeeded,
//! how far down their candidate chain they were, and their configured
//! reliability. A provider that answers on the first attempt with reliability
//! 1.0 scores 1.0; every fallback step divides that score.

use crate::llm::{Capability, ProviderRegistry};
use crate::types::{duration_ms, AggregatedResponse, ProviderResult, ResearchRequest, Task};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Minimum length for a word to count as a key term.
const KEY_TERM_MIN_CHARS: usize = 4;

/// Outcome of one task after synthesis.
struct TaskSynthesis {
    capability: Capability,
    content: Option<String>,
    confidence: f64,
    fallback_used: bool,
    contributors: Vec<String>,
    trace: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Marker {
    Accepted,
    Agreed,
    Diverged,
    None,
}

impl Marker {
    fn suffix(&self) -> &'static str {
        match self {
            Marker::Accepted => " accepted",
            Marker::Agreed => " agreed",
            Marker::Diverged => " diverged",
            Marker::None => "",
        }
    }
}

pub struct Synthesizer {
    registry: Arc<ProviderRegistry>,
    agreement_threshold: f64,
}

impl Synthesizer {
    pub fn new(registry: Arc<ProviderRegistry>, agreement_threshold: f64) -> Self {
        Self {
            registry,
            agreement_threshold: agreement_threshold.clamp(0.0, 1.0),
        }
    }

    /// Combine `results` for the planned `tasks` into the final response.
    pub fn synthesize(
        &self,
        request: &ResearchRequest,
        tasks: &[Task],
        mut results: Vec<ProviderResult>,
        elapsed: Duration,
    ) -> AggregatedResponse {
        // Stable presentation order: plan order, then attempt.
        results.sort_by_key(|r| {
            let position = tasks
                .iter()
                .position(|t| t.id == r.task_id)
                .unwrap_or(usize::MAX);
            (position, r.attempt)
        });

        let per_task: Vec<TaskSynthesis> = tasks
            .iter()
            .map(|task| {
                let task_results: Vec<&ProviderResult> =
                    results.iter().filter(|r| r.task_id == task.id).collect();
                self.synthesize_task(task, &task_results)
            })
            .collect();

        let trace: Vec<String> = per_task.iter().flat_map(|t| t.trace.clone()).collect();
        let total_latency_ms = duration_ms(elapsed);

        if per_task.iter().all(|t| t.content.is_none()) {
            return AggregatedResponse {
                content: degrade_template(request, tasks, &results),
                confidence: 0.0,
                contributing_providers: Vec::new(),
                fallback_used: true,
                per_task_results: results,
                trace,
                total_latency_ms,
            };
        }

        let mut contributing_providers: Vec<String> = Vec::new();
        for id in per_task.iter().flat_map(|t| t.contributors.iter()) {
            if !contributing_providers.contains(id) {
                contributing_providers.push(id.clone());
            }
        }

        let content = if per_task.len() == 1 {
            per_task[0].content.clone().unwrap_or_default()
        } else {
            per_task
                .iter()
                .map(|t| {
                    let body = t
                        .content
                        .clone()
                        .unwrap_or_else(|| "No provider produced an answer.".to_string());
                    format!("## {}\n{}", t.capability.title(), body)
                })
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let confidence =
            per_task.iter().map(|t| t.confidence).sum::<f64>() / per_task.len() as f64;

        AggregatedResponse {
            content,
            confidence: confidence.clamp(0.0, 1.0),
            contributing_providers,
            fallback_used: per_task.iter().any(|t| t.fallback_used),
            per_task_results: results,
            trace,
            total_latency_ms,
        }
    }

    fn synthesize_task(&self, task: &Task, results: &[&ProviderResult]) -> TaskSynthesis {
        let successes: Vec<&ProviderResult> =
            results.iter().copied().filter(|r| r.is_success()).collect();
        let mut markers = vec![Marker::None; results.len()];

        let outcome = match successes.as_slice() {
            [] => TaskSynthesis {
                capability: task.capability,
                content: None,
                confidence: 0.0,
                fallback_used: true,
                contributors: Vec::new(),
                trace: Vec::new(),
            },
            [only] => {
                mark(&mut markers, results, only, Marker::Accepted);
                TaskSynthesis {
                    capability: task.capability,
                    content: only.content.clone(),
                    confidence: self.result_confidence(only),
                    fallback_used: !is_first_choice(task, only),
                    contributors: only.provider_id.iter().cloned().collect(),
                    trace: Vec::new(),
                }
            }
            many => {
                // Results are ordered by attempt, so the first success is the
                // highest-priority one.
                let primary = many[0];
                let primary_text = primary.content.as_deref().unwrap_or_default();
                mark(&mut markers, results, primary, Marker::Accepted);

                let mut agreeing = vec![primary.provider_label().to_string()];
                for other in &many[1..] {
                    let overlap = key_term_overlap(
                        primary_text,
                        other.content.as_deref().unwrap_or_default(),
                    );
                    if overlap >= self.agreement_threshold {
                        agreeing.push(other.provider_label().to_string());
                        mark(&mut markers, results, other, Marker::Agreed);
                    } else {
                        mark(&mut markers, results, other, Marker::Diverged);
                    }
                }

                let agreement = format!(
                    "Agreement: {} of {} providers concur ({}).",
                    agreeing.len(),
                    many.len(),
                    agreeing.join(", ")
                );
                let miss = many
                    .iter()
                    .map(|r| 1.0 - self.result_confidence(r))
                    .product::<f64>();

                TaskSynthesis {
                    capability: task.capability,
                    content: Some(format!("{}\n\n{}", primary_text, agreement)),
                    confidence: 1.0 - miss,
                    fallback_used: !is_first_choice(task, primary),
                    contributors: many.iter().filter_map(|r| r.provider_id.clone()).collect(),
                    trace: Vec::new(),
                }
            }
        };

        let trace = results
            .iter()
            .zip(markers)
            .map(|(r, marker)| trace_line(r, marker))
            .collect();

        TaskSynthesis { trace, ..outcome }
    }

    /// `(1 / attempt) * (0.5 + 0.5 * reliability)`
    fn result_confidence(&self, result: &ProviderResult) -> f64 {
        let reliability = result
            .provider_id
            .as_deref()
            .and_then(|id| self.registry.get(id).ok())
            .map(|p| p.reliability)
            .unwrap_or(0.0);
        let attempt = f64::from(result.attempt.max(1));

        ((0.5 + 0.5 * reliability) / attempt).clamp(0.0, 1.0)
    }
}

fn is_first_choice(task: &Task, result: &ProviderResult) -> bool {
    match (task.assigned_providers.first(), result.provider_id.as_ref()) {
        (Some(first), Some(id)) => first == id,
        _ => false,
    }
}

fn mark(
    markers: &mut [Marker],
    results: &[&ProviderResult],
    target: &ProviderResult,
    marker: Marker,
) {
    if let Some(index) = results.iter().position(|r| std::ptr::eq(*r, target)) {
        markers[index] = marker;
    }
}

fn trace_line(result: &ProviderResult, marker: Marker) -> String {
    format!(
        "{}: {} {} attempt={} {}ms{}",
        result.capability,
        result.provider_label(),
        result.status,
        result.attempt,
        result.latency_ms,
        marker.suffix()
    )
}

fn key_terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= KEY_TERM_MIN_CHARS)
        .map(|word| word.to_lowercase())
        .collect()
}

/// Overlap coefficient of the two texts' key terms, in [0, 1].
pub fn key_term_overlap(a: &str, b: &str) -> f64 {
    let a = key_terms(a);
    let b = key_terms(b);
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }

    a.intersection(&b).count() as f64 / smaller as f64
}

/// Deterministic answer used when no provider succeeded.
fn degrade_template(
    request: &ResearchRequest,
    tasks: &[Task],
    results: &[ProviderResult],
) -> String {
    let capabilities = if tasks.is_empty() {
        "(none)".to_string()
    } else {
        tasks
            .iter()
            .map(|t| t.capability.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut outcomes: Vec<String> = results
        .iter()
        .map(|r| format!("- {}: {} {}", r.capability, r.provider_label(), r.status))
        .collect();
    outcomes.sort();
    if outcomes.is_empty() {
        outcomes.push("- no provider was invoked".to_string());
    }

    format!(
        "No provider produced an answer for \"{}\".\nCapabilities: {}\nOutcomes:\n{}",
        request.query,
        capabilities,
        outcomes.join("\n")
    )
}
