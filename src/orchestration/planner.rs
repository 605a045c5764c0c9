use crate::llm::{Capability, ProviderRegistry};
use crate::types::{ResearchRequest, Task};
use std::sync::Arc;
use uuid::Uuid;

/// Decomposes a request into one task per requested capability.
pub struct TaskPlanner {
    registry: Arc<ProviderRegistry>,
}

impl TaskPlanner {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self { registry }
    }

    /// Plan the tasks for `request`, in request order.
    ///
    /// An empty capability list means every capability with at least one
    /// provider. A capability nobody serves still gets a task, with no
    /// candidates.
    pub fn plan(&self, request: &ResearchRequest) -> Vec<Task> {
        let requested = if request.capabilities.is_empty() {
            self.registry.capabilities()
        } else {
            request.capabilities.clone()
        };

        let mut seen: Vec<Capability> = Vec::with_capacity(requested.len());
        let prompt = Self::prompt(request);

        requested
            .into_iter()
            .filter(|cap| {
                if seen.contains(cap) {
                    false
                } else {
                    seen.push(*cap);
                    true
                }
            })
            .map(|capability| Task {
                id: Uuid::new_v4(),
                capability,
                instruction: capability.instruction().to_string(),
                prompt: prompt.clone(),
                assigned_providers: self
                    .registry
                    .list_by_capability(capability)
                    .into_iter()
                    .map(|p| p.id.clone())
                    .collect(),
            })
            .collect()
    }

    fn prompt(request: &ResearchRequest) -> String {
        match request.context.as_deref() {
            Some(context) => format!("{}\n\nContext:\n{}", request.query, context),
            None => request.query.clone(),
        }
    }
}
