//! Execution planning: turn an intent (or an explicit manual selection) into
//! an ordered, dependency-resolved list of tasks.
//!
//! Auto mode runs two passes over the capability graph. Upstream resolution
//! walks each seeded collaborator depth-first and inserts the producer of any
//! missing required artifact immediately before it; a dependency cycle aborts
//! the turn before anything runs. Downstream resolution then appends
//! consumers of the artifacts this plan will refresh, but only consumers that
//! are already *available* (phase-compatible and fully fed from the record):
//! first-time production never fans out to collaborators whose inputs do not
//! exist yet. Manual mode is authoritative: upstream only, no expansion.

use project_mentor_sdk::{
    AgentAvailability, ExecutionPlan, IntentResult, PlanningError, ProjectRecord, Task,
};
use std::collections::HashSet;
use std::sync::Arc;

use crate::capability::{CapabilityEntry, CapabilityGraph};

/// What the planner was asked to plan for.
#[derive(Debug, Clone, Copy)]
pub enum PlanRequest<'a> {
    /// Automatic routing from a classified intent.
    Auto(&'a IntentResult),
    /// Explicit user selection; `None` means no collaborator picked yet.
    Manual(Option<&'a str>),
}

/// Planner output: a runnable plan, or the manual-mode sentinel telling the
/// orchestrator to surface the roster and invoke nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Plan(ExecutionPlan),
    AwaitingSelection,
}

/// Two-pass planner over a fixed capability graph.
pub struct ExecutionPlanner {
    graph: Arc<CapabilityGraph>,
}

impl ExecutionPlanner {
    pub fn new(graph: Arc<CapabilityGraph>) -> Self {
        Self { graph }
    }

    /// Resolve a plan for one turn. Fails only on a dependency cycle or an
    /// unknown manual selection; both reject the turn before any agent runs.
    pub fn plan(
        &self,
        request: PlanRequest<'_>,
        record: &ProjectRecord,
    ) -> Result<PlanOutcome, PlanningError> {
        let scheduled = match request {
            PlanRequest::Auto(intent) => {
                let mut seed: Vec<&'static str> = intent
                    .requires_agents
                    .iter()
                    .filter_map(|id| self.graph.get(id).map(|e| e.id))
                    .collect();
                if seed.is_empty() {
                    // Unknown intent: fall back to the full pipeline, keeping
                    // only collaborators compatible with the current phase.
                    seed = self
                        .graph
                        .full_pipeline()
                        .into_iter()
                        .filter(|id| {
                            self.graph
                                .get(id)
                                .is_some_and(|e| e.phase_compatibility.allows(record.phase))
                        })
                        .collect();
                }
                let mut scheduled = self.resolve_upstream(&seed, record)?;
                self.resolve_downstream(&mut scheduled, record);
                scheduled
            }
            PlanRequest::Manual(None) => return Ok(PlanOutcome::AwaitingSelection),
            PlanRequest::Manual(Some(selected)) => {
                let entry =
                    self.graph
                        .get(selected)
                        .ok_or_else(|| PlanningError::UnknownAgent {
                            agent_id: selected.to_string(),
                        })?;
                // Manual selection is authoritative: dependencies are filled
                // in upstream, but nothing is appended downstream.
                self.resolve_upstream(&[entry.id], record)?
            }
        };

        let mut plan = ExecutionPlan::new();
        for id in scheduled {
            if let Some(entry) = self.graph.get(id) {
                plan.push(Task::new(entry.id, entry.requires.clone()));
            }
        }
        Ok(PlanOutcome::Plan(plan))
    }

    /// Availability roster for the current record: every declared
    /// collaborator, flagged with the phase/requirement predicate and the
    /// artifacts still missing. Read-only, so calling it twice with no
    /// intervening update yields identical results.
    pub fn available_agents(&self, record: &ProjectRecord) -> Vec<AgentAvailability> {
        self.graph
            .entries()
            .iter()
            .map(|entry| {
                let missing: Vec<String> = entry
                    .requires
                    .artifact_names()
                    .iter()
                    .filter(|name| !record.has_artifact(name))
                    .cloned()
                    .collect();
                let phase_ok = entry.phase_compatibility.allows(record.phase);
                AgentAvailability {
                    agent_id: entry.id.to_string(),
                    agent_name: entry.name.to_string(),
                    description: entry.description.to_string(),
                    phase_compatibility: entry.phase_compatibility.clone(),
                    available: phase_ok && missing.is_empty(),
                    missing_context: missing,
                }
            })
            .collect()
    }

    /// Depth-first upstream pass: producers of missing artifacts land
    /// immediately before their consumer. `visited` keeps the plan free of
    /// duplicates; `on_path` detects cycles.
    fn resolve_upstream(
        &self,
        seed: &[&'static str],
        record: &ProjectRecord,
    ) -> Result<Vec<&'static str>, PlanningError> {
        let mut scheduled = Vec::new();
        let mut visited = HashSet::new();
        let mut on_path = Vec::new();
        for &id in seed {
            self.schedule_with_dependencies(
                id,
                record,
                &mut scheduled,
                &mut visited,
                &mut on_path,
            )?;
        }
        Ok(scheduled)
    }

    fn schedule_with_dependencies(
        &self,
        agent_id: &'static str,
        record: &ProjectRecord,
        scheduled: &mut Vec<&'static str>,
        visited: &mut HashSet<&'static str>,
        on_path: &mut Vec<&'static str>,
    ) -> Result<(), PlanningError> {
        if visited.contains(agent_id) {
            return Ok(());
        }
        if on_path.contains(&agent_id) {
            let mut path: Vec<String> = on_path.iter().map(|s| s.to_string()).collect();
            path.push(agent_id.to_string());
            return Err(PlanningError::DependencyCycle {
                agent_id: agent_id.to_string(),
                path,
            });
        }

        let entry = match self.graph.get(agent_id) {
            Some(entry) => entry,
            None => return Ok(()),
        };

        on_path.push(agent_id);
        // All-requirers contribute no resolvable dependency edge.
        for artifact in entry.requires.artifact_names() {
            if record.has_artifact(artifact) {
                continue;
            }
            for producer in self.graph.producers_of(artifact) {
                self.schedule_with_dependencies(producer.id, record, scheduled, visited, on_path)?;
            }
        }
        on_path.pop();

        visited.insert(agent_id);
        scheduled.push(agent_id);
        Ok(())
    }

    /// Bounded fixpoint downstream pass over the produces/consumes adjacency.
    ///
    /// Terminates in at most one iteration per declared collaborator, since
    /// each productive pass schedules at least one new agent.
    fn resolve_downstream(&self, scheduled: &mut Vec<&'static str>, record: &ProjectRecord) {
        for _ in 0..self.graph.entries().len() {
            let produced: HashSet<&str> = scheduled
                .iter()
                .filter_map(|id| self.graph.get(id))
                .filter(|e| !e.requires.is_all())
                .flat_map(|e| e.produces.iter().copied())
                .collect();

            let mut added = false;
            for entry in self.graph.entries() {
                if entry.requires.is_all() || scheduled.contains(&entry.id) {
                    continue;
                }
                let names = entry.requires.artifact_names();
                if names.is_empty() {
                    continue;
                }
                let consumes_refreshed = names.iter().any(|a| produced.contains(a.as_str()));
                if consumes_refreshed && self.is_ready(entry, record) {
                    scheduled.push(entry.id);
                    added = true;
                }
            }
            if !added {
                break;
            }
        }
    }

    /// The availability predicate: phase-compatible and every Specific
    /// requirement already present and non-empty in the record.
    fn is_ready(&self, entry: &CapabilityEntry, record: &ProjectRecord) -> bool {
        entry.phase_compatibility.allows(record.phase)
            && entry
                .requires
                .artifact_names()
                .iter()
                .all(|name| record.has_artifact(name))
    }
}
