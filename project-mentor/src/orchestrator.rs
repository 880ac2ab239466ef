//! The per-turn orchestration loop.
//!
//! One `process_request` call drives a whole turn: load the record, classify
//! (or accept the manual selection), plan, run every planned collaborator in
//! order against the live record, advance the phase, synthesize a reply, and
//! append exactly one user/assistant pair to the conversation log.
//!
//! Collaborator failures and registry misses are per-task outcomes, never
//! turn failures. Only a planning error or an unreachable store rejects the
//! turn, and both happen before or instead of state mutation, never after a
//! partial write they would need to roll back. Deltas applied by completed
//! tasks stay committed even if a later task fails.

use project_mentor_sdk::{
    AgentInvocation, AgentResult, AgentStatus, ConversationEntry, ExecutionPlan, IntentResult,
    OrchestratorError, PersistenceAdapter, ProjectRecord, Requirement, SelectionMode, Task,
    TaskContext, TurnEvent, TurnRequest, TurnResponse,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::capability::CapabilityGraph;
use crate::config::MentorConfig;
use crate::intent::IntentClassifier;
use crate::planner::{ExecutionPlanner, PlanOutcome, PlanRequest};
use crate::registry::CollaboratorRegistry;
use crate::state::{RecordDelta, StateManager};

/// Top-level coordinator for a set of collaborators sharing one record.
pub struct Orchestrator {
    graph: Arc<CapabilityGraph>,
    classifier: IntentClassifier,
    planner: ExecutionPlanner,
    registry: CollaboratorRegistry,
    state: StateManager,
    // One guard per session: a whole turn holds it, so two concurrent turns
    // on the same record can never interleave reads and writes.
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Orchestrator {
    pub fn new(
        graph: Arc<CapabilityGraph>,
        classifier: IntentClassifier,
        registry: CollaboratorRegistry,
        store: Arc<dyn PersistenceAdapter>,
    ) -> Self {
        Self {
            planner: ExecutionPlanner::new(Arc::clone(&graph)),
            graph,
            classifier,
            registry,
            state: StateManager::new(store),
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Default wiring: built-in graph, built-in registry, rule-based
    /// classification (no LLM adapter unless configured).
    pub fn builtin(config: &MentorConfig, store: Arc<dyn PersistenceAdapter>) -> Self {
        let graph = Arc::new(CapabilityGraph::builtin());
        let registry = CollaboratorRegistry::builtin(config);
        let adapter = config.llm.clone().map(|settings| {
            let client = Arc::new(crate::llm::HttpLlmClient::new(settings));
            Arc::new(crate::intent::LlmIntentAdapter::new(client))
                as Arc<dyn project_mentor_sdk::IntentAdapter>
        });
        Self::new(graph, IntentClassifier::new(adapter), registry, store)
    }

    /// Run one turn for a session.
    pub async fn process_request(
        &self,
        request: TurnRequest,
    ) -> Result<TurnResponse, OrchestratorError> {
        let session_lock = self.session_lock(&request.session_id).await;
        let _guard = session_lock.lock().await;

        let turn_id = Uuid::new_v4();
        TurnEvent::TurnStarted {
            turn_id,
            session_id: request.session_id.clone(),
            mode: request.agent_selection_mode,
        }
        .emit();

        let mut record = self.state.load(&request.session_id).await?;

        // Classify, or synthesize the trivial manual intent.
        let intent = match request.agent_selection_mode {
            SelectionMode::Auto => {
                self.classifier
                    .classify(&request.message, record.phase)
                    .await
            }
            SelectionMode::Manual => IntentResult {
                primary_intent: "manual".to_string(),
                requires_agents: request
                    .selected_agent_id
                    .iter()
                    .cloned()
                    .collect(),
                confidence: 1.0,
            },
        };
        TurnEvent::IntentClassified {
            turn_id,
            intent: intent.primary_intent.clone(),
            confidence: intent.confidence,
        }
        .emit();

        // Plan before any mutation so a planning error leaves no trace.
        let plan_request = match request.agent_selection_mode {
            SelectionMode::Auto => PlanRequest::Auto(&intent),
            SelectionMode::Manual => PlanRequest::Manual(request.selected_agent_id.as_deref()),
        };
        let plan = match self.planner.plan(plan_request, &record)? {
            PlanOutcome::Plan(plan) => plan,
            PlanOutcome::AwaitingSelection => {
                return Ok(self.awaiting_selection_response(record, intent));
            }
        };
        TurnEvent::PlanResolved {
            turn_id,
            agents: plan.tasks.iter().map(|t| t.agent_id.clone()).collect(),
        }
        .emit();

        // A confirmed manual selection is part of the session state.
        if request.agent_selection_mode == SelectionMode::Manual {
            record = self
                .state
                .apply(
                    &request.session_id,
                    RecordDelta::Selection {
                        mode: SelectionMode::Manual,
                        selected_agent_id: request.selected_agent_id.clone(),
                    },
                )
                .await?;
        }

        let mut agent_results = Vec::with_capacity(plan.len());
        for task in &plan.tasks {
            let result = self
                .run_task(turn_id, task, &request, &mut record)
                .await?;
            agent_results.push(result);
        }

        let message = synthesize_message(&agent_results);

        // Dedicated append-only channel: exactly two entries per turn, no
        // matter how many collaborators ran.
        record = self
            .state
            .apply(
                &request.session_id,
                RecordDelta::AppendConversation(vec![
                    ConversationEntry::user(&request.message),
                    ConversationEntry::assistant(&message),
                ]),
            )
            .await?;

        TurnEvent::TurnCompleted {
            turn_id,
            session_id: request.session_id.clone(),
            agents_run: agent_results
                .iter()
                .filter(|r| r.status == AgentStatus::Success)
                .count(),
        }
        .emit();

        let available_agents = self.planner.available_agents(&record);
        Ok(TurnResponse {
            message,
            state: record,
            intent,
            plan,
            agent_results,
            available_agents,
            awaiting_selection: false,
        })
    }

    /// Availability roster for a session's current record.
    pub async fn available_agents(
        &self,
        session_id: &str,
    ) -> Result<Vec<project_mentor_sdk::AgentAvailability>, OrchestratorError> {
        let record = self.state.load(session_id).await?;
        Ok(self.planner.available_agents(&record))
    }

    async fn run_task(
        &self,
        turn_id: Uuid,
        task: &Task,
        request: &TurnRequest,
        record: &mut ProjectRecord,
    ) -> Result<AgentResult, OrchestratorError> {
        let agent_name = self
            .graph
            .get(&task.agent_id)
            .map(|e| e.name.to_string())
            .unwrap_or_else(|| task.agent_id.clone());

        let agent = match self.registry.get_agent(&task.agent_id).await {
            Some(agent) => agent,
            None => {
                TurnEvent::AgentSkipped {
                    turn_id,
                    agent_id: task.agent_id.clone(),
                }
                .emit();
                return Ok(AgentResult {
                    agent_id: task.agent_id.clone(),
                    agent_name,
                    status: AgentStatus::Skipped,
                    content: None,
                    state_delta_keys: Vec::new(),
                });
            }
        };

        let invocation = AgentInvocation {
            user_input: task
                .input_override
                .clone()
                .unwrap_or_else(|| request.message.clone()),
            context: extract_context(record, &task.required_context),
        };

        TurnEvent::AgentStarted {
            turn_id,
            agent_id: task.agent_id.clone(),
        }
        .emit();

        let output = match agent.process(invocation).await {
            Ok(output) => output,
            Err(err) => {
                // One failing collaborator never aborts the rest of the plan.
                TurnEvent::AgentFailed {
                    turn_id,
                    agent_id: task.agent_id.clone(),
                    error: err.to_string(),
                }
                .emit();
                return Ok(AgentResult {
                    agent_id: task.agent_id.clone(),
                    agent_name,
                    status: AgentStatus::Error,
                    content: Some(err.to_string()),
                    state_delta_keys: Vec::new(),
                });
            }
        };

        let state_delta_keys: Vec<String> = output.state_delta.keys().cloned().collect();
        if !output.state_delta.is_empty() {
            // Later tasks in this same plan observe the updated record.
            *record = self
                .state
                .apply(
                    &request.session_id,
                    RecordDelta::Artifacts(output.state_delta),
                )
                .await?;

            // Transitions only advance, and only on a run that moved state.
            if let Some(target) = self.graph.transition_target(&task.agent_id) {
                if target > record.phase {
                    let from = record.phase;
                    *record = self
                        .state
                        .apply(&request.session_id, RecordDelta::Phase(target))
                        .await?;
                    TurnEvent::PhaseAdvanced {
                        turn_id,
                        from,
                        to: target,
                    }
                    .emit();
                }
            }
        }

        TurnEvent::AgentCompleted {
            turn_id,
            agent_id: task.agent_id.clone(),
            state_delta_keys: state_delta_keys.clone(),
        }
        .emit();

        Ok(AgentResult {
            agent_id: task.agent_id.clone(),
            agent_name,
            status: AgentStatus::Success,
            content: if output.content.trim().is_empty() {
                None
            } else {
                Some(output.content)
            },
            state_delta_keys,
        })
    }

    fn awaiting_selection_response(
        &self,
        record: ProjectRecord,
        intent: IntentResult,
    ) -> TurnResponse {
        let available_agents = self.planner.available_agents(&record);
        let ready: Vec<&str> = available_agents
            .iter()
            .filter(|a| a.available)
            .map(|a| a.agent_name.as_str())
            .collect();
        let message = format!(
            "Manual mode is on but no collaborator is selected. Currently ready: {}.",
            if ready.is_empty() {
                "none".to_string()
            } else {
                ready.join(", ")
            }
        );
        TurnResponse {
            message,
            state: record,
            intent,
            plan: ExecutionPlan::new(),
            agent_results: Vec::new(),
            available_agents,
            awaiting_selection: true,
        }
    }

    async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

/// Pass the full record to `All`-requirers, exactly the named artifacts to
/// everyone else (missing ones as null).
fn extract_context(record: &ProjectRecord, requirement: &Requirement) -> TaskContext {
    match requirement {
        Requirement::All => TaskContext::Full {
            record: Box::new(record.clone()),
        },
        Requirement::Specific { artifacts } => {
            let mut map = BTreeMap::new();
            for name in artifacts {
                map.insert(
                    name.clone(),
                    record.artifacts.get(name).cloned().unwrap_or(Value::Null),
                );
            }
            TaskContext::Artifacts { artifacts: map }
        }
    }
}

/// One user-facing message from the ordered per-task contents: every
/// non-empty content joined by blank lines, so the last collaborator gets the
/// closing word. A fixed fallback covers plans that produced nothing.
fn synthesize_message(results: &[AgentResult]) -> String {
    let contents: Vec<&str> = results
        .iter()
        .filter_map(|r| r.content.as_deref())
        .filter(|c| !c.trim().is_empty())
        .collect();
    if contents.is_empty() {
        "I couldn't act on that directly. Try rephrasing, or pick a collaborator manually."
            .to_string()
    } else {
        contents.join("\n\n")
    }
}
