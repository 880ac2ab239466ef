//! Contract types shared between the project-mentor core and its collaborators.
//!
//! A collaborator is an external specialist that turns a slice of the project
//! record plus the user's message into a state delta and an optional reply.
//! This crate defines the record itself, the capability metadata that drives
//! planning, the invocation contract, the error taxonomy, and the structured
//! turn events the core emits while it runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// Re-export async trait for implementors
pub use async_trait::async_trait;

/// Lifecycle phase of a project session.
///
/// Declaration order doubles as the advancement order: transitions only ever
/// move to a later variant, never back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPhase {
    #[default]
    Initialization,
    Discovery,
    RequirementsComplete,
    ArchitectureComplete,
    PlanningComplete,
    DesignComplete,
    Exportable,
}

impl ProjectPhase {
    /// Stable snake_case name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectPhase::Initialization => "initialization",
            ProjectPhase::Discovery => "discovery",
            ProjectPhase::RequirementsComplete => "requirements_complete",
            ProjectPhase::ArchitectureComplete => "architecture_complete",
            ProjectPhase::PlanningComplete => "planning_complete",
            ProjectPhase::DesignComplete => "design_complete",
            ProjectPhase::Exportable => "exportable",
        }
    }
}

impl fmt::Display for ProjectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How collaborators are selected for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Intent classification decides which collaborators run.
    #[default]
    Auto,
    /// The caller names a single collaborator; no automatic expansion beyond
    /// its upstream dependencies.
    Manual,
}

/// Role of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationRole {
    User,
    Assistant,
}

/// One entry in the append-only conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: ConversationRole,
    pub content: String,
}

impl ConversationEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ConversationRole::Assistant,
            content: content.into(),
        }
    }
}

/// The authoritative per-session project record.
///
/// Artifacts are opaque structured blobs owned by their producing
/// collaborator; the core only ever checks presence and merges whole values
/// by key. The conversation log is append-only and grows by exactly one
/// user/assistant pair per completed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub phase: ProjectPhase,
    #[serde(default)]
    pub artifacts: BTreeMap<String, Value>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationEntry>,
    #[serde(default)]
    pub agent_selection_mode: SelectionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_agent_id: Option<String>,
}

impl ProjectRecord {
    /// Fresh record in the initialization phase with no artifacts.
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            session_id: session_id.into(),
            project_name: None,
            created_at: now,
            updated_at: now,
            phase: ProjectPhase::Initialization,
            artifacts: BTreeMap::new(),
            conversation_history: Vec::new(),
            agent_selection_mode: SelectionMode::Auto,
            selected_agent_id: None,
        }
    }

    /// The named artifact, if present (possibly empty).
    pub fn artifact(&self, name: &str) -> Option<&Value> {
        self.artifacts.get(name)
    }

    /// True when the artifact is present *and* non-empty: not null, a
    /// container with at least one element, a string with visible content.
    pub fn has_artifact(&self, name: &str) -> bool {
        self.artifacts
            .get(name)
            .map(|v| !value_is_empty(v))
            .unwrap_or(false)
    }
}

/// Emptiness rule shared by the planner and availability query.
pub fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// What a collaborator needs from the record before it can run.
///
/// Modeled as a tagged variant rather than a wildcard artifact name so the
/// planner branches on structure, not string comparison. `All`-requirers are
/// terminal: they consume the whole record and contribute no dependency edge,
/// so neither planning pass ever auto-expands them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Requirement {
    All,
    Specific { artifacts: Vec<String> },
}

impl Requirement {
    pub fn none() -> Self {
        Requirement::Specific {
            artifacts: Vec::new(),
        }
    }

    pub fn specific<I, S>(artifacts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Requirement::Specific {
            artifacts: artifacts.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Requirement::All)
    }

    /// Named artifacts for `Specific`, empty slice for `All`.
    pub fn artifact_names(&self) -> &[String] {
        match self {
            Requirement::All => &[],
            Requirement::Specific { artifacts } => artifacts,
        }
    }
}

/// Which phases a collaborator (or intent pattern) may run in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PhaseCompatibility {
    Any,
    Phases { phases: Vec<ProjectPhase> },
}

impl PhaseCompatibility {
    pub fn phases<I>(phases: I) -> Self
    where
        I: IntoIterator<Item = ProjectPhase>,
    {
        PhaseCompatibility::Phases {
            phases: phases.into_iter().collect(),
        }
    }

    pub fn allows(&self, phase: ProjectPhase) -> bool {
        match self {
            PhaseCompatibility::Any => true,
            PhaseCompatibility::Phases { phases } => phases.contains(&phase),
        }
    }
}

/// Result of classifying a user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub primary_intent: String,
    pub requires_agents: Vec<String>,
    pub confidence: f64,
}

impl IntentResult {
    /// The no-match result: unknown intent, no agents, zero confidence.
    pub fn unknown() -> Self {
        Self {
            primary_intent: "unknown".to_string(),
            requires_agents: Vec::new(),
            confidence: 0.0,
        }
    }
}

/// Description of one declared intent, handed to an external classifier so it
/// can answer with the same vocabulary the rule-based path uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentDescriptor {
    pub intent: String,
    pub description: String,
    pub phase_compatibility: PhaseCompatibility,
}

/// A single collaborator invocation in an execution plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub agent_id: String,
    pub required_context: Requirement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_override: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
}

impl Task {
    pub fn new(agent_id: impl Into<String>, required_context: Requirement) -> Self {
        Self {
            agent_id: agent_id.into(),
            required_context,
            input_override: None,
            tools: Vec::new(),
        }
    }
}

/// Ordered, dependency-resolved list of tasks for one turn.
///
/// Order is a valid topological order with respect to produces→requires edges
/// among the scheduled collaborators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub tasks: Vec<Task>,
}

impl ExecutionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn agent_ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.agent_id.as_str()).collect()
    }

    pub fn contains_agent(&self, agent_id: &str) -> bool {
        self.tasks.iter().any(|t| t.agent_id == agent_id)
    }
}

/// Per-task outcome, surfaced verbatim to the caller so "ran", "skipped, not
/// implemented" and "attempted, failed" stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Success,
    Skipped,
    Error,
}

/// Outcome of one task in an executed plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_id: String,
    pub agent_name: String,
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_delta_keys: Vec<String>,
}

/// One roster entry in the availability listing returned with every turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAvailability {
    pub agent_id: String,
    pub agent_name: String,
    pub description: String,
    pub phase_compatibility: PhaseCompatibility,
    /// Phase-compatible and every Specific requirement present and non-empty.
    pub available: bool,
    /// Specific requirements currently missing or empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_context: Vec<String>,
}

/// Context handed to a collaborator, shaped by its declared requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskContext {
    /// `All`-requirers see the entire record.
    Full { record: Box<ProjectRecord> },
    /// Everyone else sees exactly the named artifacts; missing ones are null.
    Artifacts { artifacts: BTreeMap<String, Value> },
}

impl TaskContext {
    /// The named artifact from either context shape, `Null` when absent.
    pub fn artifact(&self, name: &str) -> Value {
        match self {
            TaskContext::Full { record } => {
                record.artifacts.get(name).cloned().unwrap_or(Value::Null)
            }
            TaskContext::Artifacts { artifacts } => {
                artifacts.get(name).cloned().unwrap_or(Value::Null)
            }
        }
    }
}

/// Input to a collaborator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInvocation {
    pub user_input: String,
    pub context: TaskContext,
}

/// What a collaborator hands back: artifact values to merge and reply text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    #[serde(default)]
    pub state_delta: BTreeMap<String, Value>,
    #[serde(default)]
    pub content: String,
}

impl AgentOutput {
    /// Reply text only, no state mutation.
    pub fn reply(content: impl Into<String>) -> Self {
        Self {
            state_delta: BTreeMap::new(),
            content: content.into(),
        }
    }
}

/// A caller's request for one turn (transport-agnostic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub message: String,
    pub session_id: String,
    #[serde(default)]
    pub agent_selection_mode: SelectionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_agent_id: Option<String>,
}

impl TurnRequest {
    pub fn auto(session_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            session_id: session_id.into(),
            agent_selection_mode: SelectionMode::Auto,
            selected_agent_id: None,
        }
    }

    pub fn manual(
        session_id: impl Into<String>,
        message: impl Into<String>,
        selected_agent_id: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            session_id: session_id.into(),
            agent_selection_mode: SelectionMode::Manual,
            selected_agent_id: Some(selected_agent_id.into()),
        }
    }
}

/// Everything a caller gets back from one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponse {
    pub message: String,
    pub state: ProjectRecord,
    pub intent: IntentResult,
    pub plan: ExecutionPlan,
    pub agent_results: Vec<AgentResult>,
    pub available_agents: Vec<AgentAvailability>,
    /// Manual mode with no selection: nothing ran, pick from the roster.
    #[serde(default)]
    pub awaiting_selection: bool,
}

// ============================================================================
// Error taxonomy
// ============================================================================

/// Collaborator execution failures. Per-task and non-fatal: the orchestrator
/// records them and keeps going.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error("Collaborator {agent_id} failed: {reason}")]
    ExecutionFailed { agent_id: String, reason: String },

    #[error("Collaborator {agent_id} returned malformed output: {reason}")]
    InvalidOutput { agent_id: String, reason: String },
}

/// Durable store failures. Fatal for the turn.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Failed to encode record for session {session_id}: {reason}")]
    Serialization { session_id: String, reason: String },
}

/// External classifier failures. Never fatal: the rule-based path takes over.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("Classification adapter failed: {reason}")]
    Adapter { reason: String },

    #[error("Classification adapter returned malformed result: {reason}")]
    MalformedResult { reason: String },
}

/// Planning failures. Fatal for the turn, raised before any collaborator runs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlanningError {
    #[error("Dependency cycle while resolving {agent_id}: {}", path.join(" -> "))]
    DependencyCycle { agent_id: String, path: Vec<String> },

    #[error("Unknown collaborator id: {agent_id}")]
    UnknownAgent { agent_id: String },
}

/// Top-level error for a turn.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
}

// ============================================================================
// Capability interfaces
// ============================================================================

/// The single capability interface every collaborator implements.
///
/// Implementations own their artifact schemas and any internal retries; the
/// core only sees the final output or error.
#[async_trait]
pub trait Collaborator: Send + Sync {
    async fn process(&self, invocation: AgentInvocation) -> Result<AgentOutput, AgentError>;
}

/// Durable store for project records, one record per session id.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<ProjectRecord>, PersistenceError>;

    async fn save(
        &self,
        session_id: &str,
        record: &ProjectRecord,
    ) -> Result<(), PersistenceError>;

    async fn delete(&self, session_id: &str) -> Result<(), PersistenceError>;

    async fn list_sessions(&self) -> Result<Vec<String>, PersistenceError>;
}

/// Optional external (LLM-backed) intent classifier.
///
/// Must honor the same result schema as the rule-based path; any failure
/// makes the core fall back silently.
#[async_trait]
pub trait IntentAdapter: Send + Sync {
    async fn classify(
        &self,
        user_input: &str,
        phase: ProjectPhase,
        intents: &[IntentDescriptor],
    ) -> Result<IntentResult, ClassificationError>;
}

// ============================================================================
// Structured turn events
// ============================================================================

/// Structured events emitted while a turn executes.
///
/// Written to stderr as `__PM_EVENT__:{json}` lines so a wrapping process can
/// follow orchestration progress without parsing free-form logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    TurnStarted {
        turn_id: Uuid,
        session_id: String,
        mode: SelectionMode,
    },
    IntentClassified {
        turn_id: Uuid,
        intent: String,
        confidence: f64,
    },
    PlanResolved {
        turn_id: Uuid,
        agents: Vec<String>,
    },
    AgentStarted {
        turn_id: Uuid,
        agent_id: String,
    },
    AgentCompleted {
        turn_id: Uuid,
        agent_id: String,
        state_delta_keys: Vec<String>,
    },
    AgentSkipped {
        turn_id: Uuid,
        agent_id: String,
    },
    AgentFailed {
        turn_id: Uuid,
        agent_id: String,
        error: String,
    },
    PhaseAdvanced {
        turn_id: Uuid,
        from: ProjectPhase,
        to: ProjectPhase,
    },
    TurnCompleted {
        turn_id: Uuid,
        session_id: String,
        agents_run: usize,
    },
}

impl TurnEvent {
    /// Emit this event to stderr for host-process parsing.
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            use std::io::Write;
            eprintln!("__PM_EVENT__:{}", json);
            let _ = std::io::stderr().flush();
        }
    }
}

/// Logs an informational message.
#[macro_export]
macro_rules! log_info {
    ($message:expr) => {
        println!("\x1b[36mℹ {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[36mℹ {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs a warning message.
#[macro_export]
macro_rules! log_warning {
    ($message:expr) => {
        println!("\x1b[33m⚠ {}\x1b[0m", $message);
    };
    ($fmt:expr, $($arg:tt)*) => {
        println!("\x1b[33m⚠ {}\x1b[0m", format!($fmt, $($arg)*));
    };
}

/// Logs a per-agent status line in the chat REPL.
#[macro_export]
macro_rules! log_agent_status {
    ($agent:expr, $status:expr) => {
        println!("\x1b[2m  [{}] {}\x1b[0m", $agent, $status);
    };
}
