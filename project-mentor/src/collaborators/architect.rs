//! LLM-backed project architect.
//!
//! Prompts the configured model with the requirements artifact and the user's
//! message, expects a JSON architecture proposal back, and merges it into the
//! record as the `architecture` artifact. Parsing is lenient about fenced
//! code blocks but strict about shape: no tech stack, no delta.

use project_mentor_sdk::{
    async_trait, AgentError, AgentInvocation, AgentOutput, Collaborator,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::llm::{extract_json_block, LlmClient};

pub struct ArchitectCollaborator {
    llm: Arc<dyn LlmClient>,
}

impl ArchitectCollaborator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    fn prompt(requirements: &Value, user_input: &str) -> String {
        format!(
            "You are a software architect. Based on the requirements below and \
             the user's message, propose an architecture.\n\n\
             Requirements:\n{requirements}\n\n\
             User message: {user_input:?}\n\n\
             Answer with JSON only, in this shape:\n\
             {{\n\
               \"tech_stack\": {{\"frontend\": \"...\", \"backend\": \"...\", \"database\": \"...\"}},\n\
               \"data_schema\": \"<mermaid ER diagram or null>\",\n\
               \"system_diagram\": \"<mermaid diagram or null>\",\n\
               \"api_design\": [{{\"method\": \"GET\", \"path\": \"/...\", \"purpose\": \"...\"}}],\n\
               \"deployment_strategy\": \"<one sentence or null>\",\n\
               \"rationale\": \"<short explanation>\"\n\
             }}"
        )
    }

    fn summarize(architecture: &Value) -> String {
        let stack = architecture
            .get("tech_stack")
            .and_then(Value::as_object)
            .map(|stack| {
                stack
                    .iter()
                    .filter_map(|(layer, choice)| {
                        choice.as_str().map(|c| format!("{layer}: {c}"))
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        let rationale = architecture
            .get("rationale")
            .and_then(Value::as_str)
            .unwrap_or("");

        if rationale.is_empty() {
            format!("Proposed architecture: {stack}.")
        } else {
            format!("Proposed architecture: {stack}. {rationale}")
        }
    }
}

#[async_trait]
impl Collaborator for ArchitectCollaborator {
    async fn process(&self, invocation: AgentInvocation) -> Result<AgentOutput, AgentError> {
        let requirements = invocation.context.artifact("requirements");
        let prompt = Self::prompt(&requirements, &invocation.user_input);

        let raw = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|e| AgentError::ExecutionFailed {
                agent_id: "project_architect".to_string(),
                reason: e.to_string(),
            })?;

        let architecture: Value = serde_json::from_str(extract_json_block(&raw)).map_err(
            |e| AgentError::InvalidOutput {
                agent_id: "project_architect".to_string(),
                reason: format!("not valid JSON: {e}"),
            },
        )?;

        if architecture.get("tech_stack").and_then(Value::as_object).is_none() {
            return Err(AgentError::InvalidOutput {
                agent_id: "project_architect".to_string(),
                reason: "missing tech_stack object".to_string(),
            });
        }

        let content = Self::summarize(&architecture);
        let mut state_delta = BTreeMap::new();
        state_delta.insert("architecture".to_string(), architecture);

        Ok(AgentOutput {
            state_delta,
            content,
        })
    }
}
