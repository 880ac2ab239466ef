//! Deterministic exporter.
//!
//! The only `All`-requirer in the built-in graph: it sees the whole record
//! and renders every present artifact into one Markdown bundle, stored back
//! as the `export` artifact so re-exports overwrite cleanly.

use project_mentor_sdk::{
    async_trait, AgentError, AgentInvocation, AgentOutput, Collaborator, ProjectRecord,
    TaskContext,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub struct ExporterCollaborator;

impl ExporterCollaborator {
    pub fn new() -> Self {
        Self
    }

    fn render(record: &ProjectRecord) -> (String, usize) {
        let title = record
            .project_name
            .clone()
            .unwrap_or_else(|| format!("Project {}", record.session_id));

        let mut doc = format!("# {title}\n\nPhase: {}\n", record.phase);
        let mut sections = 0;

        // Fixed section order; the export artifact itself is skipped so a
        // re-export never embeds the previous bundle.
        for (artifact, heading) in [
            ("requirements", "Requirements"),
            ("architecture", "Architecture"),
            ("mockups", "Mockups"),
            ("roadmap", "Roadmap"),
        ] {
            if let Some(value) = record.artifact(artifact) {
                if value.is_null() {
                    continue;
                }
                doc.push_str(&format!("\n## {heading}\n\n"));
                doc.push_str(&Self::render_value(value, 0));
                sections += 1;
            }
        }

        if sections == 0 {
            doc.push_str("\n_No artifacts yet. Talk to the mentor first._\n");
        }
        (doc, sections)
    }

    fn render_value(value: &Value, depth: usize) -> String {
        let indent = "  ".repeat(depth);
        match value {
            Value::Object(map) => map
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(key, v)| match v {
                    Value::String(s) => format!("{indent}- **{key}**: {s}\n"),
                    Value::Number(n) => format!("{indent}- **{key}**: {n}\n"),
                    Value::Bool(b) => format!("{indent}- **{key}**: {b}\n"),
                    _ => format!(
                        "{indent}- **{key}**:\n{}",
                        Self::render_value(v, depth + 1)
                    ),
                })
                .collect(),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => format!("{indent}- {s}\n"),
                    _ => format!("{indent}- {}\n", item),
                })
                .collect(),
            other => format!("{indent}{other}\n"),
        }
    }
}

impl Default for ExporterCollaborator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collaborator for ExporterCollaborator {
    async fn process(&self, invocation: AgentInvocation) -> Result<AgentOutput, AgentError> {
        let record = match &invocation.context {
            TaskContext::Full { record } => record.as_ref(),
            TaskContext::Artifacts { .. } => {
                return Err(AgentError::ExecutionFailed {
                    agent_id: "exporter".to_string(),
                    reason: "exporter needs the full record".to_string(),
                })
            }
        };

        let (document, sections) = Self::render(record);
        let mut state_delta = BTreeMap::new();
        state_delta.insert(
            "export".to_string(),
            json!({
                "format": "markdown",
                "document": document,
            }),
        );

        Ok(AgentOutput {
            state_delta,
            content: format!(
                "Export bundle ready: {sections} section{} as Markdown.",
                if sections == 1 { "" } else { "s" }
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_invocation(record: ProjectRecord) -> AgentInvocation {
        AgentInvocation {
            user_input: "export everything".to_string(),
            context: TaskContext::Full {
                record: Box::new(record),
            },
        }
    }

    #[tokio::test]
    async fn test_renders_present_artifacts_as_sections() {
        let mut record = ProjectRecord::new("s1");
        record.artifacts.insert(
            "requirements".to_string(),
            json!({"functional": ["create tasks", "share lists"]}),
        );
        record.artifacts.insert(
            "architecture".to_string(),
            json!({"tech_stack": {"backend": "Axum"}}),
        );

        let output = ExporterCollaborator::new()
            .process(full_invocation(record))
            .await
            .unwrap();

        let document = output.state_delta["export"]["document"].as_str().unwrap();
        assert!(document.contains("## Requirements"));
        assert!(document.contains("## Architecture"));
        assert!(document.contains("- create tasks"));
        assert!(document.contains("**backend**: Axum"));
        assert!(output.content.contains("2 sections"));
    }

    #[tokio::test]
    async fn test_empty_record_still_exports() {
        let output = ExporterCollaborator::new()
            .process(full_invocation(ProjectRecord::new("s1")))
            .await
            .unwrap();

        let document = output.state_delta["export"]["document"].as_str().unwrap();
        assert!(document.contains("No artifacts yet"));
        assert!(output.content.contains("0 sections"));
    }

    #[tokio::test]
    async fn test_reexport_does_not_embed_previous_bundle() {
        let mut record = ProjectRecord::new("s1");
        record.artifacts.insert(
            "export".to_string(),
            json!({"format": "markdown", "document": "OLD BUNDLE"}),
        );
        record
            .artifacts
            .insert("requirements".to_string(), json!({"functional": ["x"]}));

        let output = ExporterCollaborator::new()
            .process(full_invocation(record))
            .await
            .unwrap();
        let document = output.state_delta["export"]["document"].as_str().unwrap();
        assert!(!document.contains("OLD BUNDLE"));
    }

    #[tokio::test]
    async fn test_partial_context_is_rejected() {
        let invocation = AgentInvocation {
            user_input: "export".to_string(),
            context: TaskContext::Artifacts {
                artifacts: BTreeMap::new(),
            },
        };
        let err = ExporterCollaborator::new()
            .process(invocation)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ExecutionFailed { .. }));
    }
}
