//! Deterministic requirements collector.
//!
//! Splits the user message into clauses and sorts them into functional
//! requirements, non-functional requirements and constraints using marker
//! vocabulary. No model behind it: the point is keeping the requirements
//! artifact current from plain conversation, not prose quality.

use project_mentor_sdk::{
    async_trait, AgentError, AgentInvocation, AgentOutput, Collaborator,
};
use serde_json::json;
use std::collections::BTreeMap;

const CONSTRAINT_MARKERS: &[&str] = &[
    "must not",
    "cannot",
    "can't",
    "only",
    "budget",
    "deadline",
    "within",
    "at most",
    "no more than",
];

const NON_FUNCTIONAL_MARKERS: &[&str] = &[
    "fast",
    "performance",
    "secure",
    "security",
    "scalable",
    "scale",
    "reliable",
    "available",
    "accessible",
];

pub struct RequirementsCollaborator;

impl RequirementsCollaborator {
    pub fn new() -> Self {
        Self
    }

    fn split_clauses(input: &str) -> Vec<String> {
        input
            .split(['.', ';', '!', '?', '\n'])
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn classify(clause: &str) -> Bucket {
        let lowered = clause.to_lowercase();
        if CONSTRAINT_MARKERS.iter().any(|m| lowered.contains(m)) {
            Bucket::Constraint
        } else if NON_FUNCTIONAL_MARKERS.iter().any(|m| lowered.contains(m)) {
            Bucket::NonFunctional
        } else {
            Bucket::Functional
        }
    }
}

impl Default for RequirementsCollaborator {
    fn default() -> Self {
        Self::new()
    }
}

enum Bucket {
    Functional,
    NonFunctional,
    Constraint,
}

#[async_trait]
impl Collaborator for RequirementsCollaborator {
    async fn process(&self, invocation: AgentInvocation) -> Result<AgentOutput, AgentError> {
        let clauses = Self::split_clauses(&invocation.user_input);
        if clauses.is_empty() {
            return Ok(AgentOutput::reply(
                "Tell me what you're trying to build: goals, features, \
                 constraints. I'll capture them as requirements.",
            ));
        }

        let mut functional = Vec::new();
        let mut non_functional = Vec::new();
        let mut constraints = Vec::new();
        for clause in clauses {
            match Self::classify(&clause) {
                Bucket::Functional => functional.push(clause),
                Bucket::NonFunctional => non_functional.push(clause),
                Bucket::Constraint => constraints.push(clause),
            }
        }

        let captured = functional.len() + non_functional.len() + constraints.len();
        let content = format!(
            "Captured {} requirement{} ({} functional, {} non-functional, {} constraint{}). \
             Anything else I should know before we design the architecture?",
            captured,
            if captured == 1 { "" } else { "s" },
            functional.len(),
            non_functional.len(),
            constraints.len(),
            if constraints.len() == 1 { "" } else { "s" },
        );

        let mut state_delta = BTreeMap::new();
        state_delta.insert(
            "requirements".to_string(),
            json!({
                "functional": functional,
                "non_functional": non_functional,
                "constraints": constraints,
                "user_stories": [],
                "gaps": [],
            }),
        );

        Ok(AgentOutput {
            state_delta,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use project_mentor_sdk::TaskContext;
    use std::collections::BTreeMap as Map;

    fn invoke(input: &str) -> AgentInvocation {
        AgentInvocation {
            user_input: input.to_string(),
            context: TaskContext::Artifacts {
                artifacts: Map::new(),
            },
        }
    }

    #[tokio::test]
    async fn test_collects_functional_requirements() {
        let collector = RequirementsCollaborator::new();
        let output = collector
            .process(invoke("Users can create tasks. Tasks sync across devices."))
            .await
            .unwrap();

        let requirements = &output.state_delta["requirements"];
        let functional = requirements["functional"].as_array().unwrap();
        assert_eq!(functional.len(), 2);
        assert!(output.content.contains("2 requirements"));
    }

    #[tokio::test]
    async fn test_sorts_constraints_and_non_functional() {
        let collector = RequirementsCollaborator::new();
        let output = collector
            .process(invoke(
                "The app must not exceed a $500 budget. It should feel fast. \
                 Users can share lists.",
            ))
            .await
            .unwrap();

        let requirements = &output.state_delta["requirements"];
        assert_eq!(requirements["constraints"].as_array().unwrap().len(), 1);
        assert_eq!(requirements["non_functional"].as_array().unwrap().len(), 1);
        assert_eq!(requirements["functional"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_message_asks_for_detail_without_delta() {
        let collector = RequirementsCollaborator::new();
        let output = collector.process(invoke("   ")).await.unwrap();
        assert!(output.state_delta.is_empty());
        assert!(output.content.contains("requirements"));
    }
}
