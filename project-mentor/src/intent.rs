//! Intent classification: rule-based keyword matching with an optional
//! LLM-backed adapter in front of it.
//!
//! The adapter is tried first when configured; any failure or malformed
//! result falls back to the rules without surfacing an error. Classification
//! can therefore never fail a turn.

use project_mentor_sdk::{
    ClassificationError, IntentAdapter, IntentDescriptor, IntentResult, PhaseCompatibility,
    ProjectPhase,
};
use std::sync::Arc;

use crate::capability::{
    EXPORTER, MOCKUP_DESIGNER, PROJECT_ARCHITECT, REQUIREMENTS_COLLECTOR, ROADMAP_PLANNER,
};
use crate::llm::{extract_json_block, LlmClient};

/// One declared intent: match vocabulary, phase gate, and the collaborators
/// the intent maps to.
#[derive(Debug, Clone)]
pub struct IntentPattern {
    pub intent: &'static str,
    pub description: &'static str,
    pub keywords: Vec<&'static str>,
    pub triggers: Vec<&'static str>,
    pub phase_compatibility: PhaseCompatibility,
    pub agents: Vec<&'static str>,
}

/// The declared intent table, in priority (declaration) order.
///
/// Declaration order is the tie-break when two patterns score the same
/// number of hits.
pub fn intent_patterns() -> Vec<IntentPattern> {
    vec![
        IntentPattern {
            intent: "requirements_gathering",
            description: "Clarify goals, constraints, features and user stories.",
            keywords: vec!["need", "want", "goal", "problem", "user story", "build"],
            triggers: vec!["clarify", "what if", "constraints"],
            phase_compatibility: PhaseCompatibility::phases([
                ProjectPhase::Initialization,
                ProjectPhase::Discovery,
            ]),
            agents: vec![REQUIREMENTS_COLLECTOR],
        },
        IntentPattern {
            intent: "architecture_design",
            description: "Design the tech stack, system structure and data model.",
            keywords: vec!["architecture", "tech stack", "database", "api"],
            triggers: vec!["diagram", "structure", "how does"],
            phase_compatibility: PhaseCompatibility::phases([
                ProjectPhase::RequirementsComplete,
                ProjectPhase::ArchitectureComplete,
            ]),
            agents: vec![PROJECT_ARCHITECT],
        },
        IntentPattern {
            intent: "mockup_creation",
            description: "Sketch UI screens, wireframes and user flows.",
            keywords: vec!["ui", "screen", "flow", "wireframe", "design"],
            triggers: vec!["looks like", "user journey"],
            phase_compatibility: PhaseCompatibility::phases([
                ProjectPhase::RequirementsComplete,
            ]),
            agents: vec![MOCKUP_DESIGNER],
        },
        IntentPattern {
            intent: "execution_planning",
            description: "Lay out the roadmap: milestones, sprints, timeline.",
            keywords: vec!["roadmap", "timeline", "milestone", "sprint"],
            triggers: vec!["how long", "when", "priority"],
            phase_compatibility: PhaseCompatibility::phases([
                ProjectPhase::ArchitectureComplete,
            ]),
            agents: vec![ROADMAP_PLANNER],
        },
        IntentPattern {
            intent: "export",
            description: "Bundle the project record into a shareable document.",
            keywords: vec!["export", "download", "document", "pdf"],
            triggers: vec!["generate", "compile"],
            phase_compatibility: PhaseCompatibility::Any,
            agents: vec![EXPORTER],
        },
    ]
}

/// Always-available keyword classifier over the declared patterns.
#[derive(Debug)]
pub struct RuleBasedClassifier {
    patterns: Vec<IntentPattern>,
}

impl RuleBasedClassifier {
    pub fn new() -> Self {
        Self {
            patterns: intent_patterns(),
        }
    }

    pub fn patterns(&self) -> &[IntentPattern] {
        &self.patterns
    }

    /// Classify a message against the current phase.
    ///
    /// Case-folds the input, counts keyword and trigger hits per
    /// phase-compatible pattern, picks the highest count (first declared
    /// wins ties). No hits at all yields the `unknown` result.
    pub fn classify(&self, user_input: &str, phase: ProjectPhase) -> IntentResult {
        let normalized = user_input.trim().to_lowercase();
        if normalized.is_empty() {
            return IntentResult::unknown();
        }

        let mut best: Option<(usize, &IntentPattern)> = None;
        for pattern in &self.patterns {
            if !pattern.phase_compatibility.allows(phase) {
                continue;
            }
            let hits = pattern
                .keywords
                .iter()
                .chain(pattern.triggers.iter())
                .filter(|term| normalized.contains(&term.to_lowercase()))
                .count();
            if hits == 0 {
                continue;
            }
            // Strictly-greater keeps declaration order as the tie-break.
            if best.map(|(h, _)| hits > h).unwrap_or(true) {
                best = Some((hits, pattern));
            }
        }

        match best {
            Some((hits, pattern)) => {
                let vocab = pattern.keywords.len() + pattern.triggers.len();
                let confidence = (hits as f64 / vocab.max(1) as f64).min(1.0);
                IntentResult {
                    primary_intent: pattern.intent.to_string(),
                    requires_agents: pattern.agents.iter().map(|a| a.to_string()).collect(),
                    confidence,
                }
            }
            None => IntentResult::unknown(),
        }
    }
}

impl Default for RuleBasedClassifier {
    fn default() -> Self {
        Self::new()
    }
}

/// Classifier facade: external adapter first when present, rules otherwise.
pub struct IntentClassifier {
    rules: RuleBasedClassifier,
    adapter: Option<Arc<dyn IntentAdapter>>,
    descriptors: Vec<IntentDescriptor>,
}

impl IntentClassifier {
    pub fn new(adapter: Option<Arc<dyn IntentAdapter>>) -> Self {
        let rules = RuleBasedClassifier::new();
        let descriptors = rules
            .patterns()
            .iter()
            .map(|p| IntentDescriptor {
                intent: p.intent.to_string(),
                description: p.description.to_string(),
                phase_compatibility: p.phase_compatibility.clone(),
            })
            .collect();
        Self {
            rules,
            adapter,
            descriptors,
        }
    }

    pub fn rule_based() -> Self {
        Self::new(None)
    }

    /// Classify with silent degradation: an adapter error or an answer naming
    /// an undeclared intent falls back to the rule-based result.
    pub async fn classify(&self, user_input: &str, phase: ProjectPhase) -> IntentResult {
        if let Some(adapter) = &self.adapter {
            match adapter.classify(user_input, phase, &self.descriptors).await {
                Ok(result) if self.is_declared(&result) => return result,
                Ok(_) | Err(_) => {}
            }
        }
        self.rules.classify(user_input, phase)
    }

    fn is_declared(&self, result: &IntentResult) -> bool {
        result.primary_intent == "unknown"
            || self
                .rules
                .patterns()
                .iter()
                .any(|p| p.intent == result.primary_intent)
    }
}

/// LLM-backed intent adapter over the generic completion client.
///
/// The model only names an intent and a confidence; the collaborator mapping
/// always comes from the declared pattern table, so a creative answer can
/// never route to an undeclared agent.
pub struct LlmIntentAdapter {
    client: Arc<dyn LlmClient>,
}

impl LlmIntentAdapter {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    fn prompt(user_input: &str, phase: ProjectPhase, intents: &[IntentDescriptor]) -> String {
        let mut prompt = String::from(
            "Classify the user message into exactly one of these intents.\n\n",
        );
        for descriptor in intents {
            prompt.push_str(&format!(
                "- {}: {}\n",
                descriptor.intent, descriptor.description
            ));
        }
        prompt.push_str(&format!(
            "\nCurrent project phase: {phase}\n\
             User message: {user_input:?}\n\n\
             Answer with JSON only: {{\"primary_intent\": \"<intent or unknown>\", \
             \"confidence\": <0.0-1.0>}}",
        ));
        prompt
    }
}

#[derive(serde::Deserialize)]
struct AdapterAnswer {
    primary_intent: String,
    #[serde(default)]
    confidence: f64,
}

#[project_mentor_sdk::async_trait]
impl IntentAdapter for LlmIntentAdapter {
    async fn classify(
        &self,
        user_input: &str,
        phase: ProjectPhase,
        intents: &[IntentDescriptor],
    ) -> Result<IntentResult, ClassificationError> {
        let prompt = Self::prompt(user_input, phase, intents);
        let raw = self
            .client
            .complete(&prompt)
            .await
            .map_err(|e| ClassificationError::Adapter {
                reason: e.to_string(),
            })?;

        let answer: AdapterAnswer = serde_json::from_str(extract_json_block(&raw)).map_err(
            |e| ClassificationError::MalformedResult {
                reason: e.to_string(),
            },
        )?;

        if answer.primary_intent == "unknown" {
            return Ok(IntentResult::unknown());
        }
        let pattern = intent_patterns()
            .into_iter()
            .find(|p| p.intent == answer.primary_intent)
            .ok_or_else(|| ClassificationError::MalformedResult {
                reason: format!("undeclared intent {:?}", answer.primary_intent),
            })?;

        Ok(IntentResult {
            primary_intent: pattern.intent.to_string(),
            requires_agents: pattern.agents.iter().map(|a| a.to_string()).collect(),
            confidence: answer.confidence.clamp(0.0, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use project_mentor_sdk::{async_trait, ClassificationError};

    #[test]
    fn test_requirements_gathering_in_initialization() {
        let rules = RuleBasedClassifier::new();
        let result = rules.classify("I want to build a task app", ProjectPhase::Initialization);
        assert_eq!(result.primary_intent, "requirements_gathering");
        assert_eq!(result.requires_agents, vec![REQUIREMENTS_COLLECTOR]);
        assert!(result.confidence > 0.0);
    }

    #[test]
    fn test_architecture_design_in_requirements_complete() {
        let rules = RuleBasedClassifier::new();
        let result = rules.classify(
            "generate the architecture",
            ProjectPhase::RequirementsComplete,
        );
        assert_eq!(result.primary_intent, "architecture_design");
        assert_eq!(result.requires_agents, vec![PROJECT_ARCHITECT]);
    }

    #[test]
    fn test_architecture_keywords_diagram_and_stack() {
        let rules = RuleBasedClassifier::new();
        let result = rules.classify(
            "we need a diagram and tech stack",
            ProjectPhase::RequirementsComplete,
        );
        assert_eq!(result.primary_intent, "architecture_design");
    }

    #[test]
    fn test_export_allowed_in_any_phase() {
        let rules = RuleBasedClassifier::new();
        let result = rules.classify("export the document to PDF", ProjectPhase::Initialization);
        assert_eq!(result.primary_intent, "export");
        assert_eq!(result.requires_agents, vec![EXPORTER]);
    }

    #[test]
    fn test_execution_planning_in_architecture_complete() {
        let rules = RuleBasedClassifier::new();
        let result = rules.classify(
            "give me a roadmap and timeline",
            ProjectPhase::ArchitectureComplete,
        );
        assert_eq!(result.primary_intent, "execution_planning");
        assert_eq!(result.requires_agents, vec![ROADMAP_PLANNER]);
    }

    #[test]
    fn test_phase_incompatible_pattern_is_discarded() {
        let rules = RuleBasedClassifier::new();
        // Roadmap vocabulary, but the phase gate excludes execution_planning
        // in initialization and nothing else matches.
        let result = rules.classify("roadmap and milestone", ProjectPhase::Initialization);
        assert_eq!(result.primary_intent, "unknown");
    }

    #[test]
    fn test_empty_and_whitespace_input_unknown() {
        let rules = RuleBasedClassifier::new();
        for input in ["", "   "] {
            let result = rules.classify(input, ProjectPhase::Initialization);
            assert_eq!(result.primary_intent, "unknown");
            assert!(result.requires_agents.is_empty());
            assert_eq!(result.confidence, 0.0);
        }
    }

    #[test]
    fn test_gibberish_is_unknown() {
        let rules = RuleBasedClassifier::new();
        let result = rules.classify("xyzzz qqq", ProjectPhase::Initialization);
        assert_eq!(result.primary_intent, "unknown");
        assert!(result.requires_agents.is_empty());
    }

    #[test]
    fn test_confidence_is_normalized() {
        let rules = RuleBasedClassifier::new();
        let result = rules.classify(
            "export and download the document as pdf, generate and compile it",
            ProjectPhase::Initialization,
        );
        assert_eq!(result.primary_intent, "export");
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
    }

    struct FailingAdapter;

    #[async_trait]
    impl IntentAdapter for FailingAdapter {
        async fn classify(
            &self,
            _user_input: &str,
            _phase: ProjectPhase,
            _intents: &[IntentDescriptor],
        ) -> Result<IntentResult, ClassificationError> {
            Err(ClassificationError::Adapter {
                reason: "timeout".to_string(),
            })
        }
    }

    struct UndeclaredAdapter;

    #[async_trait]
    impl IntentAdapter for UndeclaredAdapter {
        async fn classify(
            &self,
            _user_input: &str,
            _phase: ProjectPhase,
            _intents: &[IntentDescriptor],
        ) -> Result<IntentResult, ClassificationError> {
            Ok(IntentResult {
                primary_intent: "made_up_intent".to_string(),
                requires_agents: vec!["nobody".to_string()],
                confidence: 0.99,
            })
        }
    }

    #[tokio::test]
    async fn test_adapter_failure_falls_back_to_rules() {
        let classifier = IntentClassifier::new(Some(Arc::new(FailingAdapter)));
        let result = classifier
            .classify("I want to build a task app", ProjectPhase::Initialization)
            .await;
        assert_eq!(result.primary_intent, "requirements_gathering");
    }

    #[tokio::test]
    async fn test_undeclared_adapter_intent_falls_back_to_rules() {
        let classifier = IntentClassifier::new(Some(Arc::new(UndeclaredAdapter)));
        let result = classifier
            .classify("I want to build a task app", ProjectPhase::Initialization)
            .await;
        assert_eq!(result.primary_intent, "requirements_gathering");
    }

    struct ConfidentAdapter;

    #[async_trait]
    impl IntentAdapter for ConfidentAdapter {
        async fn classify(
            &self,
            _user_input: &str,
            _phase: ProjectPhase,
            _intents: &[IntentDescriptor],
        ) -> Result<IntentResult, ClassificationError> {
            Ok(IntentResult {
                primary_intent: "export".to_string(),
                requires_agents: vec![EXPORTER.to_string()],
                confidence: 0.95,
            })
        }
    }

    #[tokio::test]
    async fn test_adapter_result_wins_when_declared() {
        let classifier = IntentClassifier::new(Some(Arc::new(ConfidentAdapter)));
        let result = classifier
            .classify("bundle everything up", ProjectPhase::Initialization)
            .await;
        assert_eq!(result.primary_intent, "export");
        assert_eq!(result.confidence, 0.95);
    }

    struct CannedLlm(&'static str);

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String, crate::llm::LlmError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_llm_intent_adapter_maps_agents_from_table() {
        let adapter = LlmIntentAdapter::new(Arc::new(CannedLlm(
            "```json\n{\"primary_intent\": \"architecture_design\", \"confidence\": 0.8}\n```",
        )));
        let classifier = IntentClassifier::new(Some(Arc::new(adapter)));
        let result = classifier
            .classify("set it all up", ProjectPhase::RequirementsComplete)
            .await;
        assert_eq!(result.primary_intent, "architecture_design");
        assert_eq!(result.requires_agents, vec![PROJECT_ARCHITECT]);
        assert_eq!(result.confidence, 0.8);
    }

    #[tokio::test]
    async fn test_llm_intent_adapter_garbage_falls_back() {
        let adapter = LlmIntentAdapter::new(Arc::new(CannedLlm("not json at all")));
        let classifier = IntentClassifier::new(Some(Arc::new(adapter)));
        let result = classifier
            .classify("I want to build a task app", ProjectPhase::Initialization)
            .await;
        // Malformed adapter output degrades silently to the rules.
        assert_eq!(result.primary_intent, "requirements_gathering");
    }
}
