//! Collaborator registry: resolve an agent id to a live handle.
//!
//! Construction is lazy and memoized per id behind a `OnceCell`, so each
//! collaborator is built at most once no matter how many turns race on it.
//! A constructor may decline: a declared-but-unimplemented collaborator, or
//! one whose prerequisites (an LLM endpoint) are not configured. That
//! absence is a first-class outcome the orchestrator reports as "skipped",
//! never as an error.

use project_mentor_sdk::Collaborator;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::capability::{
    EXPORTER, MOCKUP_DESIGNER, PROJECT_ARCHITECT, REQUIREMENTS_COLLECTOR, ROADMAP_PLANNER,
};
use crate::collaborators::{
    ArchitectCollaborator, ExporterCollaborator, RequirementsCollaborator,
};
use crate::config::MentorConfig;
use crate::llm::HttpLlmClient;

/// A resolved collaborator handle; `None` means "declared but absent".
pub type Handle = Option<Arc<dyn Collaborator>>;
/// Constructor for one collaborator, run at most once.
pub type Builder = Box<dyn Fn() -> Handle + Send + Sync>;

struct RegistrySlot {
    builder: Builder,
    cell: OnceCell<Handle>,
}

/// Id→constructor map with memoized, per-key lazy initialization.
pub struct CollaboratorRegistry {
    slots: HashMap<String, RegistrySlot>,
}

impl CollaboratorRegistry {
    /// Build a registry from explicit constructors (tests and embedders).
    pub fn from_builders(builders: Vec<(String, Builder)>) -> Self {
        let slots = builders
            .into_iter()
            .map(|(id, builder)| {
                (
                    id,
                    RegistrySlot {
                        builder,
                        cell: OnceCell::new(),
                    },
                )
            })
            .collect();
        Self { slots }
    }

    /// The default wiring for the built-in capability graph.
    pub fn builtin(config: &MentorConfig) -> Self {
        let llm_settings = config.llm.clone();

        let mut builders: Vec<(String, Builder)> = Vec::new();
        builders.push((
            REQUIREMENTS_COLLECTOR.to_string(),
            Box::new(|| Some(Arc::new(RequirementsCollaborator::new()) as Arc<dyn Collaborator>)),
        ));
        builders.push((
            PROJECT_ARCHITECT.to_string(),
            Box::new(move || {
                // Without an endpoint the architect stays absent and plans
                // that include it report it as skipped.
                let settings = llm_settings.clone()?;
                let client = Arc::new(HttpLlmClient::new(settings));
                Some(Arc::new(ArchitectCollaborator::new(client)) as Arc<dyn Collaborator>)
            }),
        ));
        // TODO: wire RoadmapCollaborator here once it exists.
        builders.push((ROADMAP_PLANNER.to_string(), Box::new(|| None)));
        // TODO: wire MockupCollaborator here once it exists.
        builders.push((MOCKUP_DESIGNER.to_string(), Box::new(|| None)));
        builders.push((
            EXPORTER.to_string(),
            Box::new(|| Some(Arc::new(ExporterCollaborator::new()) as Arc<dyn Collaborator>)),
        ));

        Self::from_builders(builders)
    }

    /// Resolve an agent id. `None` for undeclared ids and for declared ids
    /// whose constructor declined.
    pub async fn get_agent(&self, agent_id: &str) -> Option<Arc<dyn Collaborator>> {
        let slot = self.slots.get(agent_id)?;
        slot.cell
            .get_or_init(|| async { (slot.builder)() })
            .await
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use project_mentor_sdk::{
        async_trait, AgentError, AgentInvocation, AgentOutput,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NoopCollaborator;

    #[async_trait]
    impl Collaborator for NoopCollaborator {
        async fn process(&self, _: AgentInvocation) -> Result<AgentOutput, AgentError> {
            Ok(AgentOutput::reply("ok"))
        }
    }

    fn config_without_llm() -> MentorConfig {
        MentorConfig {
            database_path: MentorConfig::default_database_path(),
            llm: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_id_is_absent() {
        let registry = CollaboratorRegistry::builtin(&config_without_llm());
        assert!(registry.get_agent("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_placeholders_are_absent() {
        let registry = CollaboratorRegistry::builtin(&config_without_llm());
        assert!(registry.get_agent(ROADMAP_PLANNER).await.is_none());
        assert!(registry.get_agent(MOCKUP_DESIGNER).await.is_none());
    }

    #[tokio::test]
    async fn test_architect_absent_without_llm() {
        let registry = CollaboratorRegistry::builtin(&config_without_llm());
        assert!(registry.get_agent(PROJECT_ARCHITECT).await.is_none());
    }

    #[tokio::test]
    async fn test_deterministic_collaborators_resolve() {
        let registry = CollaboratorRegistry::builtin(&config_without_llm());
        assert!(registry.get_agent(REQUIREMENTS_COLLECTOR).await.is_some());
        assert!(registry.get_agent(EXPORTER).await.is_some());
    }

    #[tokio::test]
    async fn test_construction_is_memoized() {
        static BUILDS: AtomicUsize = AtomicUsize::new(0);

        let builders: Vec<(String, Builder)> = vec![(
            "counted".to_string(),
            Box::new(|| {
                BUILDS.fetch_add(1, Ordering::SeqCst);
                Some(Arc::new(NoopCollaborator) as Arc<dyn Collaborator>)
            }),
        )];
        let registry = CollaboratorRegistry::from_builders(builders);

        let first = registry.get_agent("counted").await.unwrap();
        let second = registry.get_agent("counted").await.unwrap();
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_declined_construction_is_memoized_too() {
        static BUILDS: AtomicUsize = AtomicUsize::new(0);

        let builders: Vec<(String, Builder)> = vec![(
            "absent".to_string(),
            Box::new(|| {
                BUILDS.fetch_add(1, Ordering::SeqCst);
                None
            }),
        )];
        let registry = CollaboratorRegistry::from_builders(builders);

        assert!(registry.get_agent("absent").await.is_none());
        assert!(registry.get_agent("absent").await.is_none());
        assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    }
}
