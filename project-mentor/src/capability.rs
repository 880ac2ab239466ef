//! Static capability graph: what each collaborator needs, what it produces,
//! and in which phases it may run.
//!
//! The table is declared once at process start and never mutated. Declaration
//! order is the deterministic iteration order used as a tie-break everywhere
//! else (planner seeding, producer lookup, availability listing).

use project_mentor_sdk::{PhaseCompatibility, ProjectPhase, Requirement};
use std::collections::HashMap;

/// One declared collaborator in the capability graph.
#[derive(Debug, Clone)]
pub struct CapabilityEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub requires: Requirement,
    pub produces: Vec<&'static str>,
    pub phase_compatibility: PhaseCompatibility,
}

/// Read-only lookup table over the declared collaborators plus the companion
/// phase-transition table (one target phase per producing collaborator).
#[derive(Debug)]
pub struct CapabilityGraph {
    entries: Vec<CapabilityEntry>,
    index: HashMap<&'static str, usize>,
    transitions: HashMap<&'static str, ProjectPhase>,
}

pub const REQUIREMENTS_COLLECTOR: &str = "requirements_collector";
pub const PROJECT_ARCHITECT: &str = "project_architect";
pub const ROADMAP_PLANNER: &str = "roadmap_planner";
pub const MOCKUP_DESIGNER: &str = "mockup_designer";
pub const EXPORTER: &str = "exporter";

impl CapabilityGraph {
    /// Build a graph from an explicit table. Declaration order of `entries`
    /// is preserved as the iteration order.
    pub fn new(
        entries: Vec<CapabilityEntry>,
        transitions: HashMap<&'static str, ProjectPhase>,
    ) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();
        Self {
            entries,
            index,
            transitions,
        }
    }

    /// The built-in collaborator table, in dependency order.
    pub fn builtin() -> Self {
        let entries = vec![
            CapabilityEntry {
                id: REQUIREMENTS_COLLECTOR,
                name: "Requirements Collector",
                description: "Gathers goals, constraints and features from the \
                              conversation and keeps the requirements artifact current.",
                requires: Requirement::none(),
                produces: vec!["requirements"],
                phase_compatibility: PhaseCompatibility::Any,
            },
            CapabilityEntry {
                id: PROJECT_ARCHITECT,
                name: "Project Architect",
                description: "Turns requirements into a tech stack, system and data \
                              diagrams, and an API sketch.",
                requires: Requirement::specific(["requirements"]),
                produces: vec!["architecture"],
                phase_compatibility: PhaseCompatibility::phases([
                    ProjectPhase::RequirementsComplete,
                    ProjectPhase::ArchitectureComplete,
                ]),
            },
            CapabilityEntry {
                id: ROADMAP_PLANNER,
                name: "Roadmap Planner",
                description: "Creates phases, milestones and implementation steps \
                              from the architecture.",
                requires: Requirement::specific(["architecture"]),
                produces: vec!["roadmap"],
                phase_compatibility: PhaseCompatibility::phases([
                    ProjectPhase::ArchitectureComplete,
                ]),
            },
            CapabilityEntry {
                id: MOCKUP_DESIGNER,
                name: "Mockup Designer",
                description: "Generates UI wireframes and screen flows from \
                              requirements and architecture.",
                requires: Requirement::specific(["requirements", "architecture"]),
                produces: vec!["mockups"],
                phase_compatibility: PhaseCompatibility::phases([
                    ProjectPhase::RequirementsComplete,
                ]),
            },
            CapabilityEntry {
                id: EXPORTER,
                name: "Exporter",
                description: "Bundles every artifact into a shareable document.",
                requires: Requirement::All,
                produces: vec!["export"],
                phase_compatibility: PhaseCompatibility::Any,
            },
        ];

        // Transition targets: applied by the orchestrator after a successful
        // run that actually mutated state. Every producing collaborator has one.
        let transitions = HashMap::from([
            (REQUIREMENTS_COLLECTOR, ProjectPhase::RequirementsComplete),
            (PROJECT_ARCHITECT, ProjectPhase::ArchitectureComplete),
            (ROADMAP_PLANNER, ProjectPhase::PlanningComplete),
            (MOCKUP_DESIGNER, ProjectPhase::DesignComplete),
            (EXPORTER, ProjectPhase::Exportable),
        ]);

        Self::new(entries, transitions)
    }

    /// Entry for a collaborator id, if declared.
    pub fn get(&self, agent_id: &str) -> Option<&CapabilityEntry> {
        self.index.get(agent_id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.index.contains_key(agent_id)
    }

    /// All entries in declaration order.
    pub fn entries(&self) -> &[CapabilityEntry] {
        &self.entries
    }

    /// Collaborators whose `produces` includes the artifact, declaration order.
    pub fn producers_of(&self, artifact: &str) -> Vec<&CapabilityEntry> {
        self.entries
            .iter()
            .filter(|e| e.produces.iter().any(|p| *p == artifact))
            .collect()
    }

    /// Collaborators whose Specific `requires` includes the artifact.
    /// `All`-requirers are excluded: they contribute no dependency edge.
    pub fn consumers_of(&self, artifact: &str) -> Vec<&CapabilityEntry> {
        self.entries
            .iter()
            .filter(|e| {
                e.requires
                    .artifact_names()
                    .iter()
                    .any(|name| name.as_str() == artifact)
            })
            .collect()
    }

    /// Target phase applied after a successful, state-mutating run.
    pub fn transition_target(&self, agent_id: &str) -> Option<ProjectPhase> {
        self.transitions.get(agent_id).copied()
    }

    /// Default pipeline used when intent classification yields no agents:
    /// every declared collaborator, in declaration (dependency) order.
    pub fn full_pipeline(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.id).collect()
    }
}

impl Default for CapabilityGraph {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let graph = CapabilityGraph::builtin();
        let mut seen = std::collections::HashSet::new();
        for entry in graph.entries() {
            assert!(seen.insert(entry.id), "duplicate id {}", entry.id);
        }
    }

    #[test]
    fn test_get_and_contains() {
        let graph = CapabilityGraph::builtin();
        assert!(graph.contains(PROJECT_ARCHITECT));
        assert_eq!(graph.get(PROJECT_ARCHITECT).unwrap().name, "Project Architect");
        assert!(graph.get("ghost").is_none());
    }

    #[test]
    fn test_producers_of_architecture() {
        let graph = CapabilityGraph::builtin();
        let producers = graph.producers_of("architecture");
        assert_eq!(producers.len(), 1);
        assert_eq!(producers[0].id, PROJECT_ARCHITECT);
    }

    #[test]
    fn test_consumers_of_excludes_all_requirers() {
        let graph = CapabilityGraph::builtin();
        let consumers: Vec<&str> = graph
            .consumers_of("architecture")
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(consumers, vec![ROADMAP_PLANNER, MOCKUP_DESIGNER]);
        // The exporter consumes everything but never appears as a consumer edge.
        assert!(!consumers.contains(&EXPORTER));
    }

    #[test]
    fn test_iteration_order_is_declaration_order() {
        let graph = CapabilityGraph::builtin();
        let ids: Vec<&str> = graph.entries().iter().map(|e| e.id).collect();
        assert_eq!(
            ids,
            vec![
                REQUIREMENTS_COLLECTOR,
                PROJECT_ARCHITECT,
                ROADMAP_PLANNER,
                MOCKUP_DESIGNER,
                EXPORTER,
            ]
        );
        assert_eq!(graph.full_pipeline(), ids);
    }

    #[test]
    fn test_every_producing_agent_has_a_transition() {
        let graph = CapabilityGraph::builtin();
        for entry in graph.entries() {
            if !entry.produces.is_empty() {
                assert!(
                    graph.transition_target(entry.id).is_some(),
                    "{} produces artifacts but has no transition target",
                    entry.id
                );
            }
        }
    }

    #[test]
    fn test_transition_targets_follow_phase_order() {
        let graph = CapabilityGraph::builtin();
        assert_eq!(
            graph.transition_target(REQUIREMENTS_COLLECTOR),
            Some(ProjectPhase::RequirementsComplete)
        );
        assert_eq!(
            graph.transition_target(PROJECT_ARCHITECT),
            Some(ProjectPhase::ArchitectureComplete)
        );
        assert_eq!(
            graph.transition_target(EXPORTER),
            Some(ProjectPhase::Exportable)
        );
    }
}
