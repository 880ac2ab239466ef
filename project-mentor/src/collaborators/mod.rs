//! Built-in collaborators.
//!
//! Each one implements the single `Collaborator` capability interface and
//! owns the schema of the artifact it produces. The requirements collector
//! and exporter are deterministic; the architect needs a configured LLM
//! endpoint and is only registered when one exists.

pub mod architect;
pub mod exporter;
pub mod requirements;

pub use architect::ArchitectCollaborator;
pub use exporter::ExporterCollaborator;
pub use requirements::RequirementsCollaborator;
