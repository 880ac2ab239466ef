//! State management: the per-session cache over the durable store, with one
//! atomic update primitive and per-channel merge strategies.
//!
//! Artifacts merge by overwrite-by-key; the conversation log is append-only;
//! phase and selection are plain scalar overwrites. Every apply refreshes
//! `updated_at` and writes through to the store before returning, so the
//! cache stays authoritative during a turn and the store never lags by more
//! than the in-flight update.

use project_mentor_sdk::{
    ConversationEntry, PersistenceAdapter, PersistenceError, ProjectPhase, ProjectRecord,
    SelectionMode,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

/// One atomic update to a session record, tagged with its merge strategy.
#[derive(Debug, Clone)]
pub enum RecordDelta {
    /// Overwrite-by-key artifact merge.
    Artifacts(BTreeMap<String, Value>),
    /// Scalar phase overwrite (the orchestrator guards monotonicity).
    Phase(ProjectPhase),
    /// Scalar selection overwrite.
    Selection {
        mode: SelectionMode,
        selected_agent_id: Option<String>,
    },
    /// Append-only growth of the conversation log.
    AppendConversation(Vec<ConversationEntry>),
}

/// Owns the authoritative in-memory record per session and mediates with the
/// durable store.
pub struct StateManager {
    store: Arc<dyn PersistenceAdapter>,
    cache: Mutex<HashMap<String, ProjectRecord>>,
}

impl StateManager {
    pub fn new(store: Arc<dyn PersistenceAdapter>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> Arc<dyn PersistenceAdapter> {
        Arc::clone(&self.store)
    }

    /// Cached record if present, else the stored one, else a fresh default.
    pub async fn load(&self, session_id: &str) -> Result<ProjectRecord, PersistenceError> {
        let mut cache = self.cache.lock().await;
        if let Some(record) = cache.get(session_id) {
            return Ok(record.clone());
        }
        let record = match self.store.get(session_id).await? {
            Some(record) => record,
            None => ProjectRecord::new(session_id),
        };
        cache.insert(session_id.to_string(), record.clone());
        Ok(record)
    }

    /// Apply one delta atomically: merge into the cached record, stamp
    /// `updated_at`, write through, return the new record.
    pub async fn apply(
        &self,
        session_id: &str,
        delta: RecordDelta,
    ) -> Result<ProjectRecord, PersistenceError> {
        let mut cache = self.cache.lock().await;
        let mut record = match cache.get(session_id) {
            Some(record) => record.clone(),
            None => match self.store.get(session_id).await? {
                Some(record) => record,
                None => ProjectRecord::new(session_id),
            },
        };

        match delta {
            RecordDelta::Artifacts(artifacts) => {
                for (key, value) in artifacts {
                    record.artifacts.insert(key, value);
                }
            }
            RecordDelta::Phase(phase) => {
                record.phase = phase;
            }
            RecordDelta::Selection {
                mode,
                selected_agent_id,
            } => {
                record.agent_selection_mode = mode;
                record.selected_agent_id = selected_agent_id;
            }
            RecordDelta::AppendConversation(entries) => {
                record.conversation_history.extend(entries);
            }
        }
        record.updated_at = chrono::Utc::now();

        self.store.save(session_id, &record).await?;
        cache.insert(session_id.to_string(), record.clone());
        Ok(record)
    }
}
