//! In-memory persistence adapter.
//!
//! Records are cloned in and out, so callers never share mutable state with
//! the store. State lives only for the lifetime of the process.

use project_mentor_sdk::{async_trait, PersistenceAdapter, PersistenceError, ProjectRecord};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Simple in-memory store keyed by session id.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, ProjectRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions (test helper).
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryStore {
    async fn get(&self, session_id: &str) -> Result<Option<ProjectRecord>, PersistenceError> {
        Ok(self.records.lock().await.get(session_id).cloned())
    }

    async fn save(
        &self,
        session_id: &str,
        record: &ProjectRecord,
    ) -> Result<(), PersistenceError> {
        self.records
            .lock()
            .await
            .insert(session_id.to_string(), record.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), PersistenceError> {
        self.records.lock().await.remove(session_id);
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, PersistenceError> {
        let mut sessions: Vec<String> = self.records.lock().await.keys().cloned().collect();
        sessions.sort();
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_get_round_trip() {
        let store = MemoryStore::new();
        let record = ProjectRecord::new("s1");
        store.save("s1", &record).await.unwrap();

        let loaded = store.get("s1").await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = MemoryStore::new();
        store.save("s1", &ProjectRecord::new("s1")).await.unwrap();
        store.delete("s1").await.unwrap();
        assert!(store.get("s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_sessions_sorted() {
        let store = MemoryStore::new();
        store.save("b", &ProjectRecord::new("b")).await.unwrap();
        store.save("a", &ProjectRecord::new("a")).await.unwrap();
        assert_eq!(store.list_sessions().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_stored_record_is_isolated_from_caller() {
        let store = MemoryStore::new();
        let mut record = ProjectRecord::new("s1");
        store.save("s1", &record).await.unwrap();

        // Mutating the caller's copy must not leak into the store.
        record.project_name = Some("changed".to_string());
        let loaded = store.get("s1").await.unwrap().unwrap();
        assert!(loaded.project_name.is_none());
    }
}
