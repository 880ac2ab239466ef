//! SQLite persistence for project records.
//!
//! One row per session id with the full record serialized as JSON, plus the
//! phase and timestamps as plain columns for inspection with any SQLite
//! client. WAL mode is enabled for better concurrent access; a
//! `schema_version` table tracks migrations.

use project_mentor_sdk::{async_trait, PersistenceAdapter, PersistenceError, ProjectRecord};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;

/// Durable store backed by a single SQLite database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path and initialize the
    /// schema. Parent directories are created as needed.
    pub fn open(path: PathBuf) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PersistenceError::Unavailable {
                reason: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }

        let conn = Connection::open(&path).map_err(store_unavailable)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(store_unavailable)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory().map_err(store_unavailable)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), PersistenceError> {
        let conn = self.lock_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                phase TEXT NOT NULL,
                record TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_updated_at
            ON sessions(updated_at DESC);

            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            INSERT OR IGNORE INTO schema_version (version) VALUES (1);
            "#,
        )
        .map_err(store_unavailable)?;
        Ok(())
    }

    /// Current schema version.
    pub fn schema_version(&self) -> Result<i32, PersistenceError> {
        let conn = self.lock_conn()?;
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get(0)
        })
        .map_err(store_unavailable)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, PersistenceError> {
        self.conn.lock().map_err(|_| PersistenceError::Unavailable {
            reason: "connection lock poisoned".to_string(),
        })
    }
}

fn store_unavailable(err: rusqlite::Error) -> PersistenceError {
    PersistenceError::Unavailable {
        reason: err.to_string(),
    }
}

#[async_trait]
impl PersistenceAdapter for SqliteStore {
    async fn get(&self, session_id: &str) -> Result<Option<ProjectRecord>, PersistenceError> {
        let json: Option<String> = {
            let conn = self.lock_conn()?;
            conn.query_row(
                "SELECT record FROM sessions WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_unavailable)?
        };

        match json {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| PersistenceError::Serialization {
                    session_id: session_id.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        session_id: &str,
        record: &ProjectRecord,
    ) -> Result<(), PersistenceError> {
        let json =
            serde_json::to_string(record).map_err(|e| PersistenceError::Serialization {
                session_id: session_id.to_string(),
                reason: e.to_string(),
            })?;

        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO sessions (session_id, phase, record, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(session_id) DO UPDATE SET
                phase = excluded.phase,
                record = excluded.record,
                updated_at = excluded.updated_at
            "#,
            params![
                session_id,
                record.phase.as_str(),
                json,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )
        .map_err(store_unavailable)?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), PersistenceError> {
        let conn = self.lock_conn()?;
        conn.execute(
            "DELETE FROM sessions WHERE session_id = ?1",
            params![session_id],
        )
        .map_err(store_unavailable)?;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>, PersistenceError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare("SELECT session_id FROM sessions ORDER BY session_id")
            .map_err(store_unavailable)?;
        let sessions = stmt
            .query_map([], |row| row.get(0))
            .map_err(store_unavailable)?
            .collect::<Result<Vec<String>, _>>()
            .map_err(store_unavailable)?;
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use project_mentor_sdk::{ConversationEntry, ProjectPhase};
    use serde_json::json;

    #[tokio::test]
    async fn test_schema_initialized() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.schema_version().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_save_and_get_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut record = ProjectRecord::new("s1");
        record.phase = ProjectPhase::RequirementsComplete;
        record
            .artifacts
            .insert("requirements".to_string(), json!({"functional": ["login"]}));
        record
            .conversation_history
            .push(ConversationEntry::user("hello"));

        store.save("s1", &record).await.unwrap();
        let loaded = store.get("s1").await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_existing_row() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut record = ProjectRecord::new("s1");
        store.save("s1", &record).await.unwrap();

        record.phase = ProjectPhase::ArchitectureComplete;
        record
            .artifacts
            .insert("architecture".to_string(), json!({"tech_stack": {}}));
        store.save("s1", &record).await.unwrap();

        let loaded = store.get("s1").await.unwrap().unwrap();
        assert_eq!(loaded.phase, ProjectPhase::ArchitectureComplete);
        assert_eq!(store.list_sessions().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.save("b", &ProjectRecord::new("b")).await.unwrap();
        store.save("a", &ProjectRecord::new("a")).await.unwrap();
        assert_eq!(store.list_sessions().await.unwrap(), vec!["a", "b"]);

        store.delete("a").await.unwrap();
        assert_eq!(store.list_sessions().await.unwrap(), vec!["b"]);
    }
}
