// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session history persistence as one JSON file per session under
//! `<state root>/sessions/`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use mnemon_core::MnemonError;
use mnemon_core::types::{ChatMessage, Role};

/// One persisted conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A session's full persisted state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub updated_at: DateTime<Utc>,
    pub history: Vec<SessionTurn>,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            updated_at: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Appends a turn and bumps `updated_at`.
    pub fn push(&mut self, message: &ChatMessage) {
        self.history.push(SessionTurn {
            role: message.role,
            content: message.content.clone(),
            timestamp: Utc::now(),
        });
        self.updated_at = Utc::now();
    }
}

/// File-backed session store.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Creates the store rooted under `<state_root>/sessions/`.
    pub fn new(state_root: &Path) -> Self {
        Self {
            dir: state_root.join("sessions"),
        }
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        // Session ids double as file names; reject separators outright.
        self.dir.join(format!("{}.json", session_id.replace(['/', '\\'], "_")))
    }

    /// Loads a session, returning a fresh empty record when absent.
    pub async fn load(&self, session_id: &str) -> Result<SessionRecord, MnemonError> {
        let path = self.path_for(session_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| MnemonError::Internal(format!("corrupt session file {path:?}: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(SessionRecord::new(session_id))
            }
            Err(e) => Err(MnemonError::Storage {
                source: Box::new(e),
            }),
        }
    }

    /// Persists a session atomically (write temp file, then rename).
    pub async fn save(&self, record: &SessionRecord) -> Result<(), MnemonError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| MnemonError::Storage {
                source: Box::new(e),
            })?;
        let path = self.path_for(&record.session_id);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(record)
            .map_err(|e| MnemonError::Internal(format!("session serialise failed: {e}")))?;
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| MnemonError::Storage {
                source: Box::new(e),
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| MnemonError::Storage {
                source: Box::new(e),
            })?;
        debug!(session_id = %record.session_id, turns = record.history.len(), "session saved");
        Ok(())
    }

    /// Lists known session ids, most recently updated first.
    pub async fn list(&self) -> Result<Vec<String>, MnemonError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(MnemonError::Storage {
                    source: Box::new(e),
                });
            }
        };
        let mut sessions: Vec<(String, std::time::SystemTime)> = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| MnemonError::Storage {
            source: Box::new(e),
        })? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let modified = entry
                .metadata()
                .await
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            sessions.push((stem.to_string(), modified));
        }
        sessions.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(sessions.into_iter().map(|(id, _)| id).collect())
    }

    /// Removes a session file. Missing files fail with `NotFound`.
    pub async fn delete(&self, session_id: &str) -> Result<(), MnemonError> {
        let path = self.path_for(session_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(MnemonError::NotFound {
                kind: "session",
                id: session_id.to_string(),
            }),
            Err(e) => Err(MnemonError::Storage {
                source: Box::new(e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_absent_returns_empty_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let record = store.load("s1").await.unwrap();
        assert_eq!(record.session_id, "s1");
        assert!(record.history.is_empty());
    }

    #[tokio::test]
    async fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        let mut record = SessionRecord::new("s1");
        record.push(&ChatMessage::user("hello"));
        record.push(&ChatMessage::assistant("hi there"));
        store.save(&record).await.unwrap();

        let loaded = store.load("s1").await.unwrap();
        assert_eq!(loaded.history.len(), 2);
        assert_eq!(loaded.history[0].role, Role::User);
        assert_eq!(loaded.history[1].content, "hi there");
    }

    #[tokio::test]
    async fn list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store.save(&SessionRecord::new("a")).await.unwrap();
        store.save(&SessionRecord::new("b")).await.unwrap();

        let ids = store.list().await.unwrap();
        assert_eq!(ids.len(), 2);

        store.delete("a").await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["b".to_string()]);
        assert!(matches!(
            store.delete("a").await.unwrap_err(),
            MnemonError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn session_id_with_separator_is_sanitised() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let mut record = SessionRecord::new("../evil");
        record.push(&ChatMessage::user("x"));
        store.save(&record).await.unwrap();
        // The file lands inside the sessions dir, not the parent.
        assert!(dir.path().join("sessions").join(".._evil.json").exists());
    }
}
