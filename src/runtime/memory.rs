//! In-process checkpoint store
//!
//! Same contract as the SQLite store; state is lost when the process exits.

use super::traits::{Checkpoint, CheckpointStore, StoreError};
use crate::db::SessionSummary;
use crate::state_machine::SessionState;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

struct Entry {
    checkpoint: Checkpoint,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .map(|e| e.checkpoint.clone()))
    }

    async fn save(&self, state: &SessionState, expected_version: u64) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        let existing = sessions.get(&state.session_id);

        let actual = existing.map_or(0, |e| e.checkpoint.version);
        if actual != expected_version {
            return Err(StoreError::Conflict {
                session_id: state.session_id.clone(),
                expected: expected_version,
                actual,
            });
        }

        if let Some(entry) = existing {
            let stored = entry.checkpoint.state.history.all();
            if !state.history.all().starts_with(stored) {
                return Err(StoreError::Backend(format!(
                    "refusing to rewrite history of session {}",
                    state.session_id
                )));
            }
        }

        let created_at = existing.map_or(now, |e| e.created_at);
        let version = actual + 1;
        sessions.insert(
            state.session_id.clone(),
            Entry {
                checkpoint: Checkpoint {
                    state: state.clone(),
                    version,
                    updated_at: Some(now),
                },
                created_at,
            },
        );
        Ok(version)
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<SessionSummary> = sessions
            .values()
            .map(|e| SessionSummary {
                id: e.checkpoint.state.session_id.clone(),
                cursor: e.checkpoint.state.cursor.as_str().to_string(),
                version: e.checkpoint.version,
                turn_count: e.checkpoint.state.history.len() as u64,
                created_at: e.created_at,
                updated_at: e.checkpoint.updated_at.unwrap_or(e.created_at),
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }
}
