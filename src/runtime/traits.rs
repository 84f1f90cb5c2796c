//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the engine with mock implementations.

use crate::db::{Database, DbError, SessionSummary};
use crate::llm::ToolDefinition;
use crate::state_machine::SessionState;
use crate::tools::{ToolError, ToolRegistry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Latest durable snapshot of one session
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub state: SessionState,
    /// 0 for a session that was never saved
    pub version: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    pub fn fresh(session_id: impl Into<String>) -> Self {
        Self {
            state: SessionState::new(session_id),
            version: 0,
            updated_at: None,
        }
    }
}

/// Checkpoint store failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Session {session_id} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        session_id: String,
        expected: u64,
        actual: u64,
    },
    #[error("Session {session_id} is corrupt: {message}")]
    Corrupt { session_id: String, message: String },
    #[error("Checkpoint store failure: {0}")]
    Backend(String),
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Conflict {
                session_id,
                expected,
                actual,
            } => StoreError::Conflict {
                session_id,
                expected,
                actual,
            },
            DbError::Corrupt {
                session_id,
                message,
            } => StoreError::Corrupt {
                session_id,
                message,
            },
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Durable per-session checkpoints
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Latest checkpoint, or `None` for a session never saved
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, StoreError>;

    /// Atomically replace the checkpoint if its version is still
    /// `expected_version`. Returns the new version.
    async fn save(&self, state: &SessionState, expected_version: u64) -> Result<u64, StoreError>;

    /// All known sessions, most recently updated first
    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError>;
}

/// Executor for tools
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Validate and run one tool
    async fn invoke(&self, name: &str, arguments: &Value) -> Result<Value, ToolError>;

    /// Get tool definitions for LLM
    fn definitions(&self) -> Vec<ToolDefinition>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: CheckpointStore + ?Sized> CheckpointStore for Arc<T> {
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        (**self).load(session_id).await
    }

    async fn save(&self, state: &SessionState, expected_version: u64) -> Result<u64, StoreError> {
        (**self).save(state, expected_version).await
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        (**self).list().await
    }
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn invoke(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        (**self).invoke(name, arguments).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        (**self).definitions()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a checkpoint store
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CheckpointStore for DatabaseStore {
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        Ok(self.db.load_session(session_id)?)
    }

    async fn save(&self, state: &SessionState, expected_version: u64) -> Result<u64, StoreError> {
        Ok(self.db.save_session(state, expected_version)?)
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        Ok(self.db.list_sessions()?)
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn invoke(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        ToolRegistry::invoke(self, name, arguments).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        ToolRegistry::definitions(self)
    }
}
