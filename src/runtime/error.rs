//! Errors returned by workflow operations

use super::traits::StoreError;
use crate::state_machine::{Cursor, TransitionError};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WorkflowError {
    /// The operation does not fit the session's position in the graph
    #[error("Session {session_id} cannot accept {operation} while at {cursor}")]
    InvalidState {
        session_id: String,
        cursor: Cursor,
        operation: &'static str,
    },

    /// Another call on the same session is in progress
    #[error("Session {0} is busy")]
    SessionBusy(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The reasoning capability failed or produced unusable output
    #[error("Reasoning unavailable: {0}")]
    ReasoningUnavailable(String),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: String, after: Duration },

    #[error("Session {session_id} is corrupt: {message}")]
    SessionCorrupt { session_id: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub(crate) fn from_transition(session_id: &str, e: TransitionError) -> Self {
        match e {
            TransitionError::InvalidState { cursor, event } => WorkflowError::InvalidState {
                session_id: session_id.to_string(),
                cursor,
                operation: event,
            },
            TransitionError::InvalidTransition(message) => WorkflowError::SessionCorrupt {
                session_id: session_id.to_string(),
                message,
            },
        }
    }

    /// Whether the same call may succeed if simply repeated
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WorkflowError::SessionBusy(_)
                | WorkflowError::ReasoningUnavailable(_)
                | WorkflowError::Timeout { .. }
                | WorkflowError::Store(StoreError::Conflict { .. })
        )
    }
}
