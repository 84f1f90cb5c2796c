//! Session state types

use crate::history::{MessageHistory, ToolInvocationRequest, Turn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Which graph node runs next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    /// Reasoning step pending
    Agent,
    /// Tool execution pending, waiting for an approve/reject decision
    Tools,
    /// Awaiting new user input
    #[default]
    Done,
}

impl Cursor {
    pub fn as_str(self) -> &'static str {
        match self {
            Cursor::Agent => "agent",
            Cursor::Tools => "tools",
            Cursor::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "agent" => Some(Cursor::Agent),
            "tools" => Some(Cursor::Tools),
            "done" => Some(Cursor::Done),
            _ => None,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A broken session invariant
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct InvariantViolation(pub String);

/// The unit of persistence: one conversation and where it stopped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub history: MessageHistory,
    pub cursor: Cursor,
}

impl SessionState {
    /// Fresh session, ready for its first user message
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            history: MessageHistory::new(),
            cursor: Cursor::Done,
        }
    }

    /// Tool requests awaiting approval. Empty unless the cursor is at `tools`.
    pub fn pending_requests(&self) -> &[ToolInvocationRequest] {
        match (self.cursor, self.history.last()) {
            (Cursor::Tools, Some(turn)) => turn.tool_calls(),
            _ => &[],
        }
    }

    /// Check the invariants that must hold after every transition
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        match self.cursor {
            Cursor::Tools => match self.history.last() {
                Some(Turn::Assistant { tool_calls, .. }) if !tool_calls.is_empty() => {}
                Some(turn) => {
                    return Err(InvariantViolation(format!(
                        "cursor is at tools but the last turn is a {} turn without pending requests",
                        turn.role().as_str()
                    )))
                }
                None => {
                    return Err(InvariantViolation(
                        "cursor is at tools but the history is empty".to_string(),
                    ))
                }
            },
            Cursor::Agent if self.history.is_empty() => {
                return Err(InvariantViolation(
                    "cursor is at agent but the history is empty".to_string(),
                ));
            }
            Cursor::Agent | Cursor::Done => {}
        }

        let mut seen = HashSet::new();
        for request in self.history.all().iter().flat_map(Turn::tool_calls) {
            if !seen.insert(request.id.as_str()) {
                return Err(InvariantViolation(format!(
                    "duplicate tool call id {}",
                    request.id
                )));
            }
        }

        Ok(())
    }
}
