//! API request and response types

use crate::db::SessionSummary;
use crate::history::{ToolInvocationRequest, Turn};
use crate::runtime::WorkflowResponse;
use crate::state_machine::Cursor;
use serde::{Deserialize, Serialize};

/// Caller decision for a paused session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatAction {
    Approve,
    Reject,
    Retry,
}

/// Body of `POST /chat`. A message takes precedence over an action.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub thread_id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub action: Option<ChatAction>,
    /// Only used with `reject`
    #[serde(default)]
    pub reason: Option<String>,
}

/// Session view returned by the chat and session endpoints
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub thread_id: String,
    pub content: String,
    pub is_pending: bool,
    pub tool_calls: Vec<ToolInvocationRequest>,
    /// Text of every turn, in order
    pub history: Vec<String>,
    pub turns: Vec<Turn>,
    pub cursor: Cursor,
}

impl From<WorkflowResponse> for ChatResponse {
    fn from(r: WorkflowResponse) -> Self {
        Self {
            thread_id: r.session_id,
            content: r.content,
            is_pending: r.is_pending,
            tool_calls: r.tool_calls,
            history: r.history.iter().map(Turn::text).collect(),
            turns: r.history,
            cursor: r.cursor,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Whether repeating the same call may succeed
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, retryable: bool) -> Self {
        Self {
            error: message.into(),
            retryable,
        }
    }
}
