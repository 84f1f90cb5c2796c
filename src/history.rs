//! Conversation history
//!
//! Turns are appended, never edited or reordered. The history is the only
//! context the reasoning step sees.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request from the model to run one tool. Requires approval before it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Call identifier, unique within a session
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolInvocationRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    ToolResult,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::ToolResult => "tool_result",
        }
    }
}

/// One message in the conversation log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    User {
        content: String,
    },
    Assistant {
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolInvocationRequest>,
    },
    ToolResult {
        call_id: String,
        tool_name: String,
        content: Value,
        #[serde(default)]
        is_error: bool,
    },
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Turn::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolInvocationRequest>) -> Self {
        Turn::Assistant {
            content: content.into(),
            tool_calls,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, tool_name: impl Into<String>, content: Value) -> Self {
        Turn::ToolResult {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content,
            is_error: false,
        }
    }

    pub fn tool_error(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Turn::ToolResult {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: Value::String(message.into()),
            is_error: true,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Turn::User { .. } => Role::User,
            Turn::Assistant { .. } => Role::Assistant,
            Turn::ToolResult { .. } => Role::ToolResult,
        }
    }

    /// Pending tool requests; empty for anything but an assistant turn
    pub fn tool_calls(&self) -> &[ToolInvocationRequest] {
        match self {
            Turn::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Display text. Structured tool results are rendered as compact JSON.
    pub fn text(&self) -> String {
        match self {
            Turn::User { content } | Turn::Assistant { content, .. } => content.clone(),
            Turn::ToolResult { content, .. } => match content {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }
}

/// Append-only ordered sequence of turns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageHistory {
    turns: Vec<Turn>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn extend(&mut self, turns: impl IntoIterator<Item = Turn>) {
        self.turns.extend(turns);
    }

    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl From<Vec<Turn>> for MessageHistory {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}
