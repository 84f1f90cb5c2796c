//! Events that drive a session through the graph

use crate::history::Turn;
use serde::{Deserialize, Serialize};

/// External approve/reject decision for a paused session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ResumeDecision {
    Approve,
    Reject {
        #[serde(default)]
        reason: Option<String>,
    },
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Caller events
    UserMessage { text: String },
    Approve,
    Reject { reason: Option<String> },
    /// Re-run reasoning for a session left at `agent`
    Retry,

    // Step completions
    /// The reasoning step appended exactly one assistant turn
    ReasoningComplete,
    ToolsComplete { results: Vec<Turn> },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserMessage { .. } => "user_message",
            Event::Approve => "approve",
            Event::Reject { .. } => "reject",
            Event::Retry => "retry",
            Event::ReasoningComplete => "reasoning_complete",
            Event::ToolsComplete { .. } => "tools_complete",
        }
    }
}

impl From<ResumeDecision> for Event {
    fn from(decision: ResumeDecision) -> Self {
        match decision {
            ResumeDecision::Approve => Event::Approve,
            ResumeDecision::Reject { reason } => Event::Reject { reason },
        }
    }
}
