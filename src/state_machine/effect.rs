//! Effects produced by state transitions

use crate::history::ToolInvocationRequest;

/// Effects to be executed by the engine after a transition is applied
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Run the reasoning step over the current history
    RequestReasoning,

    /// Run the approved tool requests, in order
    ExecuteTools { requests: Vec<ToolInvocationRequest> },

    /// Persist the session as it stands
    Checkpoint,

    /// Stop and hand the pending requests to the caller for review
    AwaitApproval { requests: Vec<ToolInvocationRequest> },

    /// Stop with a final answer
    Finish,
}
