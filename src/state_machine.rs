//! Workflow state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions. The
//! graph is `agent -> (pause) -> tools -> agent`, with `done` as the resting
//! state between user messages.

mod effect;
pub mod event;
pub mod routing;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::{Event, ResumeDecision};
pub use state::{Cursor, SessionState};
pub use transition::{transition, TransitionError, TransitionResult, REJECTION_NOTICE};
