//! Pure state transition function
//!
//! Given the same session and event it always produces the same result. The
//! engine applies the returned turns and cursor, then executes the effects.

use super::routing::{route, Route};
use super::{Cursor, Effect, Event, SessionState};
use crate::history::{Turn, ToolInvocationRequest};
use thiserror::Error;

/// Synthetic user turn appended when the reviewer declines the tool calls
pub const REJECTION_NOTICE: &str =
    "ユーザーがツールの実行を却下しました。別の方法を提案してください。";

/// Result of a state transition
#[derive(Debug, PartialEq)]
pub struct TransitionResult {
    pub cursor: Cursor,
    /// Turns to append, in order
    pub turns: Vec<Turn>,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(cursor: Cursor) -> Self {
        Self {
            cursor,
            turns: vec![],
            effects: vec![],
        }
    }

    pub fn with_turn(mut self, turn: Turn) -> Self {
        self.turns.push(turn);
        self
    }

    pub fn with_turns(mut self, turns: impl IntoIterator<Item = Turn>) -> Self {
        self.turns.extend(turns);
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    /// The caller sent an event the session cannot accept in its current state
    #[error("Cannot {event} while session is at {cursor}")]
    InvalidState { cursor: Cursor, event: &'static str },
    /// A step reported something inconsistent with the session
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(state: &SessionState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state.cursor, event) {
        // ============================================================
        // User messages: new or finished sessions only
        // ============================================================
        (Cursor::Done, Event::UserMessage { text }) => Ok(TransitionResult::new(Cursor::Agent)
            .with_turn(Turn::user(text))
            .with_effect(Effect::RequestReasoning)),

        // ============================================================
        // Reasoning finished: route on the turn it appended
        // ============================================================
        (Cursor::Agent, Event::ReasoningComplete) => {
            let last = state.history.last();
            if !matches!(last, Some(Turn::Assistant { .. })) {
                return Err(TransitionError::InvalidTransition(
                    "reasoning completed without appending an assistant turn".to_string(),
                ));
            }

            match route(last) {
                // Mandatory pause before any tool runs
                Route::ToTools => {
                    let requests = state.history.last().map(Turn::tool_calls).unwrap_or_default().to_vec();
                    Ok(TransitionResult::new(Cursor::Tools)
                        .with_effect(Effect::Checkpoint)
                        .with_effect(Effect::AwaitApproval { requests }))
                }
                Route::Terminal => Ok(TransitionResult::new(Cursor::Done)
                    .with_effect(Effect::Checkpoint)
                    .with_effect(Effect::Finish)),
            }
        }

        (Cursor::Agent, Event::Retry) => {
            Ok(TransitionResult::new(Cursor::Agent).with_effect(Effect::RequestReasoning))
        }

        // ============================================================
        // Approval decisions
        // ============================================================
        (Cursor::Tools, Event::Approve) => Ok(TransitionResult::new(Cursor::Tools)
            .with_effect(Effect::ExecuteTools {
                requests: state.pending_requests().to_vec(),
            })),

        (Cursor::Tools, Event::Reject { reason }) => Ok(TransitionResult::new(Cursor::Agent)
            .with_turn(Turn::user(rejection_text(reason.as_deref())))
            .with_effect(Effect::RequestReasoning)),

        // Tools always loop back to reasoning
        (Cursor::Tools, Event::ToolsComplete { results }) => {
            check_results_match(state.pending_requests(), &results)?;
            Ok(TransitionResult::new(Cursor::Agent)
                .with_turns(results)
                .with_effect(Effect::Checkpoint)
                .with_effect(Effect::RequestReasoning))
        }

        // ============================================================
        // Invalid caller input
        // ============================================================
        (
            cursor,
            event @ (Event::UserMessage { .. } | Event::Approve | Event::Reject { .. } | Event::Retry),
        ) => Err(TransitionError::InvalidState {
            cursor,
            event: event.name(),
        }),

        (cursor, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {cursor} with event {}",
            event.name()
        ))),
    }
}

fn rejection_text(reason: Option<&str>) -> String {
    match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => format!("{REJECTION_NOTICE}\n理由: {reason}"),
        None => REJECTION_NOTICE.to_string(),
    }
}

/// One result per request, same order, correlated by call id
fn check_results_match(
    requests: &[ToolInvocationRequest],
    results: &[Turn],
) -> Result<(), TransitionError> {
    if requests.len() != results.len() {
        return Err(TransitionError::InvalidTransition(format!(
            "expected {} tool results, got {}",
            requests.len(),
            results.len()
        )));
    }

    for (request, result) in requests.iter().zip(results) {
        match result {
            Turn::ToolResult { call_id, .. } if *call_id == request.id => {}
            other => {
                return Err(TransitionError::InvalidTransition(format!(
                    "tool result for {} does not match: {other:?}",
                    request.id
                )))
            }
        }
    }

    Ok(())
}
