//! Routing after the reasoning step

use crate::history::Turn;

/// Where the graph goes after reasoning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Terminal,
    ToTools,
}

/// `ToTools` iff the last turn is an assistant turn with pending requests
pub fn route(last_turn: Option<&Turn>) -> Route {
    match last_turn {
        Some(Turn::Assistant { tool_calls, .. }) if !tool_calls.is_empty() => Route::ToTools,
        _ => Route::Terminal,
    }
}
