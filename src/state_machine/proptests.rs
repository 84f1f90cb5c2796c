//! Property-based tests for the state machine
//!
//! Drives random caller inputs and random step outcomes through the pure
//! transition function and checks the session invariants after every step.

use super::*;
use crate::history::{ToolInvocationRequest, Turn};
use proptest::prelude::*;
use serde_json::{json, Map};

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// What the caller does next
#[derive(Debug, Clone)]
enum CallerInput {
    Message(String),
    Approve,
    Reject(Option<String>),
    Retry,
}

/// What the reasoning step produces when asked
#[derive(Debug, Clone)]
struct ScriptedReasoning {
    text: String,
    tool_names: Vec<String>,
}

fn arb_caller_input() -> impl Strategy<Value = CallerInput> {
    prop_oneof![
        "[a-z ]{1,20}".prop_map(CallerInput::Message),
        Just(CallerInput::Approve),
        proptest::option::of("[a-z ]{0,10}").prop_map(CallerInput::Reject),
        Just(CallerInput::Retry),
    ]
}

fn arb_reasoning() -> impl Strategy<Value = ScriptedReasoning> {
    (
        "[a-z ]{0,20}",
        proptest::collection::vec(
            prop_oneof![Just("search_slip_info".to_string()), Just("create_investigation_report".to_string())],
            0..4,
        ),
    )
        .prop_map(|(text, tool_names)| ScriptedReasoning { text, tool_names })
}

fn to_event(input: CallerInput) -> Event {
    match input {
        CallerInput::Message(text) => Event::UserMessage { text },
        CallerInput::Approve => Event::Approve,
        CallerInput::Reject(reason) => Event::Reject { reason },
        CallerInput::Retry => Event::Retry,
    }
}

// ============================================================================
// Minimal driver mirroring the engine's effect loop
// ============================================================================

struct Sim {
    state: SessionState,
    next_call: usize,
    tools_executed: usize,
}

impl Sim {
    fn apply(&mut self, result: TransitionResult) -> Vec<Effect> {
        self.state.history.extend(result.turns);
        self.state.cursor = result.cursor;
        result.effects
    }

    /// Feed one caller input, then run effects until the graph halts
    fn drive(&mut self, input: CallerInput, reasoning: &mut impl Iterator<Item = ScriptedReasoning>) {
        let before = self.state.clone();
        let Ok(result) = transition(&self.state, to_event(input)) else {
            // Rejected inputs leave the session untouched
            assert_eq!(self.state, before);
            return;
        };

        let mut queue: std::collections::VecDeque<Effect> = self.apply(result).into();
        self.state.check_invariants().unwrap();

        while let Some(effect) = queue.pop_front() {
            let event = match effect {
                Effect::RequestReasoning => {
                    let script = reasoning.next().unwrap_or(ScriptedReasoning {
                        text: "done".to_string(),
                        tool_names: vec![],
                    });
                    let calls = script
                        .tool_names
                        .into_iter()
                        .map(|name| {
                            self.next_call += 1;
                            ToolInvocationRequest::new(format!("call-{}", self.next_call), name, Map::new())
                        })
                        .collect();
                    self.state.history.append(Turn::assistant(script.text, calls));
                    Event::ReasoningComplete
                }
                Effect::ExecuteTools { requests } => {
                    self.tools_executed += requests.len();
                    let results = requests
                        .iter()
                        .map(|r| Turn::tool_result(r.id.clone(), r.name.clone(), json!("ok")))
                        .collect();
                    Event::ToolsComplete { results }
                }
                Effect::Checkpoint => continue,
                Effect::AwaitApproval { .. } | Effect::Finish => break,
            };

            let result = transition(&self.state, event).expect("step completions are always accepted");
            queue.extend(self.apply(result));
            self.state.check_invariants().unwrap();
        }
    }
}

proptest! {
    #[test]
    fn invariants_hold_for_any_input_sequence(
        inputs in proptest::collection::vec(arb_caller_input(), 1..20),
        scripts in proptest::collection::vec(arb_reasoning(), 0..40),
    ) {
        let mut sim = Sim { state: SessionState::new("prop"), next_call: 0, tools_executed: 0 };
        let mut reasoning = scripts.into_iter();

        for input in inputs {
            let len_before = sim.state.history.len();
            let prefix = sim.state.history.all().to_vec();
            sim.drive(input, &mut reasoning);

            // Append-only: earlier turns are never changed
            prop_assert!(sim.state.history.len() >= len_before);
            prop_assert_eq!(&sim.state.history.all()[..len_before], &prefix[..]);
            // The graph always halts at a resting point
            prop_assert!(matches!(sim.state.cursor, Cursor::Done | Cursor::Tools));
        }
    }

    #[test]
    fn reject_never_executes_tools(
        text in "[a-z]{1,10}",
        reason in proptest::option::of("[a-z ]{0,10}"),
        n_calls in 1usize..4,
    ) {
        let mut sim = Sim { state: SessionState::new("prop"), next_call: 0, tools_executed: 0 };
        let pausing = ScriptedReasoning {
            text: String::new(),
            tool_names: vec!["search_slip_info".to_string(); n_calls],
        };
        let mut reasoning = vec![pausing].into_iter();

        sim.drive(CallerInput::Message(text), &mut reasoning);
        prop_assert_eq!(sim.state.cursor, Cursor::Tools);

        sim.drive(CallerInput::Reject(reason), &mut reasoning);
        prop_assert_eq!(sim.tools_executed, 0);
        prop_assert_eq!(sim.state.cursor, Cursor::Done);
    }

    #[test]
    fn approve_runs_each_request_once(n_calls in 1usize..5) {
        let mut sim = Sim { state: SessionState::new("prop"), next_call: 0, tools_executed: 0 };
        let pausing = ScriptedReasoning {
            text: String::new(),
            tool_names: vec!["search_slip_info".to_string(); n_calls],
        };
        let mut reasoning = vec![pausing].into_iter();

        sim.drive(CallerInput::Message("go".to_string()), &mut reasoning);
        sim.drive(CallerInput::Approve, &mut reasoning);

        prop_assert_eq!(sim.tools_executed, n_calls);
        let results = sim
            .state
            .history
            .all()
            .iter()
            .filter(|t| matches!(t, Turn::ToolResult { .. }))
            .count();
        prop_assert_eq!(results, n_calls);
        prop_assert_eq!(sim.state.cursor, Cursor::Done);
    }
}
