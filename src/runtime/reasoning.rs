//! Reasoning step
//!
//! Sends the whole history and the tool catalogue to the model and appends
//! exactly one assistant turn on success. On any failure the history is left
//! as it was.

use super::error::WorkflowError;
use crate::history::{MessageHistory, ToolInvocationRequest, Turn};
use crate::llm::{ContentBlock, LlmMessage, LlmRequest, LlmResponse, LlmService, MessageRole, ToolDefinition};
use std::collections::HashSet;
use std::time::Duration;

/// What the model decided
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Finalize(String),
    Invoke(Vec<ToolInvocationRequest>),
}

pub struct ReasoningStep<L> {
    llm: L,
    timeout: Duration,
}

impl<L: LlmService> ReasoningStep<L> {
    pub fn new(llm: L, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    pub async fn run(
        &self,
        history: &mut MessageHistory,
        tools: Vec<ToolDefinition>,
    ) -> Result<Decision, WorkflowError> {
        let request = LlmRequest {
            system: None,
            messages: build_messages(history),
            tools,
            max_tokens: None,
        };

        let response = tokio::time::timeout(self.timeout, self.llm.complete(&request))
            .await
            .map_err(|_| WorkflowError::Timeout {
                stage: "reasoning".to_string(),
                after: self.timeout,
            })?
            .map_err(|e| {
                tracing::warn!(kind = ?e.kind, transient = e.kind.is_transient(), error = %e, "Reasoning failed");
                WorkflowError::ReasoningUnavailable(e.to_string())
            })?;

        let turn = interpret(&response, history)?;
        let decision = match &turn {
            Turn::Assistant { tool_calls, .. } if !tool_calls.is_empty() => {
                Decision::Invoke(tool_calls.clone())
            }
            other => Decision::Finalize(other.text()),
        };

        history.append(turn);
        Ok(decision)
    }
}

/// Turn a model response into an assistant turn, rejecting unusable output.
///
/// Call ids that are empty or already used in this session are replaced.
fn interpret(response: &LlmResponse, history: &MessageHistory) -> Result<Turn, WorkflowError> {
    let mut seen: HashSet<String> = history
        .all()
        .iter()
        .flat_map(Turn::tool_calls)
        .map(|r| r.id.clone())
        .collect();

    let mut calls = Vec::new();
    for (id, name, input) in response.tool_uses() {
        if name.trim().is_empty() {
            return Err(WorkflowError::ReasoningUnavailable(
                "model requested a tool without a name".to_string(),
            ));
        }
        let Some(arguments) = input.as_object() else {
            return Err(WorkflowError::ReasoningUnavailable(format!(
                "arguments for {name} are not an object: {input}"
            )));
        };

        let id = if id.is_empty() || seen.contains(id) {
            format!("call_{}", uuid::Uuid::new_v4().simple())
        } else {
            id.to_string()
        };
        seen.insert(id.clone());
        calls.push(ToolInvocationRequest::new(id, name, arguments.clone()));
    }

    Ok(Turn::assistant(response.text(), calls))
}

/// Convert the history into provider messages.
///
/// Tool results are sent back as user content; consecutive turns with the
/// same provider role are merged into one message.
pub(crate) fn build_messages(history: &MessageHistory) -> Vec<LlmMessage> {
    let mut messages: Vec<LlmMessage> = Vec::new();

    for turn in history.all() {
        let (role, blocks) = match turn {
            Turn::User { content } => (MessageRole::User, vec![ContentBlock::text(content)]),
            Turn::Assistant { content, tool_calls } => {
                let mut blocks = Vec::with_capacity(tool_calls.len() + 1);
                if !content.is_empty() {
                    blocks.push(ContentBlock::text(content));
                }
                blocks.extend(tool_calls.iter().map(|call| {
                    ContentBlock::tool_use(
                        &call.id,
                        &call.name,
                        serde_json::Value::Object(call.arguments.clone()),
                    )
                }));
                (MessageRole::Assistant, blocks)
            }
            Turn::ToolResult {
                call_id,
                tool_name,
                content,
                is_error,
            } => (
                MessageRole::User,
                vec![ContentBlock::ToolResult {
                    tool_use_id: call_id.clone(),
                    name: tool_name.clone(),
                    content: content.clone(),
                    is_error: *is_error,
                }],
            ),
        };

        if blocks.is_empty() {
            continue;
        }

        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => messages.push(LlmMessage { role, content: blocks }),
        }
    }

    messages
}
