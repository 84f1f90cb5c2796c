//! Tool execution step
//!
//! Runs approved requests in order, one result per request. A tool that
//! fails produces an error result; only a timeout aborts the step.

use super::error::WorkflowError;
use super::traits::ToolExecutor;
use crate::history::{ToolInvocationRequest, Turn};
use serde_json::Value;
use std::time::Duration;

pub struct ToolExecutionStep<T> {
    tools: T,
    timeout: Duration,
}

impl<T: ToolExecutor> ToolExecutionStep<T> {
    pub fn new(tools: T, timeout: Duration) -> Self {
        Self { tools, timeout }
    }

    pub fn tools(&self) -> &T {
        &self.tools
    }

    pub async fn run(&self, requests: &[ToolInvocationRequest]) -> Result<Vec<Turn>, WorkflowError> {
        let mut results = Vec::with_capacity(requests.len());

        for request in requests {
            let arguments = Value::Object(request.arguments.clone());
            let outcome = tokio::time::timeout(self.timeout, self.tools.invoke(&request.name, &arguments))
                .await
                .map_err(|_| {
                    tracing::warn!(tool = %request.name, call_id = %request.id, "Tool timed out");
                    WorkflowError::Timeout {
                        stage: format!("tool {}", request.name),
                        after: self.timeout,
                    }
                })?;

            let turn = match outcome {
                Ok(output) => {
                    tracing::info!(tool = %request.name, call_id = %request.id, "Tool completed");
                    Turn::tool_result(&request.id, &request.name, output)
                }
                Err(e) => {
                    tracing::warn!(tool = %request.name, call_id = %request.id, error = %e, "Tool failed");
                    Turn::tool_error(&request.id, &request.name, e.to_string())
                }
            };
            results.push(turn);
        }

        Ok(results)
    }
}
