//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::memory::MemoryStore;
use super::traits::*;
use crate::db::SessionSummary;
use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmResponse, LlmService, ToolDefinition};
use crate::state_machine::SessionState;
use crate::tools::{ToolError, ToolRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Mock LLM
// ============================================================================

/// Mock LLM that returns queued responses
pub struct MockLlmService {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    requests: Mutex<Vec<LlmRequest>>,
    delay: Option<Duration>,
}

impl MockLlmService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Response containing one tool request and no text
    pub fn tool_call(id: &str, name: &str, input: Value) -> LlmResponse {
        Self::tool_calls(vec![(id, name, input)])
    }

    pub fn tool_calls(calls: Vec<(&str, &str, Value)>) -> LlmResponse {
        LlmResponse {
            content: calls
                .into_iter()
                .map(|(id, name, input)| ContentBlock::tool_use(id, name, input))
                .collect(),
            end_turn: false,
            usage: crate::llm::Usage::default(),
        }
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

// ============================================================================
// Spy Tool Executor
// ============================================================================

/// Runs the real slip tools and records every invocation
pub struct SpyToolExecutor {
    registry: ToolRegistry,
    delay: Option<Duration>,
    failing: Vec<String>,
    pub executions: Mutex<Vec<(String, Value)>>,
}

impl SpyToolExecutor {
    pub fn new() -> Self {
        Self {
            registry: ToolRegistry::standard().unwrap(),
            delay: None,
            failing: Vec::new(),
            executions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make every call to `name` fail
    pub fn failing(mut self, name: impl Into<String>) -> Self {
        self.failing.push(name.into());
        self
    }

    pub fn recorded_executions(&self) -> Vec<(String, Value)> {
        self.executions.lock().unwrap().clone()
    }

    pub fn execution_count(&self) -> usize {
        self.executions.lock().unwrap().len()
    }
}

#[async_trait]
impl ToolExecutor for SpyToolExecutor {
    async fn invoke(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        self.executions
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.iter().any(|n| n == name) {
            return Err(ToolError::Execution {
                tool: name.to_string(),
                message: "backend unavailable".to_string(),
            });
        }
        self.registry.invoke(name, arguments).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }
}

// ============================================================================
// Flaky Store
// ============================================================================

/// Memory store whose saves can be switched to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_saves: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Write a state directly, bypassing the engine
    pub async fn seed(&self, state: &SessionState) {
        let version = self
            .inner
            .load(&state.session_id)
            .await
            .unwrap()
            .map_or(0, |c| c.version);
        self.inner.save(state, version).await.unwrap();
    }
}

#[async_trait]
impl CheckpointStore for FlakyStore {
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, StoreError> {
        self.inner.load(session_id).await
    }

    async fn save(&self, state: &SessionState, expected_version: u64) -> Result<u64, StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        self.inner.save(state, expected_version).await
    }

    async fn list(&self) -> Result<Vec<SessionSummary>, StoreError> {
        self.inner.list().await
    }
}
