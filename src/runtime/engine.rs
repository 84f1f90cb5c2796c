//! Workflow engine
//!
//! Drives one session through the graph for each caller operation. Work
//! happens on a copy of the loaded checkpoint and reaches the store only at
//! checkpoint effects, so a call that fails before its first checkpoint
//! leaves the session exactly as it was.

use super::error::WorkflowError;
use super::reasoning::ReasoningStep;
use super::tool_step::ToolExecutionStep;
use super::traits::{Checkpoint, CheckpointStore, ToolExecutor};
use crate::db::SessionSummary;
use crate::history::{ToolInvocationRequest, Turn};
use crate::llm::LlmService;
use crate::state_machine::{transition, Cursor, Effect, Event, ResumeDecision, SessionState};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Shown when the model paused for review without saying anything
pub const REVIEW_PLACEHOLDER: &str = "処理を確認してください。";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowConfig {
    pub reasoning_timeout: Duration,
    pub tool_timeout: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            reasoning_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(30),
        }
    }
}

/// What the caller sees after an operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowResponse {
    pub session_id: String,
    /// Latest assistant text, or the review placeholder
    pub content: String,
    /// True when tool requests are waiting for approval
    pub is_pending: bool,
    pub tool_calls: Vec<ToolInvocationRequest>,
    pub cursor: Cursor,
    pub history: Vec<Turn>,
}

impl WorkflowResponse {
    pub fn from_state(state: &SessionState) -> Self {
        let is_pending = state.cursor == Cursor::Tools;
        let latest = state
            .history
            .all()
            .iter()
            .rev()
            .find(|t| matches!(t, Turn::Assistant { .. }))
            .map(Turn::text)
            .unwrap_or_default();
        let content = if latest.is_empty() && is_pending {
            REVIEW_PLACEHOLDER.to_string()
        } else {
            latest
        };

        Self {
            session_id: state.session_id.clone(),
            content,
            is_pending,
            tool_calls: if is_pending {
                state.pending_requests().to_vec()
            } else {
                vec![]
            },
            cursor: state.cursor,
            history: state.history.all().to_vec(),
        }
    }
}

/// One in-flight call per session; a second one is refused, not queued.
///
/// An entry exists only while a call holds it.
#[derive(Default)]
struct SessionLocks {
    locks: Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
    fn try_acquire(&self, session_id: &str) -> Result<SessionGuard, WorkflowError> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = locks.entry(session_id.to_string()).or_default().clone();
        let guard = lock
            .try_lock_owned()
            .map_err(|_| WorkflowError::SessionBusy(session_id.to_string()))?;

        Ok(SessionGuard {
            session_id: session_id.to_string(),
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Releases the session lock and drops its entry once nobody else holds it
struct SessionGuard {
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only taken under the map lock, so a count of one means idle
        if locks
            .get(&self.session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.session_id);
        }
    }
}

pub struct WorkflowEngine<S, L, T> {
    store: S,
    reasoning: ReasoningStep<L>,
    tools: ToolExecutionStep<T>,
    locks: SessionLocks,
}

impl<S, L, T> WorkflowEngine<S, L, T>
where
    S: CheckpointStore,
    L: LlmService,
    T: ToolExecutor,
{
    pub fn new(store: S, llm: L, tools: T, config: WorkflowConfig) -> Self {
        Self {
            store,
            reasoning: ReasoningStep::new(llm, config.reasoning_timeout),
            tools: ToolExecutionStep::new(tools, config.tool_timeout),
            locks: SessionLocks::default(),
        }
    }

    /// Add a user message to a new or finished session and run the graph
    /// until it finishes or pauses for review
    pub async fn submit(&self, session_id: &str, message: &str) -> Result<WorkflowResponse, WorkflowError> {
        self.handle(
            session_id,
            Event::UserMessage {
                text: message.to_string(),
            },
        )
        .await
    }

    /// Approve or reject the pending tool requests
    pub async fn resume(
        &self,
        session_id: &str,
        decision: ResumeDecision,
    ) -> Result<WorkflowResponse, WorkflowError> {
        self.handle(session_id, decision.into()).await
    }

    /// Re-run reasoning for a session stuck after a failed reasoning call
    pub async fn retry(&self, session_id: &str) -> Result<WorkflowResponse, WorkflowError> {
        self.handle(session_id, Event::Retry).await
    }

    /// Read the stored session without changing it
    pub async fn snapshot(&self, session_id: &str) -> Result<WorkflowResponse, WorkflowError> {
        let checkpoint = self
            .load(session_id)
            .await?
            .ok_or_else(|| WorkflowError::SessionNotFound(session_id.to_string()))?;
        Ok(WorkflowResponse::from_state(&checkpoint.state))
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, WorkflowError> {
        Ok(self.store.list().await?)
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>, WorkflowError> {
        let Some(checkpoint) = self.store.load(session_id).await? else {
            return Ok(None);
        };
        checkpoint
            .state
            .check_invariants()
            .map_err(|v| WorkflowError::SessionCorrupt {
                session_id: session_id.to_string(),
                message: v.0,
            })?;
        Ok(Some(checkpoint))
    }

    async fn handle(&self, session_id: &str, event: Event) -> Result<WorkflowResponse, WorkflowError> {
        let _guard = self.locks.try_acquire(session_id)?;
        let operation = event.name();

        let checkpoint = self
            .load(session_id)
            .await?
            .unwrap_or_else(|| Checkpoint::fresh(session_id));

        tracing::info!(
            session_id = %session_id,
            operation,
            cursor = %checkpoint.state.cursor,
            version = checkpoint.version,
            "Handling session operation"
        );

        let result = self.drive(checkpoint, event).await;
        match &result {
            Ok(response) => tracing::info!(
                session_id = %session_id,
                operation,
                cursor = %response.cursor,
                pending = response.tool_calls.len(),
                "Session operation completed"
            ),
            Err(e) => tracing::warn!(
                session_id = %session_id,
                operation,
                error = %e,
                "Session operation failed"
            ),
        }
        result
    }

    /// Apply the caller's event, then execute effects until the graph halts
    async fn drive(&self, checkpoint: Checkpoint, event: Event) -> Result<WorkflowResponse, WorkflowError> {
        let Checkpoint {
            mut state,
            mut version,
            ..
        } = checkpoint;

        let mut queue: VecDeque<Effect> = apply(&mut state, event)?.into();

        while let Some(effect) = queue.pop_front() {
            let next = match effect {
                Effect::RequestReasoning => {
                    let definitions = self.tools.tools().definitions();
                    let decision = self.reasoning.run(&mut state.history, definitions).await?;
                    tracing::debug!(session_id = %state.session_id, ?decision, "Reasoning completed");
                    Event::ReasoningComplete
                }
                Effect::ExecuteTools { requests } => Event::ToolsComplete {
                    results: self.tools.run(&requests).await?,
                },
                Effect::Checkpoint => {
                    version = self.store.save(&state, version).await?;
                    continue;
                }
                Effect::AwaitApproval { requests } => {
                    tracing::info!(
                        session_id = %state.session_id,
                        count = requests.len(),
                        "Awaiting approval"
                    );
                    break;
                }
                Effect::Finish => break,
            };
            queue.extend(apply(&mut state, next)?);
        }

        Ok(WorkflowResponse::from_state(&state))
    }
}

/// Run the transition function and apply its result to the working copy
fn apply(state: &mut SessionState, event: Event) -> Result<Vec<Effect>, WorkflowError> {
    let result =
        transition(state, event).map_err(|e| WorkflowError::from_transition(&state.session_id, e))?;
    state.history.extend(result.turns);
    state.cursor = result.cursor;
    state
        .check_invariants()
        .map_err(|v| WorkflowError::SessionCorrupt {
            session_id: state.session_id.clone(),
            message: v.0,
        })?;
    Ok(result.effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, LlmResponse};
    use crate::runtime::testing::{FlakyStore, MockLlmService, SpyToolExecutor};
    use crate::runtime::MemoryStore;
    use crate::state_machine::REJECTION_NOTICE;
    use serde_json::json;

    type TestEngine = WorkflowEngine<Arc<FlakyStore>, Arc<MockLlmService>, Arc<SpyToolExecutor>>;

    struct Harness {
        engine: TestEngine,
        store: Arc<FlakyStore>,
        llm: Arc<MockLlmService>,
        tools: Arc<SpyToolExecutor>,
    }

    fn harness_with(tools: SpyToolExecutor, config: WorkflowConfig) -> Harness {
        let store = Arc::new(FlakyStore::new());
        let llm = Arc::new(MockLlmService::new());
        let tools = Arc::new(tools);
        let engine = WorkflowEngine::new(store.clone(), llm.clone(), tools.clone(), config);
        Harness {
            engine,
            store,
            llm,
            tools,
        }
    }

    fn harness() -> Harness {
        harness_with(SpyToolExecutor::new(), WorkflowConfig::default())
    }

    fn search_call(id: &str, slip: &str) -> LlmResponse {
        MockLlmService::tool_call(id, "search_slip_info", json!({ "slip_id": slip }))
    }

    async fn stored_json(store: &FlakyStore, id: &str) -> Option<String> {
        store
            .load(id)
            .await
            .unwrap()
            .map(|c| serde_json::to_string(&c.state).unwrap())
    }

    #[tokio::test]
    async fn test_direct_answer() {
        let h = harness();
        h.llm.queue_response(LlmResponse::text_only("こんにちは"));

        let response = h.engine.submit("A", "hello").await.unwrap();

        assert_eq!(response.content, "こんにちは");
        assert!(!response.is_pending);
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.history.len(), 2);
        assert_eq!(response.cursor, Cursor::Done);
        assert_eq!(h.tools.execution_count(), 0);
    }

    #[tokio::test]
    async fn test_pause_then_approve() {
        let h = harness();
        h.llm.queue_response(search_call("c1", "12345"));

        let paused = h.engine.submit("B", "12345の伝票を調べて").await.unwrap();
        assert!(paused.is_pending);
        assert_eq!(paused.content, REVIEW_PLACEHOLDER);
        assert_eq!(paused.tool_calls.len(), 1);
        assert_eq!(paused.tool_calls[0].arguments["slip_id"], "12345");
        assert_eq!(paused.history.len(), 2);
        assert_eq!(h.tools.execution_count(), 0);

        h.llm.queue_response(LlmResponse::text_only("配達は完了しています。"));
        let done = h.engine.resume("B", ResumeDecision::Approve).await.unwrap();

        assert!(!done.is_pending);
        assert_eq!(done.content, "配達は完了しています。");
        assert_eq!(done.history.len(), 4);
        assert!(matches!(
            &done.history[2],
            Turn::ToolResult { call_id, content, .. } if call_id == "c1" && content["status"] == "完了"
        ));
        assert_eq!(h.tools.execution_count(), 1);
    }

    #[tokio::test]
    async fn test_track_slip_approved() {
        let h = harness();
        h.llm.queue_response(search_call("c1", "12345"));

        let paused = h.engine.submit("sess1", "track slip 12345").await.unwrap();
        assert!(paused.is_pending);
        assert_eq!(paused.cursor, Cursor::Tools);
        assert_eq!(
            paused.history,
            vec![
                Turn::user("track slip 12345"),
                Turn::assistant(
                    "",
                    vec![ToolInvocationRequest::new(
                        "c1",
                        "search_slip_info",
                        json!({"slip_id": "12345"}).as_object().unwrap().clone(),
                    )]
                ),
            ]
        );

        h.llm.queue_response(LlmResponse::text_only("Slip 12345 was delivered."));
        let done = h.engine.resume("sess1", ResumeDecision::Approve).await.unwrap();

        assert_eq!(done.cursor, Cursor::Done);
        assert_eq!(done.content, "Slip 12345 was delivered.");
        assert_eq!(
            done.history[2],
            Turn::tool_result(
                "c1",
                "search_slip_info",
                json!({"origin": "東京都千代田区", "destination": "愛知県名古屋市", "status": "完了"})
            )
        );
        assert_eq!(
            h.tools.recorded_executions(),
            vec![("search_slip_info".to_string(), json!({"slip_id": "12345"}))]
        );
    }

    #[tokio::test]
    async fn test_pause_then_reject() {
        let h = harness();
        h.llm.queue_response(MockLlmService::tool_call(
            "c1",
            "create_investigation_report",
            json!({"destination": "大阪", "note": "至急"}),
        ));
        h.engine.submit("C", "レポートを作って").await.unwrap();

        h.llm.queue_response(LlmResponse::text_only("承知しました。別の方法を提案します。"));
        let done = h
            .engine
            .resume("C", ResumeDecision::Reject { reason: None })
            .await
            .unwrap();

        assert!(!done.is_pending);
        assert_eq!(done.history.len(), 4);
        assert_eq!(done.history[2], Turn::user(REJECTION_NOTICE));
        assert_eq!(h.tools.execution_count(), 0);
    }

    #[tokio::test]
    async fn test_reject_reason_appended() {
        let h = harness();
        h.llm.queue_response(search_call("c1", "12345"));
        h.engine.submit("C", "go").await.unwrap();

        h.llm.queue_response(LlmResponse::text_only("ok"));
        let done = h
            .engine
            .resume(
                "C",
                ResumeDecision::Reject {
                    reason: Some("宛先が違う".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(done.history[2].text(), format!("{REJECTION_NOTICE}\n理由: 宛先が違う"));
    }

    #[tokio::test]
    async fn test_two_round_trips() {
        let h = harness();
        h.llm.queue_response(search_call("c1", "12345"));
        h.engine.submit("D", "調査して").await.unwrap();

        h.llm.queue_response(MockLlmService::tool_call(
            "c2",
            "create_investigation_report",
            json!({"destination": "愛知県名古屋市", "note": "配達済み"}),
        ));
        let second = h.engine.resume("D", ResumeDecision::Approve).await.unwrap();
        assert!(second.is_pending);
        assert_eq!(second.tool_calls[0].id, "c2");

        h.llm.queue_response(LlmResponse::text_only("レポートを作成しました。"));
        let done = h.engine.resume("D", ResumeDecision::Approve).await.unwrap();

        assert!(!done.is_pending);
        assert_eq!(done.history.len(), 6);
        assert_eq!(h.tools.execution_count(), 2);
        assert_eq!(h.llm.request_count(), 3);
    }

    #[tokio::test]
    async fn test_resume_without_pause_is_invalid() {
        let h = harness();
        h.llm.queue_response(LlmResponse::text_only("hi"));
        h.engine.submit("E", "hello").await.unwrap();
        let before = stored_json(&h.store, "E").await;

        let err = h.engine.resume("E", ResumeDecision::Approve).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { cursor: Cursor::Done, .. }));
        assert_eq!(stored_json(&h.store, "E").await, before);
    }

    #[tokio::test]
    async fn test_resume_unknown_session_is_invalid() {
        let h = harness();
        let err = h.engine.resume("ghost", ResumeDecision::Approve).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { .. }));
        assert!(h.store.load("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_message_while_paused_is_invalid() {
        let h = harness();
        h.llm.queue_response(search_call("c1", "12345"));
        h.engine.submit("F", "go").await.unwrap();
        let before = stored_json(&h.store, "F").await;

        let err = h.engine.submit("F", "another").await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { cursor: Cursor::Tools, .. }));
        assert_eq!(stored_json(&h.store, "F").await, before);
    }

    #[tokio::test]
    async fn test_failed_submit_leaves_session_unchanged() {
        let h = harness();
        h.llm.queue_response(LlmResponse::text_only("first answer"));
        h.engine.submit("G", "first").await.unwrap();
        let before = stored_json(&h.store, "G").await;

        h.llm.queue_error(LlmError::server_error("upstream 503"));
        let err = h.engine.submit("G", "second").await.unwrap_err();
        assert!(matches!(err, WorkflowError::ReasoningUnavailable(_)));
        assert_eq!(stored_json(&h.store, "G").await, before);

        // The same call succeeds once the model is back
        h.llm.queue_response(LlmResponse::text_only("second answer"));
        let response = h.engine.submit("G", "second").await.unwrap();
        assert_eq!(response.history.len(), 4);
    }

    #[tokio::test]
    async fn test_failed_first_submit_stores_nothing() {
        let h = harness();
        h.llm.queue_error(LlmError::network("connection refused"));
        assert!(h.engine.submit("H", "hello").await.is_err());
        assert!(h.store.load("H").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_reject_leaves_session_paused() {
        let h = harness();
        h.llm.queue_response(search_call("c1", "12345"));
        h.engine.submit("I", "go").await.unwrap();
        let before = stored_json(&h.store, "I").await;

        h.llm.queue_error(LlmError::server_error("503"));
        assert!(h.engine.resume("I", ResumeDecision::Reject { reason: None }).await.is_err());
        assert_eq!(stored_json(&h.store, "I").await, before);
        assert_eq!(h.engine.snapshot("I").await.unwrap().cursor, Cursor::Tools);
    }

    #[tokio::test]
    async fn test_tool_timeout_keeps_pause() {
        let h = harness_with(
            SpyToolExecutor::new().with_delay(Duration::from_millis(200)),
            WorkflowConfig {
                reasoning_timeout: Duration::from_secs(5),
                tool_timeout: Duration::from_millis(20),
            },
        );
        h.llm.queue_response(search_call("c1", "12345"));
        h.engine.submit("J", "go").await.unwrap();
        let before = stored_json(&h.store, "J").await;

        let err = h.engine.resume("J", ResumeDecision::Approve).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Timeout { .. }));
        assert_eq!(stored_json(&h.store, "J").await, before);
    }

    #[tokio::test]
    async fn test_reasoning_failure_after_tools_allows_retry() {
        let h = harness();
        h.llm.queue_response(search_call("c1", "12345"));
        h.engine.submit("K", "go").await.unwrap();

        h.llm.queue_error(LlmError::server_error("503"));
        assert!(h.engine.resume("K", ResumeDecision::Approve).await.is_err());

        // Tool results are kept; the tool must not run again
        let stalled = h.engine.snapshot("K").await.unwrap();
        assert_eq!(stalled.cursor, Cursor::Agent);
        assert_eq!(stalled.history.len(), 3);

        h.llm.queue_response(LlmResponse::text_only("完了です"));
        let done = h.engine.retry("K").await.unwrap();
        assert_eq!(done.cursor, Cursor::Done);
        assert_eq!(done.history.len(), 4);
        assert_eq!(h.tools.execution_count(), 1);
    }

    #[tokio::test]
    async fn test_retry_outside_agent_is_invalid() {
        let h = harness();
        h.llm.queue_response(LlmResponse::text_only("hi"));
        h.engine.submit("L", "hello").await.unwrap();
        assert!(matches!(
            h.engine.retry("L").await.unwrap_err(),
            WorkflowError::InvalidState { .. }
        ));
    }

    #[tokio::test]
    async fn test_partial_tool_failure() {
        let h = harness_with(
            SpyToolExecutor::new().failing("create_investigation_report"),
            WorkflowConfig::default(),
        );
        h.llm.queue_response(MockLlmService::tool_calls(vec![
            ("c1", "search_slip_info", json!({"slip_id": "12345"})),
            (
                "c2",
                "create_investigation_report",
                json!({"destination": "x", "note": "y"}),
            ),
        ]));
        h.engine.submit("M", "go").await.unwrap();

        h.llm.queue_response(LlmResponse::text_only("一部失敗しました"));
        let done = h.engine.resume("M", ResumeDecision::Approve).await.unwrap();

        assert!(matches!(&done.history[2], Turn::ToolResult { is_error: false, .. }));
        assert!(matches!(&done.history[3], Turn::ToolResult { is_error: true, .. }));
        assert_eq!(done.cursor, Cursor::Done);
        assert_eq!(
            h.tools.recorded_executions(),
            vec![
                ("search_slip_info".to_string(), json!({"slip_id": "12345"})),
                (
                    "create_investigation_report".to_string(),
                    json!({"destination": "x", "note": "y"})
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let h = harness();
        h.store.set_fail_saves(true);
        h.llm.queue_response(LlmResponse::text_only("hi"));

        let err = h.engine.submit("N", "hello").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Store(_)));
        h.store.set_fail_saves(false);
        assert!(h.store.load("N").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_call_is_busy() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(MockLlmService::new().with_delay(Duration::from_millis(200)));
        let engine = Arc::new(WorkflowEngine::new(
            store,
            llm.clone(),
            Arc::new(SpyToolExecutor::new()),
            WorkflowConfig::default(),
        ));
        llm.queue_response(LlmResponse::text_only("slow"));

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.submit("O", "first").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = engine.submit("O", "second").await.unwrap_err();
        assert!(matches!(err, WorkflowError::SessionBusy(_)));

        // Other sessions are unaffected by the lock
        assert!(matches!(
            engine.resume("P", ResumeDecision::Approve).await.unwrap_err(),
            WorkflowError::InvalidState { .. }
        ));

        assert!(first.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_lock_entries_released() {
        let h = harness();
        for i in 0..1000 {
            let err = h
                .engine
                .resume(&format!("ghost-{i}"), ResumeDecision::Approve)
                .await
                .unwrap_err();
            assert!(matches!(err, WorkflowError::InvalidState { .. }));
        }
        assert_eq!(h.engine.locks.len(), 0);

        h.llm.queue_response(LlmResponse::text_only("hi"));
        h.engine.submit("Q", "hello").await.unwrap();
        assert_eq!(h.engine.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_session_refused() {
        let h = harness();
        let mut bad = SessionState::new("Q");
        bad.history.append(Turn::user("hi"));
        bad.cursor = Cursor::Tools;
        h.store.seed(&bad).await;

        assert!(matches!(
            h.engine.resume("Q", ResumeDecision::Approve).await.unwrap_err(),
            WorkflowError::SessionCorrupt { .. }
        ));
        assert!(matches!(
            h.engine.snapshot("Q").await.unwrap_err(),
            WorkflowError::SessionCorrupt { .. }
        ));
    }

    #[tokio::test]
    async fn test_snapshot_unknown_session() {
        let h = harness();
        assert!(matches!(
            h.engine.snapshot("nobody").await.unwrap_err(),
            WorkflowError::SessionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let h = harness();
        h.llm.queue_response(search_call("c1", "12345"));
        h.engine.submit("R", "go").await.unwrap();
        h.llm.queue_response(LlmResponse::text_only("hi"));
        h.engine.submit("S", "hello").await.unwrap();

        assert!(h.engine.snapshot("R").await.unwrap().is_pending);
        assert!(!h.engine.snapshot("S").await.unwrap().is_pending);
        assert_eq!(h.engine.list_sessions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_model_sees_tool_definitions_and_results() {
        let h = harness();
        h.llm.queue_response(search_call("c1", "12345"));
        h.engine.submit("T", "go").await.unwrap();
        h.llm.queue_response(LlmResponse::text_only("done"));
        h.engine.resume("T", ResumeDecision::Approve).await.unwrap();

        let requests = h.llm.recorded_requests();
        assert_eq!(requests[0].tools.len(), 2);
        // user, assistant(tool use), user(tool result)
        assert_eq!(requests[1].messages.len(), 3);
    }
}
