//! HTTP request handlers

use super::types::{ChatAction, ChatRequest, ChatResponse, ErrorResponse, SessionListResponse};
use super::AppState;
use crate::runtime::{StoreError, WorkflowError};
use crate::state_machine::ResumeDecision;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", get(get_session))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat
// ============================================================

async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let thread_id = req.thread_id.trim();
    if thread_id.is_empty() {
        return Err(AppError::BadRequest("thread_id must not be empty".to_string()));
    }

    let engine = &state.engine;
    let response = match (req.message.as_deref().filter(|m| !m.trim().is_empty()), req.action) {
        (Some(message), _) => engine.submit(thread_id, message).await?,
        (None, Some(ChatAction::Approve)) => engine.resume(thread_id, ResumeDecision::Approve).await?,
        (None, Some(ChatAction::Reject)) => {
            engine
                .resume(thread_id, ResumeDecision::Reject { reason: req.reason })
                .await?
        }
        (None, Some(ChatAction::Retry)) => engine.retry(thread_id).await?,
        (None, None) => {
            return Err(AppError::BadRequest(
                "either message or action is required".to_string(),
            ))
        }
    };

    Ok(Json(response.into()))
}

// ============================================================
// Sessions
// ============================================================

async fn list_sessions(State(state): State<AppState>) -> Result<Json<SessionListResponse>, AppError> {
    let sessions = state.engine.list_sessions().await?;
    Ok(Json(SessionListResponse { sessions }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatResponse>, AppError> {
    let response = state.engine.snapshot(&id).await?;
    Ok(Json(response.into()))
}

async fn get_version() -> &'static str {
    concat!("slip-agent ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Workflow(WorkflowError),
}

impl From<WorkflowError> for AppError {
    fn from(e: WorkflowError) -> Self {
        AppError::Workflow(e)
    }
}

fn status_for(e: &WorkflowError) -> StatusCode {
    match e {
        WorkflowError::InvalidState { .. }
        | WorkflowError::SessionBusy(_)
        | WorkflowError::Store(StoreError::Conflict { .. }) => StatusCode::CONFLICT,
        WorkflowError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        WorkflowError::ReasoningUnavailable(_) => StatusCode::BAD_GATEWAY,
        WorkflowError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        WorkflowError::SessionCorrupt { .. } | WorkflowError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg, false)),
            AppError::Workflow(e) => {
                let status = status_for(&e);
                if status.is_server_error() {
                    tracing::error!(error = %e, "Request failed");
                }
                (status, ErrorResponse::new(e.to_string(), e.is_retryable()))
            }
        };

        (status, Json(body)).into_response()
    }
}
