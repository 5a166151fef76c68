//! Request handlers for the task protocol endpoints.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::executor::ExecutionRequest;
use crate::protocol::board::ChannelSink;
use crate::protocol::card::AgentCard;
use crate::protocol::Task;
use crate::server::AppState;

/// Error payload returned by handlers.
type HandlerError = (StatusCode, String);

/// One inbound message submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// Prompt text for the agent.
    pub text: String,
    /// Conversation context; minted when absent.
    #[serde(default)]
    pub context_id: Option<String>,
    /// Task id; reusing one continues the existing task.
    #[serde(default)]
    pub task_id: Option<String>,
    /// Message id; minted when absent.
    #[serde(default)]
    pub message_id: Option<String>,
}

/// Response body for a cancellation request.
#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    /// Whether a running execution was actually signaled.
    pub canceled: bool,
}

/// Validate a submission and fill in minted identifiers.
fn prepare(state: &AppState, request: SendRequest) -> Result<ExecutionRequest, HandlerError> {
    if request.text.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "text must not be empty".into()));
    }

    let task_id = request
        .task_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let existing_task = state.board.contains(&task_id);

    Ok(ExecutionRequest {
        context_id: request
            .context_id
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        message_id: request
            .message_id
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        user_text: request.text,
        task_id,
        existing_task,
    })
}

/// `GET /health` — liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

/// `GET /.well-known/agent-card.json` — the agent's self-description.
pub async fn agent_card(State(state): State<Arc<AppState>>) -> Json<AgentCard> {
    Json(state.card.clone())
}

/// `POST /message/send` — run a task to completion, respond with the final
/// task snapshot.
pub async fn message_send(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendRequest>,
) -> Result<Json<Task>, HandlerError> {
    let exec_request = prepare(&state, request)?;
    let task_id = exec_request.task_id.clone();

    state
        .executor
        .execute(exec_request, state.board.as_ref())
        .await;

    state.board.get(&task_id).map(Json).ok_or((
        StatusCode::INTERNAL_SERVER_ERROR,
        "task record missing after execution".into(),
    ))
}

/// `POST /message/stream` — run a task and stream every published event as
/// SSE; the stream closes after the terminal event.
pub async fn message_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, HandlerError> {
    let exec_request = prepare(&state, request)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let sink = ChannelSink::new(Arc::clone(&state.board), tx);

    let executor = Arc::clone(&state.executor);
    tokio::spawn(async move {
        executor.execute(exec_request, &sink).await;
    });

    // Stream events until the final one; the sender half closing also ends
    // the stream (the executor never exits without a terminal publish).
    let events = stream::unfold((rx, false), |(mut rx, done)| async move {
        if done {
            return None;
        }
        let event = rx.recv().await?;
        let is_last = event.is_final();
        let sse = Event::default().json_data(&event).ok()?;
        Some((Ok::<Event, Infallible>(sse), (rx, is_last)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// `GET /tasks/{task_id}` — latest snapshot of a task.
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, HandlerError> {
    state
        .board
        .get(&task_id)
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, format!("task {task_id} not found")))
}

/// `POST /tasks/{task_id}/cancel` — request cooperative cancellation.
///
/// Idempotent: canceling an unknown or already-settled task reports
/// `canceled: false` and is not an error.
pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Json<CancelResponse> {
    let canceled = state.executor.cancel(&task_id);
    Json(CancelResponse { canceled })
}
