//! Execution controller.
//!
//! Drives the task-lifecycle state machine around one claude subprocess per
//! request: publishes `Submitted` (new tasks only) and a starting `Working`
//! update, runs the subprocess via [`runner`], and publishes exactly one
//! terminal event per task. Supports many concurrent executions; the only
//! state shared between them is the injected [`SessionStore`] and the
//! running-execution table used for cancellation.

pub mod command;
mod runner;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GlobalConfig;
use crate::protocol::{
    EventSink, ProtocolMessage, Task, TaskEvent, TaskState, TaskStatus, TaskStatusUpdate,
};
use crate::session::SessionStore;
use crate::trace::SpanSink;
use crate::AppError;

/// Placeholder text published with the initial `Working` update.
const STARTING_MESSAGE: &str = "Sending request to Claude Code...";

/// Final message used when the subprocess produced no text at all.
const EMPTY_RESPONSE_FALLBACK: &str = "No response from Claude Code";

/// One task execution request.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Task identifier; reused ids continue an existing task.
    pub task_id: String,
    /// Conversation context; drives session resume.
    pub context_id: String,
    /// Message id of the originating request.
    pub message_id: String,
    /// Prompt text.
    pub user_text: String,
    /// Whether a task record already exists for `task_id`; suppresses the
    /// `Submitted` event when true.
    pub existing_task: bool,
}

/// Executes tasks by bridging requests to claude subprocesses.
pub struct ClaudeExecutor {
    config: Arc<GlobalConfig>,
    claude_bin: PathBuf,
    sessions: Arc<dyn SessionStore>,
    span_sink: Option<Arc<dyn SpanSink>>,
    running: Mutex<HashMap<String, CancellationToken>>,
}

impl ClaudeExecutor {
    /// Create an executor.
    ///
    /// `claude_bin` must already be resolved via
    /// [`command::find_claude_bin`] — a missing executable is a startup
    /// failure, not a per-task one. `span_sink` enables the trace emitter
    /// when present.
    #[must_use]
    pub fn new(
        config: Arc<GlobalConfig>,
        claude_bin: PathBuf,
        sessions: Arc<dyn SessionStore>,
        span_sink: Option<Arc<dyn SpanSink>>,
    ) -> Self {
        Self {
            config,
            claude_bin,
            sessions,
            span_sink,
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Execute one task to completion, publishing every lifecycle event to
    /// `sink`. Exactly one terminal event is published per call.
    pub async fn execute(&self, request: ExecutionRequest, sink: &dyn EventSink) {
        let ExecutionRequest {
            task_id,
            context_id,
            message_id,
            user_text,
            existing_task,
        } = request;

        if !existing_task {
            let user_message =
                ProtocolMessage::user_text(&task_id, &context_id, message_id.clone(), user_text.clone());
            sink.publish(TaskEvent::Task(Task {
                id: task_id.clone(),
                context_id: context_id.clone(),
                status: TaskStatus::now(TaskState::Submitted, None),
                history: vec![user_message],
            }));
        }

        sink.publish(TaskEvent::StatusUpdate(TaskStatusUpdate {
            task_id: task_id.clone(),
            context_id: context_id.clone(),
            status: TaskStatus::now(
                TaskState::Working,
                Some(ProtocolMessage::agent_text(
                    &task_id,
                    &context_id,
                    STARTING_MESSAGE.to_owned(),
                )),
            ),
            is_final: false,
        }));

        let cancel = CancellationToken::new();
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(task_id.clone(), cancel.clone());

        info!(task_id, context_id, "task execution started");

        let result = runner::run_claude(
            &self.config,
            &self.claude_bin,
            self.sessions.as_ref(),
            self.span_sink.clone(),
            sink,
            runner::RunParams {
                task_id: &task_id,
                context_id: &context_id,
                message_id: &message_id,
                user_text: &user_text,
                cancel,
            },
        )
        .await;

        // `cancel` may have removed the entry already; removal is idempotent.
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&task_id);

        match result {
            Ok(text) => {
                let final_text = if text.is_empty() {
                    EMPTY_RESPONSE_FALLBACK.to_owned()
                } else {
                    text
                };
                info!(task_id, chars = final_text.len(), "task completed");
                sink.publish(TaskEvent::StatusUpdate(TaskStatusUpdate {
                    task_id: task_id.clone(),
                    context_id: context_id.clone(),
                    status: TaskStatus::now(
                        TaskState::Completed,
                        Some(ProtocolMessage::agent_text(&task_id, &context_id, final_text)),
                    ),
                    is_final: true,
                }));
            }
            Err(err) => {
                let reason = match err {
                    AppError::Execution(msg) => msg,
                    other => other.to_string(),
                };
                warn!(task_id, error = %reason, "task failed");
                sink.publish(TaskEvent::StatusUpdate(TaskStatusUpdate {
                    task_id: task_id.clone(),
                    context_id: context_id.clone(),
                    status: TaskStatus::now(
                        TaskState::Failed,
                        Some(ProtocolMessage::agent_text(&task_id, &context_id, reason)),
                    ),
                    is_final: true,
                }));
            }
        }
    }

    /// Request cancellation of a running task.
    ///
    /// Signals the execution's cancellation token and removes it from the
    /// running table immediately. Idempotent: canceling twice, or canceling
    /// an unknown id, is a no-op. The run loop still publishes the terminal
    /// `Failed` event on its own schedule — "removed from the running set"
    /// and "terminal status observed" are separate signals.
    pub fn cancel(&self, task_id: &str) -> bool {
        let token = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(task_id);
        match token {
            Some(token) => {
                info!(task_id, "cancellation requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of executions currently in flight.
    #[must_use]
    pub fn running_count(&self) -> usize {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
