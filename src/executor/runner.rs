//! Per-task subprocess run loop.
//!
//! One invocation of [`run_claude`] owns one claude subprocess from spawn to
//! settle. Stdout is framed into lines, classified, and processed strictly
//! in emission order by a single loop; stderr is drained concurrently for
//! the failure path. The loop suspends on whichever resolves first: the next
//! framed line, the cancellation token, or the hard deadline.
//!
//! All per-execution state (accumulated text, captured lines, the trace
//! emitter's cursor and tool table) lives in this function's locals —
//! nothing here is shared across executions.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::time::Instant;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::GlobalConfig;
use crate::executor::command::{build_claude_args, build_command};
use crate::protocol::{EventSink, ProtocolMessage, TaskEvent, TaskState, TaskStatus, TaskStatusUpdate};
use crate::session::SessionStore;
use crate::stream::classifier::{classify, AgentMessage};
use crate::stream::codec::StreamCodec;
use crate::stream::preview::{preview, DEFAULT_PREVIEW_WIDTH};
use crate::trace::emitter::{TraceContext, TraceEmitter};
use crate::trace::SpanSink;
use crate::{AppError, Result};

/// Identifiers and control handles for one run.
pub(crate) struct RunParams<'a> {
    /// Task being executed.
    pub task_id: &'a str,
    /// Conversation context of the task.
    pub context_id: &'a str,
    /// Message id of the originating request.
    pub message_id: &'a str,
    /// Prompt text extracted from the request.
    pub user_text: &'a str,
    /// Cooperative cancellation handle for this execution.
    pub cancel: CancellationToken,
}

/// How the read loop stopped consuming stdout.
enum Settle {
    /// Stream closed; await the exit status.
    Eof,
    /// Cancellation was requested.
    Canceled,
    /// The wall-clock deadline elapsed.
    TimedOut,
}

/// Run one claude subprocess to completion.
///
/// Returns the accumulated response text on clean exit. Every failure mode
/// (spawn error, non-zero exit, timeout, cancellation) returns
/// [`AppError::Execution`] carrying the caller-visible message, resolved in
/// order: structured error-result line from captured stdout, then stderr,
/// then a generic description.
///
/// # Errors
///
/// See above — the error message is the resolved failure text.
pub(crate) async fn run_claude(
    config: &GlobalConfig,
    claude_bin: &Path,
    sessions: &dyn SessionStore,
    span_sink: Option<Arc<dyn SpanSink>>,
    sink: &dyn EventSink,
    params: RunParams<'_>,
) -> Result<String> {
    let resume = sessions.get(params.context_id);
    let args = build_claude_args(params.user_text, resume.as_deref(), config);
    let workspace = config.workspace_root_abs();

    debug!(
        task_id = params.task_id,
        resume = resume.is_some(),
        workspace = %workspace.display(),
        "launching claude subprocess"
    );

    let mut child = build_command(claude_bin, &args, &workspace)
        .spawn()
        .map_err(|err| {
            AppError::Execution(format!("failed to spawn {}: {err}", claude_bin.display()))
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Execution("failed to capture claude stdout".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::Execution("failed to capture claude stderr".into()))?;

    // Drain stderr concurrently so the child never blocks on a full pipe.
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        let mut stderr = stderr;
        stderr.read_to_string(&mut buf).await.ok();
        buf
    });

    let emitter = span_sink.map(|sink| {
        TraceEmitter::new(
            sink,
            TraceContext {
                task_id: params.task_id.to_owned(),
                context_id: params.context_id.to_owned(),
                message_id: params.message_id.to_owned(),
                user_text: params.user_text.to_owned(),
            },
        )
    });

    let mut lines = LineLoop {
        task_id: params.task_id,
        context_id: params.context_id,
        sessions,
        sink,
        emitter,
        log_file: open_log_file(config),
        accumulated: String::new(),
        captured: Vec::new(),
    };

    let mut framed = FramedRead::new(stdout, StreamCodec::new());
    let deadline = Instant::now() + Duration::from_secs(config.timeout_seconds);

    let settle = loop {
        tokio::select! {
            biased;

            () = params.cancel.cancelled() => break Settle::Canceled,

            () = tokio::time::sleep_until(deadline) => break Settle::TimedOut,

            item = framed.next() => match item {
                None => break Settle::Eof,
                Some(Ok(line)) => lines.handle_line(&line),
                Some(Err(AppError::Stream(msg))) => {
                    // Oversized line — recoverable, skip and keep reading.
                    warn!(task_id = params.task_id, error = %msg, "skipping unframeable line");
                }
                Some(Err(err)) => {
                    warn!(task_id = params.task_id, %err, "stdout read error; settling");
                    break Settle::Eof;
                }
            }
        }
    };

    let timeout_text = format!(
        "claude process exceeded {}s timeout",
        config.timeout_seconds
    );

    let status = match settle {
        Settle::Canceled => {
            child.kill().await.ok();
            let stderr_text = stderr_task.await.unwrap_or_default();
            return Err(AppError::Execution(lines.resolve_error(
                &stderr_text,
                "canceled by caller",
            )));
        }
        Settle::TimedOut => {
            child.kill().await.ok();
            let stderr_text = stderr_task.await.unwrap_or_default();
            return Err(AppError::Execution(
                lines.resolve_error(&stderr_text, &timeout_text),
            ));
        }
        Settle::Eof => {
            // Stream closed; the exit status still races cancel and deadline.
            tokio::select! {
                biased;

                () = params.cancel.cancelled() => {
                    child.kill().await.ok();
                    let stderr_text = stderr_task.await.unwrap_or_default();
                    return Err(AppError::Execution(lines.resolve_error(
                        &stderr_text,
                        "canceled by caller",
                    )));
                }

                () = tokio::time::sleep_until(deadline) => {
                    child.kill().await.ok();
                    let stderr_text = stderr_task.await.unwrap_or_default();
                    return Err(AppError::Execution(
                        lines.resolve_error(&stderr_text, &timeout_text),
                    ));
                }

                status = child.wait() => status.map_err(|err| {
                    AppError::Execution(format!("failed waiting for claude process: {err}"))
                })?,
            }
        }
    };

    let stderr_text = stderr_task.await.unwrap_or_default();

    if status.success() {
        Ok(lines.accumulated)
    } else {
        Err(AppError::Execution(
            lines.resolve_error(&stderr_text, &exit_description(&status)),
        ))
    }
}

/// Human-readable description of a non-success exit status.
fn exit_description(status: &std::process::ExitStatus) -> String {
    status.code().map_or_else(
        || "claude process terminated by signal".to_owned(),
        |code| format!("claude process exited with code {code}"),
    )
}

/// Open the configured NDJSON mirror file in append mode, if any.
///
/// A mirror that cannot be opened disables mirroring for this run only.
fn open_log_file(config: &GlobalConfig) -> Option<std::fs::File> {
    let path = config.log_path.as_ref()?;
    match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(err) => {
            warn!(path = %path.display(), %err, "cannot open log mirror; disabling for this run");
            None
        }
    }
}

/// Per-execution line processing state.
struct LineLoop<'a> {
    task_id: &'a str,
    context_id: &'a str,
    sessions: &'a dyn SessionStore,
    sink: &'a dyn EventSink,
    emitter: Option<TraceEmitter>,
    log_file: Option<std::fs::File>,
    accumulated: String,
    captured: Vec<String>,
}

impl LineLoop<'_> {
    /// Process one complete stdout line: mirror it, classify it, feed the
    /// trace emitter, and apply controller effects in item order.
    fn handle_line(&mut self, line: &str) {
        if let Some(file) = self.log_file.as_mut() {
            if let Err(err) = writeln!(file, "{line}") {
                warn!(%err, "log mirror write failed; disabling for this run");
                self.log_file = None;
            }
        }

        for msg in classify(line) {
            debug!(
                task_id = self.task_id,
                chunk = %preview(&msg, DEFAULT_PREVIEW_WIDTH),
                "agent message"
            );

            if let Some(emitter) = self.emitter.as_mut() {
                emitter.on_message(&msg);
            }

            match msg {
                AgentMessage::Init { session_id } => {
                    self.sessions.set(self.context_id, session_id);
                }
                AgentMessage::TextDelta { text, .. } => {
                    self.accumulated.push_str(&text);
                    self.publish_working();
                }
                AgentMessage::Result { text, .. } => {
                    // Result text is additive to already-accumulated deltas.
                    if !text.is_empty() {
                        self.accumulated.push_str(&text);
                    }
                }
                AgentMessage::Unrecognized { subtype } => {
                    debug!(task_id = self.task_id, subtype, "unrecognized system message");
                }
                AgentMessage::ToolInvoked { .. } | AgentMessage::ToolCompleted { .. } => {}
            }
        }

        self.captured.push(line.to_owned());
    }

    /// Publish a non-final `Working` update carrying the cumulative text.
    fn publish_working(&self) {
        let message =
            ProtocolMessage::agent_text(self.task_id, self.context_id, self.accumulated.clone());
        self.sink.publish(TaskEvent::StatusUpdate(TaskStatusUpdate {
            task_id: self.task_id.to_owned(),
            context_id: self.context_id.to_owned(),
            status: TaskStatus::now(TaskState::Working, Some(message)),
            is_final: false,
        }));
    }

    /// Resolve the caller-visible failure message.
    ///
    /// Order is a hard contract: (a) a captured stdout line whose JSON marks
    /// an error result, (b) the raw stderr text, (c) the generic fallback.
    fn resolve_error(&self, stderr: &str, fallback: &str) -> String {
        for line in &self.captured {
            if line.trim().is_empty() {
                continue;
            }
            let Ok(value) = serde_json::from_str::<Value>(line) else {
                continue;
            };
            if value.get("type").and_then(Value::as_str) == Some("result")
                && value.get("is_error").and_then(Value::as_bool) == Some(true)
            {
                if let Some(text) = value.get("result").and_then(Value::as_str) {
                    if !text.is_empty() {
                        return text.to_owned();
                    }
                }
            }
        }

        let stderr = stderr.trim();
        if stderr.is_empty() {
            fallback.to_owned()
        } else {
            stderr.to_owned()
        }
    }
}
